//! Relative module specifier → candidate file paths.
//!
//! Paths are workspace-relative and `/`-separated. Normalisation is lexical;
//! callers check which candidate actually exists in the store.

/// How a language spells relative imports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelativeStyle {
    /// `./x`, `../x/y` path specifiers.
    Path,
    /// Python's leading dots: `.x`, `..x.y`, `.`.
    PythonDots,
    /// The language has no relative imports.
    #[default]
    None,
}

/// Per-language resolution table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleResolution {
    pub style: RelativeStyle,
    /// Suffixes appended to the normalised specifier, in order.
    pub extensions: &'static [&'static str],
    /// File names tried when the specifier names a directory.
    pub index_files: &'static [&'static str],
}

impl ModuleResolution {
    pub fn is_relative(&self, specifier: &str) -> bool {
        match self.style {
            RelativeStyle::Path => specifier.starts_with("./") || specifier.starts_with("../"),
            RelativeStyle::PythonDots => specifier.starts_with('.'),
            RelativeStyle::None => false,
        }
    }
}

/// Every path `specifier` may refer to when imported from `importer`, in lookup order.
///
/// Returns an empty list for bare specifiers and for paths escaping the workspace root.
pub fn candidate_paths(importer: &str, specifier: &str, res: &ModuleResolution) -> Vec<String> {
    if !res.is_relative(specifier) {
        return Vec::new();
    }
    let dir = parent_dir(importer);
    let base = match res.style {
        RelativeStyle::Path => normalize(dir, specifier),
        RelativeStyle::PythonDots => python_base(dir, specifier),
        RelativeStyle::None => None,
    };
    let Some(base) = base else {
        return Vec::new();
    };

    let mut out = Vec::new();
    if !base.is_empty() && !names_directory(specifier, res.style) {
        if res.style == RelativeStyle::Path && has_known_extension(&base, res) {
            out.push(base.clone());
        }
        out.extend(res.extensions.iter().map(|ext| format!("{base}{ext}")));
    }
    out.extend(res.index_files.iter().map(|index| join(&base, index)));
    out
}

/// `.` in Python or a trailing `/`, `.` or `..` in a path can only mean a package directory.
fn names_directory(specifier: &str, style: RelativeStyle) -> bool {
    match style {
        RelativeStyle::PythonDots => specifier.trim_start_matches('.').is_empty(),
        RelativeStyle::Path => matches!(specifier.rsplit('/').next(), Some("" | "." | "..")),
        RelativeStyle::None => false,
    }
}

fn has_known_extension(path: &str, res: &ModuleResolution) -> bool {
    res.extensions.iter().any(|ext| path.ends_with(ext))
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Lexically apply `rel` to `dir`, folding `.` and `..` segments.
fn normalize(dir: &str, rel: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

/// `.x` → `dir/x`, `..x.y` → `dir/../x/y`, `.` → `dir`.
fn python_base(dir: &str, specifier: &str) -> Option<String> {
    let dots = specifier.chars().take_while(|c| *c == '.').count();
    let rest = &specifier[dots..];
    let mut rel = String::from(".");
    for _ in 1..dots {
        rel.push_str("/..");
    }
    for seg in rest.split('.').filter(|s| !s.is_empty()) {
        rel.push('/');
        rel.push_str(seg);
    }
    normalize(dir, &rel)
}
