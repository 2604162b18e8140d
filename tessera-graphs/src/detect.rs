//! Extension → language-id detection.

use std::path::Path;

/// Extension table. Order only matters for [`supported_extensions`].
const EXTENSION_MAP: &[(&str, &str)] = &[
    ("ts", "typescript"),
    ("mts", "typescript"),
    ("cts", "typescript"),
    ("tsx", "tsx"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("py", "python"),
    ("pyi", "python"),
    ("go", "go"),
    ("java", "java"),
    ("cs", "csharp"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
];

/// Detect a language id from a path's extension.
///
/// Declaration files (`*.d.ts`) are TypeScript like any other `.ts` file.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    language_for_extension(ext)
}

/// Look up a language id for a bare extension (no leading dot, case-insensitive).
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let lower = ext.to_ascii_lowercase();
    EXTENSION_MAP
        .iter()
        .find(|(e, _)| *e == lower)
        .map(|(_, lang)| *lang)
}

/// All extensions the detector recognises.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    EXTENSION_MAP.iter().map(|(ext, _)| *ext)
}
