//! Ignore rules applied during enumeration and again per file.

use std::path::Path;

use tracing::debug;

use crate::config::IGNORE_FILE;
use crate::error::IndexError;

/// Decides which workspace-relative paths are excluded from indexing.
pub trait IgnoreRules: Send + Sync {
    /// `path` is workspace-relative and `/`-separated. A trailing `/` marks a directory.
    fn should_ignore(&self, path: &str) -> bool;

    /// The pattern strings this rule set was built from.
    fn patterns(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
enum Rule {
    /// `name/` or `a/b/`: a directory anywhere in the path.
    Dir(String),
    Glob(glob::Pattern),
    /// A path component or the full relative path.
    Exact(String),
}

/// Directory, glob, and exact-name rules.
#[derive(Debug, Clone, Default)]
pub struct GlobIgnore {
    rules: Vec<Rule>,
    patterns: Vec<String>,
}

impl GlobIgnore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pattern strings. Blank lines and `#` comments are skipped.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ignore = Self::new();
        for pattern in patterns {
            ignore.add(pattern.as_ref())?;
        }
        Ok(ignore)
    }

    /// Read `.tesseraignore` under `root` (if present) and merge `exclude_dirs` as directory rules.
    pub fn load(root: &Path, exclude_dirs: &[String]) -> Result<Self, IndexError> {
        let mut ignore = Self::new();
        for dir in exclude_dirs {
            let dir = dir.trim_end_matches('/');
            if !dir.is_empty() {
                ignore.add(&format!("{dir}/"))?;
            }
        }

        let path = root.join(IGNORE_FILE);
        if path.is_file() {
            let text = std::fs::read_to_string(&path)?;
            for line in text.lines() {
                ignore.add(line)?;
            }
            debug!(path = %path.display(), rules = ignore.rules.len(), "Loaded ignore file");
        }
        Ok(ignore)
    }

    /// Add one pattern. Blank lines and comments are accepted and ignored.
    pub fn add(&mut self, raw: &str) -> Result<(), IndexError> {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        let pattern = line.trim_start_matches("./").trim_start_matches('/');

        let rule = if let Some(dir) = pattern.strip_suffix('/') {
            Rule::Dir(dir.trim_end_matches('/').to_string())
        } else if pattern.contains(['*', '?', '[']) {
            let compiled = glob::Pattern::new(pattern).map_err(|e| IndexError::IgnorePattern {
                pattern: line.to_string(),
                message: e.to_string(),
            })?;
            Rule::Glob(compiled)
        } else {
            Rule::Exact(pattern.to_string())
        };
        self.rules.push(rule);
        self.patterns.push(line.to_string());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn dir_matches(dir: &str, path: &str) -> bool {
    if dir.is_empty() {
        return false;
    }
    if dir.contains('/') {
        let prefix = format!("{dir}/");
        return path.starts_with(&prefix) || path.contains(&format!("/{prefix}"));
    }
    // Every component but the last names a directory.
    let mut components: Vec<&str> = path.split('/').collect();
    components.pop();
    components.contains(&dir)
}

impl IgnoreRules for GlobIgnore {
    fn should_ignore(&self, path: &str) -> bool {
        let trimmed = path.trim_end_matches('/');
        let file_name = trimmed.rsplit('/').next().unwrap_or(trimmed);

        self.rules.iter().any(|rule| match rule {
            Rule::Dir(dir) => dir_matches(dir, path),
            Rule::Glob(pattern) => pattern.matches(trimmed) || pattern.matches(file_name),
            Rule::Exact(name) => trimmed == name || trimmed.split('/').any(|c| c == name),
        })
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.clone()
    }
}
