//! Workspace enumeration.

use std::path::{Component, Path, PathBuf};

use tessera_graphs::LanguageRegistry;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LanguageConfig;
use crate::ignore::IgnoreRules;

/// A candidate source file found during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub abs_path: PathBuf,
    /// Workspace-relative, `/`-separated.
    pub rel_path: String,
    pub language: &'static str,
}

/// Convert `path` into a `/`-separated workspace path.
///
/// Absolute paths must lie under `root`. A relative path that starts with a
/// relative `root` has it stripped; any other relative path is taken as
/// root-relative. Returns `None` for paths outside `root` or paths that climb
/// with `..`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = if path.is_absolute() {
        path.strip_prefix(root).ok()?
    } else if root.is_relative() {
        path.strip_prefix(root).unwrap_or(path)
    } else {
        path
    };
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Enumerates indexable files under a root.
pub struct Scanner<'a> {
    root: &'a Path,
    registry: &'a LanguageRegistry,
    ignore: &'a dyn IgnoreRules,
    languages: &'a LanguageConfig,
}

impl std::fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("root", &self.root)
            .field("languages", &self.languages)
            .finish_non_exhaustive()
    }
}

impl<'a> Scanner<'a> {
    pub fn new(
        root: &'a Path,
        registry: &'a LanguageRegistry,
        ignore: &'a dyn IgnoreRules,
        languages: &'a LanguageConfig,
    ) -> Self {
        Self {
            root,
            registry,
            ignore,
            languages,
        }
    }

    /// Language for a workspace-relative path, if it is indexable at all.
    pub fn classify(&self, rel_path: &str) -> Option<&'static str> {
        let support = self.registry.for_file(Path::new(rel_path))?;
        let id = support.id();
        self.languages.allows(id).then_some(id)
    }

    /// Walk the tree, pruning ignored directories. Results are sorted by path.
    pub fn scan(&self) -> Vec<ScannedFile> {
        let root = self.root;
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                if e.path() == root {
                    return true;
                }
                let Some(rel) = relative_path(root, e.path()) else {
                    return false;
                };
                if e.file_type().is_dir() {
                    !self.ignore.should_ignore(&format!("{rel}/"))
                } else {
                    !self.ignore.should_ignore(&rel)
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel_path) = relative_path(root, entry.path()) else {
                continue;
            };
            match self.classify(&rel_path) {
                Some(language) => files.push(ScannedFile {
                    abs_path: entry.path().to_path_buf(),
                    rel_path,
                    language,
                }),
                None => debug!(path = %rel_path, "Skipping unsupported file"),
            }
        }

        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        files
    }
}
