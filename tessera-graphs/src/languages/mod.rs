pub mod csharp;
mod ecma;
pub mod fallback;
pub mod go;
mod helpers;
pub mod java;
pub mod javascript;
pub mod kotlin;
pub mod python;
pub mod typescript;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::resolve::ModuleResolution;
use crate::{CallSite, ImportDeclaration, Symbol};

pub use helpers::Scope;

/// Buffers a walker appends into.
///
/// Owned by the caller so anything pushed before a panic survives it.
#[derive(Debug, Default)]
pub struct Extraction {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportDeclaration>,
    pub calls: Vec<CallSite>,
}

/// Trait implemented by each language's extraction support.
pub trait LanguageSupport: Send + Sync + std::fmt::Debug {
    /// Language identifier (e.g., "typescript", "python").
    fn id(&self) -> &'static str;

    /// File extensions this language handles.
    fn extensions(&self) -> &'static [&'static str];

    /// Tree-sitter language for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Walk a parsed tree and append symbols, imports, and calls to `out`.
    fn walk(&self, root: tree_sitter::Node<'_>, source: &str, out: &mut Extraction);

    /// How relative module specifiers in this language map onto files.
    fn module_resolution(&self) -> ModuleResolution {
        ModuleResolution::default()
    }
}

/// Registry of all supported languages.
#[derive(Debug)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<dyn LanguageSupport>>,
    extension_map: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };
        reg.register(Arc::new(typescript::TypeScriptSupport));
        reg.register(Arc::new(typescript::TsxSupport));
        reg.register(Arc::new(javascript::JavaScriptSupport));
        reg.register(Arc::new(python::PythonSupport));
        reg.register(Arc::new(go::GoSupport));
        reg.register(Arc::new(java::JavaSupport));
        reg.register(Arc::new(csharp::CSharpSupport));
        reg.register(Arc::new(kotlin::KotlinSupport));
        reg
    }

    /// A registry restricted to the given language ids. Unknown ids are ignored.
    pub fn with_languages(ids: &[String]) -> Self {
        let full = Self::new();
        let mut reg = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };
        for id in ids {
            if let Some(lang) = full.get(id) {
                reg.register(lang);
            }
        }
        reg
    }

    fn register(&mut self, lang: Arc<dyn LanguageSupport>) {
        for ext in lang.extensions() {
            self.extension_map
                .insert((*ext).to_string(), lang.id().to_string());
        }
        self.languages.insert(lang.id().to_string(), lang);
    }

    /// Look up the language support for a file by its extension.
    ///
    /// Returns `None` when the detected language is not registered here.
    pub fn for_file(&self, path: &Path) -> Option<Arc<dyn LanguageSupport>> {
        let lang_id = crate::detect::detect_language(path)?;
        self.languages.get(lang_id).cloned()
    }

    /// Get a language by its identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn LanguageSupport>> {
        self.languages.get(id).cloned()
    }

    /// List all registered language IDs.
    pub fn language_ids(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }

    /// Every extension handled by a registered language.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extension_map.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detect_language;

    #[test]
    fn registry_agrees_with_detector() {
        let reg = LanguageRegistry::new();
        for ext in reg.extensions() {
            let path = format!("file.{ext}");
            let lang = reg.for_file(Path::new(&path)).unwrap();
            assert_eq!(detect_language(Path::new(&path)), Some(lang.id()), "{ext}");
        }
    }

    #[test]
    fn restricted_registry_drops_other_languages() {
        let reg = LanguageRegistry::with_languages(&["python".to_string(), "cobol".to_string()]);
        assert_eq!(reg.language_ids(), vec!["python"]);
        assert!(reg.for_file(Path::new("a.py")).is_some());
        assert!(reg.for_file(Path::new("a.ts")).is_none());
    }

    #[test]
    fn every_grammar_loads() {
        let reg = LanguageRegistry::new();
        for id in reg.language_ids() {
            let lang = reg.get(id).unwrap();
            let mut parser = tree_sitter::Parser::new();
            parser
                .set_language(&lang.tree_sitter_language())
                .unwrap_or_else(|e| panic!("{id}: {e}"));
        }
    }
}
