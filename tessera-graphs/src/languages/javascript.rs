use super::{Extraction, LanguageSupport, ecma};
use crate::resolve::{ModuleResolution, RelativeStyle};

#[derive(Debug)]
pub struct JavaScriptSupport;

impl LanguageSupport for JavaScriptSupport {
    fn id(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn walk(&self, root: tree_sitter::Node<'_>, source: &str, out: &mut Extraction) {
        ecma::walk(root, source, out);
    }

    fn module_resolution(&self) -> ModuleResolution {
        ModuleResolution {
            style: RelativeStyle::Path,
            extensions: &[".js", ".jsx", ".mjs", ".cjs", ".ts"],
            index_files: &["index.js", "index.jsx", "index.mjs"],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{ParseOutcome, ParseResult, SymbolKind};

    fn parse_js(source: &str) -> ParseResult {
        match crate::extract(&JavaScriptSupport, Path::new("test.js"), Some(source)) {
            ParseOutcome::Parsed(result) => result,
            ParseOutcome::Unparseable { .. } => panic!("javascript grammar failed"),
        }
    }

    #[test]
    fn extracts_functions_classes_and_fields() {
        let source = "function greet(name) {\n  console.log(name);\n}\n\nclass Greeter {\n  count = 0;\n  constructor() {}\n  greet() { greet('x'); }\n}\n";
        let result = parse_js(source);
        let symbols: Vec<_> = result.symbols.iter().map(|s| (s.fqname.as_str(), s.kind)).collect();
        assert_eq!(
            symbols,
            vec![
                ("greet", SymbolKind::Function),
                ("Greeter", SymbolKind::Class),
                ("Greeter.count", SymbolKind::Variable),
                ("Greeter.constructor", SymbolKind::Constructor),
                ("Greeter.greet", SymbolKind::Method),
            ]
        );
        let callees: Vec<_> = result.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["console.log", "greet"]);
    }

    #[test]
    fn require_bindings_are_imports() {
        let source = "const path = require('path');\nconst { join, dirname: dn } = require(\"./util\");\n";
        let result = parse_js(source);
        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0].specifier, "path");
        assert_eq!(result.imports[0].names, vec!["path"]);
        assert_eq!(result.imports[1].specifier, "./util");
        assert_eq!(result.imports[1].names, vec!["join", "dn"]);
    }

    #[test]
    fn object_literal_methods_are_not_symbols() {
        let source = "export default {\n  render() { draw(); }\n};\n";
        let result = parse_js(source);
        assert!(result.symbols.is_empty());
        assert_eq!(result.calls[0].callee, "draw");
    }

    #[test]
    fn function_expression_binding() {
        let source = "var legacy = function () { return 1; };\nlet n;\n";
        let result = parse_js(source);
        assert_eq!(result.symbols[0].kind, SymbolKind::Function);
        assert_eq!(result.symbols[1].name, "n");
        assert_eq!(result.symbols[1].kind, SymbolKind::Variable);
    }
}
