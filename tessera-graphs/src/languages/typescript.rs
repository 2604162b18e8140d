use super::{Extraction, LanguageSupport, ecma};
use crate::resolve::{ModuleResolution, RelativeStyle};

const TS_RESOLUTION: ModuleResolution = ModuleResolution {
    style: RelativeStyle::Path,
    extensions: &[".ts", ".tsx", ".d.ts", ".js", ".jsx"],
    index_files: &["index.ts", "index.tsx", "index.js"],
};

#[derive(Debug)]
pub struct TypeScriptSupport;

impl LanguageSupport for TypeScriptSupport {
    fn id(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "mts", "cts"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn walk(&self, root: tree_sitter::Node<'_>, source: &str, out: &mut Extraction) {
        ecma::walk(root, source, out);
    }

    fn module_resolution(&self) -> ModuleResolution {
        TS_RESOLUTION
    }
}

/// `.tsx` needs its own grammar; JSX is ambiguous with type assertions otherwise.
#[derive(Debug)]
pub struct TsxSupport;

impl LanguageSupport for TsxSupport {
    fn id(&self) -> &'static str {
        "tsx"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tsx"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    }

    fn walk(&self, root: tree_sitter::Node<'_>, source: &str, out: &mut Extraction) {
        ecma::walk(root, source, out);
    }

    fn module_resolution(&self) -> ModuleResolution {
        TS_RESOLUTION
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{ParseOutcome, ParseResult, SymbolKind};

    fn parse_ts(source: &str) -> ParseResult {
        match crate::extract(&TypeScriptSupport, Path::new("test.ts"), Some(source)) {
            ParseOutcome::Parsed(result) => result,
            ParseOutcome::Unparseable { .. } => panic!("typescript grammar failed"),
        }
    }

    fn fqnames(result: &ParseResult) -> Vec<&str> {
        result.symbols.iter().map(|s| s.fqname.as_str()).collect()
    }

    #[test]
    fn method_fqname_includes_class() {
        let source = "class Foo {\n  bar() { return 1; }\n}\nfunction baz() {}\n";
        let result = parse_ts(source);
        assert_eq!(fqnames(&result), vec!["Foo", "Foo.bar", "baz"]);
        assert_eq!(result.symbols[1].kind, SymbolKind::Method);
        assert_eq!(result.symbols[1].name, "bar");
    }

    #[test]
    fn locals_inside_functions_are_skipped() {
        let source = "const top = 1;\nfunction f() {\n  const x = 1;\n  if (top) { let y = 2; }\n}\nclass C {\n  field = 3;\n}\n";
        let result = parse_ts(source);
        assert_eq!(fqnames(&result), vec!["top", "f", "C", "C.field"]);
        assert_eq!(result.symbols[0].kind, SymbolKind::Variable);
        assert_eq!(result.symbols[3].kind, SymbolKind::Variable);
    }

    #[test]
    fn arrow_bindings_become_functions() {
        let source = "export const handler = async (req) => { respond(req); };\n";
        let result = parse_ts(source);
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].kind, SymbolKind::Function);
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].callee, "respond");
        assert!(result.symbols[0].range.contains(&result.calls[0].range));
    }

    #[test]
    fn type_level_declarations() {
        let source = "interface Shape { area(): number; name: string }\ntype Id = string;\nenum Color { Red }\nabstract class Base { abstract run(): void; constructor() {} }\n";
        let result = parse_ts(source);
        let kinds: Vec<_> = result.symbols.iter().map(|s| (s.fqname.as_str(), s.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("Shape", SymbolKind::Interface),
                ("Shape.area", SymbolKind::Method),
                ("Shape.name", SymbolKind::Variable),
                ("Id", SymbolKind::Type),
                ("Color", SymbolKind::Type),
                ("Base", SymbolKind::Class),
                ("Base.run", SymbolKind::Method),
                ("Base.constructor", SymbolKind::Constructor),
            ]
        );
    }

    #[test]
    fn namespace_prefixes_members() {
        let source = "namespace Geo {\n  export function area() {}\n}\n";
        let result = parse_ts(source);
        assert_eq!(fqnames(&result), vec!["Geo.area"]);
    }

    #[test]
    fn import_bound_names() {
        let source = "import Def, { a, b as c } from './mod';\nimport * as ns from \"../lib\";\nimport './side-effect';\nimport fs = require('fs');\n";
        let result = parse_ts(source);
        assert_eq!(result.imports.len(), 4);
        assert_eq!(result.imports[0].specifier, "./mod");
        assert_eq!(result.imports[0].names, vec!["Def", "a", "c"]);
        assert_eq!(result.imports[1].specifier, "../lib");
        assert_eq!(result.imports[1].names, vec!["ns"]);
        assert!(result.imports[2].names.is_empty());
        assert_eq!(result.imports[3].specifier, "fs");
        assert_eq!(result.imports[3].names, vec!["fs"]);
    }

    #[test]
    fn reexports_count_as_imports() {
        let source = "export { x, y as z } from './other';\nexport const local = 1;\n";
        let result = parse_ts(source);
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].names, vec!["x", "z"]);
        assert_eq!(fqnames(&result), vec!["local"]);
    }

    #[test]
    fn callee_text_is_raw() {
        let source = "function main() {\n  Logger.getInstance().log('x');\n  this.run();\n}\n";
        let result = parse_ts(source);
        let callees: Vec<_> = result.calls.iter().map(|c| c.callee.as_str()).collect();
        assert!(callees.contains(&"Logger.getInstance"));
        assert!(callees.contains(&"this.run"));
    }

    #[test]
    fn tsx_grammar_parses_jsx() {
        let source = "export function App() {\n  return <div onClick={() => track()}>hi</div>;\n}\n";
        let result = match crate::extract(&TsxSupport, Path::new("App.tsx"), Some(source)) {
            ParseOutcome::Parsed(r) => r,
            ParseOutcome::Unparseable { .. } => panic!("tsx grammar failed"),
        };
        assert_eq!(fqnames(&result), vec!["App"]);
        assert_eq!(result.calls[0].callee, "track");
    }
}
