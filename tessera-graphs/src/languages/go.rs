use tree_sitter::Node;

use super::helpers::{Scope, child_by_field, last_segment, node_text, strip_quotes};
use super::{Extraction, LanguageSupport};
use crate::SymbolKind;
use crate::resolve::{ModuleResolution, RelativeStyle};

#[derive(Debug)]
pub struct GoSupport;

impl LanguageSupport for GoSupport {
    fn id(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_go::LANGUAGE.into()
    }

    fn walk(&self, root: Node<'_>, source: &str, out: &mut Extraction) {
        walk_go_node(root, source, &Scope::root(), out);
    }

    fn module_resolution(&self) -> ModuleResolution {
        ModuleResolution {
            style: RelativeStyle::Path,
            extensions: &[".go"],
            index_files: &[],
        }
    }
}

// Methods keep their bare name: a receiver is not a lexical namespace, and the
// package clause never prefixes.
fn walk_go_node(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    match node.kind() {
        "function_declaration" | "method_declaration" => {
            if let Some(name) = child_by_field(node, "name") {
                let kind = if node.kind() == "method_declaration" {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                out.push_symbol(scope, node_text(name, source), kind, node);
            }
            walk_go_children(node, source, &scope.enter_function(), out);
        }
        "type_spec" | "type_alias" => {
            if let Some(name) = child_by_field(node, "name") {
                let kind = match child_by_field(node, "type").map(|t| t.kind()) {
                    Some("struct_type") if node.kind() == "type_spec" => SymbolKind::Struct,
                    Some("interface_type") if node.kind() == "type_spec" => SymbolKind::Interface,
                    _ => SymbolKind::Type,
                };
                out.push_binding(scope, node_text(name, source), kind, node);
            }
        }
        "var_spec" | "const_spec" => {
            let kind = if node.kind() == "const_spec" {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                out.push_binding(scope, node_text(name, source), kind, node);
            }
            walk_go_children(node, source, scope, out);
        }
        "func_literal" => walk_go_children(node, source, &scope.enter_function(), out),
        "import_spec" => {
            let Some(path) = child_by_field(node, "path") else {
                return;
            };
            let specifier = strip_quotes(node_text(path, source));
            let names = match child_by_field(node, "name") {
                Some(alias) if alias.kind() == "package_identifier" => {
                    vec![node_text(alias, source).to_string()]
                }
                // `_` and `.` bind nothing addressable.
                Some(_) => Vec::new(),
                None => vec![last_segment(specifier).to_string()],
            };
            out.push_import(specifier, names);
        }
        "call_expression" => {
            if let Some(func) = child_by_field(node, "function") {
                out.push_call(node_text(func, source), node);
            }
            walk_go_children(node, source, scope, out);
        }
        _ => walk_go_children(node, source, scope, out),
    }
}

fn walk_go_children(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_go_node(child, source, scope, out);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{ParseOutcome, ParseResult};

    fn parse_go(source: &str) -> ParseResult {
        match crate::extract(&GoSupport, Path::new("main.go"), Some(source)) {
            ParseOutcome::Parsed(result) => result,
            ParseOutcome::Unparseable { .. } => panic!("go grammar failed"),
        }
    }

    #[test]
    fn extracts_declarations() {
        let source = r#"package main

import (
	"fmt"
	str "strings"
	_ "embed"
)

const Version = "1"

var counter int

type Server struct {
	addr string
}

type Handler interface {
	Serve()
}

type ID = string

func (s *Server) Start() {
	fmt.Println(str.ToUpper(s.addr))
}

func main() {
	local := 1
	var other = 2
	_ = local + other
}
"#;
        let result = parse_go(source);
        let symbols: Vec<_> = result.symbols.iter().map(|s| (s.fqname.as_str(), s.kind)).collect();
        assert_eq!(
            symbols,
            vec![
                ("Version", SymbolKind::Constant),
                ("counter", SymbolKind::Variable),
                ("Server", SymbolKind::Struct),
                ("Handler", SymbolKind::Interface),
                ("ID", SymbolKind::Type),
                ("Start", SymbolKind::Method),
                ("main", SymbolKind::Function),
            ]
        );

        let imports: Vec<_> = result
            .imports
            .iter()
            .map(|i| (i.specifier.as_str(), i.names.clone()))
            .collect();
        assert_eq!(
            imports,
            vec![
                ("fmt", vec!["fmt".to_string()]),
                ("strings", vec!["str".to_string()]),
                ("embed", vec![]),
            ]
        );

        let callees: Vec<_> = result.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["fmt.Println", "str.ToUpper"]);
    }

    #[test]
    fn grouped_var_block() {
        let source = "package p\n\nvar (\n\ta, b = 1, 2\n\tc string\n)\n";
        let result = parse_go(source);
        let names: Vec<_> = result.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
