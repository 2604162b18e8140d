use tree_sitter::Node;

use super::helpers::{Scope, child_by_field, find_child_by_kind, has_token, last_segment, node_text};
use super::{Extraction, LanguageSupport};
use crate::SymbolKind;

#[derive(Debug)]
pub struct CSharpSupport;

impl LanguageSupport for CSharpSupport {
    fn id(&self) -> &'static str {
        "csharp"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_c_sharp::LANGUAGE.into()
    }

    fn walk(&self, root: Node<'_>, source: &str, out: &mut Extraction) {
        walk_cs_children(root, source, &Scope::root(), out);
    }
}

fn type_kind(kind: &str) -> Option<SymbolKind> {
    Some(match kind {
        "class_declaration" | "record_declaration" | "record_struct_declaration" | "struct_declaration" => {
            SymbolKind::Class
        }
        "interface_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Type,
        _ => return None,
    })
}

fn name_text<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    let name = child_by_field(node, "name").or_else(|| find_child_by_kind(node, "identifier"))?;
    Some(node_text(name, source))
}

fn walk_cs_node(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    if let Some(kind) = type_kind(node.kind()) {
        if let Some(name) = name_text(node, source) {
            out.push_symbol(scope, name, kind, node);
            walk_cs_children(node, source, &scope.enter_type(name), out);
        }
        return;
    }

    match node.kind() {
        "namespace_declaration" => match name_text(node, source) {
            Some(name) => walk_cs_children(node, source, &scope.enter_namespace(name), out),
            None => walk_cs_children(node, source, scope, out),
        },
        "delegate_declaration" => {
            if let Some(name) = name_text(node, source) {
                out.push_symbol(scope, name, SymbolKind::Type, node);
            }
        }
        "method_declaration" | "local_function_statement" => {
            if let Some(name) = name_text(node, source) {
                let kind = if node.kind() == "local_function_statement" {
                    SymbolKind::Function
                } else {
                    SymbolKind::Method
                };
                out.push_symbol(scope, name, kind, node);
            }
            walk_cs_children(node, source, &scope.enter_function(), out);
        }
        "constructor_declaration" => {
            if let Some(name) = name_text(node, source) {
                out.push_symbol(scope, name, SymbolKind::Constructor, node);
            }
            walk_cs_children(node, source, &scope.enter_function(), out);
        }
        "destructor_declaration" => {
            if let Some(name) = name_text(node, source) {
                out.push_symbol(scope, &format!("~{name}"), SymbolKind::Method, node);
            }
            walk_cs_children(node, source, &scope.enter_function(), out);
        }
        "operator_declaration" => {
            if let Some(op) = child_by_field(node, "operator") {
                let name = format!("operator{}", node_text(op, source));
                out.push_symbol(scope, &name, SymbolKind::Method, node);
            }
            walk_cs_children(node, source, &scope.enter_function(), out);
        }
        "property_declaration" => {
            if let (true, Some(name)) = (scope.in_type_body(), name_text(node, source)) {
                out.push_symbol(scope, name, SymbolKind::Variable, node);
            }
            walk_cs_children(node, source, &scope.enter_function(), out);
        }
        "field_declaration" => {
            let kind = if has_token(node, source, "const") {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            if let Some(decl) = find_child_by_kind(node, "variable_declaration") {
                let mut cursor = decl.walk();
                for declarator in decl.children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(name) = name_text(declarator, source) {
                        out.push_binding(scope, name, kind, declarator);
                    }
                }
            }
            walk_cs_children(node, source, &scope.enter_function(), out);
        }
        "lambda_expression" | "anonymous_method_expression" => {
            walk_cs_children(node, source, &scope.enter_function(), out);
        }
        "using_directive" => {
            if let Some((specifier, names)) = parse_using(node_text(node, source)) {
                out.push_import(&specifier, names);
            }
        }
        "invocation_expression" => {
            if let Some(func) = child_by_field(node, "function") {
                out.push_call(node_text(func, source), node);
            }
            walk_cs_children(node, source, scope, out);
        }
        _ => walk_cs_children(node, source, scope, out),
    }
}

/// Walk children, letting a file-scoped `namespace X;` prefix every later sibling.
fn walk_cs_children(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    let mut current = scope.clone();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "file_scoped_namespace_declaration" {
            if let Some(name) = name_text(child, source) {
                current = scope.enter_namespace(name);
            }
            // Some grammar versions nest the following declarations inside the node.
            walk_cs_children(child, source, &current, out);
            continue;
        }
        walk_cs_node(child, source, &current, out);
    }
}

/// `using A.B;`, `using static A.B;`, `global using A;`, `using X = A.B;`.
fn parse_using(text: &str) -> Option<(String, Vec<String>)> {
    let body = text
        .trim()
        .trim_end_matches(';')
        .split_whitespace()
        .skip_while(|w| matches!(*w, "global" | "using" | "static"))
        .collect::<Vec<_>>()
        .join(" ");
    if body.is_empty() {
        return None;
    }
    match body.split_once('=') {
        Some((alias, target)) => Some((target.trim().to_string(), vec![alias.trim().to_string()])),
        None => {
            let names = vec![last_segment(&body).to_string()];
            Some((body, names))
        }
    }
}
