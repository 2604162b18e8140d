use tree_sitter::Node;

use super::helpers::{Scope, child_by_field, has_token, last_segment, node_text};
use super::{Extraction, LanguageSupport};
use crate::SymbolKind;

#[derive(Debug)]
pub struct JavaSupport;

impl LanguageSupport for JavaSupport {
    fn id(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    fn walk(&self, root: Node<'_>, source: &str, out: &mut Extraction) {
        walk_java_node(root, source, &Scope::root(), out);
    }
}

fn type_kind(kind: &str) -> Option<SymbolKind> {
    Some(match kind {
        "class_declaration" | "record_declaration" => SymbolKind::Class,
        "interface_declaration" | "annotation_type_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Type,
        _ => return None,
    })
}

fn walk_java_node(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    if let Some(kind) = type_kind(node.kind()) {
        if let Some(name) = child_by_field(node, "name") {
            let name = node_text(name, source);
            out.push_symbol(scope, name, kind, node);
            walk_java_children(node, source, &scope.enter_type(name), out);
        }
        return;
    }

    match node.kind() {
        "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
            if let Some(name) = child_by_field(node, "name") {
                let kind = if node.kind() == "method_declaration" {
                    SymbolKind::Method
                } else {
                    SymbolKind::Constructor
                };
                out.push_symbol(scope, node_text(name, source), kind, node);
            }
            walk_java_children(node, source, &scope.enter_function(), out);
        }
        "field_declaration" | "constant_declaration" => {
            let constant = node.kind() == "constant_declaration"
                || (has_token(node, source, "static") && has_token(node, source, "final"));
            let kind = if constant {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            let mut cursor = node.walk();
            for declarator in node.children_by_field_name("declarator", &mut cursor) {
                if let Some(name) = child_by_field(declarator, "name") {
                    out.push_binding(scope, node_text(name, source), kind, declarator);
                }
            }
            walk_java_children(node, source, &scope.enter_function(), out);
        }
        "lambda_expression" => walk_java_children(node, source, &scope.enter_function(), out),
        "import_declaration" => {
            let (specifier, names) = parse_import(node_text(node, source));
            if !specifier.is_empty() {
                out.push_import(specifier, names);
            }
        }
        "method_invocation" => {
            if let Some(name) = child_by_field(node, "name") {
                // Receiver plus method name, without the argument list.
                let callee = source.get(node.start_byte()..name.end_byte()).unwrap_or("");
                out.push_call(callee, node);
            }
            walk_java_children(node, source, scope, out);
        }
        _ => walk_java_children(node, source, scope, out),
    }
}

fn walk_java_children(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_java_node(child, source, scope, out);
    }
}

/// `import static a.b.C.d;` → (`a.b.C.d`, [`d`]); wildcards bind nothing.
fn parse_import(text: &str) -> (&str, Vec<String>) {
    let body = text
        .trim()
        .trim_start_matches("import")
        .trim()
        .trim_end_matches(';')
        .trim();
    let body = body.strip_prefix("static ").map_or(body, str::trim);
    match body.strip_suffix(".*") {
        Some(package) => (package, Vec::new()),
        None => (body, vec![last_segment(body).to_string()]),
    }
}
