//! Walker shared by the TypeScript, TSX, and JavaScript grammars.
//!
//! The JavaScript grammar is a subset of the TypeScript one for everything we
//! look at, so type-level node kinds simply never occur in `.js` trees.

use tree_sitter::Node;

use super::Extraction;
use super::helpers::{Scope, child_by_field, find_child_by_kind, node_text};
use crate::SymbolKind;

pub(super) fn walk(root: Node<'_>, source: &str, out: &mut Extraction) {
    walk_node(root, source, &Scope::root(), out);
}

fn field_text<'a>(node: Node<'_>, field: &str, source: &'a str) -> Option<&'a str> {
    let text = node_text(child_by_field(node, field)?, source).trim();
    (!text.is_empty()).then_some(text)
}

fn is_function_like(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn walk_node(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                out.push_symbol(scope, name, SymbolKind::Function, node);
            }
            walk_children(node, source, &scope.enter_function(), out);
        }
        "class_declaration" | "abstract_class_declaration" | "class" => {
            if let Some(name) = field_text(node, "name", source) {
                out.push_symbol(scope, name, SymbolKind::Class, node);
                walk_children(node, source, &scope.enter_type(name), out);
            } else {
                // Anonymous class expression: members have no stable name.
                walk_children(node, source, &scope.enter_function(), out);
            }
        }
        "method_definition" => {
            if scope.in_type_body() {
                if let Some(name) = field_text(node, "name", source) {
                    let kind = if name == "constructor" {
                        SymbolKind::Constructor
                    } else {
                        SymbolKind::Method
                    };
                    out.push_symbol(scope, name, kind, node);
                }
            }
            walk_children(node, source, &scope.enter_function(), out);
        }
        "method_signature" | "abstract_method_signature" => {
            if scope.in_type_body() {
                if let Some(name) = field_text(node, "name", source) {
                    out.push_symbol(scope, name, SymbolKind::Method, node);
                }
            }
        }
        "public_field_definition" | "field_definition" => {
            let name = field_text(node, "name", source).or_else(|| field_text(node, "property", source));
            if let (true, Some(name)) = (scope.in_type_body(), name) {
                let kind = match child_by_field(node, "value") {
                    Some(v) if is_function_like(v) => SymbolKind::Method,
                    _ => SymbolKind::Variable,
                };
                out.push_symbol(scope, name, kind, node);
            }
            walk_children(node, source, &scope.enter_function(), out);
        }
        "property_signature" => {
            if let (true, Some(name)) = (scope.in_type_body(), field_text(node, "name", source)) {
                out.push_symbol(scope, name, SymbolKind::Variable, node);
            }
        }
        "interface_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                out.push_symbol(scope, name, SymbolKind::Interface, node);
                walk_children(node, source, &scope.enter_type(name), out);
            }
        }
        "type_alias_declaration" | "enum_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                out.push_symbol(scope, name, SymbolKind::Type, node);
            }
        }
        "internal_module" | "module" => match field_text(node, "name", source) {
            Some(name) => walk_children(node, source, &scope.enter_namespace(name), out),
            None => walk_children(node, source, scope, out),
        },
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "variable_declarator" {
                    walk_declarator(child, source, scope, out);
                }
            }
        }
        "arrow_function" | "function_expression" | "function" | "generator_function" => {
            walk_children(node, source, &scope.enter_function(), out);
        }
        "import_statement" => walk_import(node, source, out),
        "export_statement" => {
            if let Some(specifier) = child_by_field(node, "source") {
                out.push_import(node_text(specifier, source), export_names(node, source));
            }
            walk_children(node, source, scope, out);
        }
        "call_expression" => {
            if let Some(func) = child_by_field(node, "function") {
                out.push_call(node_text(func, source), node);
            }
            walk_children(node, source, scope, out);
        }
        _ => walk_children(node, source, scope, out),
    }
}

fn walk_children(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_node(child, source, scope, out);
    }
}

fn walk_declarator(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    let name_node = child_by_field(node, "name");
    let value = child_by_field(node, "value");

    if let (Some(name_node), Some(specifier)) = (name_node, value.and_then(|v| require_target(v, source))) {
        out.push_import(specifier, pattern_names(name_node, source));
    }

    if let Some(name_node) = name_node.filter(|n| n.kind() == "identifier") {
        let kind = if value.is_some_and(is_function_like) {
            SymbolKind::Function
        } else {
            SymbolKind::Variable
        };
        out.push_binding(scope, node_text(name_node, source), kind, node);
    }

    if let Some(value) = value {
        walk_node(value, source, scope, out);
    }
}

/// `require("x")` → `"x"`.
fn require_target<'a>(value: Node<'_>, source: &'a str) -> Option<&'a str> {
    if value.kind() != "call_expression" {
        return None;
    }
    let func = child_by_field(value, "function")?;
    if node_text(func, source) != "require" {
        return None;
    }
    let args = child_by_field(value, "arguments")?;
    let arg = find_child_by_kind(args, "string")?;
    Some(node_text(arg, source))
}

/// Names bound by a declarator's left-hand side: `x`, `{ a, b: c }`, `[d]`.
fn pattern_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    collect_pattern_names(node, source, &mut names);
    names
}

fn collect_pattern_names(node: Node<'_>, source: &str, names: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            names.push(node_text(node, source).to_string());
        }
        "pair_pattern" => {
            if let Some(value) = child_by_field(node, "value") {
                collect_pattern_names(value, source, names);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_pattern_names(child, source, names);
            }
        }
    }
}

fn walk_import(node: Node<'_>, source: &str, out: &mut Extraction) {
    // `import x = require("y")`
    if let Some(clause) = find_child_by_kind(node, "import_require_clause") {
        let names = find_child_by_kind(clause, "identifier")
            .map(|id| vec![node_text(id, source).to_string()])
            .unwrap_or_default();
        if let Some(specifier) = child_by_field(clause, "source") {
            out.push_import(node_text(specifier, source), names);
        }
        return;
    }

    let Some(specifier) = child_by_field(node, "source") else {
        return;
    };
    let mut names = Vec::new();
    if let Some(clause) = find_child_by_kind(node, "import_clause") {
        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            match child.kind() {
                "identifier" => names.push(node_text(child, source).to_string()),
                "namespace_import" => {
                    if let Some(id) = find_child_by_kind(child, "identifier") {
                        names.push(node_text(id, source).to_string());
                    }
                }
                "named_imports" => specifier_names(child, "import_specifier", source, &mut names),
                _ => {}
            }
        }
    }
    out.push_import(node_text(specifier, source), names);
}

fn export_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(clause) = find_child_by_kind(node, "export_clause") {
        specifier_names(clause, "export_specifier", source, &mut names);
    }
    if let Some(ns) = find_child_by_kind(node, "namespace_export") {
        if let Some(id) = find_child_by_kind(ns, "identifier") {
            names.push(node_text(id, source).to_string());
        }
    }
    names
}

/// Alias if present, else the imported name.
fn specifier_names(list: Node<'_>, kind: &str, source: &str, names: &mut Vec<String>) {
    let mut cursor = list.walk();
    for spec in list.children(&mut cursor) {
        if spec.kind() != kind {
            continue;
        }
        let bound = child_by_field(spec, "alias").or_else(|| child_by_field(spec, "name"));
        if let Some(bound) = bound {
            names.push(node_text(bound, source).to_string());
        }
    }
}
