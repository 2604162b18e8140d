use tree_sitter::Node;

use super::helpers::{
    Scope, child_by_field, find_child_by_kind, find_child_by_kinds, has_token, last_segment,
    name_of, node_text,
};
use super::{Extraction, LanguageSupport};
use crate::SymbolKind;

#[derive(Debug)]
pub struct KotlinSupport;

impl LanguageSupport for KotlinSupport {
    fn id(&self) -> &'static str {
        "kotlin"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["kt", "kts"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_kotlin_ng::LANGUAGE.into()
    }

    fn walk(&self, root: Node<'_>, source: &str, out: &mut Extraction) {
        walk_kt_node(root, source, &Scope::root(), out);
    }
}

const NAME_KINDS: &[&str] = &["identifier", "type_identifier", "simple_identifier"];

fn walk_kt_node(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    if !node.is_named() {
        return;
    }
    match node.kind() {
        "class_declaration" => {
            let Some(name) = name_of(node, source, NAME_KINDS) else {
                return walk_kt_children(node, source, scope, out);
            };
            let kind = if has_token(node, source, "interface") {
                SymbolKind::Interface
            } else if has_token(node, source, "enum") {
                SymbolKind::Type
            } else {
                SymbolKind::Class
            };
            out.push_symbol(scope, &name, kind, node);
            walk_kt_children(node, source, &scope.enter_type(&name), out);
        }
        "object_declaration" | "companion_object" => {
            let name = name_of(node, source, NAME_KINDS).unwrap_or_else(|| "Companion".to_string());
            out.push_symbol(scope, &name, SymbolKind::Class, node);
            walk_kt_children(node, source, &scope.enter_type(&name), out);
        }
        "function_declaration" => {
            if let Some(name) = name_of(node, source, NAME_KINDS) {
                let kind = if scope.in_type_body() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                out.push_symbol(scope, &name, kind, node);
            }
            walk_kt_children(node, source, &scope.enter_function(), out);
        }
        "secondary_constructor" => {
            out.push_symbol(scope, "constructor", SymbolKind::Constructor, node);
            walk_kt_children(node, source, &scope.enter_function(), out);
        }
        "property_declaration" => {
            let name = find_child_by_kind(node, "variable_declaration")
                .and_then(|decl| find_child_by_kinds(decl, NAME_KINDS))
                .map(|id| node_text(id, source));
            if let Some(name) = name {
                let kind = if has_token(node, source, "const") {
                    SymbolKind::Constant
                } else {
                    SymbolKind::Variable
                };
                out.push_binding(scope, name, kind, node);
            }
            walk_kt_children(node, source, &scope.enter_function(), out);
        }
        "type_alias" => {
            let name = child_by_field(node, "name")
                .or_else(|| child_by_field(node, "type"))
                .or_else(|| find_child_by_kinds(node, NAME_KINDS));
            if let Some(name) = name {
                out.push_symbol(scope, node_text(name, source), SymbolKind::Type, node);
            }
        }
        "lambda_literal" | "anonymous_function" | "anonymous_initializer" | "getter" | "setter" => {
            walk_kt_children(node, source, &scope.enter_function(), out);
        }
        "import" | "import_header" => {
            if let Some((specifier, names)) = parse_import(node, source) {
                out.push_import(specifier, names);
            }
        }
        "call_expression" => {
            if let Some(callee) = node.named_child(0) {
                out.push_call(node_text(callee, source), node);
            }
            walk_kt_children(node, source, scope, out);
        }
        _ => walk_kt_children(node, source, scope, out),
    }
}

fn walk_kt_children(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_kt_node(child, source, scope, out);
    }
}

/// `import a.b.C`, `import a.b.C as D`, `import a.b.*`.
fn parse_import<'a>(node: Node<'_>, source: &'a str) -> Option<(&'a str, Vec<String>)> {
    let path = find_child_by_kinds(node, &["qualified_identifier", "identifier"])?;
    let specifier = node_text(path, source);

    let mut alias = None;
    let mut wildcard = false;
    let mut after_path = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.id() == path.id() {
            after_path = true;
            continue;
        }
        if !after_path {
            continue;
        }
        match child.kind() {
            "*" => wildcard = true,
            "identifier" | "simple_identifier" => alias = Some(node_text(child, source)),
            _ => {}
        }
    }

    let names = match (alias, wildcard) {
        (Some(alias), _) => vec![alias.to_string()],
        (None, true) => Vec::new(),
        (None, false) => vec![last_segment(specifier).to_string()],
    };
    Some((specifier, names))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{ParseOutcome, ParseResult};

    fn parse_kt(source: &str) -> ParseResult {
        match crate::extract(&KotlinSupport, Path::new("App.kt"), Some(source)) {
            ParseOutcome::Parsed(result) => result,
            ParseOutcome::Unparseable { .. } => panic!("kotlin grammar failed"),
        }
    }

    fn symbols(result: &ParseResult) -> Vec<(&str, SymbolKind)> {
        result.symbols.iter().map(|s| (s.fqname.as_str(), s.kind)).collect()
    }

    #[test]
    fn classes_objects_and_members() {
        let source = r#"package com.example

class Calculator {
    val precision = 2

    fun add(a: Int, b: Int): Int {
        val local = a
        return local + b
    }

    companion object {
        fun create(): Calculator = Calculator()
    }
}

object Logger {
    fun log(message: String) {
        println(message)
    }
}

interface Shape

enum class Color { RED, GREEN }

const val MAX = 10

fun main() {
    Logger.log("hi")
}
"#;
        let result = parse_kt(source);
        assert_eq!(
            symbols(&result),
            vec![
                ("Calculator", SymbolKind::Class),
                ("Calculator.precision", SymbolKind::Variable),
                ("Calculator.add", SymbolKind::Method),
                ("Calculator.Companion", SymbolKind::Class),
                ("Calculator.Companion.create", SymbolKind::Method),
                ("Logger", SymbolKind::Class),
                ("Logger.log", SymbolKind::Method),
                ("Shape", SymbolKind::Interface),
                ("Color", SymbolKind::Type),
                ("MAX", SymbolKind::Constant),
                ("main", SymbolKind::Function),
            ]
        );

        let callees: Vec<_> = result.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["Calculator", "println", "Logger.log"]);
    }

    #[test]
    fn import_forms() {
        let source = "import com.example.models.User\nimport kotlin.math.max as maximum\nimport kotlinx.coroutines.*\n\nclass App\n";
        let result = parse_kt(source);
        let imports: Vec<_> = result
            .imports
            .iter()
            .map(|i| (i.specifier.as_str(), i.names.clone()))
            .collect();
        assert_eq!(
            imports,
            vec![
                ("com.example.models.User", vec!["User".to_string()]),
                ("kotlin.math.max", vec!["maximum".to_string()]),
                ("kotlinx.coroutines", vec![]),
            ]
        );
    }
}
