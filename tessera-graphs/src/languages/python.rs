use tree_sitter::Node;

use super::helpers::{Scope, child_by_field, last_segment, node_text};
use super::{Extraction, LanguageSupport};
use crate::SymbolKind;
use crate::resolve::{ModuleResolution, RelativeStyle};

#[derive(Debug)]
pub struct PythonSupport;

impl LanguageSupport for PythonSupport {
    fn id(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn walk(&self, root: Node<'_>, source: &str, out: &mut Extraction) {
        walk_py_node(root, source, &Scope::root(), out);
    }

    fn module_resolution(&self) -> ModuleResolution {
        ModuleResolution {
            style: RelativeStyle::PythonDots,
            extensions: &[".py", ".pyi"],
            index_files: &["__init__.py"],
        }
    }
}

/// `MAX_RETRIES`, `V2` but not `_` or `Config`.
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn walk_py_node(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    match node.kind() {
        "function_definition" => {
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, source);
                let kind = match (scope.in_type_body(), name) {
                    (true, "__init__") => SymbolKind::Constructor,
                    (true, _) => SymbolKind::Method,
                    (false, _) => SymbolKind::Function,
                };
                out.push_symbol(scope, name, kind, node);
            }
            walk_py_children(node, source, &scope.enter_function(), out);
        }
        "class_definition" => {
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, source);
                out.push_symbol(scope, name, SymbolKind::Class, node);
                walk_py_children(node, source, &scope.enter_type(name), out);
            }
        }
        "assignment" => {
            if let Some(left) = child_by_field(node, "left").filter(|n| n.kind() == "identifier") {
                let name = node_text(left, source);
                let kind = if is_constant_name(name) {
                    SymbolKind::Constant
                } else {
                    SymbolKind::Variable
                };
                out.push_binding(scope, name, kind, node);
            }
            walk_py_children(node, source, scope, out);
        }
        "lambda" => walk_py_children(node, source, &scope.enter_function(), out),
        "import_statement" => {
            let mut cursor = node.walk();
            for module in node.children_by_field_name("name", &mut cursor) {
                let (specifier, bound) = aliased(module, source);
                out.push_import(specifier, vec![bound.to_string()]);
            }
        }
        "import_from_statement" => {
            let Some(module) = child_by_field(node, "module_name") else {
                return;
            };
            let mut names = Vec::new();
            let mut cursor = node.walk();
            for imported in node.children_by_field_name("name", &mut cursor) {
                names.push(aliased(imported, source).1.to_string());
            }
            out.push_import(node_text(module, source), names);
        }
        "call" => {
            if let Some(func) = child_by_field(node, "function") {
                out.push_call(node_text(func, source), node);
            }
            walk_py_children(node, source, scope, out);
        }
        _ => walk_py_children(node, source, scope, out),
    }
}

fn walk_py_children(node: Node<'_>, source: &str, scope: &Scope, out: &mut Extraction) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_py_node(child, source, scope, out);
    }
}

/// `(module, bound name)` for `a.b.c` or `a.b.c as d`.
fn aliased<'a>(node: Node<'_>, source: &'a str) -> (&'a str, &'a str) {
    if node.kind() == "aliased_import" {
        let module = child_by_field(node, "name").map_or("", |n| node_text(n, source));
        let alias = child_by_field(node, "alias").map_or(module, |n| node_text(n, source));
        (module, alias)
    } else {
        let module = node_text(node, source);
        (module, last_segment(module))
    }
}
