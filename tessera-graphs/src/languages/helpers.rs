use tree_sitter::Node;

use super::Extraction;
use crate::{ByteRange, CallSite, ImportDeclaration, Symbol, SymbolKind};

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Find the first child with a specific kind.
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| child.kind() == kind)
}

/// Find the first child whose kind is any of `kinds`.
pub fn find_child_by_kinds<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| kinds.contains(&child.kind()))
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Text of the `name` field, falling back to the first child of one of `kinds`.
pub fn name_of(node: Node<'_>, source: &str, kinds: &[&str]) -> Option<String> {
    let name_node = child_by_field(node, "name").or_else(|| find_child_by_kinds(node, kinds))?;
    let text = node_text(name_node, source).trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Whether any direct child is the anonymous token or `modifier` text `word`.
pub fn has_token(node: Node<'_>, source: &str, word: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|child| {
        child.kind() == word
            || (child.kind().contains("modifier")
                && node_text(child, source).split_whitespace().any(|w| w == word))
    })
}

/// Convert a tree-sitter node to a `ByteRange`.
pub fn node_range(node: Node<'_>) -> ByteRange {
    node.byte_range().into()
}

/// Strip one layer of matching string delimiters.
pub fn strip_quotes(text: &str) -> &str {
    let t = text.trim();
    for q in ['"', '\'', '`'] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            return &t[1..t.len() - 1];
        }
    }
    t
}

/// Last segment of a dotted or slash-separated path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit(['.', '/']).next().unwrap_or(path)
}

/// Recursion context threaded through every walker.
///
/// `inside_function` is set on entering any function-like body and cleared only
/// when a class body is entered, so locals in nested blocks stay excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    namespace: String,
    inside_function: bool,
    in_type_body: bool,
}

impl Scope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn inside_function(&self) -> bool {
        self.inside_function
    }

    /// Directly inside a class/interface/struct/object body.
    pub fn in_type_body(&self) -> bool {
        self.in_type_body
    }

    /// `namespace.name`, or just `name` at the top level.
    pub fn qualify(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.namespace)
        }
    }

    /// Scope for the body of a class, interface, struct, or object named `name`.
    pub fn enter_type(&self, name: &str) -> Self {
        Self {
            namespace: self.qualify(name),
            inside_function: false,
            in_type_body: true,
        }
    }

    /// Scope for a namespace or module block.
    pub fn enter_namespace(&self, name: &str) -> Self {
        Self {
            namespace: self.qualify(name),
            inside_function: self.inside_function,
            in_type_body: false,
        }
    }

    /// Scope for a function, method, or lambda body.
    pub fn enter_function(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            inside_function: true,
            in_type_body: false,
        }
    }
}

impl Extraction {
    pub(crate) fn push_symbol(
        &mut self,
        scope: &Scope,
        name: &str,
        kind: SymbolKind,
        node: Node<'_>,
    ) {
        self.symbols.push(Symbol {
            name: name.to_string(),
            fqname: scope.qualify(name),
            kind,
            range: node_range(node),
        });
    }

    /// Record a variable-like declaration unless it is local to a function.
    pub(crate) fn push_binding(
        &mut self,
        scope: &Scope,
        name: &str,
        kind: SymbolKind,
        node: Node<'_>,
    ) {
        if !scope.inside_function() {
            self.push_symbol(scope, name, kind, node);
        }
    }

    pub(crate) fn push_call(&mut self, callee: &str, node: Node<'_>) {
        let callee = callee.trim();
        if callee.is_empty() {
            return;
        }
        self.calls.push(CallSite {
            callee: callee.to_string(),
            range: node_range(node),
        });
    }

    pub(crate) fn push_import(&mut self, specifier: &str, names: Vec<String>) {
        let specifier = strip_quotes(specifier);
        if specifier.is_empty() {
            return;
        }
        self.imports.push(ImportDeclaration {
            specifier: specifier.to_string(),
            names,
        });
    }
}
