pub mod detect;
pub mod extract;
pub mod languages;
pub mod resolve;

use serde::{Deserialize, Serialize};

pub use extract::{
    MAX_SOURCE_BYTES, content_hash, extract, extract_limited, extract_with_fallback, recover,
    strip_bom,
};
pub use languages::{LanguageRegistry, LanguageSupport};

/// Error type for the extraction engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

// ── Span type ──────────────────────────────────────────────────────

/// Half-open byte range `[start, end)` into a file's (BOM-stripped) text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<std::ops::Range<usize>> for ByteRange {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self {
            start: r.start,
            end: r.end,
        }
    }
}

// ── Symbol kind ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Constructor,
    Class,
    Interface,
    Type,
    Struct,
    Variable,
    Constant,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Struct => "struct",
            Self::Variable => "variable",
            Self::Constant => "constant",
        }
    }

    /// Parse the lowercase identifier produced by [`SymbolKind::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "function" => Self::Function,
            "method" => Self::Method,
            "constructor" => Self::Constructor,
            "class" => Self::Class,
            "interface" => Self::Interface,
            "type" => Self::Type,
            "struct" => Self::Struct,
            "variable" => Self::Variable,
            "constant" => Self::Constant,
            _ => return None,
        })
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Extraction output ──────────────────────────────────────────────

/// A declaration found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    /// Dotted name built from the enclosing namespaces and types.
    pub fqname: String,
    pub kind: SymbolKind,
    pub range: ByteRange,
}

/// One import/using/from-import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    /// Module specifier with quotes stripped (`./b`, `os.path`, `System.Text`).
    pub specifier: String,
    /// Names the statement binds locally.
    pub names: Vec<String>,
}

/// An invocation expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Raw source text of the invoked expression (`foo`, `Logger.getInstance`).
    pub callee: String,
    pub range: ByteRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Full syntax-tree walk.
    TreeSitter,
    /// Pattern-based recovery after the syntax tree was unavailable.
    RegexFallback,
    /// Input rejected by a pre-check (empty, oversized, binary); nothing was parsed.
    Guarded,
}

/// Everything extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Hex SHA-256 of the BOM-stripped text.
    pub hash: String,
    pub method: ExtractionMethod,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportDeclaration>,
    pub calls: Vec<CallSite>,
}

impl ParseResult {
    /// An empty result that still carries the content hash.
    pub fn empty(hash: String, method: ExtractionMethod) -> Self {
        Self {
            hash,
            method,
            symbols: Vec::new(),
            imports: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// Outcome of a syntax-tree extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(ParseResult),
    /// The syntax tree could not be built; callers should try the fallback.
    Unparseable { hash: String },
}

impl ParseOutcome {
    pub fn hash(&self) -> &str {
        match self {
            Self::Parsed(result) => &result.hash,
            Self::Unparseable { hash } => hash,
        }
    }
}
