//! The extraction contract: guarded, hash-stamped parsing of one file.
//!
//! [`extract`] never fails. Rejected input (missing, empty, oversized, binary)
//! yields an empty [`ParseResult`]. A syntax tree that cannot be built, that is
//! mostly `ERROR` nodes, or that is damaged and yields no symbols is reported as
//! [`ParseOutcome::Unparseable`] so the caller can run the regex fallback
//! instead of trusting "zero symbols". Every outcome carries the SHA-256 of the
//! BOM-stripped text.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::languages::{Extraction, LanguageSupport, fallback};
use crate::{ExtractionMethod, ParseOutcome, ParseResult};

/// Default size cap; larger files are usually generated or minified.
pub const MAX_SOURCE_BYTES: usize = 200 * 1024;

/// Hex-encoded SHA-256 of `text`.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Remove a leading UTF-8 byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Why a pre-check rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Missing,
    Empty,
    Oversized,
    Binary,
}

/// Run the pre-checks. On success returns the BOM-stripped text and its hash.
fn prepare(text: Option<&str>, max_bytes: usize) -> Result<(&str, String), (Rejection, String)> {
    let Some(text) = text else {
        return Err((Rejection::Missing, content_hash("")));
    };
    let text = strip_bom(text);
    let hash = content_hash(text);
    if text.is_empty() {
        return Err((Rejection::Empty, hash));
    }
    if text.len() > max_bytes {
        return Err((Rejection::Oversized, hash));
    }
    if text.contains('\0') {
        return Err((Rejection::Binary, hash));
    }
    Ok((text, hash))
}

/// Parse `text` with `lang`'s grammar using the default size cap.
pub fn extract(lang: &dyn LanguageSupport, path: &Path, text: Option<&str>) -> ParseOutcome {
    extract_limited(lang, path, text, MAX_SOURCE_BYTES)
}

/// Parse `text` with `lang`'s grammar, rejecting input above `max_bytes`.
pub fn extract_limited(
    lang: &dyn LanguageSupport,
    path: &Path,
    text: Option<&str>,
    max_bytes: usize,
) -> ParseOutcome {
    let (text, hash) = match prepare(text, max_bytes) {
        Ok(ok) => ok,
        Err((reason, hash)) => {
            debug!(path = %path.display(), ?reason, "Skipping parse");
            return ParseOutcome::Parsed(ParseResult::empty(hash, ExtractionMethod::Guarded));
        }
    };

    // A fresh parser per call: nothing carries over from a previous failure.
    let mut parser = tree_sitter::Parser::new();
    if let Err(e) = parser.set_language(&lang.tree_sitter_language()) {
        warn!(path = %path.display(), language = lang.id(), error = %e, "Grammar unavailable");
        return ParseOutcome::Unparseable { hash };
    }
    let Some(tree) = parser.parse(text, None) else {
        debug!(path = %path.display(), "tree-sitter returned no tree");
        return ParseOutcome::Unparseable { hash };
    };

    let root = tree.root_node();
    let damaged = root.has_error();
    if damaged {
        let error_bytes = error_bytes(root);
        if error_bytes * 2 > text.len() {
            debug!(path = %path.display(), error_bytes, "Syntax tree mostly errors");
            return ParseOutcome::Unparseable { hash };
        }
        debug!(path = %path.display(), error_bytes, "Syntax errors present, walking best-effort");
    }

    let mut out = Extraction::default();
    let walked = catch_unwind(AssertUnwindSafe(|| lang.walk(root, text, &mut out)));
    if walked.is_err() {
        warn!(
            path = %path.display(),
            symbols = out.symbols.len(),
            "Walker panicked, keeping partial results"
        );
    }
    if damaged && out.symbols.is_empty() {
        debug!(path = %path.display(), "Damaged tree yielded no symbols");
        return ParseOutcome::Unparseable { hash };
    }

    ParseOutcome::Parsed(ParseResult {
        hash,
        method: ExtractionMethod::TreeSitter,
        symbols: out.symbols,
        imports: out.imports,
        calls: out.calls,
    })
}

/// Parse with the grammar, falling back to regex patterns if the tree is unavailable.
pub fn extract_with_fallback(
    lang: &dyn LanguageSupport,
    path: &Path,
    text: Option<&str>,
    max_bytes: usize,
) -> ParseResult {
    let outcome = extract_limited(lang, path, text, max_bytes);
    recover(lang.id(), path, text.map(strip_bom).unwrap_or_default(), outcome)
}

/// Bytes covered by outermost `ERROR` nodes. `MISSING` nodes are zero-width.
fn error_bytes(root: tree_sitter::Node<'_>) -> usize {
    let mut total = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() {
            total += node.byte_range().len();
            continue;
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    total
}

/// Turn a [`ParseOutcome`] into a result, running the fallback on `Unparseable`.
///
/// If the fallback itself panics the file is still reported, with no symbols.
pub fn recover(language_id: &str, path: &Path, text: &str, outcome: ParseOutcome) -> ParseResult {
    match outcome {
        ParseOutcome::Parsed(result) => result,
        ParseOutcome::Unparseable { hash } => {
            debug!(path = %path.display(), language = language_id, "Using regex fallback");
            let recovered = catch_unwind(AssertUnwindSafe(|| {
                fallback::extract_fallback(language_id, text, hash.clone())
            }));
            recovered.unwrap_or_else(|_| {
                warn!(path = %path.display(), "Fallback extractor panicked");
                ParseResult::empty(hash, ExtractionMethod::RegexFallback)
            })
        }
    }
}
