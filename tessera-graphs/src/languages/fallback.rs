//! Pattern-based recovery used when no syntax tree is available.
//!
//! Each language has an ordered rule list; the first rule to claim a line wins.
//! Only declarations are recovered. Imports and calls are never guessed.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::{ByteRange, ExtractionMethod, ParseResult, Symbol, SymbolKind};
use Extent::{Braces, Indent, Line};
use KindRule::{ByCase, ByIndent, Fixed};

/// Window for function and method bodies.
pub const FUNCTION_SPAN_CAP: usize = 500;
/// Window for class, interface, and struct bodies.
pub const TYPE_SPAN_CAP: usize = 1000;

#[derive(Debug, Clone, Copy)]
enum Extent {
    /// Brace-counted body, capped.
    Braces(usize),
    /// Python-style indented block, capped.
    Indent(usize),
    /// Ends with the line.
    Line,
}

#[derive(Debug, Clone, Copy)]
enum KindRule {
    Fixed(SymbolKind),
    /// Column-zero declarations get `top`, indented ones `nested`.
    ByIndent { top: SymbolKind, nested: SymbolKind },
    /// `UPPER_CASE` names are constants.
    ByCase,
}

#[derive(Debug)]
struct FallbackRule {
    pattern: Regex,
    kind: KindRule,
    extent: Extent,
}

fn rule(pattern: &str, kind: KindRule, extent: Extent) -> FallbackRule {
    FallbackRule {
        pattern: Regex::new(pattern).expect("fallback pattern is valid"),
        kind,
        extent,
    }
}

const FN: Extent = Braces(FUNCTION_SPAN_CAP);
const TYPE: Extent = Braces(TYPE_SPAN_CAP);
const FUNCTION_OR_METHOD: KindRule = ByIndent {
    top: SymbolKind::Function,
    nested: SymbolKind::Method,
};

fn ecma_rules() -> Vec<FallbackRule> {
    vec![
        rule(
            r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)",
            Fixed(SymbolKind::Function),
            FN,
        ),
        rule(
            r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
            Fixed(SymbolKind::Class),
            TYPE,
        ),
        rule(
            r"(?m)^[ \t]*(?:export\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)",
            Fixed(SymbolKind::Interface),
            TYPE,
        ),
        rule(
            r"(?m)^[ \t]*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)",
            Fixed(SymbolKind::Type),
            TYPE,
        ),
        rule(
            r"(?m)^[ \t]*(?:export\s+)?(?:declare\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)[^=\n]*=",
            Fixed(SymbolKind::Type),
            Line,
        ),
        rule(
            r"(?m)^(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)[^=\n]*=\s*(?:async\s+)?(?:function\b|\([^)\n]*\)[^=\n]*=>|[A-Za-z_$][\w$]*\s*=>)",
            Fixed(SymbolKind::Function),
            FN,
        ),
        rule(
            r"(?m)^(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)",
            Fixed(SymbolKind::Variable),
            Line,
        ),
        rule(
            r"(?m)^[ \t]+(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*(?P<name>[A-Za-z_$][\w$]*)\s*\([^)\n]*\)\s*(?::\s*[^{\n]+)?\{",
            Fixed(SymbolKind::Method),
            FN,
        ),
    ]
}

fn python_rules() -> Vec<FallbackRule> {
    vec![
        rule(
            r"(?m)^[ \t]*class\s+(?P<name>[A-Za-z_]\w*)",
            Fixed(SymbolKind::Class),
            Indent(TYPE_SPAN_CAP),
        ),
        rule(
            r"(?m)^[ \t]*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)",
            FUNCTION_OR_METHOD,
            Indent(FUNCTION_SPAN_CAP),
        ),
        rule(r"(?m)^(?P<name>[A-Za-z_]\w*)\s*(?::[^=\n]+)?=[^=]", ByCase, Line),
    ]
}

fn go_rules() -> Vec<FallbackRule> {
    vec![
        rule(
            r"(?m)^func\s+\([^)]*\)\s*(?P<name>[A-Za-z_]\w*)",
            Fixed(SymbolKind::Method),
            FN,
        ),
        rule(r"(?m)^func\s+(?P<name>[A-Za-z_]\w*)", Fixed(SymbolKind::Function), FN),
        rule(
            r"(?m)^type\s+(?P<name>[A-Za-z_]\w*)\s+struct\b",
            Fixed(SymbolKind::Struct),
            TYPE,
        ),
        rule(
            r"(?m)^type\s+(?P<name>[A-Za-z_]\w*)\s+interface\b",
            Fixed(SymbolKind::Interface),
            TYPE,
        ),
        rule(r"(?m)^type\s+(?P<name>[A-Za-z_]\w*)\b", Fixed(SymbolKind::Type), Line),
        rule(r"(?m)^var\s+(?P<name>[A-Za-z_]\w*)", Fixed(SymbolKind::Variable), Line),
        rule(r"(?m)^const\s+(?P<name>[A-Za-z_]\w*)", Fixed(SymbolKind::Constant), Line),
    ]
}

fn java_rules() -> Vec<FallbackRule> {
    const MODS: &str = r"(?:(?:public|private|protected|static|final|abstract|sealed|strictfp)\s+)*";
    vec![
        rule(
            &format!(r"(?m)^[ \t]*{MODS}(?:class|record)\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Class),
            TYPE,
        ),
        rule(
            &format!(r"(?m)^[ \t]*{MODS}@?interface\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Interface),
            TYPE,
        ),
        rule(
            &format!(r"(?m)^[ \t]*{MODS}enum\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Type),
            TYPE,
        ),
        rule(
            r"(?m)^[ \t]+(?:(?:public|private|protected|static|final|abstract|synchronized|native|default)\s+)*(?:<[^>\n]+>\s+)?[\w<>\[\],.? ]+\s+(?P<name>[A-Za-z_]\w*)\s*\([^)\n]*\)\s*(?:throws\s+[^{;\n]+)?\{",
            Fixed(SymbolKind::Method),
            FN,
        ),
    ]
}

fn csharp_rules() -> Vec<FallbackRule> {
    const MODS: &str = r"(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly|unsafe|new|file)\s+)*";
    vec![
        rule(
            &format!(r"(?m)^[ \t]*{MODS}(?:class|record|struct)\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Class),
            TYPE,
        ),
        rule(
            &format!(r"(?m)^[ \t]*{MODS}interface\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Interface),
            TYPE,
        ),
        rule(
            &format!(r"(?m)^[ \t]*{MODS}enum\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Type),
            TYPE,
        ),
        rule(
            &format!(r"(?m)^[ \t]*{MODS}delegate\s+[\w<>\[\],.? ]+\s+(?P<name>[A-Za-z_]\w*)\s*\("),
            Fixed(SymbolKind::Type),
            Line,
        ),
        rule(
            r"(?m)^[ \t]+(?:(?:public|private|protected|internal|static|virtual|override|abstract|async|extern|sealed|new)\s+)*[\w<>\[\],.? ]+\s+(?P<name>[A-Za-z_]\w*)\s*\([^)\n]*\)\s*\{",
            Fixed(SymbolKind::Method),
            FN,
        ),
    ]
}

fn kotlin_rules() -> Vec<FallbackRule> {
    const MODS: &str = r"(?:(?:public|private|protected|internal|open|abstract|sealed|data|inner|final|value|annotation)\s+)*";
    vec![
        rule(
            &format!(r"(?m)^[ \t]*{MODS}enum\s+class\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Type),
            TYPE,
        ),
        rule(
            &format!(r"(?m)^[ \t]*{MODS}(?:fun\s+)?interface\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Interface),
            TYPE,
        ),
        rule(
            &format!(r"(?m)^[ \t]*{MODS}(?:class|object)\s+(?P<name>[A-Za-z_]\w*)"),
            Fixed(SymbolKind::Class),
            TYPE,
        ),
        rule(
            r"(?m)^[ \t]*typealias\s+(?P<name>[A-Za-z_]\w*)",
            Fixed(SymbolKind::Type),
            Line,
        ),
        rule(
            r"(?m)^[ \t]*(?:(?:public|private|protected|internal|open|override|abstract|suspend|inline|operator|infix|tailrec)\s+)*fun\s+(?:<[^>\n]+>\s+)?(?:[\w.]+\.)?(?P<name>[A-Za-z_]\w*)\s*\(",
            FUNCTION_OR_METHOD,
            FN,
        ),
        rule(
            r"(?m)^(?:(?:private|internal|public)\s+)?const\s+val\s+(?P<name>[A-Za-z_]\w*)",
            Fixed(SymbolKind::Constant),
            Line,
        ),
        rule(
            r"(?m)^(?:(?:private|internal|public)\s+)?(?:val|var)\s+(?P<name>[A-Za-z_]\w*)",
            Fixed(SymbolKind::Variable),
            Line,
        ),
    ]
}

static RULES: LazyLock<HashMap<&'static str, Vec<FallbackRule>>> = LazyLock::new(|| {
    let mut rules = HashMap::new();
    rules.insert("typescript", ecma_rules());
    rules.insert("tsx", ecma_rules());
    rules.insert("javascript", ecma_rules());
    rules.insert("python", python_rules());
    rules.insert("go", go_rules());
    rules.insert("java", java_rules());
    rules.insert("csharp", csharp_rules());
    rules.insert("kotlin", kotlin_rules());
    rules
});

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "else", "do", "try", "new",
    "throw", "using", "lock", "foreach", "synchronized",
];

/// Recover declarations from `text` without a syntax tree.
///
/// Symbols come back in source order with unqualified fqnames.
pub fn extract_fallback(language_id: &str, text: &str, hash: String) -> ParseResult {
    let mut result = ParseResult::empty(hash, ExtractionMethod::RegexFallback);
    let Some(rules) = RULES.get(language_id) else {
        return result;
    };

    let mut claimed_lines = HashSet::new();
    for rule in rules {
        for caps in rule.pattern.captures_iter(text) {
            let Some(name) = caps.name("name") else {
                continue;
            };
            let name_start = name.start();
            let name = name.as_str();
            if CONTROL_KEYWORDS.contains(&name) {
                continue;
            }
            let line_start = text[..name_start].rfind('\n').map_or(0, |i| i + 1);
            if !claimed_lines.insert(line_start) {
                continue;
            }

            let indent = indentation(&text[line_start..]);
            let start = line_start + indent;
            let end = match rule.extent {
                Extent::Braces(cap) => brace_end(text, start, cap),
                Extent::Indent(cap) => indent_end(text, start, indent, cap),
                Extent::Line => line_end(text, start),
            };
            let kind = match rule.kind {
                KindRule::Fixed(kind) => kind,
                KindRule::ByIndent { top, nested } => {
                    if indent == 0 {
                        top
                    } else {
                        nested
                    }
                }
                KindRule::ByCase => {
                    if name.chars().any(|c| c.is_ascii_uppercase())
                        && !name.chars().any(|c| c.is_ascii_lowercase())
                    {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    }
                }
            };
            result.symbols.push(Symbol {
                name: name.to_string(),
                fqname: name.to_string(),
                kind,
                range: ByteRange::new(start, end),
            });
        }
    }
    result.symbols.sort_by_key(|s| s.range.start);
    result
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Largest char boundary of `text` not after `at`.
fn floor_boundary(text: &str, at: usize) -> usize {
    let mut at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

fn capped(text: &str, start: usize, cap: usize) -> usize {
    floor_boundary(text, start.saturating_add(cap))
}

/// Index just past the brace that closes the first `{` after `start`,
/// or `start + cap` if it does not close within that window.
pub fn brace_end(text: &str, start: usize, cap: usize) -> usize {
    let limit = capped(text, start, cap);
    let mut depth = 0usize;
    let mut opened = false;
    for (offset, byte) in text.as_bytes()[start..limit].iter().enumerate() {
        match byte {
            b'{' => {
                depth += 1;
                opened = true;
            }
            b'}' if opened => {
                depth -= 1;
                if depth == 0 {
                    return start + offset + 1;
                }
            }
            _ => {}
        }
    }
    limit
}

/// End of the indented block whose header starts at `start`: the start of the
/// first later non-blank line indented no deeper than `indent`.
pub fn indent_end(text: &str, start: usize, indent: usize, cap: usize) -> usize {
    let limit = capped(text, start, cap);
    let header_end = line_end(text, start);
    let mut pos = header_end;
    let mut last_content_end = header_end;
    while pos < limit {
        let line_start = pos + 1;
        if line_start >= text.len() {
            break;
        }
        let end = line_end(text, line_start);
        let line = &text[line_start..end];
        if !line.trim().is_empty() {
            if indentation(line) <= indent {
                return last_content_end.min(limit);
            }
            last_content_end = end;
        }
        pos = end;
    }
    last_content_end.min(limit)
}

fn line_end(text: &str, start: usize) -> usize {
    text[start..].find('\n').map_or(text.len(), |i| start + i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_hash;

    fn fallback(lang: &str, text: &str) -> ParseResult {
        extract_fallback(lang, text, content_hash(text))
    }

    fn names(result: &ParseResult) -> Vec<(&str, SymbolKind)> {
        result.symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect()
    }

    #[test]
    fn typescript_declarations() {
        let text = "export class Store {\n  load(id: string): Item {\n    return fetch(id);\n  }\n}\n\nexport const run = async () => {\n  go();\n};\nexport type Id = string;\nlet count = 0;\n";
        let result = fallback("typescript", text);
        assert_eq!(
            names(&result),
            vec![
                ("Store", SymbolKind::Class),
                ("load", SymbolKind::Method),
                ("run", SymbolKind::Function),
                ("Id", SymbolKind::Type),
                ("count", SymbolKind::Variable),
            ]
        );
        assert!(result.imports.is_empty());
        assert!(result.calls.is_empty());

        let class = &result.symbols[0];
        assert_eq!(&text[class.range.start..class.range.end], &text[..text.find("\n\n").unwrap()]);
        let id = &result.symbols[3];
        assert_eq!(&text[id.range.start..id.range.end], "export type Id = string;");
    }

    #[test]
    fn later_declarations_start_at_their_own_line() {
        let text = "// header\n\n    def helper(x):\n        return x\nVALUE = 1\n";
        let result = fallback("python", text);
        assert_eq!(
            names(&result),
            vec![("helper", SymbolKind::Method), ("VALUE", SymbolKind::Constant)]
        );
        let helper = &result.symbols[0];
        assert_eq!(helper.range.start, text.find("def helper").unwrap());
        let value = &result.symbols[1];
        assert_eq!(&text[value.range.start..value.range.end], "VALUE = 1");
    }

    #[test]
    fn control_flow_is_not_a_method() {
        let text = "function f() {\n  if (x) {\n    y();\n  }\n}\n";
        let result = fallback("javascript", text);
        assert_eq!(names(&result), vec![("f", SymbolKind::Function)]);
    }

    #[test]
    fn python_blocks_end_at_dedent() {
        let text = "class A:\n    def m(self):\n        pass\n\n    def n(self):\n        pass\n\nLIMIT = 3\ndef top():\n    pass\n";
        let result = fallback("python", text);
        assert_eq!(
            names(&result),
            vec![
                ("A", SymbolKind::Class),
                ("m", SymbolKind::Method),
                ("n", SymbolKind::Method),
                ("LIMIT", SymbolKind::Constant),
                ("top", SymbolKind::Function),
            ]
        );
        let class = &result.symbols[0];
        assert!(text[class.range.start..class.range.end].ends_with("        pass"));
        assert!(!text[class.range.start..class.range.end].contains("LIMIT"));
        let m = &result.symbols[1];
        assert_eq!(&text[m.range.start..m.range.end], "def m(self):\n        pass");
    }

    #[test]
    fn go_method_wins_over_function_rule() {
        let text = "func (s *Server) Start() {\n}\n\nfunc main() {}\ntype Config struct {\n\tPort int\n}\n";
        let result = fallback("go", text);
        assert_eq!(
            names(&result),
            vec![
                ("Start", SymbolKind::Method),
                ("main", SymbolKind::Function),
                ("Config", SymbolKind::Struct),
            ]
        );
    }

    #[test]
    fn unbalanced_braces_are_capped() {
        let body = "x".repeat(2000);
        let text = format!("function open() {{\n{body}\n");
        let result = fallback("typescript", &text);
        assert_eq!(result.symbols[0].range, ByteRange::new(0, FUNCTION_SPAN_CAP));

        let text = format!("class Open {{\n{body}\n");
        let result = fallback("typescript", &text);
        assert_eq!(result.symbols[0].range, ByteRange::new(0, TYPE_SPAN_CAP));
    }

    #[test]
    fn unknown_language_yields_nothing() {
        let result = fallback("cobol", "IDENTIFICATION DIVISION.");
        assert!(result.symbols.is_empty());
        assert_eq!(result.method, ExtractionMethod::RegexFallback);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn brace_end_is_bounded(text in "[{}a \\n]{0,2000}", start in 0usize..100, cap in 1usize..1500) {
                let start = start.min(text.len());
                let end = brace_end(&text, start, cap);
                prop_assert!(end >= start);
                prop_assert!(end <= text.len());
                prop_assert!(end - start <= cap);
            }

            #[test]
            fn ranges_stay_inside_text(text in "(class|def|function|func|fun| |x|\\{|\\}|\\(|\\)|:|\\n|é)*") {
                for lang in ["typescript", "python", "go", "java", "csharp", "kotlin"] {
                    let result = fallback(lang, &text);
                    for sym in &result.symbols {
                        prop_assert!(sym.range.start <= sym.range.end);
                        prop_assert!(sym.range.end <= text.len());
                        prop_assert!(text.is_char_boundary(sym.range.end));
                    }
                }
            }
        }
    }
}
