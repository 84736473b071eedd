//! Element extraction — named structural elements of a Solidity source

use std::sync::OnceLock;

use regex::Regex;

use super::scanner::{blank_comments_and_strings, line_of};
use super::{ContractElement, ElementKind};

/// Pulls `(kind, name)` elements out of a source text.
///
/// Implementations must be deterministic: the same text always yields the
/// same elements in the same order.
pub trait ElementExtractor {
    fn extract(&self, source: &str) -> Vec<ContractElement>;
}

/// Keyword-prefixed identifier scan using regular expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

struct Patterns {
    by_kind: Vec<(ElementKind, Regex)>,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table = [
            (ElementKind::Contract, r"\bcontract\s+([A-Za-z_$][\w$]*)"),
            (ElementKind::Struct, r"\bstruct\s+([A-Za-z_$][\w$]*)"),
            (ElementKind::Function, r"\bfunction\s+([A-Za-z_$][\w$]*)"),
            // Value types may nest one level: mapping(a => mapping(b => c))
            (
                ElementKind::Mapping,
                r"\bmapping\s*\((?:[^()]|\([^()]*\))*\)\s*(?:(?:public|private|internal|constant|immutable)\s+)*([A-Za-z_$][\w$]*)",
            ),
            (ElementKind::Event, r"\bevent\s+([A-Za-z_$][\w$]*)"),
        ];
        Patterns {
            by_kind: table
                .into_iter()
                .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid element regex")))
                .collect(),
        }
    })
}

impl ElementExtractor for PatternExtractor {
    fn extract(&self, source: &str) -> Vec<ContractElement> {
        let cleaned = blank_comments_and_strings(source);
        let mut elements = Vec::new();

        for (kind, re) in &patterns().by_kind {
            for caps in re.captures_iter(&cleaned) {
                let Some(name) = caps.get(1) else { continue };
                elements.push(ContractElement {
                    kind: *kind,
                    name: name.as_str().to_string(),
                    line: line_of(&cleaned, name.start()),
                });
            }
        }

        // Source order within the whole file, kind as tie-breaker
        elements.sort_by(|a, b| a.line.cmp(&b.line).then(a.kind.cmp(&b.kind)));
        elements
    }
}
