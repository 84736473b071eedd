//! Contract Comparator — structural similarity between two Solidity sources
//!
//! Used by the verification wizard: the contract generated from an uploaded
//! license JSON is compared with an uploaded Solidity file.
//!
//! # Scoring
//!
//! ```text
//! similarity = matches / max(|generated|, |uploaded|) * 100
//! ```
//!
//! A match is an identical `(kind, name)` pair present in both element
//! lists, counted as a multiset. Two empty lists are 100% similar.
//!
//! This is a heuristic. It looks at names only: two contracts with identical
//! bodies but different names score 0%.

mod extractor;
mod scanner;

pub use extractor::{ElementExtractor, PatternExtractor};
pub use scanner::blank_comments_and_strings;

use std::collections::BTreeMap;

/// Default minimum similarity for a comparison to pass
pub const DEFAULT_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Contract,
    Struct,
    Function,
    Mapping,
    Event,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Contract => "contract",
            ElementKind::Struct => "struct",
            ElementKind::Function => "function",
            ElementKind::Mapping => "mapping",
            ElementKind::Event => "event",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named structural element found in a source text
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContractElement {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub name: String,
    /// 1-based line of the name in the scanned source
    pub line: usize,
}

impl ContractElement {
    fn key(&self) -> (ElementKind, &str) {
        (self.kind, self.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComparatorConfig {
    /// Minimum similarity percentage, inclusive
    pub threshold: f64,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        ComparatorConfig {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Outcome of comparing a generated and an uploaded contract
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    /// 0.0 ..= 100.0
    pub similarity: f64,
    pub is_valid: bool,
    pub threshold: f64,
    pub matched: usize,
    /// Missing entries first, then extra entries
    pub differences: Vec<String>,
    /// In the generated contract, absent from the upload
    pub missing: Vec<ContractElement>,
    /// In the upload, absent from the generated contract
    pub extra: Vec<ContractElement>,
}

/// Compare with the default pattern extractor and the 80% threshold
pub fn compare_contracts(generated: &str, uploaded: &str) -> Comparison {
    Comparator::default().compare(generated, uploaded)
}

/// Comparison with a pluggable extractor and threshold
pub struct Comparator<E: ElementExtractor = PatternExtractor> {
    extractor: E,
    config: ComparatorConfig,
}

impl Default for Comparator<PatternExtractor> {
    fn default() -> Self {
        Comparator {
            extractor: PatternExtractor,
            config: ComparatorConfig::default(),
        }
    }
}

impl<E: ElementExtractor> Comparator<E> {
    pub fn new(extractor: E, config: ComparatorConfig) -> Self {
        Comparator { extractor, config }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    pub fn compare(&self, generated: &str, uploaded: &str) -> Comparison {
        let gen = self.extractor.extract(generated);
        let up = self.extractor.extract(uploaded);
        let comparison = score(&gen, &up, self.config.threshold);
        tracing::debug!(
            similarity = comparison.similarity,
            matched = comparison.matched,
            generated = gen.len(),
            uploaded = up.len(),
            "contracts compared"
        );
        comparison
    }
}

fn score(generated: &[ContractElement], uploaded: &[ContractElement], threshold: f64) -> Comparison {
    let missing = unmatched(generated, uploaded);
    let extra = unmatched(uploaded, generated);
    let matched = generated.len() - missing.len();

    let denominator = generated.len().max(uploaded.len());
    let similarity = if denominator == 0 {
        100.0
    } else {
        matched as f64 / denominator as f64 * 100.0
    };

    let differences = missing
        .iter()
        .map(|el| format!("Missing {}: {}", el.kind, el.name))
        .chain(extra.iter().map(|el| format!("Extra {}: {}", el.kind, el.name)))
        .collect();

    Comparison {
        similarity,
        is_valid: similarity >= threshold,
        threshold,
        matched,
        differences,
        missing,
        extra,
    }
}

/// Elements of `from` left over after pairing each with an equal element of `against`
fn unmatched<'a>(from: &'a [ContractElement], against: &'a [ContractElement]) -> Vec<ContractElement> {
    let mut available: BTreeMap<(ElementKind, &'a str), usize> = BTreeMap::new();
    for el in against {
        *available.entry(el.key()).or_insert(0) += 1;
    }
    from.iter()
        .filter(|el| match available.get_mut(&el.key()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}
