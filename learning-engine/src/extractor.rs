//! Pattern-based concept extraction from source transcripts
//!
//! A static, data-driven table maps each CRT concept to a set of
//! case-insensitive patterns and a fixed importance weight. Extraction is a
//! pure function of the input text: concepts with zero matches are omitted
//! from the result entirely.

use common::VideoSource;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Radius of the context window captured around a match, in bytes
/// (clamped to char boundaries).
const CONTEXT_RADIUS: usize = 150;

/// Maximum context snippets kept per concept hit.
const MAX_CONTEXTS: usize = 3;

struct ConceptSpec {
    name: &'static str,
    importance: f64,
    patterns: Vec<Regex>,
}

fn spec(name: &'static str, importance: f64, patterns: &[&str]) -> ConceptSpec {
    ConceptSpec {
        name,
        importance,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)).expect("invalid concept pattern"))
            .collect(),
    }
}

lazy_static! {
    /// The CRT concept table. Core concepts carry weights 8-10; adding a new
    /// concept means adding a row here, not touching control flow.
    static ref CONCEPT_TABLE: Vec<ConceptSpec> = vec![
        spec("pcc", 10.0, &[
            r"PCC",
            r"previous\s+candle\s+close",
            r"close\s+of\s+previous",
            r"prior\s+close",
        ]),
        spec("four_hour_candle", 10.0, &[
            r"4\s*h(?:our)?",
            r"four\s+hour",
            r"4h\s+candle",
        ]),
        spec("manipulation", 9.0, &[
            r"manipulation",
            r"wick",
            r"liquidity\s+grab",
            r"fake\s+out",
        ]),
        spec("distribution", 9.0, &[
            r"distribution",
            r"impulse",
            r"real\s+move",
            r"breakout",
        ]),
        spec("quadrants", 8.0, &[
            r"quadrant",
            r"fibonacci",
            r"25%",
            r"50%",
            r"75%",
            r"premium",
            r"discount",
        ]),
        spec("turtle_soup", 8.0, &[
            r"turtle\s+soup",
            r"liquidity\s+sweep",
            r"stop\s+hunt",
        ]),
        spec("entry_zone", 9.0, &[
            r"entry",
            r"zone",
            r"setup",
            r"signal",
        ]),
        spec("risk_management", 9.0, &[
            r"stop\s+loss",
            r"take\s+profit",
            r"risk\s+reward",
            r"R:R",
        ]),
    ];
}

/// Extraction result for a single concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptHit {
    pub count: usize,
    pub importance: f64,
    pub contexts: Vec<String>,
    pub source: String,
}

/// Extract all concept hits from a transcript. Deterministic and
/// side-effect-free; zero-match concepts do not appear in the map.
pub fn extract(text: &str, source: &VideoSource) -> BTreeMap<String, ConceptHit> {
    let mut hits = BTreeMap::new();

    for concept in CONCEPT_TABLE.iter() {
        let mut count = 0;
        let mut positions = Vec::new();

        for pattern in &concept.patterns {
            for m in pattern.find_iter(text) {
                count += 1;
                if positions.len() < MAX_CONTEXTS {
                    positions.push(m.start());
                }
            }
        }

        if count == 0 {
            continue;
        }

        let contexts = positions
            .iter()
            .map(|&at| context_window(text, at))
            .collect();

        hits.insert(
            concept.name.to_string(),
            ConceptHit {
                count,
                importance: concept.importance,
                contexts,
                source: source.title.clone(),
            },
        );
    }

    hits
}

/// Slice a window of +/- CONTEXT_RADIUS bytes around `at`, snapped to char
/// boundaries so multibyte transcripts never panic.
fn context_window(text: &str, at: usize) -> String {
    let start = floor_boundary(text, at.saturating_sub(CONTEXT_RADIUS));
    let end = ceil_boundary(text, (at + CONTEXT_RADIUS).min(text.len()));
    text[start..end].trim().to_string()
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
