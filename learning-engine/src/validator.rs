//! Similarity-based compatibility check for new concept evidence
//!
//! Guards the knowledge base against semantically unrelated matches that
//! happen to share a trigger keyword: new context snippets must textually
//! overlap with previously stored evidence (Jaccard similarity of word sets)
//! before they are merged.

use crate::extractor::ConceptHit;
use common::{CompatibilityVerdict, KnowledgeDocument};
use std::collections::HashSet;

/// Minimum average similarity for compatibility. Strict inequality: an
/// average of exactly 0.30 is incompatible.
const SIMILARITY_THRESHOLD: f64 = 0.30;

/// Existing entries compared against, most recently added first.
const COMPARISON_WINDOW: usize = 3;

/// Validate new evidence for `concept` against the knowledge base.
pub fn validate(concept: &str, hit: &ConceptHit, knowledge: &KnowledgeDocument) -> CompatibilityVerdict {
    let existing = knowledge.entries(concept);
    if existing.is_empty() {
        return CompatibilityVerdict {
            compatible: true,
            confidence: 1.0,
            reason: "new concept".to_string(),
        };
    }

    let recent = &existing[existing.len().saturating_sub(COMPARISON_WINDOW)..];

    let mut similarity_sum = 0.0;
    let mut comparisons = 0usize;

    for new_context in &hit.contexts {
        let new_words = word_set(new_context);
        if new_words.is_empty() {
            continue;
        }
        for entry in recent {
            for old_context in &entry.contexts {
                let old_words = word_set(old_context);
                if old_words.is_empty() {
                    continue;
                }
                similarity_sum += jaccard(&new_words, &old_words);
                comparisons += 1;
            }
        }
    }

    if comparisons == 0 {
        return CompatibilityVerdict {
            compatible: true,
            confidence: 0.5,
            reason: "insufficient data".to_string(),
        };
    }

    let avg = similarity_sum / comparisons as f64;
    CompatibilityVerdict {
        compatible: avg > SIMILARITY_THRESHOLD,
        confidence: avg,
        reason: format!("similarity: {:.1}%", avg * 100.0),
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::ConceptEntry;

    fn hit(contexts: &[&str]) -> ConceptHit {
        ConceptHit {
            count: 1,
            importance: 10.0,
            contexts: contexts.iter().map(|c| c.to_string()).collect(),
            source: "test video".to_string(),
        }
    }

    fn entry(contexts: &[&str]) -> ConceptEntry {
        ConceptEntry {
            video: "earlier video".to_string(),
            channel: "Novo Legacy".to_string(),
            url: String::new(),
            priority: 10.0,
            count: 1,
            importance: 10.0,
            contexts: contexts.iter().map(|c| c.to_string()).collect(),
            timestamp: Utc::now(),
            validation: CompatibilityVerdict {
                compatible: true,
                confidence: 1.0,
                reason: "new concept".to_string(),
            },
        }
    }

    fn knowledge_with(concept: &str, entries: Vec<ConceptEntry>) -> KnowledgeDocument {
        let mut doc = KnowledgeDocument::default();
        for e in entries {
            doc.push_entry(concept, e);
        }
        doc
    }

    #[test]
    fn test_unseen_concept_is_compatible() {
        let doc = KnowledgeDocument::default();
        let verdict = validate("pcc", &hit(&["any context"]), &doc);
        assert!(verdict.compatible);
        assert_eq!(verdict.confidence, 1.0);
        assert_eq!(verdict.reason, "new concept");
    }

    #[test]
    fn test_boundary_similarity_is_incompatible() {
        // 3 shared words, 10 in the union: Jaccard exactly 3/10 = 0.30,
        // which sits on the boundary and must be rejected (strict >).
        let doc = knowledge_with(
            "pcc",
            vec![entry(&["alpha beta gamma eta theta iota kappa"])],
        );
        let verdict = validate("pcc", &hit(&["alpha beta gamma delta epsilon zeta"]), &doc);
        assert!(!verdict.compatible);
        assert_eq!(verdict.confidence, 0.3);
    }

    #[test]
    fn test_above_boundary_is_compatible() {
        // 1 shared word of 3 in the union: 0.333 > 0.30.
        let doc = knowledge_with("pcc", vec![entry(&["alpha beta"])]);
        let verdict = validate("pcc", &hit(&["alpha gamma"]), &doc);
        assert!(verdict.compatible);
        assert!(verdict.confidence > 0.30);
    }

    #[test]
    fn test_no_comparable_pairs_defaults_to_compatible() {
        // Existing entry with no stored contexts: nothing to compare.
        let doc = knowledge_with("pcc", vec![entry(&[])]);
        let verdict = validate("pcc", &hit(&["some context words"]), &doc);
        assert!(verdict.compatible);
        assert_eq!(verdict.confidence, 0.5);
        assert_eq!(verdict.reason, "insufficient data");
    }

    #[test]
    fn test_only_recent_entries_are_compared() {
        // The oldest entry matches the new evidence exactly, but it sits
        // outside the 3-entry window. Against the three recent entries the
        // similarity is 1/4 = 0.25 each, so the verdict must be a conflict;
        // if the oldest leaked into the window the average would rise to
        // 0.4375 and flip the verdict.
        let doc = knowledge_with(
            "pcc",
            vec![
                entry(&["alpha beta"]),
                entry(&["alpha gamma delta"]),
                entry(&["alpha gamma delta"]),
                entry(&["alpha gamma delta"]),
            ],
        );
        let verdict = validate("pcc", &hit(&["alpha beta"]), &doc);
        assert!(!verdict.compatible);
        assert!((verdict.confidence - 0.25).abs() < 1e-9);
    }
}
