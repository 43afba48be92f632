//! Theory-vs-practice correlation
//!
//! Compares how important each concept was judged from textual evidence
//! against how it actually performed across realized trades, producing a
//! validation snapshot. Below the minimum sample the run is an explicit
//! no-op, never an error.

use chrono::Utc;
use common::{
    ConceptComparison, ConceptStatus, KnowledgeDocument, PerformanceDocument, ValidationSnapshot,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Minimum trades before correlation produces a snapshot.
pub const MIN_TRADE_SAMPLE: usize = 10;

/// Trades referencing a concept needed before real-world evidence counts.
const MIN_CONCEPT_SAMPLE: usize = 5;

/// Result of a correlation run
#[derive(Debug, Clone)]
pub enum CorrelationOutcome {
    /// Fewer than [`MIN_TRADE_SAMPLE`] trades recorded; nothing to validate.
    InsufficientSample { trades: usize },
    Snapshot(ValidationSnapshot),
}

#[derive(Default)]
struct ConceptTally {
    wins: usize,
    losses: usize,
    total_profit: f64,
}

/// Correlate learned concepts with realized trade outcomes.
pub fn correlate(
    performance: &PerformanceDocument,
    knowledge: &KnowledgeDocument,
) -> CorrelationOutcome {
    if performance.total_trades() < MIN_TRADE_SAMPLE {
        return CorrelationOutcome::InsufficientSample {
            trades: performance.total_trades(),
        };
    }

    // Accumulate per-concept outcomes across all trades.
    let mut tallies: BTreeMap<&str, ConceptTally> = BTreeMap::new();
    for trade in &performance.trades {
        for concept in &trade.concepts_used {
            let tally = tallies.entry(concept.as_str()).or_default();
            if trade.is_win() {
                tally.wins += 1;
            } else {
                tally.losses += 1;
            }
            tally.total_profit += trade.profit;
        }
    }

    // Compare every learned concept against its realized results.
    let mut comparison = BTreeMap::new();
    for (concept, entries) in &knowledge.concepts {
        if entries.is_empty() {
            continue;
        }
        let learned_importance = entries
            .iter()
            .map(|e| e.importance * e.priority)
            .sum::<f64>()
            / entries.len() as f64;

        let (real_win_rate, real_effectiveness, sample_size) = match tallies.get(concept.as_str())
        {
            Some(tally) => {
                let total = tally.wins + tally.losses;
                let win_rate = tally.wins as f64 / total as f64 * 100.0;
                let avg_profit = tally.total_profit / total as f64;
                (win_rate, win_rate * avg_profit, total)
            }
            None => (0.0, 0.0, 0),
        };

        let theory_vs_practice = theory_vs_practice(real_win_rate, sample_size);

        debug!(
            concept = concept.as_str(),
            learned_importance,
            real_win_rate,
            sample_size,
            theory_vs_practice,
            "correlated concept"
        );

        comparison.insert(
            concept.clone(),
            ConceptComparison {
                learned_importance,
                real_win_rate,
                real_effectiveness,
                sample_size,
                theory_vs_practice,
                status: ConceptStatus::from_score(theory_vs_practice),
            },
        );
    }

    CorrelationOutcome::Snapshot(ValidationSnapshot {
        timestamp: Utc::now(),
        comparison,
        total_trades: performance.total_trades(),
        overall_win_rate: performance.win_rate,
    })
}

/// Score how well theory matched practice. Concepts with fewer than
/// [`MIN_CONCEPT_SAMPLE`] referencing trades score 0: not enough real-world
/// evidence to validate the theory either way.
fn theory_vs_practice(win_rate: f64, sample_size: usize) -> f64 {
    if sample_size < MIN_CONCEPT_SAMPLE {
        return 0.0;
    }
    if win_rate >= 60.0 {
        (win_rate + 20.0).min(100.0)
    } else {
        win_rate
    }
}
