//! Shared domain types for the CRT learning engine
//!
//! This crate holds the types that cross crate boundaries:
//! - External source identity (videos carrying a priority weight)
//! - The four durable documents (knowledge, performance, validation, rewards)
//!   together with their state-transition methods
//!
//! Each document is persisted as a single JSON file, loaded at startup and
//! rewritten in full on every save. Durable storage is the sole source of
//! truth between invocations; nothing here caches across calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// An external content source (video) with a trust/relevance weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel: String,
    pub url: String,
    pub priority: f64,
}

/// Compatibility verdict attached to every accepted concept entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityVerdict {
    pub compatible: bool,
    pub confidence: f64,
    pub reason: String,
}

/// One piece of accepted evidence for a concept, append-only once stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub video: String,
    pub channel: String,
    pub url: String,
    pub priority: f64,
    pub count: usize,
    pub importance: f64,
    pub contexts: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub validation: CompatibilityVerdict,
}

/// Durable knowledge base: processed source ids plus concept evidence lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub videos_analyzed: Vec<String>,
    pub concepts: BTreeMap<String, Vec<ConceptEntry>>,
    pub last_update: Option<DateTime<Utc>>,
}

impl KnowledgeDocument {
    /// Idempotence gate: has this source already been handled?
    pub fn is_processed(&self, source_id: &str) -> bool {
        self.videos_analyzed.iter().any(|id| id == source_id)
    }

    /// Mark a source processed. The set only grows; a second call for the
    /// same id is a no-op.
    pub fn mark_processed(&mut self, source_id: &str) {
        if !self.is_processed(source_id) {
            self.videos_analyzed.push(source_id.to_string());
        }
    }

    /// Append accepted evidence for a concept. Entries are never removed.
    pub fn push_entry(&mut self, concept: &str, entry: ConceptEntry) {
        self.concepts.entry(concept.to_string()).or_default().push(entry);
    }

    pub fn entries(&self, concept: &str) -> &[ConceptEntry] {
        self.concepts.get(concept).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_sources(&self) -> usize {
        self.videos_analyzed.len()
    }
}

/// One realized trade outcome with concept attribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub profit: f64,
    pub concepts_used: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }
}

/// Append-only log of realized trades with a derived win rate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceDocument {
    pub trades: Vec<TradeRecord>,
    pub win_rate: f64,
}

impl PerformanceDocument {
    /// Append a trade and recompute the win rate (wins / total x 100).
    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        self.win_rate = wins as f64 / self.trades.len() as f64 * 100.0;
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }
}

/// Per-concept theory-vs-practice comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptComparison {
    pub learned_importance: f64,
    pub real_win_rate: f64,
    pub real_effectiveness: f64,
    pub sample_size: usize,
    pub theory_vs_practice: f64,
    pub status: ConceptStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConceptStatus {
    /// theory-vs-practice score >= 70
    Validated,
    /// theory-vs-practice score >= 50
    NeedsImprovement,
    NotWorking,
}

impl ConceptStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            ConceptStatus::Validated
        } else if score >= 50.0 {
            ConceptStatus::NeedsImprovement
        } else {
            ConceptStatus::NotWorking
        }
    }
}

/// Snapshot of one correlation run, captured at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSnapshot {
    pub timestamp: DateTime<Utc>,
    pub comparison: BTreeMap<String, ConceptComparison>,
    pub total_trades: usize,
    pub overall_win_rate: f64,
}

/// Unbounded validation history. Unlike the reward ledger this list is never
/// capped; long-running deployments grow it by one snapshot per correlation
/// run and should archive the file externally if size becomes a concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationDocument {
    pub validations: Vec<ValidationSnapshot>,
    pub last_validation: Option<DateTime<Utc>>,
}

impl ValidationDocument {
    pub fn append(&mut self, snapshot: ValidationSnapshot) {
        self.last_validation = Some(snapshot.timestamp);
        self.validations.push(snapshot);
    }

    pub fn latest(&self) -> Option<&ValidationSnapshot> {
        self.validations.last()
    }
}

/// Outcome of a concluded trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
}

/// Points awarded per outcome. The 5:1 asymmetry is deliberate: a single
/// loss must be expensive relative to a single win so the cumulative score
/// only trends positive under the target risk/reward ratio.
pub const WIN_POINTS: i64 = 100;
pub const LOSS_POINTS: i64 = -500;

/// Maximum ledger entries retained; oldest are dropped on overflow.
pub const REWARD_HISTORY_CAP: usize = 100;

/// One reward/punishment ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub result: TradeOutcome,
    pub points: i64,
    pub profit: f64,
    pub total_score: i64,
    pub message: String,
}

/// Durable score/win/loss ledger with bounded history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardDocument {
    pub total_score: i64,
    pub wins: u64,
    pub losses: u64,
    pub sessions: u64,
    pub history: Vec<LedgerEntry>,
}

impl RewardDocument {
    /// Apply a win or loss, append a ledger entry, and trim history to the
    /// most recent [`REWARD_HISTORY_CAP`] entries.
    pub fn apply(&mut self, result: TradeOutcome, profit: f64) -> LedgerEntry {
        let points = match result {
            TradeOutcome::Win => WIN_POINTS,
            TradeOutcome::Loss => LOSS_POINTS,
        };
        self.total_score += points;
        let message = match result {
            TradeOutcome::Win => {
                self.wins += 1;
                format!("WIN +{} points | profit ${:.2}", points, profit)
            }
            TradeOutcome::Loss => {
                self.losses += 1;
                format!("LOSS {} points (severe punishment) | loss ${:.2}", points, profit)
            }
        };

        let entry = LedgerEntry {
            timestamp: Utc::now(),
            result,
            points,
            profit,
            total_score: self.total_score,
            message,
        };
        self.history.push(entry.clone());

        if self.history.len() > REWARD_HISTORY_CAP {
            let excess = self.history.len() - REWARD_HISTORY_CAP;
            self.history.drain(..excess);
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(profit: f64) -> TradeRecord {
        TradeRecord {
            id: Uuid::new_v4(),
            profit,
            concepts_used: vec!["pcc".to_string()],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_processed_set_is_idempotent() {
        let mut doc = KnowledgeDocument::default();
        doc.mark_processed("vid-1");
        doc.mark_processed("vid-1");
        assert_eq!(doc.videos_analyzed, vec!["vid-1".to_string()]);
        assert!(doc.is_processed("vid-1"));
        assert!(!doc.is_processed("vid-2"));
    }

    #[test]
    fn test_win_rate_recomputed_on_append() {
        let mut doc = PerformanceDocument::default();
        for profit in [10.0, -5.0, 3.0] {
            doc.record_trade(trade(profit));
        }
        assert_eq!(doc.total_trades(), 3);
        assert!((doc.win_rate - 200.0 / 3.0).abs() < 1e-9); // 66.7%
    }

    #[test]
    fn test_score_is_order_independent() {
        let mut forward = RewardDocument::default();
        let mut reverse = RewardDocument::default();

        for _ in 0..4 {
            forward.apply(TradeOutcome::Win, 10.0);
        }
        for _ in 0..3 {
            forward.apply(TradeOutcome::Loss, -10.0);
        }

        for _ in 0..3 {
            reverse.apply(TradeOutcome::Loss, -10.0);
        }
        for _ in 0..4 {
            reverse.apply(TradeOutcome::Win, 10.0);
        }

        let expected = 100 * 4 - 500 * 3;
        assert_eq!(forward.total_score, expected);
        assert_eq!(reverse.total_score, expected);
        assert_eq!(forward.wins, 4);
        assert_eq!(forward.losses, 3);
    }

    #[test]
    fn test_ledger_history_is_bounded() {
        let mut doc = RewardDocument::default();
        for i in 0..150 {
            let outcome = if i % 2 == 0 { TradeOutcome::Win } else { TradeOutcome::Loss };
            doc.apply(outcome, 1.0);
        }
        assert_eq!(doc.history.len(), REWARD_HISTORY_CAP);
        // The retained entries are chronologically the last 100: after 150
        // applications the first retained running total matches entry #51.
        assert_eq!(doc.wins, 75);
        assert_eq!(doc.losses, 75);
        let last = doc.history.last().unwrap();
        assert_eq!(last.total_score, doc.total_score);
    }

    #[test]
    fn test_win_then_loss_scenario() {
        let mut doc = RewardDocument::default();
        doc.apply(TradeOutcome::Win, 50.0);
        doc.apply(TradeOutcome::Loss, -20.0);
        assert_eq!(doc.total_score, -400);
        assert_eq!(doc.wins, 1);
        assert_eq!(doc.losses, 1);
        assert_eq!(doc.history.len(), 2);
        assert_eq!(doc.history[0].result, TradeOutcome::Win);
        assert_eq!(doc.history[1].result, TradeOutcome::Loss);
    }

    #[test]
    fn test_status_bands_inclusive_lower_bounds() {
        assert_eq!(ConceptStatus::from_score(70.0), ConceptStatus::Validated);
        assert_eq!(ConceptStatus::from_score(69.9), ConceptStatus::NeedsImprovement);
        assert_eq!(ConceptStatus::from_score(50.0), ConceptStatus::NeedsImprovement);
        assert_eq!(ConceptStatus::from_score(49.9), ConceptStatus::NotWorking);
    }
}
