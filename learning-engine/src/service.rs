//! Learning service facade
//!
//! `LearningService` owns the durable documents and exposes the operations
//! the surrounding orchestration layer calls: running a learning cycle,
//! compiling the current strategy, recording trade results, and applying
//! rewards. Every operation reloads the documents it needs from storage,
//! computes, and writes back in full — durable storage is the sole source of
//! truth between invocations.
//!
//! Single-writer discipline: each document has its own mutex and every
//! read-modify-write section holds the owning lock. When correlation needs
//! both the performance and validation documents it acquires them in that
//! order. The knowledge document is read without a lock where it is only
//! read, because saves are atomic renames and always expose a complete
//! version.

use crate::config::LearnerConfig;
use crate::connectors::{SourceSearch, TranscriptProvider};
use crate::correlator::{self, CorrelationOutcome, MIN_TRADE_SAMPLE};
use crate::extractor;
use crate::storage::{
    DocumentStore, KNOWLEDGE_FILE, PERFORMANCE_FILE, REWARDS_FILE, VALIDATION_FILE,
};
use crate::validator;
use anyhow::Result;
use chrono::Utc;
use common::{
    ConceptComparison, ConceptEntry, KnowledgeDocument, LedgerEntry, PerformanceDocument,
    RewardDocument, TradeOutcome, TradeRecord, ValidationDocument, VideoSource,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Trades between correlation runs triggered by trade results.
const CORRELATION_TRADE_STRIDE: usize = 5;

/// Summary returned by one learning cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSummary {
    pub new_sources: usize,
    pub total_sources: usize,
    pub concepts: Vec<String>,
    pub performance_validated: bool,
}

/// Outcome of analyzing one candidate source
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub source_id: String,
    pub concepts_found: Vec<String>,
    pub accepted: usize,
    pub conflicts: usize,
    pub transcript_length: usize,
    /// Sum of importance x source priority over found concepts
    pub source_score: f64,
}

/// One concept in the compiled strategy, ranked by importance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptSummary {
    pub name: String,
    pub learned_from: Vec<String>,
    pub best_explanations: Vec<String>,
    pub importance: f64,
    pub times_mentioned: usize,
    pub real_performance: Option<ConceptComparison>,
}

/// Read-only strategy snapshot compiled from current knowledge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    /// min(100, 5 x total sources + 15 x primary-channel sources)
    pub confidence: u32,
    pub concepts: Vec<ConceptSummary>,
    pub validated_by_performance: bool,
}

pub struct LearningService {
    config: LearnerConfig,
    store: DocumentStore,
    search: Arc<dyn SourceSearch>,
    transcripts: Arc<dyn TranscriptProvider>,
    knowledge_lock: Mutex<()>,
    performance_lock: Mutex<()>,
    validation_lock: Mutex<()>,
    reward_lock: Mutex<()>,
}

impl LearningService {
    pub fn new(
        config: LearnerConfig,
        store: DocumentStore,
        search: Arc<dyn SourceSearch>,
        transcripts: Arc<dyn TranscriptProvider>,
    ) -> Self {
        Self {
            config,
            store,
            search,
            transcripts,
            knowledge_lock: Mutex::new(()),
            performance_lock: Mutex::new(()),
            validation_lock: Mutex::new(()),
            reward_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Run one learning cycle: fetch candidates from the primary channel and
    /// a capped set of secondary terms, analyze each, correlate against
    /// realized performance when enough trades exist, and persist.
    pub async fn update_learning(&self) -> Result<LearningSummary> {
        let session = self.bump_session().await?;
        info!(session, "learning cycle started");

        let mut new_sources = 0usize;

        // Primary channel first: highest trust, highest priority weight.
        match self
            .search
            .search_channel(&self.config.primary_channel, self.config.primary_max_results)
            .await
        {
            Ok(videos) => {
                new_sources += self.analyze_batch(&videos).await;
            }
            Err(e) => warn!(
                channel = self.config.primary_channel.name.as_str(),
                "primary channel fetch failed: {e:#}"
            ),
        }

        // A few secondary terms per cycle, to bound external call volume.
        for term in self
            .config
            .search_terms
            .iter()
            .take(self.config.secondary_terms_per_cycle)
        {
            match self
                .search
                .search_query(
                    term,
                    self.config.secondary_priority,
                    self.config.secondary_max_results,
                )
                .await
            {
                Ok(videos) => {
                    new_sources += self.analyze_batch(&videos).await;
                }
                Err(e) => warn!(term = term.as_str(), "secondary search failed: {e:#}"),
            }
        }

        let performance_validated = self.run_correlation().await?;

        let knowledge: KnowledgeDocument = self.store.load(KNOWLEDGE_FILE).await?;
        let summary = LearningSummary {
            new_sources,
            total_sources: knowledge.total_sources(),
            concepts: knowledge.concepts.keys().cloned().collect(),
            performance_validated,
        };
        info!(
            new_sources = summary.new_sources,
            total_sources = summary.total_sources,
            concepts = summary.concepts.len(),
            "learning cycle finished"
        );
        Ok(summary)
    }

    /// Analyze a batch of candidates sequentially with the configured
    /// inter-call delay. Per-source failures are logged and skipped.
    async fn analyze_batch(&self, videos: &[VideoSource]) -> usize {
        let mut analyzed = 0;
        for video in videos {
            match self.analyze_source(video).await {
                Ok(Some(report)) => {
                    analyzed += 1;
                    info!(
                        source = video.title.as_str(),
                        accepted = report.accepted,
                        conflicts = report.conflicts,
                        score = report.source_score,
                        "source analyzed"
                    );
                }
                Ok(None) => {}
                Err(e) => error!(source = video.id.as_str(), "source analysis failed: {e:#}"),
            }
            self.throttle().await;
        }
        analyzed
    }

    /// Analyze one candidate source: dedup check, transcript fetch, concept
    /// extraction, per-concept validation, merge of compatible findings.
    /// Returns `None` when the source was already processed or has no
    /// transcript (normal skips).
    pub async fn analyze_source(&self, source: &VideoSource) -> Result<Option<AnalysisReport>> {
        let _guard = self.knowledge_lock.lock().await;
        let mut knowledge: KnowledgeDocument = self.store.load(KNOWLEDGE_FILE).await?;

        // Cheap dedup gate before any external fetch.
        if knowledge.is_processed(&source.id) {
            debug!(source = source.id.as_str(), "already analyzed, skipping");
            return Ok(None);
        }

        let transcript = match self.transcripts.fetch(&source.id).await? {
            Some(text) => text,
            None => {
                // No captions is a normal skip; the source stays eligible
                // for a later cycle in case captions appear.
                info!(source = source.id.as_str(), "no transcript available");
                return Ok(None);
            }
        };

        let hits = extractor::extract(&transcript, source);
        let mut accepted = 0usize;
        let mut conflicts = 0usize;
        let mut source_score = 0.0;

        for (concept, hit) in &hits {
            source_score += hit.importance * source.priority;
            let verdict = validator::validate(concept, hit, &knowledge);
            if verdict.compatible {
                debug!(concept = concept.as_str(), reason = verdict.reason.as_str(), "accepted");
                knowledge.push_entry(
                    concept,
                    ConceptEntry {
                        video: source.title.clone(),
                        channel: source.channel.clone(),
                        url: source.url.clone(),
                        priority: source.priority,
                        count: hit.count,
                        importance: hit.importance,
                        contexts: hit.contexts.clone(),
                        timestamp: Utc::now(),
                        validation: verdict,
                    },
                );
                accepted += 1;
            } else {
                // Conflicting evidence is reported but never merged.
                warn!(
                    concept = concept.as_str(),
                    reason = verdict.reason.as_str(),
                    "conflict detected, withheld from knowledge base"
                );
                conflicts += 1;
            }
        }

        // Processed regardless of how many concepts were accepted.
        knowledge.mark_processed(&source.id);
        knowledge.last_update = Some(Utc::now());
        self.store.save(KNOWLEDGE_FILE, &knowledge).await?;

        Ok(Some(AnalysisReport {
            source_id: source.id.clone(),
            concepts_found: hits.keys().cloned().collect(),
            accepted,
            conflicts,
            transcript_length: transcript.len(),
            source_score,
        }))
    }

    /// Compile a ranked strategy snapshot from current knowledge. Read-only.
    pub async fn get_strategy(&self) -> Result<StrategyReport> {
        let knowledge: KnowledgeDocument = self.store.load(KNOWLEDGE_FILE).await?;
        let performance: PerformanceDocument = self.store.load(PERFORMANCE_FILE).await?;
        let validation: ValidationDocument = self.store.load(VALIDATION_FILE).await?;
        let latest = validation.latest();

        let mut concepts = Vec::new();
        let mut primary_sources: HashSet<&str> = HashSet::new();

        for (name, entries) in &knowledge.concepts {
            if entries.is_empty() {
                continue;
            }

            for entry in entries {
                if entry.priority >= self.config.primary_channel.weight {
                    primary_sources.insert(entry.video.as_str());
                }
            }

            let mut ranked: Vec<&ConceptEntry> = entries.iter().collect();
            ranked.sort_by(|a, b| {
                (b.priority * b.importance)
                    .partial_cmp(&(a.priority * a.importance))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let best_explanations = ranked
                .iter()
                .take(3)
                .flat_map(|e| e.contexts.iter().take(2).cloned())
                .take(5)
                .collect();

            concepts.push(ConceptSummary {
                name: name.clone(),
                learned_from: ranked.iter().take(3).map(|e| e.channel.clone()).collect(),
                best_explanations,
                importance: ranked[0].importance,
                times_mentioned: entries.iter().map(|e| e.count).sum(),
                real_performance: latest.and_then(|s| s.comparison.get(name).cloned()),
            });
        }

        concepts.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        let confidence =
            (5 * knowledge.total_sources() + 15 * primary_sources.len()).min(100) as u32;

        Ok(StrategyReport {
            confidence,
            concepts,
            validated_by_performance: performance.total_trades() >= MIN_TRADE_SAMPLE,
        })
    }

    /// Record a concluded trade: append, recompute the win rate, persist.
    /// Every fifth trade once the minimum sample is reached also re-runs
    /// the correlator.
    pub async fn add_trade_result(&self, trade: TradeRecord) -> Result<()> {
        let _guard = self.performance_lock.lock().await;
        let mut performance: PerformanceDocument = self.store.load(PERFORMANCE_FILE).await?;
        performance.record_trade(trade);
        self.store.save(PERFORMANCE_FILE, &performance).await?;

        let total = performance.total_trades();
        info!(total, win_rate = performance.win_rate, "trade recorded");

        if total >= MIN_TRADE_SAMPLE && total % CORRELATION_TRADE_STRIDE == 0 {
            self.correlate_and_append(&performance).await?;
        }
        Ok(())
    }

    /// Apply a reward or punishment and persist before returning.
    /// Durable-on-return: callers may rely on the entry surviving a crash.
    pub async fn apply_reward(&self, result: TradeOutcome, profit: f64) -> Result<LedgerEntry> {
        let _guard = self.reward_lock.lock().await;
        let mut rewards: RewardDocument = self.store.load(REWARDS_FILE).await?;
        let entry = rewards.apply(result, profit);
        self.store.save(REWARDS_FILE, &rewards).await?;
        info!(
            total_score = rewards.total_score,
            wins = rewards.wins,
            losses = rewards.losses,
            "{}",
            entry.message
        );
        Ok(entry)
    }

    /// Current reward counters (score, wins, losses, sessions).
    pub async fn reward_state(&self) -> Result<RewardDocument> {
        let _guard = self.reward_lock.lock().await;
        self.store.load(REWARDS_FILE).await
    }

    /// Correlate during a cycle. Returns whether the performance sample was
    /// large enough to validate against.
    async fn run_correlation(&self) -> Result<bool> {
        let _guard = self.performance_lock.lock().await;
        let performance: PerformanceDocument = self.store.load(PERFORMANCE_FILE).await?;
        if performance.total_trades() < MIN_TRADE_SAMPLE {
            info!(
                trades = performance.total_trades(),
                "insufficient trade sample, skipping correlation"
            );
            return Ok(false);
        }
        self.correlate_and_append(&performance).await?;
        Ok(true)
    }

    /// Run the correlator and append the snapshot. Caller holds the
    /// performance lock; the validation lock is acquired second (fixed
    /// order, see module docs).
    async fn correlate_and_append(&self, performance: &PerformanceDocument) -> Result<()> {
        let knowledge: KnowledgeDocument = self.store.load(KNOWLEDGE_FILE).await?;
        match correlator::correlate(performance, &knowledge) {
            CorrelationOutcome::Snapshot(snapshot) => {
                let _guard = self.validation_lock.lock().await;
                let mut validation: ValidationDocument = self.store.load(VALIDATION_FILE).await?;
                info!(
                    concepts = snapshot.comparison.len(),
                    total_trades = snapshot.total_trades,
                    overall_win_rate = snapshot.overall_win_rate,
                    "validation snapshot appended"
                );
                validation.append(snapshot);
                self.store.save(VALIDATION_FILE, &validation).await?;
            }
            CorrelationOutcome::InsufficientSample { trades } => {
                info!(trades, "insufficient trade sample, skipping correlation");
            }
        }
        Ok(())
    }

    async fn bump_session(&self) -> Result<u64> {
        let _guard = self.reward_lock.lock().await;
        let mut rewards: RewardDocument = self.store.load(REWARDS_FILE).await?;
        rewards.sessions += 1;
        self.store.save(REWARDS_FILE, &rewards).await?;
        Ok(rewards.sessions)
    }

    async fn throttle(&self) {
        if self.config.fetch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.fetch_delay_ms)).await;
        }
    }
}
