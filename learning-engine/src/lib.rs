//! CRT Continuous-Learning Engine
//!
//! This crate implements the learning feedback loop around the trading
//! system:
//! - Concept extraction from video transcripts (pattern table)
//! - Knowledge base merge with similarity-based conflict detection
//! - Theory-vs-practice correlation against realized trade outcomes
//! - Asymmetric reward/punishment ledger (+100 per win, -500 per loss)
//! - Hourly scheduler driving the whole loop with per-cycle failure isolation
//!
//! The model layer (sequence model, boosted trees) and the HTTP transport
//! are external collaborators; this crate only orchestrates state.

pub mod config;
pub mod connectors;
pub mod correlator;
pub mod extractor;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod validator;

// Re-export commonly used types
pub use config::{ChannelSpec, LearnerConfig};
pub use connectors::{SourceSearch, TranscriptProvider, YouTubeSearch, YouTubeTranscripts};
pub use correlator::{correlate, CorrelationOutcome, MIN_TRADE_SAMPLE};
pub use scheduler::{FinalCounters, Scheduler, SchedulerPhase};
pub use service::{AnalysisReport, ConceptSummary, LearningService, LearningSummary, StrategyReport};
pub use storage::DocumentStore;

// Re-export shared domain types for convenience
pub use common::{
    KnowledgeDocument, LedgerEntry, PerformanceDocument, RewardDocument, TradeOutcome,
    TradeRecord, ValidationDocument, VideoSource,
};
