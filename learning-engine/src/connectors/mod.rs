//! External source collaborators
//!
//! The learning loop consumes two external seams: a source-search provider
//! returning candidate videos and a transcript provider returning full text
//! (or nothing, which is a normal skip). Both are traits so tests can supply
//! in-memory implementations.

pub mod youtube;

use crate::config::ChannelSpec;
use anyhow::Result;
use async_trait::async_trait;
use common::VideoSource;

pub use youtube::{YouTubeSearch, YouTubeTranscripts};

/// Candidate-source search provider
#[async_trait]
pub trait SourceSearch: Send + Sync {
    /// Search a specific channel's uploads. A missing credential must
    /// degrade to an empty result set, never a fatal error.
    async fn search_channel(&self, channel: &ChannelSpec, max_results: usize) -> Result<Vec<VideoSource>>;

    /// Free-text search across all channels.
    async fn search_query(&self, query: &str, priority: f64, max_results: usize) -> Result<Vec<VideoSource>>;
}

/// Transcript provider. `Ok(None)` means no transcript exists in any
/// accepted language; the caller skips the source without error.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch(&self, video_id: &str) -> Result<Option<String>>;
}
