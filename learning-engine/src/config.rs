//! Learner configuration
//!
//! A plain config struct with sensible defaults plus environment overrides.
//! The YouTube API key is optional: without it, source search degrades to an
//! empty result set instead of failing.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A prioritized channel to learn from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub channel_id: String,
    /// Query used to filter the channel's uploads for relevant content
    pub query: String,
    /// Trust/relevance weight attached to every source from this channel
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Directory holding the four durable JSON documents
    pub data_dir: PathBuf,
    /// YouTube Data API key; None degrades search to a no-op
    pub api_key: Option<String>,
    /// Nominal seconds between learning cycles
    pub cycle_interval_secs: u64,
    /// Due-ness poll granularity in seconds (coarse, not a precise timer)
    pub poll_interval_secs: u64,
    /// Delay between external calls within a cycle, for rate limits
    pub fetch_delay_ms: u64,
    /// Primary learning source, fetched first each cycle
    pub primary_channel: ChannelSpec,
    pub primary_max_results: usize,
    /// Secondary free-text search terms; only the first few run per cycle
    pub search_terms: Vec<String>,
    pub secondary_terms_per_cycle: usize,
    pub secondary_max_results: usize,
    pub secondary_priority: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_key: None,
            cycle_interval_secs: 3600,
            poll_interval_secs: 60,
            fetch_delay_ms: 2000,
            primary_channel: ChannelSpec {
                name: "Novo Legacy".to_string(),
                channel_id: "UCuHf0qp6kVqVGfPQHq_KJJQ".to_string(),
                query: "CRT one candle".to_string(),
                weight: 10.0,
            },
            primary_max_results: 10,
            search_terms: vec![
                "one candle strategy".to_string(),
                "CRT trading".to_string(),
                "previous candle close PCC".to_string(),
                "candle manipulation trading".to_string(),
                "turtle soup trading".to_string(),
                "4 hour candle strategy".to_string(),
                "candle range theory".to_string(),
                "premium discount zones".to_string(),
                "liquidity sweep trading".to_string(),
            ],
            secondary_terms_per_cycle: 3,
            secondary_max_results: 2,
            secondary_priority: 5.0,
        }
    }
}

impl LearnerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("LEARNER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(key) = std::env::var("YOUTUBE_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(secs) = std::env::var("LEARNER_CYCLE_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.cycle_interval_secs = secs;
            }
        }
        if let Ok(secs) = std::env::var("LEARNER_POLL_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.poll_interval_secs = secs;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LearnerConfig::default();
        assert_eq!(config.cycle_interval_secs, 3600);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.primary_channel.weight, 10.0);
        assert_eq!(config.secondary_terms_per_cycle, 3);
        assert_eq!(config.search_terms.len(), 9);
        assert!(config.api_key.is_none());
    }
}
