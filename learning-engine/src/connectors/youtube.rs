//! YouTube connectors
//!
//! Search goes through the Data API v3 search endpoint; transcripts come
//! from the timedtext endpoint, preferring English captions and falling back
//! to Portuguese then the Brazilian regional variant. Absence of captions is
//! a normal skip, not an error.

use super::{SourceSearch, TranscriptProvider};
use crate::config::ChannelSpec;
use anyhow::Result;
use async_trait::async_trait;
use common::VideoSource;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

const SEARCH_API_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

/// Caption languages tried in order of preference.
const TRANSCRIPT_LANGUAGES: [&str; 3] = ["en", "pt", "pt-BR"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
}

/// Source search backed by the YouTube Data API
pub struct YouTubeSearch {
    api_key: Option<String>,
    api_url: String,
    client: Client,
}

impl YouTubeSearch {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("no YouTube API key configured, source search will return nothing");
        }
        Self {
            api_key,
            api_url: SEARCH_API_URL.to_string(),
            client: Client::new(),
        }
    }

    async fn search(
        &self,
        params: &[(&str, &str)],
        priority: f64,
        max_results: usize,
    ) -> Result<Vec<VideoSource>> {
        let key = match &self.api_key {
            Some(key) => key.clone(),
            None => {
                warn!("search skipped: missing API key");
                return Ok(Vec::new());
            }
        };

        let max = max_results.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("order", "relevance"),
                ("maxResults", max.as_str()),
                ("key", key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("YouTube search error: {}", response.status()));
        }

        let body: SearchResponse = response.json().await?;
        let sources = body
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(VideoSource {
                    url: format!("https://www.youtube.com/watch?v={}", video_id),
                    id: video_id,
                    title: item.snippet.title,
                    description: item.snippet.description,
                    channel: item.snippet.channel_title,
                    priority,
                })
            })
            .collect::<Vec<_>>();

        info!("found {} candidate sources", sources.len());
        Ok(sources)
    }
}

#[async_trait]
impl SourceSearch for YouTubeSearch {
    async fn search_channel(&self, channel: &ChannelSpec, max_results: usize) -> Result<Vec<VideoSource>> {
        self.search(
            &[
                ("channelId", channel.channel_id.as_str()),
                ("q", channel.query.as_str()),
            ],
            channel.weight,
            max_results,
        )
        .await
    }

    async fn search_query(&self, query: &str, priority: f64, max_results: usize) -> Result<Vec<VideoSource>> {
        self.search(&[("q", query)], priority, max_results).await
    }
}

/// Transcript fetcher backed by the YouTube timedtext endpoint
pub struct YouTubeTranscripts {
    api_url: String,
    client: Client,
}

impl YouTubeTranscripts {
    pub fn new() -> Self {
        Self {
            api_url: TIMEDTEXT_URL.to_string(),
            client: Client::new(),
        }
    }
}

impl Default for YouTubeTranscripts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptProvider for YouTubeTranscripts {
    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        for lang in TRANSCRIPT_LANGUAGES {
            let response = self
                .client
                .get(&self.api_url)
                .query(&[("v", video_id), ("lang", lang)])
                .send()
                .await?;

            if !response.status().is_success() {
                continue;
            }
            let body = response.text().await?;
            if body.trim().is_empty() {
                // No captions in this language, try the next one.
                continue;
            }

            debug!(video_id, lang, "transcript found");
            return Ok(Some(flatten_timedtext(&body)));
        }

        Ok(None)
    }
}

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Reduce timedtext XML to plain transcript text: strip markup, decode the
/// handful of entities the endpoint emits, and collapse whitespace.
fn flatten_timedtext(xml: &str) -> String {
    let stripped = TAG.replace_all(xml, " ");
    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE.replace_all(decoded.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_timedtext() {
        let xml = r#"<?xml version="1.0"?><transcript>
            <text start="0" dur="2.4">watch the previous candle close</text>
            <text start="2.4" dur="3.1">it&#39;s the 4h range &amp; the wick</text>
        </transcript>"#;
        let text = flatten_timedtext(xml);
        assert_eq!(
            text,
            "watch the previous candle close it's the 4h range & the wick"
        );
    }

    #[tokio::test]
    async fn test_search_without_key_degrades_to_empty() {
        let search = YouTubeSearch::new(None);
        let channel = ChannelSpec {
            name: "Novo Legacy".to_string(),
            channel_id: "UC123".to_string(),
            query: "CRT".to_string(),
            weight: 10.0,
        };
        let sources = search.search_channel(&channel, 10).await.unwrap();
        assert!(sources.is_empty());

        let sources = search.search_query("CRT trading", 5.0, 2).await.unwrap();
        assert!(sources.is_empty());
    }
}
