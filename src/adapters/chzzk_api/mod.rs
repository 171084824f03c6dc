//! Chzzk replay resolution adapter
//!
//! Looks up video metadata on the Chzzk service API, obtains the playback
//! description (embedded for live rewinds, otherwise from the neonplayer
//! playback API) and picks the first HLS playlist in it.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

const API_VERSIONS: [&str; 2] = ["v3", "v2"];

/// HTTP settings for the platform API and the media fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub referer: String,
    pub timeout_secs: u64,
    pub api_base: String,
    pub playback_base: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
            referer: "https://chzzk.naver.com/".to_string(),
            timeout_secs: 10,
            api_base: "https://api.chzzk.naver.com/service".to_string(),
            playback_base: "https://apis.naver.com/neonplayer/vodplay/v2/playback".to_string(),
        }
    }
}

/// Chzzk API adapter
pub struct ChzzkApiAdapter {
    client: Client,
    config: HttpConfig,
}

impl ChzzkApiAdapter {
    pub fn new(config: HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch the metadata object, trying each API version in order
    async fn fetch_metadata(&self, video_id: &str) -> Result<Value, DomainError> {
        let mut not_found = 0;
        let mut last_error = String::new();

        for version in API_VERSIONS {
            let url = format!("{}/{}/videos/{}", self.config.api_base, version, video_id);
            debug!(url = %url, "Requesting video metadata");

            let response = match self
                .client
                .get(&url)
                .header("Referer", &self.config.referer)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(version, error = %e, "Metadata request failed");
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                not_found += 1;
                last_error = format!("{} returned 404", version);
                continue;
            }
            if !status.is_success() {
                warn!(version, %status, "Metadata request rejected");
                last_error = format!("{} returned {}", version, status);
                continue;
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| DomainError::unavailable(video_id, format!("Malformed metadata: {}", e)))?;
            return match body.get("content") {
                Some(Value::Null) => Err(DomainError::VideoNotFound {
                    video_id: video_id.to_string(),
                }),
                Some(content) => Ok(content.clone()),
                None => Ok(body),
            };
        }

        if not_found == API_VERSIONS.len() {
            return Err(DomainError::VideoNotFound {
                video_id: video_id.to_string(),
            });
        }
        Err(DomainError::unavailable(
            video_id,
            format!("Metadata request failed: {}", last_error),
        ))
    }

    /// Playback description: embedded live-rewind JSON or the neonplayer API
    async fn fetch_playback(&self, video_id: &str, meta: &Value) -> Result<Value, DomainError> {
        if let Some(Value::String(embedded)) = meta.get("liveRewindPlaybackJson") {
            if !embedded.is_empty() {
                debug!("Using embedded live rewind playback");
                return serde_json::from_str(embedded).map_err(|e| {
                    DomainError::unavailable(video_id, format!("Malformed liveRewindPlaybackJson: {}", e))
                });
            }
        }

        let in_key = lookup_string(meta, &["inKey", "inkey"])
            .ok_or_else(|| DomainError::unavailable(video_id, "No inKey in metadata"))?;
        let playback_id = lookup_string(meta, &["videoId", "id"])
            .ok_or_else(|| DomainError::unavailable(video_id, "No videoId in metadata"))?;

        let url = format!("{}/{}", self.config.playback_base, playback_id);
        debug!(url = %url, "Requesting playback description");

        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.referer)
            .query(&[
                ("key", in_key.as_str()),
                ("env", "real"),
                ("lc", "ko"),
                ("cpl", "ko"),
                ("sid", "2099"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::unavailable(video_id, format!("Playback request failed: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| DomainError::unavailable(video_id, format!("Malformed playback description: {}", e)))
    }
}

#[async_trait]
impl ResolvePort for ChzzkApiAdapter {
    async fn resolve(&self, video_id: &str) -> Result<MediaLocator, DomainError> {
        let meta = self.fetch_metadata(video_id).await?;

        let title = video_title(&meta, video_id);
        let total = meta
            .get("duration")
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| DomainError::unavailable(video_id, "Metadata has no duration"))?;

        let playback = self.fetch_playback(video_id, &meta).await?;
        let media_url = collect_m3u8_urls(&playback)
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::unavailable(video_id, "No HLS playlist in playback description"))?;

        info!(video_id, title = %title, total_duration = total, "Resolved video");
        debug!(media_url = %media_url, "Media source");

        Ok(MediaLocator::new(media_url, title, total)
            .with_header("User-Agent", &self.config.user_agent)
            .with_header("Referer", &self.config.referer))
    }
}

/// Title from `videoTitle`, then `title`, then the id
pub fn video_title(meta: &Value, video_id: &str) -> String {
    ["videoTitle", "title"]
        .iter()
        .filter_map(|key| meta.get(*key).and_then(Value::as_str))
        .find(|t| !t.trim().is_empty())
        .unwrap_or(video_id)
        .to_string()
}

/// First depth-first occurrence of `key` in nested objects and arrays
pub fn find_first_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key).filter(|v| !v.is_null()) {
                return Some(found);
            }
            map.values().find_map(|v| find_first_key(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_first_key(v, key)),
        _ => None,
    }
}

/// Top-level lookup over `keys`, then a recursive search for the first one
fn lookup_string(meta: &Value, keys: &[&str]) -> Option<String> {
    let as_text = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    keys.iter()
        .filter_map(|k| meta.get(*k))
        .find_map(as_text)
        .or_else(|| keys.first().and_then(|k| find_first_key(meta, k)).and_then(as_text))
}

/// Every string containing `.m3u8`, depth-first
pub fn collect_m3u8_urls(value: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    collect_into(value, &mut urls);
    urls
}

fn collect_into(value: &Value, urls: &mut Vec<String>) {
    match value {
        Value::Object(map) => map.values().for_each(|v| collect_into(v, urls)),
        Value::Array(items) => items.iter().for_each(|v| collect_into(v, urls)),
        Value::String(s) if s.contains(".m3u8") => urls.push(s.clone()),
        _ => {}
    }
}
