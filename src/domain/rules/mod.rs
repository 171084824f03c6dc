// Domain rules - URL parsing and window resolution policies

use tracing::{debug, warn};
use url::Url;

use crate::domain::errors::DomainError;
use crate::domain::model::*;

/// Host serving replay pages
pub const PLATFORM_HOST: &str = "chzzk.naver.com";

/// Query parameter carrying the playback position
pub const TIMESTAMP_PARAM: &str = "currentTime";

/// Parser for replay URLs of the form `https://chzzk.naver.com/video/<id>?currentTime=<secs>`
pub struct UrlParser;

impl UrlParser {
    /// Extract the video identifier and optional embedded timestamp
    pub fn parse(raw_url: &str) -> Result<SourceReference, DomainError> {
        let url = Self::parse_url(raw_url)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DomainError::invalid_url(
                raw_url,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let host_matches = host == PLATFORM_HOST || host.ends_with(&format!(".{}", PLATFORM_HOST));
        if !host_matches {
            return Err(DomainError::invalid_url(
                raw_url,
                format!("host '{}' is not {}", host, PLATFORM_HOST),
            ));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let video_id = match segments.as_slice() {
            ["video", id] => *id,
            ["video"] => {
                return Err(DomainError::invalid_url(raw_url, "missing video identifier"))
            }
            _ => {
                return Err(DomainError::invalid_url(
                    raw_url,
                    "expected a /video/<id> path",
                ))
            }
        };

        if !video_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::invalid_url(
                raw_url,
                format!("malformed video identifier '{}'", video_id),
            ));
        }

        let embedded_timestamp = Self::parse_timestamp(raw_url, &url)?;
        debug!(video_id, ?embedded_timestamp, "Parsed source URL");

        Ok(SourceReference {
            raw_url: raw_url.to_string(),
            video_id: video_id.to_string(),
            embedded_timestamp,
        })
    }

    /// Return the URL with the timestamp parameter removed
    pub fn strip_timestamp(raw_url: &str) -> Result<String, DomainError> {
        let mut url = Self::parse_url(raw_url)?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != TIMESTAMP_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        Ok(url.to_string())
    }

    fn parse_url(raw_url: &str) -> Result<Url, DomainError> {
        let trimmed = raw_url.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_url(raw_url, "empty URL"));
        }
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };
        Url::parse(&candidate).map_err(|e| DomainError::invalid_url(raw_url, e.to_string()))
    }

    fn parse_timestamp(raw_url: &str, url: &Url) -> Result<Option<f64>, DomainError> {
        let value = url
            .query_pairs()
            .find(|(key, value)| key == TIMESTAMP_PARAM && !value.is_empty())
            .map(|(_, value)| value.into_owned());

        let Some(value) = value else {
            return Ok(None);
        };

        match value.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(Some(seconds)),
            _ => Err(DomainError::invalid_url(
                raw_url,
                format!("{} '{}' is not a non-negative number", TIMESTAMP_PARAM, value),
            )),
        }
    }
}

/// Combines explicit and embedded start times with the source duration
pub struct WindowResolver;

impl WindowResolver {
    /// Reject a malformed duration or explicit start before any lookup
    pub fn check_inputs(explicit_start: Option<f64>, duration: f64) -> Result<(), DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::InvalidWindow(format!(
                "duration must be greater than zero (got {})",
                duration
            )));
        }
        match explicit_start {
            Some(start) if !start.is_finite() || start < 0.0 => Err(DomainError::InvalidWindow(
                format!("start must be a non-negative number (got {})", start),
            )),
            _ => Ok(()),
        }
    }

    /// Resolve the extraction window
    ///
    /// Start precedence is explicit start, then the URL timestamp, then zero.
    /// A window running past the end of the video is shortened and reported
    /// through [`WindowNote::Clamped`] instead of failing.
    pub fn resolve(
        explicit_start: Option<f64>,
        duration: f64,
        source: &SourceReference,
        locator: &MediaLocator,
    ) -> Result<ResolvedWindow, DomainError> {
        Self::check_inputs(explicit_start, duration)?;

        if let (Some(start), Some(embedded)) = (explicit_start, source.embedded_timestamp) {
            warn!(
                explicit = start,
                embedded, "Explicit start overrides the timestamp embedded in the URL"
            );
        }

        let start = explicit_start
            .or(source.embedded_timestamp)
            .unwrap_or(0.0);
        let total = locator.total_duration_seconds;

        if start >= total {
            return Err(DomainError::WindowOutOfRange { start, total });
        }

        let available = total - start;
        if duration > available {
            let note = WindowNote::Clamped {
                requested_duration: duration,
                granted_duration: available,
            };
            debug!(%note, "Window clamped to the end of the video");
            return Ok(ResolvedWindow {
                window: ExtractionWindow::new(start, available),
                note: Some(note),
            });
        }

        Ok(ResolvedWindow {
            window: ExtractionWindow::new(start, duration),
            note: None,
        })
    }
}
