//! Lyrics lookup against LRCLIB.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::models::Track;

const LRCLIB_GET: &str = "https://lrclib.net/api/get";

/// Leading "[mm:ss.xx]" stamps of synced lyrics lines
static LRC_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\[\d{1,3}:\d{2}(?:[.:]\d{1,3})?\]\s*)+").unwrap());

pub trait LyricsProvider: Send + Sync {
    /// Lyrics of `track`, empty when none are known.
    fn search(&self, track: &Track) -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibRecord {
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
    #[serde(default)]
    instrumental: bool,
}

/// Synced lyrics with the timestamps removed
pub fn strip_timestamps(synced: &str) -> String {
    synced
        .lines()
        .map(|line| LRC_TIMESTAMP.replace(line, "").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn pick(record: LrclibRecord) -> String {
    if record.instrumental {
        return String::new();
    }
    match (record.plain_lyrics, record.synced_lyrics) {
        (Some(plain), _) if !plain.trim().is_empty() => plain.trim().to_string(),
        (_, Some(synced)) => strip_timestamps(&synced),
        _ => String::new(),
    }
}

pub struct Lrclib {
    http_client: ureq::Agent,
}

impl Default for Lrclib {
    fn default() -> Self {
        Self::new()
    }
}

impl Lrclib {
    pub fn new() -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .user_agent(concat!("tracksync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { http_client }
    }

    fn url(track: &Track) -> String {
        format!(
            "{}?artist_name={}&track_name={}&album_name={}&duration={}",
            LRCLIB_GET,
            urlencoding::encode(track.primary_artist()),
            urlencoding::encode(&track.title),
            urlencoding::encode(&track.album),
            track.duration
        )
    }
}

impl LyricsProvider for Lrclib {
    fn search(&self, track: &Track) -> Result<String> {
        let url = Self::url(track);
        log::debug!("lyrics: GET {}", url);
        let record: LrclibRecord = match self.http_client.get(&url).call() {
            Ok(response) => response
                .into_json()
                .map_err(|err| SyncError::Lyrics(format!("cannot parse lyrics: {}", err)))?,
            Err(ureq::Error::Status(404, _)) => return Ok(String::new()),
            Err(err) => return Err(SyncError::Lyrics(err.to_string())),
        };
        Ok(pick(record))
    }
}
