//! YouTube search through `yt-dlp`.
//!
//! Results are scored by popularity, textual closeness of "owner title" to the query
//! and closeness of duration to the track's.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::AssetProvider;
use crate::error::{Result, SyncError};
use crate::models::{sort_matches, Match, Track};
use crate::normalize::unique_fields;

const TITLE_SCORE_MULTIPLIER: f64 = 1.5;
const DURATION_SCORE_MULTIPLIER: f64 = 2.0;
const VIEWS_SCORE_MULTIPLIER: f64 = 0.000_001;

/// One line of `yt-dlp --dump-json --flat-playlist` output
#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<String>,
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    view_count: Option<u64>,
    duration: Option<f64>,
}

impl SearchEntry {
    fn owner(&self) -> Option<&str> {
        self.channel.as_deref().or(self.uploader.as_deref())
    }
}

pub fn query(track: &Track) -> String {
    let mut parts = vec![track.title.as_str()];
    parts.extend(track.artists.iter().map(String::as_str));
    parts.join(" ")
}

/// Score of a result titled `title`, published by `owner`, against `query`.
pub fn score(query: &str, track: &Track, owner: &str, title: &str, views: u64, length: u32) -> i64 {
    let distance = strsim::levenshtein(
        &unique_fields(query),
        &unique_fields(&format!("{} {}", owner, title)),
    );
    let title_score = (distance as f64 * TITLE_SCORE_MULTIPLIER) as i64;
    let duration_score =
        ((length as f64 - track.duration as f64).abs() * DURATION_SCORE_MULTIPLIER) as i64;
    let views_score = (views as f64 * VIEWS_SCORE_MULTIPLIER) as i64;
    views_score - title_score - duration_score
}

/// Parses JSON lines into scored matches. Entries lacking id, title or owner are skipped.
fn parse_results(output: &str, track: &Track) -> Vec<Match> {
    let query = query(track);
    let mut matches: Vec<Match> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<SearchEntry>(line) {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!("provider: unparsable result: {}", err);
                None
            }
        })
        .filter_map(|entry| {
            let id = entry.id.as_deref().filter(|id| !id.is_empty())?;
            let title = entry.title.as_deref().filter(|title| !title.is_empty())?;
            let owner = entry.owner().filter(|owner| !owner.is_empty())?;
            let length = entry.duration.unwrap_or(0.0).round() as u32;
            Some(Match {
                url: format!("https://youtu.be/{}", id),
                score: score(&query, track, owner, title, entry.view_count.unwrap_or(0), length),
            })
        })
        .collect();
    sort_matches(&mut matches);
    matches
}

pub struct YouTube {
    ytdlp_path: PathBuf,
    results: usize,
}

impl YouTube {
    pub fn new(ytdlp_path: impl Into<PathBuf>, results: usize) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            results: results.max(1),
        }
    }
}

impl AssetProvider for YouTube {
    fn search(&self, track: &Track) -> Result<Vec<Match>> {
        let search = format!("ytsearch{}:{}", self.results, query(track));
        log::debug!("provider: {} {}", self.ytdlp_path.display(), search);

        let output = Command::new(&self.ytdlp_path)
            .args(["--dump-json", "--flat-playlist", "--no-warnings", &search])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                SyncError::Provider(format!("cannot run {}: {}", self.ytdlp_path.display(), err))
            })?;

        if !output.status.success() {
            return Err(SyncError::Provider(format!(
                "yt-dlp search failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let matches = parse_results(&String::from_utf8_lossy(&output.stdout), track);
        log::debug!("provider: {} results for {}", matches.len(), track.title);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track {
            id: "123".to_string(),
            title: "Hello".to_string(),
            artists: vec!["Adele".to_string()],
            duration: 295,
            ..Track::default()
        }
    }

    #[test]
    fn test_query_joins_title_and_artists() {
        let mut t = track();
        t.artists.push("Guest".to_string());
        assert_eq!(query(&t), "Hello Adele Guest");
    }

    #[test]
    fn test_score_components() {
        let t = track();
        // identical words, same length, 3M views
        assert_eq!(score("Adele Hello", &t, "Adele", "Hello", 3_000_000, 295), 3);
        // one edit truncates to 1 point, 5s off costs 10
        assert_eq!(score("Adele Hello", &t, "Adele", "Hellx", 0, 300), -11);
    }

    #[test]
    fn test_parse_results_sorted_and_filtered() {
        let output = r#"
{"id": "a", "title": "Hello", "channel": "Adele", "view_count": 1000000, "duration": 295.0}
{"id": "b", "title": "Hello (cover)", "channel": "Someone", "view_count": 10, "duration": 240.0}
{"id": "c", "title": "Hello", "uploader": "Adele", "view_count": 5000000, "duration": 295.0}
{"id": "", "title": "No id", "channel": "x"}
{"id": "d", "title": "No owner"}
not json
"#;
        let matches = parse_results(output, &track());
        let urls: Vec<_> = matches.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(urls[0], "https://youtu.be/c");
        assert_eq!(urls[1], "https://youtu.be/a");
        assert_eq!(urls.len(), 3);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_parse_results_empty_output() {
        assert!(parse_results("", &track()).is_empty());
    }
}
