//! Core data models for catalog synchronization.
//!
//! Tracks, collections and search matches flowing through the pipeline, plus the
//! canonical naming scheme derived from track metadata.

use std::path::{Path, PathBuf};

use crate::normalize::{legalize_filename, slugify};

// ============================================================================
// Constants
// ============================================================================

pub const TRACK_FORMAT: &str = "mp3";
pub const ARTWORK_FORMAT: &str = "jpg";
pub const LYRICS_FORMAT: &str = "txt";

// ============================================================================
// Catalog Models
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Artwork {
    pub url: String,
    pub data: Option<Vec<u8>>,
}

/// Remote track as described by the catalog
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>, // credited order, first is primary
    pub album: String,
    pub artwork: Artwork,
    pub duration: u32, // seconds
    pub lyrics: String,
    pub number: u32, // position within the album
    pub year: u32,
    pub upstream_url: Option<String>, // assigned by the decider
}

impl Track {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or_default()
    }

    /// Title with the variant description stripped out:
    /// "Name - Acoustic", "Name (Live)" and "Name [Mono]" are all "Name".
    pub fn song(&self) -> &str {
        let mut song = self.title.as_str();
        for separator in [" - ", " (", " ["] {
            if let Some(idx) = song.find(separator) {
                song = &song[..idx];
            }
        }
        song
    }

    /// Canonical filename:
    /// "Artist - Title (Variant) (ft Other1, Other2).mp3"
    pub fn file_name(&self) -> String {
        let primary = self.primary_artist().replace('.', "");

        let mut title = match self.title.find(" - ") {
            Some(idx) if idx > 0 => format!(
                "{} ({})",
                self.title[..idx].trim(),
                self.title[idx + 3..].trim()
            ),
            _ => self.title.clone(),
        };

        if self.artists.len() > 1 {
            let featured: Vec<String> = self.artists[1..]
                .iter()
                .map(|artist| artist.replace('.', ""))
                .collect();
            title = format!("{} (ft {})", title, featured.join(", "));
        }

        legalize_filename(&format!("{} - {}.{}", primary, title, TRACK_FORMAT))
    }
}

/// Ordered track collection owned by a user
#[derive(Clone, Debug, Default)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub tracks: Vec<Track>,
}

#[derive(Clone, Debug, Default)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub tracks: Vec<Track>,
}

// ============================================================================
// Matching Models
// ============================================================================

/// Provider search result. Higher score is better.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub url: String,
    pub score: i64,
}

/// Sorts matches by descending score, keeping input order on ties.
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Highest-scored match; the earliest one wins a tie.
pub fn best_match(matches: &[Match]) -> Option<&Match> {
    matches
        .iter()
        .fold(None, |best: Option<&Match>, candidate| match best {
            Some(current) if current.score >= candidate.score => Some(current),
            _ => Some(candidate),
        })
}

// ============================================================================
// Layout
// ============================================================================

/// Resolves the on-disk locations derived from a track.
#[derive(Clone, Debug)]
pub struct Layout {
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Layout {
    pub fn new(output_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn final_path(&self, track: &Track) -> PathBuf {
        self.output_dir.join(track.file_name())
    }

    /// Content-addressed scratch file for the raw asset
    pub fn download_path(&self, track: &Track) -> PathBuf {
        self.cache_file(&slugify(&track.id), TRACK_FORMAT)
    }

    pub fn artwork_path(&self, track: &Track) -> PathBuf {
        let base = Path::new(&track.artwork.url)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.cache_file(&slugify(&base), ARTWORK_FORMAT)
    }

    pub fn lyrics_path(&self, track: &Track) -> PathBuf {
        self.cache_file(&slugify(&track.id), LYRICS_FORMAT)
    }

    fn cache_file(&self, stem: &str, extension: &str) -> PathBuf {
        self.cache_dir
            .join(legalize_filename(&format!("{}.{}", stem, extension)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, artists: &[&str]) -> Track {
        Track {
            id: "123".to_string(),
            title: title.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            ..Track::default()
        }
    }

    #[test]
    fn test_song_strips_variants() {
        assert_eq!(track("Name - Acoustic", &["A"]).song(), "Name");
        assert_eq!(track("Name (Live)", &["A"]).song(), "Name");
        assert_eq!(track("Name [Mono]", &["A"]).song(), "Name");
        assert_eq!(track("Name (Live) - 2011 Remaster", &["A"]).song(), "Name");
        assert_eq!(track("Name", &["A"]).song(), "Name");
    }

    #[test]
    fn test_file_name_variant_and_dotted_artist() {
        let t = track("Song - Remix", &["A.B."]);
        assert_eq!(t.file_name(), "AB - Song (Remix).mp3");
    }

    #[test]
    fn test_file_name_featured_artists() {
        let t = track("Song", &["Main", "Guest One", "G.Two"]);
        assert_eq!(t.file_name(), "Main - Song (ft Guest One, GTwo).mp3");
    }

    #[test]
    fn test_file_name_is_legal_and_idempotent() {
        let t = track("What? / Why: \"Now\"", &["AC/DC"]);
        let first = t.file_name();
        assert_eq!(first, t.file_name());
        assert!(!first.contains(['/', '?', ':', '"']));
    }

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("/music", "/cache");
        let mut t = track("Song - Remix", &["A.B."]);
        t.id = "4uLU6hMCjMI75M1A2tKUQC".to_string();
        t.artwork.url = "https://i.scdn.co/image/ab67616d0000b273ABC".to_string();

        assert_eq!(layout.final_path(&t), PathBuf::from("/music/AB - Song (Remix).mp3"));
        assert_eq!(
            layout.download_path(&t),
            PathBuf::from("/cache/4ulu6hmcjmi75m1a2tkuqc.mp3")
        );
        assert_eq!(
            layout.artwork_path(&t),
            PathBuf::from("/cache/ab67616d0000b273abc.jpg")
        );
    }

    #[test]
    fn test_best_match_prefers_earliest_on_tie() {
        let matches = vec![
            Match { url: "a".into(), score: -5 },
            Match { url: "b".into(), score: 3 },
            Match { url: "c".into(), score: 3 },
        ];
        assert_eq!(best_match(&matches).map(|m| m.url.as_str()), Some("b"));
        assert!(best_match(&[]).is_none());
    }

    #[test]
    fn test_sort_matches_is_stable() {
        let mut matches = vec![
            Match { url: "a".into(), score: 1 },
            Match { url: "b".into(), score: 2 },
            Match { url: "c".into(), score: 1 },
        ];
        sort_matches(&mut matches);
        let urls: Vec<_> = matches.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "a", "c"]);
    }
}
