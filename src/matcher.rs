//! Fuzzy matching of local files against catalog tracks.
//!
//! Two consumers: reconciliation of untagged files found by the index, and the
//! scored ranking offered to the user in manual mode. Scores are deterministic for a
//! given directory listing and track, so tests assert exact values and ordering.

use std::path::{Path, PathBuf};

use crate::index::media_files;
use crate::models::Track;
use crate::normalize::{content_words, normalize_term};

/// Number of ranked candidates offered for selection
pub const MAX_RANKED: usize = 10;

/// Points awarded by `score`
const EXACT_PATTERN_POINTS: i64 = 100;
const ARTIST_POINTS: i64 = 50;
const TITLE_POINTS: i64 = 40;
const SPLIT_POINTS: i64 = 30;
const WORD_POINTS: i64 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ranked {
    pub path: PathBuf,
    pub score: i64,
}

/// Normalized views of a track used by every rule
struct Target {
    artist: String,
    title: String,
    base_title: String,
}

impl Target {
    fn new(track: &Track) -> Self {
        Self {
            artist: normalize_term(track.primary_artist()),
            title: normalize_term(&track.title),
            base_title: normalize_term(track.song()),
        }
    }

    /// Content words of the title and of the artist, counted independently.
    fn words(&self) -> (Vec<&str>, Vec<&str>) {
        (content_words(&self.title), content_words(&self.artist))
    }
}

fn contains_term(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Whether a normalized file stem plausibly names `track`.
pub fn is_candidate(normalized_stem: &str, track: &Track) -> bool {
    let target = Target::new(track);

    if contains_term(normalized_stem, &target.artist)
        && (contains_term(normalized_stem, &target.title)
            || contains_term(normalized_stem, &target.base_title))
    {
        return true;
    }

    let (title_words, artist_words) = target.words();
    let title_hits = title_words
        .iter()
        .filter(|word| normalized_stem.contains(*word))
        .count();
    let artist_hits = artist_words
        .iter()
        .filter(|word| normalized_stem.contains(*word))
        .count();
    title_hits >= 1 && artist_hits >= 1 && title_hits + artist_hits >= 2
}

/// Pairs every file with every track it plausibly names, files in input order.
pub fn reconcile_candidates<'a>(files: &[PathBuf], tracks: &'a [Track]) -> Vec<(PathBuf, &'a Track)> {
    let mut pairs = Vec::new();
    for file in files {
        let normalized = normalize_term(&stem_of(file));
        for track in tracks {
            if is_candidate(&normalized, track) {
                pairs.push((file.clone(), track));
            }
        }
    }
    pairs
}

// ============================================================================
// Ranking
// ============================================================================

/// Score of a file name (extension included) against `track`.
pub fn score(file_name: &str, track: &Track) -> i64 {
    let target = Target::new(track);
    let lowered = file_name.to_lowercase();
    let stem = stem_of(Path::new(file_name));
    let normalized = normalize_term(&stem);
    let mut points = 0;

    let pattern = format!("{} - {}", track.primary_artist().replace('.', ""), track.song()).to_lowercase();
    if lowered.contains(&pattern) {
        points += EXACT_PATTERN_POINTS;
    }
    if contains_term(&lowered, &track.primary_artist().to_lowercase()) {
        points += ARTIST_POINTS;
    }
    if contains_term(&lowered, &track.song().to_lowercase()) {
        points += TITLE_POINTS;
    }
    if let Some((left, right)) = stem.split_once(" - ") {
        if contains_term(&normalize_term(left), &target.artist)
            && contains_term(&normalize_term(right), &target.base_title)
        {
            points += SPLIT_POINTS;
        }
    }

    let (title_words, artist_words) = target.words();
    let hits = title_words
        .iter()
        .chain(artist_words.iter())
        .filter(|word| normalized.contains(*word))
        .count();
    points + WORD_POINTS * hits as i64
}

/// Ranks the media files under `dir` against `track`: positive scores only,
/// descending, earlier files first on ties, at most `MAX_RANKED`.
pub fn rank(dir: &Path, track: &Track) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = media_files(dir)
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            let score = score(&name, track);
            (score > 0).then_some(Ranked { path, score })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(MAX_RANKED);
    ranked
}

// ============================================================================
// TESTS
// ============================================================================
