//! Remote catalog access.
//!
//! Every retrieval call publishes each track it consumes through `forward` as soon as
//! it is read, so the pipeline can start deciding before a collection is complete.

pub mod spotify;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SyncError};
use crate::models::{Album, Playlist, Track};

pub use spotify::Spotify;

/// Sink receiving every track read from the catalog
pub type Forward<'a> = &'a mut dyn FnMut(Track) -> Result<()>;

pub trait Catalog: Send + Sync {
    fn authenticate(&self) -> Result<()>;

    /// Saved tracks, newest first, at most `limit`. Returns the number forwarded.
    fn library(&self, limit: usize, forward: Forward<'_>) -> Result<usize>;

    fn album(&self, id: &str, forward: Forward<'_>) -> Result<Album>;

    fn playlist(&self, id: &str, forward: Forward<'_>) -> Result<Playlist>;

    fn track(&self, id: &str, forward: Forward<'_>) -> Result<Track>;

    /// Tracks matching `artist` and `title`, most relevant first.
    fn search(&self, artist: &str, title: &str) -> Result<Vec<Track>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Track,
    Album,
    Playlist,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Track => "track",
            Kind::Album => "album",
            Kind::Playlist => "playlist",
        }
    }
}

static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z]+$").unwrap());

static URI_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^spotify:(track|album|playlist):([0-9A-Za-z]+)$").unwrap());

static URL_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?open\.spotify\.com/(?:intl-[a-z]+/)?(track|album|playlist)/([0-9A-Za-z]+)/?(?:\?.*)?$")
        .unwrap()
});

/// Extracts a catalog identifier of `kind` from a bare id, a `spotify:kind:id` URI or
/// an `open.spotify.com/kind/id` URL.
pub fn parse_id(kind: Kind, input: &str) -> Result<String> {
    let input = input.trim();
    if BARE_ID.is_match(input) {
        return Ok(input.to_string());
    }

    let captures = URI_ID
        .captures(input)
        .or_else(|| URL_ID.captures(input))
        .ok_or_else(|| SyncError::Input(format!("malformed {} id: {:?}", kind.as_str(), input)))?;

    if &captures[1] != kind.as_str() {
        return Err(SyncError::Input(format!(
            "{:?} is a {}, expected a {}",
            input,
            &captures[1],
            kind.as_str()
        )));
    }
    Ok(captures[2].to_string())
}
