//! Error taxonomy shared by every stage and collaborator.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Track;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tag error on {}: {source}", path.display())]
    Tag {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },

    #[error("cannot index {}: {source}", root.display())]
    Index {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("lyrics lookup failed: {0}")]
    Lyrics(String),

    #[error("post-processing failed: {0}")]
    Process(String),

    #[error("unsupported playlist encoding: {0}")]
    Encoding(String),

    #[error("http error: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("{0} queue closed")]
    QueueClosed(&'static str),

    #[error("{stage} failed for {subject}: {source}")]
    Stage {
        stage: &'static str,
        subject: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("{0} stage panicked")]
    Panic(&'static str),
}

impl SyncError {
    /// Attributes an error to a track handled by `stage`.
    pub fn for_track(self, stage: &'static str, track: &Track) -> Self {
        SyncError::Stage {
            stage,
            subject: format!("{} by {} (id: {})", track.title, track.primary_artist(), track.id),
            source: Box::new(self),
        }
    }

    pub fn for_subject(self, stage: &'static str, subject: impl Into<String>) -> Self {
        SyncError::Stage {
            stage,
            subject: subject.into(),
            source: Box::new(self),
        }
    }

    pub fn tag(path: impl Into<PathBuf>, source: id3::Error) -> Self {
        SyncError::Tag {
            path: path.into(),
            source,
        }
    }
}

impl From<ureq::Error> for SyncError {
    fn from(err: ureq::Error) -> Self {
        SyncError::Http(Box::new(err))
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
