//! Embedded metadata access.
//!
//! `TagStore` opens a media file's tag; `TagHandle` reads and writes the fixed set of
//! fields the pipeline relies on. Dropping a handle releases it without saving.

use std::path::{Path, PathBuf};

use id3::frame::{ExtendedText, Lyrics, Picture, PictureType};
use id3::{Tag, TagLike, Version};

use crate::error::{Result, SyncError};
use crate::models::Track;

/// Fields read and written by the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Identifier,
    ArtworkUrl,
    Duration,
    UpstreamUrl,
    Title,
    Artist,
    Album,
    TrackNumber,
    Year,
}

impl Field {
    /// Description used for user-defined text frames
    fn custom_key(self) -> Option<&'static str> {
        match self {
            Field::Identifier => Some("Spotify ID"),
            Field::ArtworkUrl => Some("Artwork URL"),
            Field::Duration => Some("Duration"),
            Field::UpstreamUrl => Some("Upstream URL"),
            _ => None,
        }
    }
}

pub trait TagHandle: Send {
    fn get(&self, field: Field) -> Option<String>;
    fn set(&mut self, field: Field, value: &str);
    fn set_picture(&mut self, mime_type: &str, data: Vec<u8>);
    fn set_lyrics(&mut self, description: &str, text: &str);
    fn save(&mut self) -> Result<()>;

    fn identifier(&self) -> Option<String> {
        self.get(Field::Identifier).filter(|id| !id.is_empty())
    }
}

pub trait TagStore: Send + Sync {
    /// Opens the tag of `path`. A file without a tag yields an empty handle.
    fn open(&self, path: &Path) -> Result<Box<dyn TagHandle>>;
}

/// Writes the catalog metadata of `track` into `tag`. Does not save.
pub fn apply_track(tag: &mut dyn TagHandle, track: &Track) {
    tag.set(Field::Identifier, &track.id);
    tag.set(Field::Title, &track.title);
    tag.set(Field::Artist, &track.artists.join(", "));
    tag.set(Field::Album, &track.album);
    tag.set(Field::ArtworkUrl, &track.artwork.url);
    tag.set(Field::Duration, &track.duration.to_string());
    tag.set(Field::TrackNumber, &track.number.to_string());
    tag.set(Field::Year, &track.year.to_string());
    if let Some(url) = &track.upstream_url {
        tag.set(Field::UpstreamUrl, url);
    }
}

// ============================================================================
// ID3v2
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct Id3Store;

impl TagStore for Id3Store {
    fn open(&self, path: &Path) -> Result<Box<dyn TagHandle>> {
        let tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(err) if matches!(err.kind, id3::ErrorKind::NoTag) => Tag::new(),
            Err(err) => return Err(SyncError::tag(path, err)),
        };
        Ok(Box::new(Id3Handle {
            path: path.to_path_buf(),
            tag,
        }))
    }
}

pub struct Id3Handle {
    path: PathBuf,
    tag: Tag,
}

impl TagHandle for Id3Handle {
    fn get(&self, field: Field) -> Option<String> {
        if let Some(key) = field.custom_key() {
            return self
                .tag
                .extended_texts()
                .find(|text| text.description.eq_ignore_ascii_case(key))
                .map(|text| text.value.clone());
        }
        match field {
            Field::Title => self.tag.title().map(str::to_string),
            Field::Artist => self.tag.artist().map(str::to_string),
            Field::Album => self.tag.album().map(str::to_string),
            Field::TrackNumber => self.tag.track().map(|n| n.to_string()),
            Field::Year => self.tag.year().map(|y| y.to_string()),
            _ => None,
        }
    }

    fn set(&mut self, field: Field, value: &str) {
        if let Some(key) = field.custom_key() {
            self.tag.remove_extended_text(Some(key), None);
            self.tag.add_frame(ExtendedText {
                description: key.to_string(),
                value: value.to_string(),
            });
            return;
        }
        match field {
            Field::Title => self.tag.set_title(value),
            Field::Artist => self.tag.set_artist(value),
            Field::Album => self.tag.set_album(value),
            Field::TrackNumber => match value.parse::<u32>() {
                Ok(number) if number > 0 => self.tag.set_track(number),
                _ => self.tag.remove_track(),
            },
            Field::Year => match value.parse::<i32>() {
                Ok(year) if year > 0 => self.tag.set_year(year),
                _ => self.tag.remove_year(),
            },
            _ => {}
        }
    }

    fn set_picture(&mut self, mime_type: &str, data: Vec<u8>) {
        self.tag.remove_picture_by_type(PictureType::CoverFront);
        self.tag.add_frame(Picture {
            mime_type: mime_type.to_string(),
            picture_type: PictureType::CoverFront,
            description: "Front cover".to_string(),
            data,
        });
    }

    fn set_lyrics(&mut self, description: &str, text: &str) {
        self.tag.remove_all_lyrics();
        self.tag.add_frame(Lyrics {
            lang: "eng".to_string(),
            description: description.to_string(),
            text: text.to_string(),
        });
    }

    fn save(&mut self) -> Result<()> {
        self.tag
            .write_to_path(&self.path, Version::Id3v24)
            .map_err(|err| SyncError::tag(&self.path, err))
    }
}
