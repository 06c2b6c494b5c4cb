//! Playlist file encoders.
//!
//! Entries reference tracks by canonical filename, relative to the output directory
//! the playlist file is written into.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::models::{Playlist, Track};
use crate::normalize::legalize_filename;

pub trait PlaylistEncoder: Send {
    fn add(&mut self, track: &Track) -> Result<()>;
    /// Writes the playlist file and returns its path.
    fn close(self: Box<Self>) -> Result<PathBuf>;
}

pub const FORMATS: &[&str] = &["m3u", "pls"];

/// Encoder writing `playlist` into `dir` in `format`.
pub fn encoder(format: &str, playlist: &Playlist, dir: &Path) -> Result<Box<dyn PlaylistEncoder>> {
    let format = format.to_lowercase();
    let path = dir.join(legalize_filename(&format!("{}.{}", playlist.name, format)));
    match format.as_str() {
        "m3u" => Ok(Box::new(M3u::new(path))),
        "pls" => Ok(Box::new(Pls::new(path))),
        other => Err(SyncError::Encoding(other.to_string())),
    }
}

fn display_name(track: &Track) -> String {
    format!("{} - {}", track.artists.join(", "), track.title)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Extended M3U
pub struct M3u {
    path: PathBuf,
    body: String,
}

impl M3u {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            body: String::from("#EXTM3U\n"),
        }
    }
}

impl PlaylistEncoder for M3u {
    fn add(&mut self, track: &Track) -> Result<()> {
        let _ = writeln!(self.body, "#EXTINF:{},{}", track.duration, display_name(track));
        let _ = writeln!(self.body, "{}", track.file_name());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<PathBuf> {
        write_file(&self.path, &self.body)?;
        Ok(self.path)
    }
}

pub struct Pls {
    path: PathBuf,
    body: String,
    entries: usize,
}

impl Pls {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            body: String::from("[playlist]\n"),
            entries: 0,
        }
    }
}

impl PlaylistEncoder for Pls {
    fn add(&mut self, track: &Track) -> Result<()> {
        self.entries += 1;
        let n = self.entries;
        let _ = writeln!(self.body, "File{}={}", n, track.file_name());
        let _ = writeln!(self.body, "Title{}={}", n, display_name(track));
        let _ = writeln!(self.body, "Length{}={}", n, track.duration);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<PathBuf> {
        let mut body = self.body;
        let _ = writeln!(body, "NumberOfEntries={}", self.entries);
        let _ = writeln!(body, "Version=2");
        write_file(&self.path, &body)?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn playlist() -> Playlist {
        Playlist {
            id: "p1".to_string(),
            name: "Road/Trip".to_string(),
            owner: "me".to_string(),
            tracks: Vec::new(),
        }
    }

    fn track(title: &str, artist: &str, duration: u32) -> Track {
        Track {
            id: title.to_string(),
            title: title.to_string(),
            artists: vec![artist.to_string()],
            duration,
            ..Track::default()
        }
    }

    #[test]
    fn test_m3u_output() {
        let tmp = TempDir::new().unwrap();
        let mut encoder = encoder("m3u", &playlist(), tmp.path()).unwrap();
        encoder.add(&track("One", "A", 120)).unwrap();
        encoder.add(&track("Two - Live", "B.C.", 95)).unwrap();
        let path = encoder.close().unwrap();

        assert_eq!(path, tmp.path().join("RoadTrip.m3u"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "#EXTM3U\n#EXTINF:120,A - One\nA - One.mp3\n#EXTINF:95,B.C. - Two - Live\nBC - Two (Live).mp3\n"
        );
    }

    #[test]
    fn test_pls_output() {
        let tmp = TempDir::new().unwrap();
        let mut encoder = encoder("PLS", &playlist(), tmp.path()).unwrap();
        encoder.add(&track("One", "A", 120)).unwrap();
        let path = encoder.close().unwrap();

        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "[playlist]\nFile1=A - One.mp3\nTitle1=A - One\nLength1=120\nNumberOfEntries=1\nVersion=2\n"
        );
    }

    #[test]
    fn test_unknown_format_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = encoder("xspf", &playlist(), tmp.path()).err().unwrap();
        assert!(matches!(err, SyncError::Encoding(ref f) if f == "xspf"));
    }
}
