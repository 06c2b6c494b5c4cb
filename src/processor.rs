//! Post-processing of downloaded assets.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::models::Track;
use crate::tags::{apply_track, TagStore};

pub trait Processor: Send + Sync {
    fn process(&self, track: &Track, path: &Path) -> Result<()>;
}

/// Runs processors in order, stopping at the first failure.
#[derive(Default)]
pub struct Chain {
    steps: Vec<Box<dyn Processor>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, step: impl Processor + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }
}

impl Processor for Chain {
    fn process(&self, track: &Track, path: &Path) -> Result<()> {
        for step in &self.steps {
            step.process(track, path)?;
        }
        Ok(())
    }
}

/// EBU R128 loudness normalization with ffmpeg's `loudnorm` filter
pub struct FfmpegNormalizer {
    ffmpeg_path: PathBuf,
}

impl FfmpegNormalizer {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Processor for FfmpegNormalizer {
    fn process(&self, _track: &Track, path: &Path) -> Result<()> {
        let normalized = path.with_extension(format!(
            "normalized.{}",
            path.extension().and_then(|ext| ext.to_str()).unwrap_or("mp3")
        ));
        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(path)
            .args(["-af", "loudnorm=I=-16:TP=-1.5:LRA=11", "-map_metadata", "0"])
            .arg(&normalized)
            .output()
            .map_err(|err| {
                SyncError::Process(format!("cannot run {}: {}", self.ffmpeg_path.display(), err))
            })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&normalized);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::Process(format!(
                "normalization failed: {}",
                stderr.lines().last().unwrap_or_default()
            )));
        }
        std::fs::rename(&normalized, path)?;
        Ok(())
    }
}

/// Writes catalog metadata, artwork and lyrics into the file's tag.
pub struct TagEmbedder {
    tags: Arc<dyn TagStore>,
}

impl TagEmbedder {
    pub fn new(tags: Arc<dyn TagStore>) -> Self {
        Self { tags }
    }
}

impl Processor for TagEmbedder {
    fn process(&self, track: &Track, path: &Path) -> Result<()> {
        let mut tag = self.tags.open(path)?;
        apply_track(tag.as_mut(), track);
        if let Some(data) = &track.artwork.data {
            tag.set_picture("image/jpeg", data.clone());
        }
        if !track.lyrics.is_empty() {
            tag.set_lyrics(&track.title, &track.lyrics);
        }
        tag.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{Field, Id3Store};
    use id3::TagLike;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Recorder {
        name: &'static str,
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Processor for Recorder {
        fn process(&self, _track: &Track, _path: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(self.name);
            if self.fail {
                return Err(SyncError::Process(self.name.to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_chain_runs_in_order_and_stops_on_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let step = |name, fail| Recorder { name, calls: calls.clone(), fail };
        let chain = Chain::new()
            .then(step("normalize", false))
            .then(step("encode", true))
            .then(step("never", false));

        let err = chain.process(&Track::default(), Path::new("x.mp3")).unwrap_err();
        assert!(matches!(err, SyncError::Process(ref name) if name == "encode"));
        assert_eq!(*calls.lock().unwrap(), vec!["normalize", "encode"]);
    }

    #[test]
    fn test_tag_embedder_writes_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("123.mp3");
        std::fs::write(&path, b"audio").unwrap();

        let mut track = Track {
            id: "123".to_string(),
            title: "Song".to_string(),
            artists: vec!["Artist".to_string()],
            lyrics: "la la".to_string(),
            ..Track::default()
        };
        track.artwork.data = Some(vec![0xFF, 0xD8, 0xFF]);

        TagEmbedder::new(Arc::new(Id3Store)).process(&track, &path).unwrap();

        let tag = Id3Store.open(&path).unwrap();
        assert_eq!(tag.identifier().as_deref(), Some("123"));
        assert_eq!(tag.get(Field::Title).as_deref(), Some("Song"));

        let raw = id3::Tag::read_from_path(&path).unwrap();
        let lyrics = raw.lyrics().next().unwrap();
        assert_eq!(lyrics.text, "la la");
        assert_eq!(lyrics.description, "Song");
        let picture = raw.pictures().next().unwrap();
        assert_eq!(picture.mime_type, "image/jpeg");
        assert_eq!(picture.data, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_normalizer_missing_binary_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.mp3");
        std::fs::write(&path, b"audio").unwrap();
        let err = FfmpegNormalizer::new("/nonexistent/ffmpeg")
            .process(&Track::default(), &path)
            .unwrap_err();
        assert!(matches!(err, SyncError::Process(_)));
    }
}
