//! Asset and artwork retrieval.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::{Result, SyncError};

/// Largest accepted HTTP payload
const MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;

/// Largest artwork side after transformation
pub const ARTWORK_MAX_SIDE: u32 = 1000;

pub trait Transform: Send + Sync {
    fn apply(&self, data: Vec<u8>) -> Result<Vec<u8>>;
}

pub trait Downloader: Send + Sync {
    /// Writes the resource at `url` to `destination`. An existing destination is kept.
    fn download(&self, url: &str, destination: &Path, transform: Option<&dyn Transform>) -> Result<()>;

    /// Same as `download`, also returning the bytes written.
    fn download_bytes(
        &self,
        url: &str,
        destination: &Path,
        transform: Option<&dyn Transform>,
    ) -> Result<Vec<u8>> {
        self.download(url, destination, transform)?;
        Ok(std::fs::read(destination)?)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn download_error(url: &str, reason: impl ToString) -> SyncError {
    SyncError::Download {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// yt-dlp
// ============================================================================

/// Extracts the best audio stream of a media page into the destination format.
pub struct YtDlp {
    ytdlp_path: PathBuf,
}

impl YtDlp {
    pub fn new(ytdlp_path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    fn args(url: &str, destination: &Path) -> Vec<String> {
        let format = destination
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| crate::models::TRACK_FORMAT.to_string());
        let template = format!("{}.%(ext)s", destination.with_extension("").display());
        vec![
            "--format".to_string(),
            "bestaudio".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            format,
            "--audio-quality".to_string(),
            "0".to_string(),
            "--output".to_string(),
            template,
            "--continue".to_string(),
            "--no-overwrites".to_string(),
            "--no-warnings".to_string(),
            url.to_string(),
        ]
    }
}

impl Downloader for YtDlp {
    fn download(&self, url: &str, destination: &Path, transform: Option<&dyn Transform>) -> Result<()> {
        if destination.is_file() {
            log::debug!("download: reusing {}", destination.display());
            return Ok(());
        }
        ensure_parent(destination)?;

        let output = Command::new(&self.ytdlp_path)
            .args(Self::args(url, destination))
            .output()
            .map_err(|err| download_error(url, format!("cannot run {}: {}", self.ytdlp_path.display(), err)))?;
        if !output.status.success() {
            return Err(download_error(url, String::from_utf8_lossy(&output.stderr).trim()));
        }
        if !destination.is_file() {
            return Err(download_error(url, format!("{} not produced", destination.display())));
        }

        if let Some(transform) = transform {
            let data = transform.apply(std::fs::read(destination)?)?;
            std::fs::write(destination, data)?;
        }
        Ok(())
    }
}

// ============================================================================
// HTTP
// ============================================================================

pub struct Http {
    http_client: ureq::Agent,
}

impl Default for Http {
    fn default() -> Self {
        Self::new()
    }
}

impl Http {
    pub fn new() -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(30))
            .build();
        Self { http_client }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http_client.get(url).call()?;
        let mut data = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut data)
            .map_err(|err| download_error(url, err))?;
        Ok(data)
    }
}

impl Downloader for Http {
    fn download(&self, url: &str, destination: &Path, transform: Option<&dyn Transform>) -> Result<()> {
        self.download_bytes(url, destination, transform).map(|_| ())
    }

    fn download_bytes(
        &self,
        url: &str,
        destination: &Path,
        transform: Option<&dyn Transform>,
    ) -> Result<Vec<u8>> {
        if destination.is_file() {
            log::debug!("download: reusing {}", destination.display());
            return Ok(std::fs::read(destination)?);
        }

        let mut data = self.fetch(url)?;
        if let Some(transform) = transform {
            data = transform.apply(data)?;
        }
        ensure_parent(destination)?;
        std::fs::write(destination, &data)?;
        Ok(data)
    }
}

// ============================================================================
// Artwork
// ============================================================================

/// Centre-crops to a square, caps the side at `ARTWORK_MAX_SIDE` and encodes JPEG.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArtworkTransform;

impl ArtworkTransform {
    fn square(image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let side = width.min(height);
        let cropped = image.crop_imm((width - side) / 2, (height - side) / 2, side, side);
        if side > ARTWORK_MAX_SIDE {
            cropped.resize_exact(ARTWORK_MAX_SIDE, ARTWORK_MAX_SIDE, FilterType::Lanczos3)
        } else {
            cropped
        }
    }
}

impl Transform for ArtworkTransform {
    fn apply(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let image = image::load_from_memory(&data)
            .map_err(|err| SyncError::Process(format!("cannot decode artwork: {}", err)))?;
        let squared = DynamicImage::ImageRgb8(Self::square(&image).to_rgb8());

        let mut encoded = Cursor::new(Vec::new());
        squared
            .write_to(&mut encoded, ImageFormat::Jpeg)
            .map_err(|err| SyncError::Process(format!("cannot encode artwork: {}", err)))?;
        Ok(encoded.into_inner())
    }
}
