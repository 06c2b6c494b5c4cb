use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "tracksync";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub provider: ProviderConfig,
    pub processor: ProcessorConfig,
    pub paths: PathsConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Loads `path`, or the default location when `path` is `None`. A missing default
    /// file yields the built-in defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match default_path() {
                Some(path) if path.is_file() => Self::read(&path)?,
                _ => Config::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("SPOTIFY_ID") {
            self.catalog.client_id = Some(id);
        }
        if let Some(key) = lookup("SPOTIFY_KEY") {
            self.catalog.client_secret = Some(key);
        }
        if let Some(token) = lookup("SPOTIFY_TOKEN") {
            self.catalog.access_token = Some(token);
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.paths
            .output_dir
            .clone()
            .or_else(dirs::audio_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.paths.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME)
        })
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub market: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub ytdlp: PathBuf,
    pub results: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            ytdlp: PathBuf::from("yt-dlp"),
            results: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProcessorConfig {
    pub normalize: bool,
    pub ffmpeg: PathBuf,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub install_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            install_capacity: 10,
        }
    }
}
