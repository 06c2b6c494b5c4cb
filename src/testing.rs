//! In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::catalog::{Catalog, Forward};
use crate::downloader::{ArtworkTransform, Downloader, Transform};
use crate::error::{Result, SyncError};
use crate::lyrics::LyricsProvider;
use crate::models::{Album, Match, Playlist, Track};
use crate::pipeline::Collaborators;
use crate::processor::{Processor, TagEmbedder};
use crate::prompt::{Prompt, ScriptedPrompt};
use crate::provider::AssetProvider;
use crate::tags::{Field, Id3Store, TagStore};

/// "Song - Remix" by "A.B.", id 123
pub fn song_remix() -> Track {
    Track {
        id: "123".to_string(),
        title: "Song - Remix".to_string(),
        artists: vec!["A.B.".to_string()],
        album: "Album".to_string(),
        duration: 180,
        number: 1,
        year: 2001,
        ..Track::default()
    }
}

pub fn track(id: &str, title: &str, artist: &str) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artists: vec![artist.to_string()],
        duration: 200,
        ..Track::default()
    }
}

/// Writes a placeholder media file, tagged with `id` when given.
pub fn touch_tagged(path: &Path, id: Option<&str>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"audio").unwrap();
    if let Some(id) = id {
        let mut tag = Id3Store.open(path).unwrap();
        tag.set(Field::Identifier, id);
        tag.save().unwrap();
    }
}

#[derive(Default)]
struct State {
    library: Vec<Track>,
    albums: HashMap<String, Album>,
    playlists: HashMap<String, Playlist>,
    tracks: HashMap<String, Track>,
    matches: HashMap<String, Vec<Match>>,
    fail_auth: bool,
    fail_catalog: bool,
    fail_search: bool,
    searches: usize,
    downloads: Vec<String>,
    processed: Vec<String>,
}

/// Shared state behind every fake collaborator
#[derive(Clone, Default)]
pub struct Fakes {
    state: Arc<Mutex<State>>,
    prompt: Arc<ScriptedPrompt>,
}

impl Fakes {
    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::default(),
            prompt: Arc::new(ScriptedPrompt::new(answers)),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_library(&self, tracks: Vec<Track>) {
        for track in &tracks {
            self.add_track(track.clone());
        }
        self.state().library = tracks;
    }

    pub fn add_track(&self, track: Track) {
        self.state().tracks.insert(track.id.clone(), track);
    }

    pub fn add_album(&self, album: Album) {
        self.state().albums.insert(album.id.clone(), album);
    }

    pub fn add_playlist(&self, playlist: Playlist) {
        self.state().playlists.insert(playlist.id.clone(), playlist);
    }

    pub fn add_matches(&self, id: &str, matches: Vec<Match>) {
        self.state().matches.insert(id.to_string(), matches);
    }

    pub fn fail_auth(&self) {
        self.state().fail_auth = true;
    }

    pub fn fail_catalog(&self) {
        self.state().fail_catalog = true;
    }

    pub fn fail_search(&self) {
        self.state().fail_search = true;
    }

    pub fn searches(&self) -> usize {
        self.state().searches
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state().downloads.clone()
    }

    pub fn processed(&self) -> Vec<String> {
        self.state().processed.clone()
    }

    pub fn prompt(&self) -> Arc<ScriptedPrompt> {
        self.prompt.clone()
    }
}

/// Fakes for every collaborator, with the real id3 store and tag embedder.
pub fn collaborators(fakes: &Fakes) -> Collaborators {
    let tags: Arc<dyn TagStore> = Arc::new(Id3Store);
    Collaborators {
        catalog: Box::new(FakeCatalog(fakes.clone())),
        provider: Box::new(FakeProvider(fakes.clone())),
        asset_downloader: Box::new(FakeDownloader(fakes.clone())),
        artwork_downloader: Box::new(FakeDownloader(fakes.clone())),
        artwork_transform: Box::new(ArtworkTransform),
        lyrics: Box::new(FakeLyrics),
        tags: tags.clone(),
        processor: Box::new(RecordingProcessor {
            fakes: fakes.clone(),
            embedder: TagEmbedder::new(tags),
        }),
        prompt: Box::new(SharedPrompt(fakes.prompt())),
    }
}

struct FakeCatalog(Fakes);

impl FakeCatalog {
    fn check(&self) -> Result<()> {
        if self.0.state().fail_catalog {
            return Err(SyncError::Catalog("catalog unavailable".to_string()));
        }
        Ok(())
    }
}

impl Catalog for FakeCatalog {
    fn authenticate(&self) -> Result<()> {
        if self.0.state().fail_auth {
            return Err(SyncError::Catalog("bad credentials".to_string()));
        }
        Ok(())
    }

    fn library(&self, limit: usize, forward: Forward<'_>) -> Result<usize> {
        self.check()?;
        let tracks: Vec<Track> = self.0.state().library.iter().take(limit).cloned().collect();
        let count = tracks.len();
        for track in tracks {
            forward(track)?;
        }
        Ok(count)
    }

    fn album(&self, id: &str, forward: Forward<'_>) -> Result<Album> {
        self.check()?;
        let album = self.0.state().albums.get(id).cloned();
        let album = album.ok_or_else(|| SyncError::Catalog(format!("no album {}", id)))?;
        for track in &album.tracks {
            forward(track.clone())?;
        }
        Ok(album)
    }

    fn playlist(&self, id: &str, forward: Forward<'_>) -> Result<Playlist> {
        self.check()?;
        let playlist = self.0.state().playlists.get(id).cloned();
        let playlist = playlist.ok_or_else(|| SyncError::Catalog(format!("no playlist {}", id)))?;
        for track in &playlist.tracks {
            forward(track.clone())?;
        }
        Ok(playlist)
    }

    fn track(&self, id: &str, forward: Forward<'_>) -> Result<Track> {
        self.check()?;
        let track = self.0.state().tracks.get(id).cloned();
        let track = track.ok_or_else(|| SyncError::Catalog(format!("no track {}", id)))?;
        forward(track.clone())?;
        Ok(track)
    }

    /// Known tracks of `artist` whose title contains `title`, ordered by id.
    fn search(&self, artist: &str, title: &str) -> Result<Vec<Track>> {
        self.check()?;
        let title = title.to_lowercase();
        let mut found: Vec<Track> = self
            .0
            .state()
            .tracks
            .values()
            .filter(|track| track.primary_artist().eq_ignore_ascii_case(artist))
            .filter(|track| track.title.to_lowercase().contains(&title))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}

struct FakeProvider(Fakes);

impl AssetProvider for FakeProvider {
    fn search(&self, track: &Track) -> Result<Vec<Match>> {
        let mut state = self.0.state();
        state.searches += 1;
        if state.fail_search {
            return Err(SyncError::Provider("search unavailable".to_string()));
        }
        Ok(state.matches.get(&track.id).cloned().unwrap_or_default())
    }
}

/// Writes the URL itself as the downloaded content.
struct FakeDownloader(Fakes);

impl Downloader for FakeDownloader {
    fn download(&self, url: &str, destination: &Path, _transform: Option<&dyn Transform>) -> Result<()> {
        self.0.state().downloads.push(url.to_string());
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(destination, url.as_bytes())?;
        Ok(())
    }
}

struct FakeLyrics;

impl LyricsProvider for FakeLyrics {
    fn search(&self, track: &Track) -> Result<String> {
        Ok(format!("lyrics of {}", track.title))
    }
}

struct RecordingProcessor {
    fakes: Fakes,
    embedder: TagEmbedder,
}

impl Processor for RecordingProcessor {
    fn process(&self, track: &Track, path: &Path) -> Result<()> {
        self.fakes.state().processed.push(track.id.clone());
        self.embedder.process(track, path)
    }
}

struct SharedPrompt(Arc<ScriptedPrompt>);

impl Prompt for SharedPrompt {
    fn show(&self, line: &str) {
        self.0.show(line);
    }

    fn read_line(&self, message: &str) -> Option<String> {
        self.0.read_line(message)
    }
}
