//! Spotify Web API catalog backed by `ureq`.

use std::sync::Mutex;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{Catalog, Forward};
use crate::config::CatalogConfig;
use crate::error::{Result, SyncError};
use crate::models::{Album, Artwork, Playlist, Track};

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const PAGE_SIZE: usize = 50;
const SEARCH_LIMIT: usize = 10;

// ============================================================================
// Wire models
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: String,
    #[serde(default)]
    images: Vec<Image>,
    #[serde(default)]
    release_date: String,
}

/// Track object; `album` is absent on album track listings
#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    album: Option<AlbumRef>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    track_number: u32,
    #[serde(default)]
    is_local: bool,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    #[serde(default)]
    images: Vec<Image>,
    #[serde(default)]
    release_date: String,
    tracks: Paging<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    id: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    owner: Owner,
    tracks: Paging<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct SavedTrack {
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging<TrackObject>,
}

fn release_year(date: &str) -> u32 {
    date.get(..4).and_then(|year| year.parse().ok()).unwrap_or(0)
}

/// Converts a wire track. Local files and tracks without an id are dropped.
fn convert(object: TrackObject, album: Option<&AlbumRef>) -> Option<Track> {
    if object.is_local {
        return None;
    }
    let id = object.id?;
    let album = object.album.as_ref().or(album);
    Some(Track {
        id,
        title: object.name,
        artists: object.artists.into_iter().map(|artist| artist.name).collect(),
        album: album.map(|album| album.name.clone()).unwrap_or_default(),
        artwork: Artwork {
            url: album
                .and_then(|album| album.images.first())
                .map(|image| image.url.clone())
                .unwrap_or_default(),
            data: None,
        },
        duration: (object.duration_ms / 1000) as u32,
        lyrics: String::new(),
        number: object.track_number,
        year: album.map(|album| release_year(&album.release_date)).unwrap_or(0),
        upstream_url: None,
    })
}

// ============================================================================
// Client
// ============================================================================

pub struct Spotify {
    http_client: ureq::Agent,
    config: CatalogConfig,
    token: Mutex<Option<String>>,
}

impl Spotify {
    pub fn new(config: CatalogConfig) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .timeout_write(Duration::from_secs(15))
            .build();
        Self {
            http_client,
            config,
            token: Mutex::new(None),
        }
    }

    fn bearer(&self) -> Result<String> {
        self.token
            .lock()
            .ok()
            .and_then(|token| token.clone())
            .map(|token| format!("Bearer {}", token))
            .ok_or_else(|| SyncError::Catalog("not authenticated".to_string()))
    }

    fn url(&self, path: &str) -> String {
        match &self.config.market {
            Some(market) => format!("{}{}?market={}", API_BASE, path, urlencoding::encode(market)),
            None => format!("{}{}", API_BASE, path),
        }
    }

    fn search_url(&self, artist: &str, title: &str) -> String {
        let query = format!("artist:{} track:{}", artist, title);
        let mut url = format!(
            "{}/search?q={}&type=track&limit={}",
            API_BASE,
            urlencoding::encode(&query),
            SEARCH_LIMIT
        );
        if let Some(market) = &self.config.market {
            url.push_str(&format!("&market={}", urlencoding::encode(market)));
        }
        url
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        log::debug!("catalog: GET {}", url);
        let response = self
            .http_client
            .get(url)
            .set("Authorization", &self.bearer()?)
            .call()?;
        response
            .into_json()
            .map_err(|err| SyncError::Catalog(format!("cannot parse {}: {}", url, err)))
    }

    /// Follows `next` links, forwarding the converted tracks of every page.
    fn drain<T: DeserializeOwned>(
        &self,
        mut page: Paging<T>,
        album: Option<&AlbumRef>,
        extract: fn(T) -> Option<TrackObject>,
        limit: usize,
        forward: Forward<'_>,
        tracks: &mut Vec<Track>,
    ) -> Result<()> {
        loop {
            for item in page.items {
                if tracks.len() >= limit {
                    return Ok(());
                }
                if let Some(track) = extract(item).and_then(|object| convert(object, album)) {
                    forward(track.clone())?;
                    tracks.push(track);
                }
            }
            match page.next {
                Some(next) if tracks.len() < limit => page = self.get_json(&next)?,
                _ => return Ok(()),
            }
        }
    }
}

impl Catalog for Spotify {
    fn authenticate(&self) -> Result<()> {
        let token = match (&self.config.access_token, &self.config.client_id, &self.config.client_secret) {
            (Some(token), _, _) => token.clone(),
            (None, Some(id), Some(secret)) => {
                let response: TokenResponse = self
                    .http_client
                    .post(TOKEN_URL)
                    .send_form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", id.as_str()),
                        ("client_secret", secret.as_str()),
                    ])?
                    .into_json()
                    .map_err(|err| SyncError::Catalog(format!("cannot parse token: {}", err)))?;
                response.access_token
            }
            _ => {
                return Err(SyncError::Catalog(
                    "missing credentials: set SPOTIFY_TOKEN or SPOTIFY_ID and SPOTIFY_KEY".to_string(),
                ))
            }
        };

        let mut slot = self
            .token
            .lock()
            .map_err(|_| SyncError::Catalog("token lock poisoned".to_string()))?;
        *slot = Some(token);
        log::info!("catalog: authenticated");
        Ok(())
    }

    fn library(&self, limit: usize, forward: Forward<'_>) -> Result<usize> {
        let url = format!("{}/me/tracks?limit={}", API_BASE, PAGE_SIZE.min(limit.max(1)));
        let page: Paging<SavedTrack> = self.get_json(&url)?;
        let mut tracks = Vec::new();
        self.drain(page, None, |saved| saved.track, limit, forward, &mut tracks)?;
        Ok(tracks.len())
    }

    fn album(&self, id: &str, forward: Forward<'_>) -> Result<Album> {
        let mut object: AlbumObject = self.get_json(&self.url(&format!("/albums/{}", id)))?;
        let reference = AlbumRef {
            name: object.name.clone(),
            images: std::mem::take(&mut object.images),
            release_date: object.release_date.clone(),
        };
        let mut tracks = Vec::new();
        self.drain(object.tracks, Some(&reference), Some, usize::MAX, forward, &mut tracks)?;
        Ok(Album {
            id: object.id,
            name: object.name,
            artists: object.artists.into_iter().map(|artist| artist.name).collect(),
            tracks,
        })
    }

    fn playlist(&self, id: &str, forward: Forward<'_>) -> Result<Playlist> {
        let object: PlaylistObject = self.get_json(&self.url(&format!("/playlists/{}", id)))?;
        let mut tracks = Vec::new();
        self.drain(object.tracks, None, |item| item.track, usize::MAX, forward, &mut tracks)?;
        Ok(Playlist {
            id: object.id,
            name: object.name,
            owner: object.owner.display_name.unwrap_or(object.owner.id),
            tracks,
        })
    }

    fn track(&self, id: &str, forward: Forward<'_>) -> Result<Track> {
        let object: TrackObject = self.get_json(&self.url(&format!("/tracks/{}", id)))?;
        let track = convert(object, None)
            .ok_or_else(|| SyncError::Catalog(format!("track {} is not available", id)))?;
        forward(track.clone())?;
        Ok(track)
    }

    fn search(&self, artist: &str, title: &str) -> Result<Vec<Track>> {
        let response: SearchResponse = self.get_json(&self.search_url(artist, title))?;
        Ok(response
            .tracks
            .items
            .into_iter()
            .filter_map(|object| convert(object, None))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_full_track() {
        let json = r#"{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Song - Remix",
            "artists": [{"name": "A.B."}, {"name": "Guest"}],
            "album": {
                "name": "Album",
                "images": [{"url": "https://i.scdn.co/image/big"}, {"url": "https://i.scdn.co/image/small"}],
                "release_date": "1999-05-01"
            },
            "duration_ms": 215400,
            "track_number": 7
        }"#;
        let object: TrackObject = serde_json::from_str(json).unwrap();
        let track = convert(object, None).unwrap();

        assert_eq!(track.id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artists, vec!["A.B.", "Guest"]);
        assert_eq!(track.album, "Album");
        assert_eq!(track.artwork.url, "https://i.scdn.co/image/big");
        assert_eq!(track.duration, 215);
        assert_eq!(track.number, 7);
        assert_eq!(track.year, 1999);
        assert_eq!(track.upstream_url, None);
    }

    #[test]
    fn test_convert_album_track_inherits_album() {
        let object: TrackObject =
            serde_json::from_str(r#"{"id": "1", "name": "Intro", "duration_ms": 1000}"#).unwrap();
        let album = AlbumRef {
            name: "Record".to_string(),
            images: vec![Image { url: "https://img/1".to_string() }],
            release_date: "2011".to_string(),
        };
        let track = convert(object, Some(&album)).unwrap();

        assert_eq!(track.album, "Record");
        assert_eq!(track.artwork.url, "https://img/1");
        assert_eq!(track.year, 2011);
    }

    #[test]
    fn test_convert_drops_local_and_missing_ids() {
        let local: TrackObject =
            serde_json::from_str(r#"{"id": null, "name": "Mine", "is_local": true}"#).unwrap();
        assert!(convert(local, None).is_none());

        let page: Paging<PlaylistItem> =
            serde_json::from_str(r#"{"items": [{"track": null}], "next": null}"#).unwrap();
        assert!(page.items[0].track.is_none());
    }

    #[test]
    fn test_search_url_encodes_query_and_market() {
        let spotify = Spotify::new(CatalogConfig {
            market: Some("IT".to_string()),
            ..CatalogConfig::default()
        });
        assert_eq!(
            spotify.search_url("AC/DC", "T.N.T."),
            "https://api.spotify.com/v1/search?q=artist%3AAC%2FDC%20track%3AT.N.T.&type=track&limit=10&market=IT"
        );
    }

    #[test]
    fn test_search_response_skips_local_tracks() {
        let json = r#"{"tracks": {"items": [
            {"id": "1", "name": "Hello", "artists": [{"name": "Adele"}], "album": {"name": "25"}},
            {"id": null, "name": "Hello", "is_local": true}
        ], "next": null}}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let tracks: Vec<Track> = response
            .tracks
            .items
            .into_iter()
            .filter_map(|object| convert(object, None))
            .collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].album, "25");
    }

    #[test]
    fn test_release_year() {
        assert_eq!(release_year("2020-01-01"), 2020);
        assert_eq!(release_year("1987"), 1987);
        assert_eq!(release_year(""), 0);
    }

    #[test]
    fn test_authenticate_without_credentials_fails() {
        let spotify = Spotify::new(CatalogConfig::default());
        assert!(matches!(spotify.authenticate(), Err(SyncError::Catalog(_))));
        assert!(spotify.bearer().is_err());
    }

    #[test]
    fn test_authenticate_with_user_token() {
        let spotify = Spotify::new(CatalogConfig {
            access_token: Some("user-token".to_string()),
            ..CatalogConfig::default()
        });
        spotify.authenticate().unwrap();
        assert_eq!(spotify.bearer().unwrap(), "Bearer user-token");
    }
}
