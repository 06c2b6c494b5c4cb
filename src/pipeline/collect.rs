//! Collector: downloads asset, lyrics and artwork of each track concurrently.

use crossbeam_channel::{Receiver, Sender};

use super::{forward, StageContext};
use crate::error::{Result, SyncError};
use crate::models::Track;
use crate::progress::Lot;

const STAGE: &str = "collector";

pub(super) fn run(
    ctx: StageContext<'_>,
    lot: &Lot,
    input: Receiver<Track>,
    output: Sender<Track>,
) -> Result<()> {
    let mut collected = 0usize;
    for track in input {
        lot.set(format!("{} by {}", track.title, track.primary_artist()));
        let track = collect_track(ctx, track)?;
        collected += 1;
        forward(&output, track, "processor")?;
    }
    lot.close(format!("{} collected", collected));
    Ok(())
}

fn collect_track(ctx: StageContext<'_>, mut track: Track) -> Result<Track> {
    let collaborators = ctx.collaborators;
    let url = track
        .upstream_url
        .clone()
        .ok_or_else(|| SyncError::Input("no upstream url".to_string()).for_track(STAGE, &track))?;

    let (asset, (lyrics, artwork)) = rayon::join(
        || {
            collaborators
                .asset_downloader
                .download(&url, &ctx.layout.download_path(&track), None)
        },
        || {
            rayon::join(
                || {
                    if ctx.options.lyrics {
                        cached_lyrics(ctx, &track).map(Some)
                    } else {
                        Ok(None)
                    }
                },
                || {
                    if track.artwork.url.is_empty() {
                        return Ok(None);
                    }
                    collaborators
                        .artwork_downloader
                        .download_bytes(
                            &track.artwork.url,
                            &ctx.layout.artwork_path(&track),
                            Some(collaborators.artwork_transform.as_ref()),
                        )
                        .map(Some)
                },
            )
        },
    );

    asset.map_err(|err| err.for_track(STAGE, &track))?;
    if let Some(lyrics) = lyrics.map_err(|err| err.for_track(STAGE, &track))? {
        track.lyrics = lyrics;
    }
    if let Some(data) = artwork.map_err(|err| err.for_track(STAGE, &track))? {
        track.artwork.data = Some(data);
    }
    Ok(track)
}

/// Lyrics from the cache, or from the provider when not cached yet. Empty lyrics are
/// not cached.
fn cached_lyrics(ctx: StageContext<'_>, track: &Track) -> Result<String> {
    let path = ctx.layout.lyrics_path(track);
    if path.is_file() {
        log::debug!("lyrics: reusing {}", path.display());
        return Ok(std::fs::read_to_string(&path)?);
    }
    let lyrics = ctx.collaborators.lyrics.search(track)?;
    if !lyrics.is_empty() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &lyrics)?;
    }
    Ok(lyrics)
}
