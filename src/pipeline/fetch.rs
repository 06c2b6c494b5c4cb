//! Fetcher: streams catalog tracks to the decider and playlists to the mixer.

use std::collections::HashSet;
use std::path::PathBuf;

use crossbeam_channel::Sender;

use super::install::move_file;
use super::{forward, SignalReceiver, StageContext};
use crate::catalog::{parse_id, Kind};
use crate::error::Result;
use crate::index::Status;
use crate::matcher::reconcile_candidates;
use crate::models::{Playlist, Track};
use crate::progress::Lot;
use crate::prompt::confirm;
use crate::tags::apply_track;

const STAGE: &str = "fetcher";

/// Library tracks considered when reconciling untagged files
const RECONCILE_LIMIT: usize = 100;

pub(super) fn run(
    ctx: StageContext<'_>,
    lot: &Lot,
    indexed: SignalReceiver,
    authenticated: SignalReceiver,
    decide: Sender<Track>,
    mix: Sender<Playlist>,
) -> Result<()> {
    // both readiness signals are always consumed so neither producer lingers
    let index_ready = indexed.wait();
    let auth_ready = authenticated.wait();
    if !index_ready || !auth_ready {
        lot.close("skipped");
        return Ok(());
    }

    if ctx.options.reconcile {
        reconcile(ctx, lot)?;
    }

    let catalog = ctx.collaborators.catalog.as_ref();
    let mut fetched = 0usize;
    let mut send = |track: Track| -> Result<()> {
        fetched += 1;
        lot.set(format!("{} tracks fetched: {}", fetched, track.title));
        forward(&decide, track, "decider")
    };

    let fix_ids = flush_fixes(ctx)?;

    for id in fix_ids {
        let mut send_flushed = |track: Track| -> Result<()> {
            ctx.index.set(&track, ctx.layout, Status::Flush);
            send(track)
        };
        catalog
            .track(&id, &mut send_flushed)
            .map_err(|err| err.for_subject(STAGE, format!("track {}", id)))?;
    }

    let options = ctx.options;
    if library_enabled(options) {
        lot.set("fetching library");
        catalog
            .library(library_limit(options.library_limit), &mut send)
            .map_err(|err| err.for_subject(STAGE, "library"))?;
    }

    for id in valid_ids(Kind::Album, &options.albums) {
        catalog
            .album(&id, &mut send)
            .map_err(|err| err.for_subject(STAGE, format!("album {}", id)))?;
    }

    for id in valid_ids(Kind::Track, &options.tracks) {
        catalog
            .track(&id, &mut send)
            .map_err(|err| err.for_subject(STAGE, format!("track {}", id)))?;
    }

    for id in valid_ids(Kind::Playlist, &options.playlists) {
        let playlist = catalog
            .playlist(&id, &mut send)
            .map_err(|err| err.for_subject(STAGE, format!("playlist {}", id)))?;
        forward(&mix, playlist, "mixer")?;
    }

    for id in valid_ids(Kind::Playlist, &options.playlist_tracks) {
        catalog
            .playlist(&id, &mut send)
            .map_err(|err| err.for_subject(STAGE, format!("playlist {}", id)))?;
    }

    lot.close(format!("{} tracks fetched", fetched));
    Ok(())
}

/// A zero limit means the whole library.
pub(super) fn library_limit(limit: usize) -> usize {
    if limit == 0 {
        usize::MAX
    } else {
        limit
    }
}

/// The library is synchronized when asked to, or when no collection was given.
pub(super) fn library_enabled(options: &super::Options) -> bool {
    options.library
        || (options.playlists.is_empty()
            && options.playlist_tracks.is_empty()
            && options.albums.is_empty()
            && options.tracks.is_empty()
            && options.fixes.is_empty())
}

fn valid_ids(kind: Kind, inputs: &[String]) -> Vec<String> {
    inputs
        .iter()
        .filter_map(|input| match parse_id(kind, input) {
            Ok(id) => Some(id),
            Err(err) => {
                log::warn!("skipping {}", err);
                None
            }
        })
        .collect()
}

/// Marks every fix request for re-fetch and returns the identifiers to fetch.
fn flush_fixes(ctx: StageContext<'_>) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for path in &ctx.options.fixes {
        let path = match std::fs::canonicalize(path) {
            Ok(path) => path,
            Err(err) => {
                log::warn!("skipping fix {}: {}", path.display(), err);
                continue;
            }
        };
        let tag = ctx
            .collaborators
            .tags
            .open(&path)
            .map_err(|err| err.for_subject(STAGE, path.display().to_string()))?;
        match tag.identifier() {
            Some(id) => {
                ctx.index.set_path(path, Status::Flush);
                ids.push(id);
            }
            None => log::warn!("skipping fix {}: no identifier tag", path.display()),
        }
    }
    Ok(ids)
}

/// Offers untagged local files that look like library tracks for tagging. A confirmed
/// file is tagged and moved to its canonical path.
fn reconcile(ctx: StageContext<'_>, lot: &Lot) -> Result<()> {
    let untagged = ctx.index.untagged();
    if untagged.is_empty() {
        return Ok(());
    }

    lot.set(format!("reconciling {} untagged files", untagged.len()));
    let mut library = Vec::new();
    ctx.collaborators
        .catalog
        .library(RECONCILE_LIMIT, &mut |track| {
            library.push(track);
            Ok(())
        })
        .map_err(|err| err.for_subject(STAGE, "library"))?;

    let prompt = ctx.collaborators.prompt.as_ref();
    let mut confirmed: HashSet<PathBuf> = HashSet::new();
    for (file, track) in reconcile_candidates(&untagged, &library) {
        if confirmed.contains(&file) || ctx.index.get(track, ctx.layout) == Some(Status::Installed) {
            continue;
        }
        prompt.show(&format!(
            "{} looks like {} by {}",
            file.display(),
            track.title,
            track.artists.join(", ")
        ));
        if !confirm(prompt, "tag it with this track?") {
            continue;
        }

        let mut tag = ctx
            .collaborators
            .tags
            .open(&file)
            .map_err(|err| err.for_track(STAGE, track))?;
        apply_track(tag.as_mut(), track);
        tag.save().map_err(|err| err.for_track(STAGE, track))?;
        drop(tag);

        let final_path = ctx.layout.final_path(track);
        if file != final_path {
            move_file(&file, &final_path).map_err(|err| err.for_track(STAGE, track))?;
        }
        ctx.index.set(track, ctx.layout, Status::Installed);
        log::info!("reconciled {} as {}", file.display(), track.id);
        confirmed.insert(file);
    }
    Ok(())
}
