//! Decider: determines per track whether a remote asset is needed.

use std::path::Path;

use crossbeam_channel::{Receiver, Sender};

use super::{forward, StageContext};
use crate::error::Result;
use crate::index::Status;
use crate::matcher::rank;
use crate::models::{best_match, Track};
use crate::progress::Lot;
use crate::prompt::{select, Choice};
use crate::tags::{apply_track, Field};

const STAGE: &str = "decider";

/// Outcome for one track
#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    /// Final file present with the right identifier
    Installed,
    /// Final file present, identifier rewritten
    Repaired,
    /// Already pending or terminal in this run
    Skipped,
    /// Resolved from a local file picked by the user
    Resolved,
    /// Needs the asset at `upstream_url`
    Fetch(Track),
}

pub(super) fn run(
    ctx: StageContext<'_>,
    lot: &Lot,
    input: Receiver<Track>,
    output: Sender<Track>,
) -> Result<()> {
    let mut forwarded = 0usize;
    let mut skipped = 0usize;
    for track in input {
        lot.set(format!("{} by {}", track.title, track.primary_artist()));
        match decide_track(ctx, track)? {
            Decision::Fetch(track) => {
                forwarded += 1;
                forward(&output, track, "collector")?;
            }
            Decision::Skipped => skipped += 1,
            Decision::Installed | Decision::Repaired | Decision::Resolved => {}
        }
    }
    lot.close(format!("{} to fetch, {} skipped", forwarded, skipped));
    Ok(())
}

pub fn decide_track(ctx: StageContext<'_>, mut track: Track) -> Result<Decision> {
    let index = ctx.index;
    let final_path = ctx.layout.final_path(&track);

    // a flushed track is re-fetched even if its file is in place
    if index.get(&track, ctx.layout) != Some(Status::Flush) && final_path.is_file() {
        match check_installed(ctx, &track, &final_path) {
            Ok(decision) => {
                index.set(&track, ctx.layout, Status::Installed);
                return Ok(decision);
            }
            Err(err) => log::warn!("cannot read tag of {}: {}", final_path.display(), err),
        }
    }

    match index.get(&track, ctx.layout) {
        None => index.set(&track, ctx.layout, Status::Online),
        Some(Status::Online) => {
            log::debug!("{} already pending", track.id);
            return Ok(Decision::Skipped);
        }
        Some(Status::Offline) => return Ok(Decision::Skipped),
        Some(Status::Installed) | Some(Status::Flush) => {}
    }

    if ctx.options.manual {
        return decide_manually(ctx, track);
    }

    let matches = ctx
        .collaborators
        .provider
        .search(&track)
        .map_err(|err| err.for_track(STAGE, &track))?;
    match best_match(&matches) {
        Some(best) => {
            log::debug!("{} matched {} (score {})", track.id, best.url, best.score);
            track.upstream_url = Some(best.url.clone());
            Ok(Decision::Fetch(track))
        }
        None => {
            log::warn!(
                "no match for {} by {} (id: {}), skipping",
                track.title,
                track.primary_artist(),
                track.id
            );
            Ok(Decision::Skipped)
        }
    }
}

/// Compares the identifier tagged on an existing final file, repairing it if needed.
fn check_installed(ctx: StageContext<'_>, track: &Track, path: &Path) -> Result<Decision> {
    let mut tag = ctx.collaborators.tags.open(path)?;
    if tag.identifier().as_deref() == Some(track.id.as_str()) {
        return Ok(Decision::Installed);
    }
    log::info!("repairing identifier of {}", path.display());
    tag.set(Field::Identifier, &track.id);
    tag.save()?;
    Ok(Decision::Repaired)
}

fn decide_manually(ctx: StageContext<'_>, mut track: Track) -> Result<Decision> {
    let prompt = ctx.collaborators.prompt.as_ref();
    prompt.show(&format!(
        "{} by {} ({}s)",
        track.title,
        track.artists.join(", "),
        track.duration
    ));
    let Some(answer) = prompt.read_line("[0] skip  [1] enter URL  [2] search local files [2]: ") else {
        log::info!("input closed, skipping {}", track.id);
        return Ok(Decision::Skipped);
    };
    match answer.trim() {
        "0" => Ok(Decision::Skipped),
        "1" => {
            let url = prompt.read_line("URL: ").unwrap_or_default();
            let url = url.trim();
            if url.is_empty() {
                return Ok(Decision::Skipped);
            }
            track.upstream_url = Some(url.to_string());
            Ok(Decision::Fetch(track))
        }
        "" | "2" => pick_local(ctx, track),
        other => {
            log::warn!("unknown option {:?}, skipping {}", other, track.id);
            Ok(Decision::Skipped)
        }
    }
}

fn pick_local(ctx: StageContext<'_>, track: Track) -> Result<Decision> {
    let prompt = ctx.collaborators.prompt.as_ref();
    let ranked = rank(&ctx.layout.output_dir, &track);
    if ranked.is_empty() {
        prompt.show("no local candidates");
        return Ok(Decision::Skipped);
    }

    let options: Vec<String> = ranked
        .iter()
        .map(|candidate| {
            let name = candidate
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{} ({})", name, candidate.score)
        })
        .collect();

    let picked = match select(prompt, "pick a file, 0 to cancel", &options) {
        Choice::Picked(position) => &ranked[position].path,
        Choice::Cancelled => return Ok(Decision::Skipped),
        Choice::Invalid(answer) => {
            log::warn!("invalid selection {:?}, skipping {}", answer, track.id);
            return Ok(Decision::Skipped);
        }
    };

    let mut tag = ctx
        .collaborators
        .tags
        .open(picked)
        .map_err(|err| err.for_track(STAGE, &track))?;
    apply_track(tag.as_mut(), &track);
    tag.save().map_err(|err| err.for_track(STAGE, &track))?;
    drop(tag);

    let final_path = ctx.layout.final_path(&track);
    if picked != &final_path {
        super::install::move_file(picked, &final_path).map_err(|err| err.for_track(STAGE, &track))?;
    }
    ctx.index.set(&track, ctx.layout, Status::Installed);
    log::info!("{} resolved from {}", track.id, picked.display());
    Ok(Decision::Resolved)
}
