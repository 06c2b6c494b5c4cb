//! Installer: places processed assets at their canonical paths.

use std::path::Path;

use crossbeam_channel::Receiver;

use super::{SignalSender, StageContext};
use crate::error::Result;
use crate::index::Status;
use crate::models::Track;
use crate::progress::Lot;

const STAGE: &str = "installer";

pub(super) fn run(
    ctx: StageContext<'_>,
    lot: &Lot,
    input: Receiver<Track>,
    done: SignalSender,
) -> Result<()> {
    let mut installed = 0usize;
    for track in input {
        lot.set(format!("{} by {}", track.title, track.primary_artist()));
        install_track(ctx, &track).map_err(|err| err.for_track(STAGE, &track))?;
        installed += 1;
    }
    lot.close(format!("{} installed", installed));
    done.send(true);
    Ok(())
}

fn install_track(ctx: StageContext<'_>, track: &Track) -> Result<()> {
    let source = ctx.layout.download_path(track);
    let destination = ctx.layout.final_path(track);

    if ctx.index.get(track, ctx.layout) == Some(Status::Flush) {
        // flushed assets stay cached
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, &destination)?;
    } else {
        move_file(&source, &destination)?;
    }

    ctx.index.set(track, ctx.layout, Status::Installed);
    log::info!("installed {}", destination.display());
    Ok(())
}

/// Renames `source` to `destination`, copying across filesystems.
pub(super) fn move_file(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(source, destination).is_err() {
        std::fs::copy(source, destination)?;
        std::fs::remove_file(source)?;
    }
    Ok(())
}
