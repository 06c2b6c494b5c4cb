//! Post-processor: runs the processing chain on each downloaded asset.

use crossbeam_channel::{Receiver, Sender};

use super::{forward, StageContext};
use crate::error::Result;
use crate::models::Track;
use crate::progress::Lot;

const STAGE: &str = "processor";

pub(super) fn run(
    ctx: StageContext<'_>,
    lot: &Lot,
    input: Receiver<Track>,
    output: Sender<Track>,
) -> Result<()> {
    let mut processed = 0usize;
    for track in input {
        lot.set(format!("{} by {}", track.title, track.primary_artist()));
        let path = ctx.layout.download_path(&track);
        ctx.collaborators
            .processor
            .process(&track, &path)
            .map_err(|err| err.for_track(STAGE, &track))?;
        processed += 1;
        forward(&output, track, "installer")?;
    }
    lot.close(format!("{} processed", processed));
    Ok(())
}
