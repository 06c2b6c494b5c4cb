//! Mixer: writes one playlist file per requested playlist.

use crossbeam_channel::Receiver;

use super::{SignalReceiver, StageContext};
use crate::error::Result;
use crate::index::Status;
use crate::models::Playlist;
use crate::playlist::encoder;
use crate::progress::Lot;

const STAGE: &str = "mixer";

pub(super) fn run(
    ctx: StageContext<'_>,
    lot: &Lot,
    installed: SignalReceiver,
    input: Receiver<Playlist>,
) -> Result<()> {
    if !installed.wait() {
        lot.close("skipped");
        return Ok(());
    }

    let mut written = 0usize;
    for playlist in input {
        lot.set(playlist.name.clone());
        mix_playlist(ctx, &playlist)
            .map_err(|err| err.for_subject(STAGE, format!("playlist {} ({})", playlist.name, playlist.id)))?;
        written += 1;
    }
    lot.close(format!("{} playlists written", written));
    Ok(())
}

fn mix_playlist(ctx: StageContext<'_>, playlist: &Playlist) -> Result<()> {
    let mut encoder = encoder(&ctx.options.playlist_encoding, playlist, &ctx.layout.output_dir)?;
    let mut added = 0usize;
    for track in &playlist.tracks {
        if matches!(
            ctx.index.get(track, ctx.layout),
            Some(Status::Installed) | Some(Status::Offline)
        ) {
            encoder.add(track)?;
            added += 1;
        }
    }
    let path = encoder.close()?;
    log::info!("wrote {} ({} of {} tracks)", path.display(), added, playlist.tracks.len());
    Ok(())
}
