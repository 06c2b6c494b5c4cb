//! Stages that prepare the run: indexing and authentication.

use super::{SignalSender, StageContext};
use crate::error::Result;
use crate::progress::Lot;

pub(super) fn index(ctx: StageContext<'_>, lot: &Lot, done: SignalSender) -> Result<()> {
    let root = &ctx.layout.output_dir;
    lot.set(format!("scanning {}", root.display()));
    let added = ctx.index.build(root, ctx.collaborators.tags.as_ref())?;
    lot.close(format!(
        "{} tracks indexed, {} untagged",
        added,
        ctx.index.untagged().len()
    ));
    done.send(true);
    Ok(())
}

pub(super) fn authenticate(ctx: StageContext<'_>, lot: &Lot, done: SignalSender) -> Result<()> {
    lot.set("authenticating");
    ctx.collaborators.catalog.authenticate()?;
    lot.close("authenticated");
    done.send(true);
    Ok(())
}
