//! Synchronization pipeline.
//!
//! Stages run as scoped threads connected by bounded queues. Readiness between stages
//! that do not share a queue is expressed with one-shot signals. Each stage owns the
//! senders it produces into; returning drops them, which closes the queue and lets the
//! consumer drain and exit. Shutdown therefore cascades downstream on success and on
//! failure alike.

mod collect;
mod decide;
mod fetch;
mod install;
mod mix;
mod process;
mod setup;

use std::fmt;
use std::sync::Arc;
use std::thread::{Builder, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::catalog::Catalog;
use crate::downloader::{Downloader, Transform};
use crate::error::{Result, SyncError};
use crate::index::{Index, Status};
use crate::lyrics::LyricsProvider;
use crate::models::{Layout, Playlist, Track};
use crate::processor::Processor;
use crate::prompt::Prompt;
use crate::progress::{format_duration, Lot, Progress};
use crate::provider::AssetProvider;
use crate::tags::TagStore;

pub use decide::{decide_track, Decision};

// ============================================================================
// Signals
// ============================================================================

/// Producing half of a one-shot readiness signal
pub struct SignalSender(Sender<bool>);

/// Consuming half. A sender dropped without sending reads as `false`.
pub struct SignalReceiver(Receiver<bool>);

pub fn signal() -> (SignalSender, SignalReceiver) {
    let (tx, rx) = bounded(1);
    (SignalSender(tx), SignalReceiver(rx))
}

impl SignalSender {
    pub fn send(self, ready: bool) {
        // the receiver may already be gone if its stage failed
        let _ = self.0.send(ready);
    }
}

impl SignalReceiver {
    pub fn wait(&self) -> bool {
        self.0.recv().unwrap_or(false)
    }
}

/// Sends `item` downstream, failing when the consumer has exited.
pub(crate) fn forward<T>(queue: &Sender<T>, item: T, consumer: &'static str) -> Result<()> {
    queue.send(item).map_err(|_| SyncError::QueueClosed(consumer))
}

// ============================================================================
// Wiring
// ============================================================================

/// Every queue and signal of one run
pub struct Wiring {
    pub indexed: (SignalSender, SignalReceiver),
    pub authenticated: (SignalSender, SignalReceiver),
    pub decide: (Sender<Track>, Receiver<Track>),
    pub collect: (Sender<Track>, Receiver<Track>),
    pub process: (Sender<Track>, Receiver<Track>),
    pub install: (Sender<Track>, Receiver<Track>),
    pub mix: (Sender<Playlist>, Receiver<Playlist>),
    pub installed: (SignalSender, SignalReceiver),
}

impl Wiring {
    pub fn new(capacity: usize, install_capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            indexed: signal(),
            authenticated: signal(),
            decide: bounded(capacity),
            collect: bounded(capacity),
            process: bounded(capacity),
            install: bounded(install_capacity.max(1)),
            // drained only after the install signal
            mix: unbounded(),
            installed: signal(),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// What to synchronize and how
#[derive(Clone, Debug)]
pub struct Options {
    pub manual: bool,
    pub lyrics: bool,
    pub reconcile: bool,
    pub library: bool,
    pub library_limit: usize,
    pub playlists: Vec<String>,
    pub playlist_tracks: Vec<String>,
    pub albums: Vec<String>,
    pub tracks: Vec<String>,
    pub fixes: Vec<std::path::PathBuf>,
    pub playlist_encoding: String,
    pub queue_capacity: usize,
    pub install_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            manual: false,
            lyrics: false,
            reconcile: false,
            library: false,
            library_limit: 0,
            playlists: Vec::new(),
            playlist_tracks: Vec::new(),
            albums: Vec::new(),
            tracks: Vec::new(),
            fixes: Vec::new(),
            playlist_encoding: "m3u".to_string(),
            queue_capacity: 10_000,
            install_capacity: 10,
        }
    }
}

/// External services the stages depend on
pub struct Collaborators {
    pub catalog: Box<dyn Catalog>,
    pub provider: Box<dyn AssetProvider>,
    pub asset_downloader: Box<dyn Downloader>,
    pub artwork_downloader: Box<dyn Downloader>,
    pub artwork_transform: Box<dyn Transform>,
    pub lyrics: Box<dyn LyricsProvider>,
    pub tags: Arc<dyn TagStore>,
    pub processor: Box<dyn Processor>,
    pub prompt: Box<dyn Prompt>,
}

/// Shared, read-only view handed to every stage
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub index: &'a Index,
    pub layout: &'a Layout,
    pub collaborators: &'a Collaborators,
    pub options: &'a Options,
}

// ============================================================================
// Orchestrator
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub installed: usize,
    pub online: usize,
    pub offline: usize,
    pub flush: usize,
    pub elapsed: Duration,
}

impl Summary {
    fn of(index: &Index, started: Instant) -> Self {
        Self {
            installed: index.size(&[Status::Installed]),
            online: index.size(&[Status::Online]),
            offline: index.size(&[Status::Offline]),
            flush: index.size(&[Status::Flush]),
            elapsed: started.elapsed(),
        }
    }
}

/// One line per status, then the elapsed time
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Installed: {}", self.installed)?;
        writeln!(f, "  Online: {}", self.online)?;
        writeln!(f, "  Offline: {}", self.offline)?;
        writeln!(f, "  Flush: {}", self.flush)?;
        write!(f, "  Elapsed: {}", format_duration(self.elapsed))
    }
}

type Handle<'scope> = (&'static str, ScopedJoinHandle<'scope, Result<()>>);

fn spawn<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    handles: &mut Vec<Handle<'scope>>,
    progress: &Progress,
    name: &'static str,
    stage: F,
) -> Result<()>
where
    F: FnOnce(&Lot) -> Result<()> + Send + 'scope,
{
    let lot = progress.lot(name);
    let handle = Builder::new()
        .name(name.to_string())
        .spawn_scoped(scope, move || stage(&lot))?;
    handles.push((name, handle));
    Ok(())
}

/// First failure in stage order. Queue-closed errors are consequences of a downstream
/// failure, so they are reported only when nothing else failed.
fn first_failure(results: Vec<(&'static str, Result<()>)>) -> Result<()> {
    let mut closed = None;
    for (name, result) in results {
        match result {
            Ok(()) => {}
            Err(SyncError::QueueClosed(consumer)) => {
                log::debug!("{}: {} queue closed", name, consumer);
                if closed.is_none() {
                    closed = Some(SyncError::QueueClosed(consumer));
                }
            }
            Err(err) => return Err(err),
        }
    }
    closed.map_or(Ok(()), Err)
}

/// Runs every stage to completion and returns the final index counts.
pub fn run(
    index: &Index,
    layout: &Layout,
    collaborators: &Collaborators,
    options: &Options,
    progress: &Progress,
) -> Result<Summary> {
    let started = Instant::now();
    let ctx = StageContext {
        index,
        layout,
        collaborators,
        options,
    };

    let Wiring {
        indexed: (indexed_tx, indexed_rx),
        authenticated: (authenticated_tx, authenticated_rx),
        decide: (decide_tx, decide_rx),
        collect: (collect_tx, collect_rx),
        process: (process_tx, process_rx),
        install: (install_tx, install_rx),
        mix: (mix_tx, mix_rx),
        installed: (installed_tx, installed_rx),
    } = Wiring::new(options.queue_capacity, options.install_capacity);

    let results = std::thread::scope(|scope| -> Result<Vec<(&'static str, Result<()>)>> {
        let mut handles = Vec::new();
        let h = &mut handles;
        spawn(scope, h, progress, "indexer", move |lot| setup::index(ctx, lot, indexed_tx))?;
        spawn(scope, h, progress, "authenticator", move |lot| {
            setup::authenticate(ctx, lot, authenticated_tx)
        })?;
        spawn(scope, h, progress, "fetcher", move |lot| {
            fetch::run(ctx, lot, indexed_rx, authenticated_rx, decide_tx, mix_tx)
        })?;
        spawn(scope, h, progress, "decider", move |lot| decide::run(ctx, lot, decide_rx, collect_tx))?;
        spawn(scope, h, progress, "collector", move |lot| {
            collect::run(ctx, lot, collect_rx, process_tx)
        })?;
        spawn(scope, h, progress, "processor", move |lot| {
            process::run(ctx, lot, process_rx, install_tx)
        })?;
        spawn(scope, h, progress, "installer", move |lot| {
            install::run(ctx, lot, install_rx, installed_tx)
        })?;
        spawn(scope, h, progress, "mixer", move |lot| mix::run(ctx, lot, installed_rx, mix_rx))?;

        Ok(handles
            .into_iter()
            .map(|(name, handle)| {
                let result = handle.join().unwrap_or_else(|_| Err(SyncError::Panic(name)));
                if let Err(err) = &result {
                    log::debug!("{} exited: {}", name, err);
                }
                (name, result)
            })
            .collect())
    })?;

    first_failure(results)?;
    Ok(Summary::of(index, started))
}
