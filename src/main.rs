use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use tracksync::catalog::Spotify;
use tracksync::config::Config;
use tracksync::downloader::{ArtworkTransform, Http, YtDlp};
use tracksync::index::Index;
use tracksync::init::init_directory;
use tracksync::lyrics::Lrclib;
use tracksync::models::Layout;
use tracksync::pipeline::{self, Collaborators, Options};
use tracksync::playlist::FORMATS;
use tracksync::processor::{Chain, FfmpegNormalizer, TagEmbedder};
use tracksync::progress::Progress;
use tracksync::prompt::TerminalPrompt;
use tracksync::provider::YouTube;
use tracksync::tags::{Id3Store, TagStore};

#[derive(Parser)]
#[command(name = "tracksync")]
#[command(about = "Synchronize a local music folder with a streaming catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, download and install catalog tracks, then write playlists
    Sync(SyncArgs),
    /// Tag untagged "Artist - Title.mp3" files with their catalog identifiers
    Init(InitArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Music folder (defaults to the user music directory)
    #[arg(short, long)]
    library: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,

    /// -v for info, -vv for debug
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args)]
struct SyncArgs {
    /// Music folder (defaults to the user music directory)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = "m3u", value_parser = clap::builder::PossibleValuesParser::new(FORMATS.iter().copied()))]
    playlist_encoding: String,

    /// Pick assets interactively instead of searching the provider
    #[arg(long)]
    manual: bool,

    /// Synchronize saved library tracks
    #[arg(long)]
    library: bool,

    /// Most recent saved tracks to synchronize (0 = no limit)
    #[arg(long, default_value = "0")]
    library_limit: usize,

    /// Playlist to synchronize and write as a playlist file
    #[arg(long = "playlist", value_name = "ID")]
    playlists: Vec<String>,

    /// Playlist whose tracks are synchronized without writing a playlist file
    #[arg(long = "playlist-tracks", value_name = "ID")]
    playlist_tracks: Vec<String>,

    #[arg(long = "album", value_name = "ID")]
    albums: Vec<String>,

    #[arg(long = "track", value_name = "ID")]
    tracks: Vec<String>,

    /// Installed file to download again
    #[arg(long = "fix", value_name = "PATH")]
    fixes: Vec<PathBuf>,

    /// Embed lyrics
    #[arg(long)]
    lyrics: bool,

    /// Offer to tag untagged local files that match library tracks
    #[arg(long)]
    reconcile: bool,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Log stage messages instead of drawing progress bars
    #[arg(long)]
    log_only: bool,

    /// Rayon worker threads (0 = one per core)
    #[arg(long, default_value = "0")]
    workers: usize,

    /// -v for info, -vv for debug
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn collaborators(config: &Config, progress: &Progress) -> Collaborators {
    let tags: Arc<dyn TagStore> = Arc::new(Id3Store);

    let mut chain = Chain::new();
    if config.processor.normalize {
        chain = chain.then(FfmpegNormalizer::new(&config.processor.ffmpeg));
    }
    let chain = chain.then(TagEmbedder::new(tags.clone()));

    Collaborators {
        catalog: Box::new(Spotify::new(config.catalog.clone())),
        provider: Box::new(YouTube::new(&config.provider.ytdlp, config.provider.results)),
        asset_downloader: Box::new(YtDlp::new(&config.provider.ytdlp)),
        artwork_downloader: Box::new(Http::new()),
        artwork_transform: Box::new(ArtworkTransform),
        lyrics: Box::new(Lrclib::new()),
        tags,
        processor: Box::new(chain),
        prompt: Box::new(TerminalPrompt::new(progress.clone())),
    }
}

fn sync(args: SyncArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let output = args.output.clone().unwrap_or_else(|| config.output_dir());
    std::fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;
    let output = std::fs::canonicalize(&output)
        .with_context(|| format!("Failed to resolve output directory {}", output.display()))?;
    let layout = Layout::new(output, config.cache_dir());
    log::info!(
        "syncing into {} (cache {})",
        layout.output_dir.display(),
        layout.cache_dir.display()
    );

    let options = Options {
        manual: args.manual,
        lyrics: args.lyrics,
        reconcile: args.reconcile,
        library: args.library,
        library_limit: args.library_limit,
        playlists: args.playlists,
        playlist_tracks: args.playlist_tracks,
        albums: args.albums,
        tracks: args.tracks,
        fixes: args.fixes,
        playlist_encoding: args.playlist_encoding,
        queue_capacity: config.pipeline.queue_capacity,
        install_capacity: config.pipeline.install_capacity,
    };

    let progress = Progress::new(args.log_only);
    let collaborators = collaborators(&config, &progress);
    let index = Index::new();

    let summary = pipeline::run(&index, &layout, &collaborators, &options, &progress)
        .map_err(|err| {
            log::error!("{}", err);
            err
        })
        .context("Synchronization failed")?;

    println!("\n{:=<60}", "");
    println!("Synchronization complete!");
    println!("{}", summary);
    println!("{:=<60}", "");

    Ok(())
}

fn init(args: InitArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let library = args.library.unwrap_or_else(|| config.output_dir());
    let layout = Layout::new(library.clone(), config.cache_dir());

    // prompts only, no stage bars
    let progress = Progress::new(true);
    let collaborators = collaborators(&config, &progress);
    collaborators
        .catalog
        .authenticate()
        .context("Failed to authenticate with the catalog")?;

    let summary = init_directory(&library, &collaborators, &layout)
        .with_context(|| format!("Failed to initialize {}", library.display()))?;

    println!("\n{:=<60}", "");
    println!("Initialization complete!");
    println!("  Tagged: {}", summary.tagged);
    println!("  Already tagged: {}", summary.already_tagged);
    println!("  Skipped: {}", summary.skipped);
    println!("  Failed: {}", summary.failed);
    println!("{:=<60}", "");

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Sync(args) => {
            init_logging(args.verbose);
            sync(args)
        }
        Command::Init(args) => {
            init_logging(args.verbose);
            init(args)
        }
    }
}
