//! Print the local files the manual mode would offer for a track, with their scores
//! Usage: cargo run --bin tracksync-rank -- <dir> <artist> <title>

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use tracksync::matcher::rank;
use tracksync::models::Track;
use tracksync::normalize::normalize_term;

#[derive(Parser)]
#[command(name = "tracksync-rank")]
#[command(about = "Rank local files against an artist and title")]
struct Args {
    dir: PathBuf,

    artist: String,

    title: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if !args.dir.is_dir() {
        bail!("{} is not a directory", args.dir.display());
    }

    let track = Track {
        title: args.title,
        artists: vec![args.artist],
        ..Track::default()
    };
    println!(
        "Ranking {} for \"{}\" / \"{}\"",
        args.dir.display(),
        normalize_term(track.primary_artist()),
        normalize_term(&track.title)
    );

    let ranked = rank(&args.dir, &track);
    if ranked.is_empty() {
        println!("  no candidates");
        return Ok(());
    }
    for (position, candidate) in ranked.iter().enumerate() {
        println!("  {:>2}. {:>4}  {}", position + 1, candidate.score, candidate.path.display());
    }
    Ok(())
}
