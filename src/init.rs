//! Adopts an existing music folder: untagged "Artist - Title.mp3" files are tagged with
//! the catalog track they name, so later synchronizations treat them as installed.

use std::path::Path;

use crate::error::{Result, SyncError};
use crate::index::media_files;
use crate::models::{Layout, Track};
use crate::pipeline::Collaborators;
use crate::prompt::Prompt;
use crate::tags::apply_track;

const STAGE: &str = "init";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitSummary {
    pub tagged: usize,
    pub already_tagged: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Tagged(String),
    AlreadyTagged,
    Skipped,
}

/// Artist and title of an "Artist - Title.mp3" file. The title loses everything from
/// its first parenthesis, so "(feat. X)" and "(Live)" suffixes do not hurt the search.
pub fn parse_file_name(path: &Path) -> Option<(String, String)> {
    let stem = path.file_stem()?.to_str()?;
    let (artist, title) = stem.split_once(" - ")?;
    let title = match title.find('(') {
        Some(position) => &title[..position],
        None => title,
    };
    let (artist, title) = (artist.trim(), title.trim());
    if artist.is_empty() || title.is_empty() {
        return None;
    }
    Some((artist.to_string(), title.to_string()))
}

/// Tags every untagged media file under `dir`. A file that cannot be handled is
/// logged and counted as failed; only an unusable `dir` aborts.
pub fn init_directory(dir: &Path, collaborators: &Collaborators, layout: &Layout) -> Result<InitSummary> {
    if !dir.is_dir() {
        return Err(SyncError::Input(format!("{} is not a directory", dir.display())));
    }

    let mut summary = InitSummary::default();
    for path in media_files(dir) {
        match init_file(&path, collaborators, layout) {
            Ok(Outcome::Tagged(id)) => {
                log::info!("tagged {} as {}", path.display(), id);
                summary.tagged += 1;
            }
            Ok(Outcome::AlreadyTagged) => {
                log::debug!("{} already tagged", path.display());
                summary.already_tagged += 1;
            }
            Ok(Outcome::Skipped) => {
                log::info!("skipped {}", path.display());
                summary.skipped += 1;
            }
            Err(err) => {
                log::warn!("{}", err.for_subject(STAGE, path.display().to_string()));
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

fn init_file(path: &Path, collaborators: &Collaborators, layout: &Layout) -> Result<Outcome> {
    let mut tag = collaborators.tags.open(path)?;
    if tag.identifier().is_some() {
        return Ok(Outcome::AlreadyTagged);
    }

    let (artist, title) = parse_file_name(path)
        .ok_or_else(|| SyncError::Input("file name is not \"Artist - Title\"".to_string()))?;
    let results = collaborators.catalog.search(&artist, &title)?;
    let Some(found) = choose(collaborators.prompt.as_ref(), &artist, &title, &results)? else {
        return Ok(Outcome::Skipped);
    };

    let mut ignore = |_: Track| -> Result<()> { Ok(()) };
    let mut track = collaborators.catalog.track(&found.id, &mut ignore)?;
    if !track.artwork.url.is_empty() {
        let data = collaborators.artwork_downloader.download_bytes(
            &track.artwork.url,
            &layout.artwork_path(&track),
            Some(collaborators.artwork_transform.as_ref()),
        )?;
        track.artwork.data = Some(data);
    }

    apply_track(tag.as_mut(), &track);
    if let Some(data) = track.artwork.data.take() {
        tag.set_picture("image/jpeg", data);
    }
    tag.save()?;
    Ok(Outcome::Tagged(track.id))
}

/// A first result with the exact title, or a lone result, is taken as is. Otherwise the
/// user picks by number and an empty answer skips.
fn choose<'a>(
    prompt: &dyn Prompt,
    artist: &str,
    title: &str,
    results: &'a [Track],
) -> Result<Option<&'a Track>> {
    match results {
        [] => {
            log::info!("no catalog match for {} - {}", artist, title);
            return Ok(None);
        }
        [first, ..] if first.title == title => return Ok(Some(first)),
        [only] => return Ok(Some(only)),
        _ => {}
    }

    prompt.show(&format!("no exact match for {} - {}", artist, title));
    for (position, track) in results.iter().enumerate() {
        prompt.show(&format!(
            "[{}] {} - {} (album: {}) https://open.spotify.com/track/{}",
            position + 1,
            track.primary_artist(),
            track.title,
            track.album,
            track.id
        ));
    }
    let Some(answer) = prompt.read_line("track number, empty to skip: ") else {
        return Ok(None);
    };
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=results.len()).contains(&n) => Ok(Some(&results[n - 1])),
        _ => Err(SyncError::Input(format!("invalid choice {:?}", answer))),
    }
}
