//! Local index: canonical file path to lifecycle status.
//!
//! Built once per run by scanning the output directory, then mutated by the stages
//! that resolve or install tracks. Entries are never removed.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::models::{Layout, Track, TRACK_FORMAT};
use crate::tags::TagStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Known remotely, pending action this run
    Online,
    /// Known locally but not resolvable online
    Offline,
    /// Final file present and tagged
    Installed,
    /// Re-fetch requested even when installed
    Flush,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Online, Status::Offline, Status::Installed, Status::Flush];
}

#[derive(Default)]
struct Entries {
    statuses: FxHashMap<PathBuf, Status>,
    untagged: Vec<PathBuf>,
}

#[derive(Default)]
pub struct Index {
    inner: Mutex<Entries>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // a poisoned map is still consistent: every write is a single insert
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Scans `root` for media files and seeds an Installed entry for every file whose
    /// tag carries an identifier. Returns the number of entries added.
    pub fn build(&self, root: &Path, tags: &dyn TagStore) -> Result<usize> {
        std::fs::read_dir(root).map_err(|source| SyncError::Index {
            root: root.to_path_buf(),
            source,
        })?;

        let files: Vec<PathBuf> = media_files(root).collect();
        log::debug!("index: {} media files under {}", files.len(), root.display());

        let scanned: Vec<(PathBuf, bool)> = files
            .into_par_iter()
            .filter_map(|path| match tags.open(&path) {
                Ok(tag) => {
                    let tagged = tag.identifier().is_some();
                    Some((path, tagged))
                }
                Err(err) => {
                    log::debug!("index: skipping {}: {}", path.display(), err);
                    None
                }
            })
            .collect();

        let mut entries = self.lock();
        let mut added = 0;
        for (path, tagged) in scanned {
            if tagged {
                if entries.statuses.insert(path, Status::Installed).is_none() {
                    added += 1;
                }
            } else {
                entries.untagged.push(path);
            }
        }
        Ok(added)
    }

    pub fn get(&self, track: &Track, layout: &Layout) -> Option<Status> {
        self.get_path(&layout.final_path(track))
    }

    pub fn get_path(&self, path: &Path) -> Option<Status> {
        self.lock().statuses.get(path).copied()
    }

    pub fn set(&self, track: &Track, layout: &Layout, status: Status) {
        self.set_path(layout.final_path(track), status);
    }

    pub fn set_path(&self, path: impl Into<PathBuf>, status: Status) {
        self.lock().statuses.insert(path.into(), status);
    }

    /// Number of entries whose status is in `filter`; an empty filter counts all.
    pub fn size(&self, filter: &[Status]) -> usize {
        let entries = self.lock();
        if filter.is_empty() {
            return entries.statuses.len();
        }
        entries
            .statuses
            .values()
            .filter(|status| filter.contains(status))
            .count()
    }

    /// Files found by `build` without an identifier, in scan order.
    pub fn untagged(&self) -> Vec<PathBuf> {
        self.lock().untagged.clone()
    }
}

/// Media files under `root`, sorted by file name within each directory.
pub fn media_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!("walk: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(TRACK_FORMAT))
                .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{Field, Id3Store};
    use tempfile::TempDir;

    fn write_tagged(path: &Path, id: Option<&str>) {
        std::fs::write(path, b"audio").unwrap();
        if let Some(id) = id {
            let mut tag = Id3Store.open(path).unwrap();
            tag.set(Field::Identifier, id);
            tag.save().unwrap();
        }
    }

    #[test]
    fn test_build_indexes_tagged_files_only() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("nested");
        std::fs::create_dir(&nested).unwrap();

        write_tagged(&tmp.path().join("A - One.mp3"), Some("1"));
        write_tagged(&nested.join("B - Two.mp3"), Some("2"));
        write_tagged(&tmp.path().join("c - three.mp3"), None);
        std::fs::write(tmp.path().join("notes.txt"), b"ignored").unwrap();

        let index = Index::new();
        let added = index.build(tmp.path(), &Id3Store).unwrap();

        assert_eq!(added, 2);
        assert_eq!(index.get_path(&tmp.path().join("A - One.mp3")), Some(Status::Installed));
        assert_eq!(index.get_path(&nested.join("B - Two.mp3")), Some(Status::Installed));
        assert_eq!(index.get_path(&tmp.path().join("c - three.mp3")), None);
        assert_eq!(index.untagged(), vec![tmp.path().join("c - three.mp3")]);
    }

    #[test]
    fn test_build_unreadable_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let err = Index::new().build(&missing, &Id3Store).unwrap_err();
        assert!(matches!(err, SyncError::Index { .. }));
    }

    #[test]
    fn test_size_sums_over_statuses() {
        let index = Index::new();
        index.set_path("/m/a.mp3", Status::Online);
        index.set_path("/m/b.mp3", Status::Offline);
        index.set_path("/m/c.mp3", Status::Installed);
        index.set_path("/m/d.mp3", Status::Flush);
        index.set_path("/m/a.mp3", Status::Installed); // overwrite, no new entry

        let total: usize = Status::ALL.iter().map(|s| index.size(&[*s])).sum();
        assert_eq!(index.size(&[]), 4);
        assert_eq!(total, index.size(&[]));
        assert_eq!(index.size(&[Status::Installed]), 2);
        assert_eq!(index.size(&[Status::Installed, Status::Offline]), 3);
    }

    #[test]
    fn test_track_lookup_resolves_final_path() {
        let layout = Layout::new("/music", "/cache");
        let track = Track {
            id: "123".to_string(),
            title: "Song - Remix".to_string(),
            artists: vec!["A.B.".to_string()],
            ..Track::default()
        };

        let index = Index::new();
        assert_eq!(index.get(&track, &layout), None);
        index.set(&track, &layout, Status::Online);
        assert_eq!(
            index.get_path(Path::new("/music/AB - Song (Remix).mp3")),
            Some(Status::Online)
        );
    }
}
