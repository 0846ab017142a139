//! Project / song / version lifecycle
//!
//! Creation ordering (song positions, version numbers), the single-favourite
//! rule, and deletes that take their media files with them.
//!
//! Deletes walk the tree explicitly inside one transaction: versions first
//! (returning their file paths), then the parents. Each statement is a write,
//! so the transaction holds the write lock from its first step. After commit
//! the files are removed best-effort. A failed commit leaves
//! every file in place; a failed file removal leaves an orphan file and a log
//! line, never a row pointing at a missing file.

use mixreview_common::storage::MediaStore;
use std::path::{Path, PathBuf};

pub mod projects;
pub mod songs;
pub mod versions;

pub use projects::{ClientProjectView, ProjectDetail, ProjectSummary, SongView};

/// Column list for `versions` rows, with `v` as the table alias
pub(crate) const VERSION_COLUMNS: &str = "v.id AS id, v.song_id AS song_id, \
     v.version_number AS version_number, v.label AS label, v.file_path AS file_path, \
     v.original_filename AS original_filename, v.favourite AS favourite, v.created_at AS created_at";

/// Remove every file in `paths`, then any folders they leave empty
pub(crate) async fn remove_media_files(store: &MediaStore, paths: &[String], dirs: &[PathBuf]) {
    for path in paths {
        store.remove_best_effort(Path::new(path)).await;
    }
    for dir in dirs {
        store.prune_dir(dir).await;
    }
}
