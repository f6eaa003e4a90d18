//! Candidate discovery.
//!
//! Walks the scan root lazily with `walkdir` and yields every regular file
//! whose name the [`Classifier`] routes to an enabled category. Paths are
//! produced one at a time so a huge tree is never held in memory; entries
//! within a directory are visited in filename order so repeated runs over
//! an unchanged tree see the same sequence.
//!
//! A symlink to a regular file is always a candidate. Links to directories
//! are only descended when `follow_links` is set.
//!
//! Unreadable directories and broken links surface as [`ScanError`] items
//! rather than ending the walk. The dispatcher counts them and moves on.

use crate::category::Classifier;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl ScanError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Walk { path, .. } => path,
        }
    }
}

/// Lazily walk `root`, yielding candidate paths in a stable order.
pub fn candidates<'a>(
    root: &Path,
    classifier: &'a Classifier,
    follow_links: bool,
) -> impl Iterator<Item = Result<PathBuf, ScanError>> + Send + 'a {
    let root_path = root.to_path_buf();
    WalkDir::new(root)
        .follow_links(follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                if !is_regular_file(&entry) {
                    return None;
                }
                classifier.classify(entry.path())?;
                Some(Ok(entry.into_path()))
            }
            Err(source) => {
                let path = source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root_path.clone());
                Some(Err(ScanError::Walk { path, source }))
            }
        })
}

/// Without `follow_links` walkdir reports a link as a link, so stat the target.
fn is_regular_file(entry: &walkdir::DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink() && std::fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file())
}
