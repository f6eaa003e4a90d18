//! Per-file verification policy and the scan loop.
//!
//! For each candidate the [`Dispatcher`]:
//!
//! 1. Resolves the category (unclassified paths are skipped silently).
//! 2. Stats the file. A stat failure is `OTHER_ERROR`; a zero-byte file
//!    follows the [`EmptyFilePolicy`].
//! 3. Runs the category's checker through the [`CheckBackend`].
//! 4. Records exactly one [`Outcome`]:
//!
//! | Checker result | Outcome | Log level |
//! |---|---|---|
//! | valid | `OK` | info |
//! | invalid | category failure label | warn |
//! | [`CheckError::NotFound`] | `NOT_FOUND` | error |
//! | [`CheckError::Timeout`] | `TIMEOUT` | error |
//! | any other error, [`CheckError::ResourceLimit`] included | `OTHER_ERROR` | error |
//!
//! Nothing a single file does can end the scan. [`run`] wraps the loop with
//! preflight and builds the [`ScanSummary`] the report is printed from.

use crate::category::{CheckCategory, Classifier};
use crate::checks::{CheckBackend, CheckError, DecoderBackend};
use crate::config::{EmptyFilePolicy, ScanConfig, VerifyConfig, effective_jobs};
use crate::preflight::{Capabilities, PreflightError, preflight};
use crate::scan::{self, ScanError};
use crate::stats::{Outcome, Stats, StatsSnapshot};
use rayon::iter::{ParallelBridge, ParallelIterator};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error("Scan root not found or not a directory: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("Could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Preflight(e) => e.exit_code(),
            Self::RootNotFound(_) | Self::ThreadPool(_) => 1,
        }
    }
}

/// Applies the verification policy to one path at a time.
pub struct Dispatcher<'a, B: CheckBackend + ?Sized> {
    backend: &'a B,
    classifier: &'a Classifier,
    empty_files: EmptyFilePolicy,
}

impl<'a, B: CheckBackend + ?Sized> Dispatcher<'a, B> {
    pub fn new(backend: &'a B, classifier: &'a Classifier, empty_files: EmptyFilePolicy) -> Self {
        Self {
            backend,
            classifier,
            empty_files,
        }
    }

    /// Check `path` and record its outcome. Returns `None` when the file is
    /// not counted (unclassified, or empty under [`EmptyFilePolicy::Skip`]).
    pub fn dispatch(&self, path: &Path, stats: &Stats) -> Option<Outcome> {
        let category = self.classifier.classify(path)?;
        let outcome = self.verify(category, path)?;
        stats.record(outcome);
        Some(outcome)
    }

    /// Dispatch one walker item. Walk errors count as `OTHER_ERROR`.
    pub fn handle(&self, item: Result<PathBuf, ScanError>, stats: &Stats) -> Option<Outcome> {
        match item {
            Ok(path) => self.dispatch(&path, stats),
            Err(e) => {
                error!("{} {}: {e}", Outcome::OtherError, e.path().display());
                stats.record(Outcome::OtherError);
                Some(Outcome::OtherError)
            }
        }
    }

    fn verify(&self, category: CheckCategory, path: &Path) -> Option<Outcome> {
        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                error!("{} {}: {e}", Outcome::OtherError, path.display());
                return Some(Outcome::OtherError);
            }
        };
        if size == 0 {
            return match self.empty_files {
                EmptyFilePolicy::Skip => {
                    debug!("SKIP_EMPTY {}", path.display());
                    None
                }
                EmptyFilePolicy::Count => {
                    info!("{} {}", Outcome::Empty, path.display());
                    Some(Outcome::Empty)
                }
            };
        }

        info!("{} {}", category.open_tag(), path.display());
        match self.backend.check(category, path) {
            Ok(result) if result.valid => {
                info!("{} {}", Outcome::Ok, path.display());
                Some(Outcome::Ok)
            }
            Ok(result) => {
                let outcome = category.failure();
                warn!("{outcome} {}: {}", path.display(), result.message);
                Some(outcome)
            }
            Err(e @ CheckError::NotFound(_)) => {
                error!("{} {}: {e}", Outcome::NotFound, path.display());
                Some(Outcome::NotFound)
            }
            Err(e @ CheckError::Timeout { .. }) => {
                error!("{} {}: {e}", Outcome::Timeout, path.display());
                Some(Outcome::Timeout)
            }
            Err(e) => {
                error!("{} {}: {e}", Outcome::OtherError, path.display());
                Some(Outcome::OtherError)
            }
        }
    }
}

/// Walk `root` and dispatch every candidate into `stats`.
///
/// `scan.jobs == 1` runs on the calling thread in walk order. Anything else
/// bridges the lazy walk into a dedicated rayon pool of
/// [`effective_jobs`] workers.
pub fn scan_tree<B: CheckBackend + ?Sized>(
    dispatcher: &Dispatcher<'_, B>,
    root: &Path,
    scan: &ScanConfig,
    stats: &Stats,
) -> Result<(), RunError> {
    let walk = scan::candidates(root, dispatcher.classifier, scan.follow_links);
    let jobs = effective_jobs(scan.jobs);
    if jobs <= 1 {
        for item in walk {
            dispatcher.handle(item, stats);
        }
        return Ok(());
    }

    debug!("dispatching with {jobs} workers");
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    pool.install(|| {
        walk.par_bridge().for_each(|item| {
            dispatcher.handle(item, stats);
        })
    });
    Ok(())
}

/// What a completed run found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub categories: Vec<CheckCategory>,
    /// Number of files that landed in a counter.
    pub files: u64,
    pub counts: StatsSnapshot,
}

impl ScanSummary {
    pub fn new(root: &Path, categories: Vec<CheckCategory>, counts: StatsSnapshot) -> Self {
        Self {
            root: root.to_path_buf(),
            categories,
            files: counts.total(),
            counts,
        }
    }
}

/// Preflight, then verify `root` with the real decoders.
pub fn run(root: &Path, config: &VerifyConfig) -> Result<ScanSummary, RunError> {
    let categories = config.enabled_categories();
    let caps = Capabilities::detect(&categories, &config.movie);
    preflight(&categories, &caps)?;
    run_with_backend(&DecoderBackend::new(&config.movie), root, config)
}

/// Verify `root` with an arbitrary backend. Skips capability probing.
pub fn run_with_backend<B: CheckBackend + ?Sized>(
    backend: &B,
    root: &Path,
    config: &VerifyConfig,
) -> Result<ScanSummary, RunError> {
    let categories = config.enabled_categories();
    if categories.is_empty() {
        return Err(PreflightError::NothingToDo.into());
    }
    if !root.is_dir() {
        return Err(RunError::RootNotFound(root.to_path_buf()));
    }

    let classifier = Classifier::new(&categories, &config.extensions);
    let dispatcher = Dispatcher::new(backend, &classifier, config.scan.empty_files);
    let stats = Stats::new();
    info!("Scanning {}", root.display());
    scan_tree(&dispatcher, root, &config.scan, &stats)?;

    Ok(ScanSummary::new(root, categories, stats.snapshot()))
}
