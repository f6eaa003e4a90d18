//! Per-format structural verification.
//!
//! | Category | Checker | Capability |
//! |---|---|---|
//! | Raster | [`raster::check_raster`] | full decode with the `image` crate |
//! | HDR | [`hdr::check_hdr`] | OpenEXR header validation with `exr` (feature `hdr`) |
//! | Movie | [`movie::MovieChecker`] | external `ffmpeg` decode, output scanned for markers (feature `movie`) |
//!
//! Checkers classify what they can: a file that fails its format's rules is
//! an `Ok(VerificationResult { valid: false, .. })`. Anything outside that
//! classification (unreadable file, tool failed to spawn, vanished file,
//! deadline exceeded) is a [`CheckError`] for the dispatcher to sort out.
//!
//! The [`CheckBackend`] trait is the seam between the dispatcher and the
//! checkers; [`DecoderBackend`] is the production implementation.

pub mod hdr;
pub mod movie;
pub mod raster;

use crate::category::CheckCategory;
use crate::config::MovieConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Verdict of one checker on one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,
}

impl VerificationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: "ok".to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The inspection tool reported the path missing. A path problem, not corruption.
    #[error("File not found during inspection: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Inspection of {} timed out after {}s", .path.display(), .after.as_secs())]
    Timeout { path: PathBuf, after: Duration },
    /// A decoder refused to allocate for a file that may well be intact.
    #[error("Decoder resource limit reached: {0}")]
    ResourceLimit(String),
    #[error("No {0} checker compiled into this build")]
    Unavailable(CheckCategory),
}

/// Runs the checker for a category against a file.
///
/// `Sync` so a single backend can serve every rayon worker.
pub trait CheckBackend: Sync {
    fn check(&self, category: CheckCategory, path: &Path)
    -> Result<VerificationResult, CheckError>;
}

/// Production backend wired to the real decoders.
#[derive(Debug, Clone)]
pub struct DecoderBackend {
    movie: movie::MovieChecker,
}

impl DecoderBackend {
    pub fn new(movie: &MovieConfig) -> Self {
        Self {
            movie: movie::MovieChecker::new(&movie.tool, movie.timeout()),
        }
    }
}

impl Default for DecoderBackend {
    fn default() -> Self {
        Self::new(&MovieConfig::default())
    }
}

impl CheckBackend for DecoderBackend {
    fn check(
        &self,
        category: CheckCategory,
        path: &Path,
    ) -> Result<VerificationResult, CheckError> {
        match category {
            CheckCategory::Raster => raster::check_raster(path),
            CheckCategory::Hdr => hdr::check_hdr(path),
            CheckCategory::Movie => self.movie.check(path),
        }
    }
}
