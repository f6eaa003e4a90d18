//! OpenEXR verification.
//!
//! Reads and validates the magic number, version flags and every header in
//! the file with the `exr` crate. Any channel layout is accepted (RGB,
//! luminance only, depth, deep data); pixel data is not decoded. Compiled
//! only with the `hdr` feature; without it the category is refused at
//! preflight and [`check_hdr`] is never reached.

use super::{CheckError, VerificationResult};
use std::path::Path;

/// Whether this build carries the EXR library.
pub const AVAILABLE: bool = cfg!(feature = "hdr");

#[cfg(feature = "hdr")]
pub fn check_hdr(path: &Path) -> Result<VerificationResult, CheckError> {
    use exr::meta::MetaData;
    use std::io::BufReader;

    let file = std::fs::File::open(path)?;
    match MetaData::read_from_buffered(BufReader::new(file), false) {
        Ok(_) => Ok(VerificationResult::ok()),
        Err(e) => Ok(VerificationResult::invalid(format!(
            "could not read file: {e}"
        ))),
    }
}

#[cfg(not(feature = "hdr"))]
pub fn check_hdr(_path: &Path) -> Result<VerificationResult, CheckError> {
    Err(CheckError::Unavailable(crate::category::CheckCategory::Hdr))
}
