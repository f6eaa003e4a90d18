//! Raster image verification through a full decode.
//!
//! The format is sniffed from the file's magic bytes first and falls back
//! to the extension, so a `.jpg` that is really a PNG still decodes.
//! Any decoder error, including truncated data, is an invalid verdict
//! carrying the decoder's own message.
//!
//! Large scans and panoramas are legitimate, so decoding runs without the
//! `image` crate's default size and allocation caps. When a cap is set and
//! hit anyway, that is a [`CheckError::ResourceLimit`], not corruption.
//! Failing to open the file at all is a [`CheckError`] too.

use super::{CheckError, VerificationResult};
use image::{ImageError, ImageReader, Limits};
use std::path::Path;

pub fn check_raster(path: &Path) -> Result<VerificationResult, CheckError> {
    check_raster_with_limits(path, Limits::no_limits())
}

pub fn check_raster_with_limits(
    path: &Path,
    limits: Limits,
) -> Result<VerificationResult, CheckError> {
    let reader = ImageReader::open(path)?;
    let mut reader = match reader.with_guessed_format() {
        Ok(r) => r,
        Err(e) => return Ok(VerificationResult::invalid(e.to_string())),
    };
    reader.limits(limits);
    match reader.decode() {
        Ok(_) => Ok(VerificationResult::ok()),
        Err(ImageError::Limits(e)) => Err(CheckError::ResourceLimit(e.to_string())),
        Err(e) => Ok(VerificationResult::invalid(e.to_string())),
    }
}
