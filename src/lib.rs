//! # Media Verify
//!
//! Corruption detection for media assets. Walks a directory tree, routes each
//! file to a checker by extension, asks the format's decoder whether the file
//! is structurally sound, and reports how many files landed in each outcome.
//! Nothing is repaired, converted, or rewritten.
//!
//! # Pipeline
//!
//! ```text
//! flags + config  →  preflight  →  walk  →  dispatch  →  stats  →  report
//!                    (abort?)      lazy     one outcome   atomic
//!                                           per file      counters
//! ```
//!
//! Preflight is the only stage allowed to end a run early. Once the walk has
//! started, every per-file problem becomes a counted outcome and the scan
//! moves on.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`category`] | `CheckCategory` and the extension `Classifier` |
//! | [`checks`] | Raster, HDR and movie checkers behind the `CheckBackend` trait |
//! | [`scan`] | Lazy, sorted directory walk yielding candidate paths |
//! | [`dispatch`] | Per-file verification policy, sequential or rayon scan loop, `run` |
//! | [`stats`] | Outcome labels and the thread-safe aggregator |
//! | [`preflight`] | Capability registry, tool probe, startup exit codes |
//! | [`config`] | Layered `.media-verify.toml` loading, merging and validation |
//! | [`output`] | Report formatting: text table and JSON |
//!
//! # Optional Capabilities
//!
//! | Feature | Enables | Without it |
//! |---|---|---|
//! | `hdr` (default) | OpenEXR header validation via the `exr` crate | `--hdr` exits with code 4 |
//! | `movie` (default) | movie checks through an external `ffmpeg` | `--movies` exits with code 5 |
//!
//! Raster checks are always available: the `image` crate is compiled in with
//! PNG, JPEG, TIFF, WebP, GIF and BMP decoders.

pub mod category;
pub mod checks;
pub mod config;
pub mod dispatch;
pub mod output;
pub mod preflight;
pub mod scan;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_helpers;
