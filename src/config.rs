//! Verification configuration.
//!
//! Configuration is layered. Each layer only needs the keys it wants to change:
//!
//! ```text
//! stock defaults                 (VerifyConfig::default)
//!   └── <root>/.media-verify.toml  (optional, per tree)
//!         └── --config <FILE>      (optional, must exist when given)
//!               └── CLI flags      (applied by the binary)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [scan]
//! categories = []          # any of "raster", "hdr", "movie"
//! follow_links = false     # follow symlinks while walking
//! empty_files = "skip"     # "skip" or "count" (EMPTY label)
//! jobs = 1                 # 1 = sequential, 0 = all cores
//!
//! [extensions]
//! raster = ["png", "jpg", "jpeg", "tif", "tiff", "webp", "gif", "bmp"]
//! hdr = ["exr"]
//! movie = ["mp4", "mov", "m4v", "mkv", "avi", "webm", "mpg", "mpeg", "mxf"]
//!
//! [movie]
//! tool = "ffmpeg"          # inspection tool, name or path
//! timeout_secs = 600       # max silence from the tool, 0 disables
//! ```
//!
//! Unknown keys are rejected to catch typos early. Extension lists must be
//! pairwise disjoint so every file maps to at most one checker.

use crate::category::{CheckCategory, normalize_extension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Per-tree config file picked up from the scan root.
pub const CONFIG_FILENAME: &str = ".media-verify.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    pub scan: ScanConfig,
    pub extensions: ExtensionsConfig,
    pub movie: MovieConfig,
}

impl VerifyConfig {
    /// Validate values and cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut owner: HashMap<String, CheckCategory> = HashMap::new();
        for category in CheckCategory::ALL {
            let list = self.extensions.for_category(category);
            if list.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "extensions.{} must not be empty",
                    category_key(category)
                )));
            }
            for ext in list {
                let normalized = normalize_extension(ext);
                if normalized.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "extensions.{} contains a blank entry",
                        category_key(category)
                    )));
                }
                match owner.get(&normalized) {
                    Some(&other) if other != category => {
                        return Err(ConfigError::Validation(format!(
                            "extension '{normalized}' is listed for both {} and {}",
                            category_key(other),
                            category_key(category)
                        )));
                    }
                    _ => {
                        owner.insert(normalized, category);
                    }
                }
            }
        }
        if self.movie.tool.trim().is_empty() {
            return Err(ConfigError::Validation(
                "movie.tool must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Enabled categories, deduplicated, in canonical order.
    pub fn enabled_categories(&self) -> Vec<CheckCategory> {
        CheckCategory::ALL
            .into_iter()
            .filter(|c| self.scan.categories.contains(c))
            .collect()
    }

    pub fn enable(&mut self, category: CheckCategory) {
        if !self.scan.categories.contains(&category) {
            self.scan.categories.push(category);
        }
    }
}

fn category_key(category: CheckCategory) -> &'static str {
    match category {
        CheckCategory::Raster => "raster",
        CheckCategory::Hdr => "hdr",
        CheckCategory::Movie => "movie",
    }
}

/// What to do with zero-byte candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EmptyFilePolicy {
    /// Neither pass nor fail: no check, no counter.
    #[default]
    Skip,
    /// Record under the `EMPTY` label without checking.
    Count,
}

/// Walk and dispatch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Categories to verify. CLI flags add to this list.
    pub categories: Vec<CheckCategory>,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Zero-byte file policy.
    pub empty_files: EmptyFilePolicy,
    /// Worker count: 1 runs sequentially, 0 uses every core.
    pub jobs: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            follow_links: false,
            empty_files: EmptyFilePolicy::Skip,
            jobs: 1,
        }
    }
}

/// Resolve the effective worker count.
///
/// - `0` → all available cores
/// - `n` → `min(n, cores)` (user can constrain down, not up)
pub fn effective_jobs(jobs: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if jobs == 0 { cores } else { jobs.min(cores) }
}

/// Extension lists per category, without the leading dot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionsConfig {
    pub raster: Vec<String>,
    pub hdr: Vec<String>,
    pub movie: Vec<String>,
}

impl ExtensionsConfig {
    pub fn for_category(&self, category: CheckCategory) -> &[String] {
        match category {
            CheckCategory::Raster => &self.raster,
            CheckCategory::Hdr => &self.hdr,
            CheckCategory::Movie => &self.movie,
        }
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        let owned = |c: CheckCategory| {
            c.default_extensions()
                .iter()
                .map(|e| e.to_string())
                .collect()
        };
        Self {
            raster: owned(CheckCategory::Raster),
            hdr: owned(CheckCategory::Hdr),
            movie: owned(CheckCategory::Movie),
        }
    }
}

/// External movie inspection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovieConfig {
    /// Tool binary name (resolved through `PATH`) or path.
    pub tool: String,
    /// Seconds the tool may go without printing before the file is
    /// abandoned. `0` waits forever.
    pub timeout_secs: u64,
}

impl MovieConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            tool: "ffmpeg".to_string(),
            timeout_secs: 600,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a `toml::Value::Table`, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(VerifyConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so an
///   overlay extension list replaces the stock list rather than extending it.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a TOML file as a raw value. `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays in order onto `base`, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<VerifyConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: VerifyConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration for a scan of `root`.
///
/// Layers `<root>/.media-verify.toml` (if present) and then `explicit`
/// (which must exist) on top of the stock defaults.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<VerifyConfig, ConfigError> {
    let mut overlays = Vec::new();
    if let Some(tree_config) = load_raw_config(&root.join(CONFIG_FILENAME))? {
        overlays.push(tree_config);
    }
    if let Some(path) = explicit {
        match load_raw_config(path)? {
            Some(value) => overlays.push(value),
            None => return Err(ConfigError::NotFound(path.to_path_buf())),
        }
    }
    resolve_config(stock_defaults_value(), overlays)
}

/// A fully commented stock config file. Printed by `--print-config`.
pub fn stock_config_toml() -> &'static str {
    r#"# media-verify configuration
# ==========================
# All settings are optional; values below are the defaults.
#
# Place this file as `.media-verify.toml` in the scan root, or pass it
# with `--config <FILE>`. CLI flags override both. Unknown keys are errors.

[scan]
# Categories to verify: "raster", "hdr", "movie".
# The --raster / --hdr / --movies flags add to this list.
categories = []

# Follow symbolic links while walking the tree.
follow_links = false

# Zero-byte files: "skip" leaves them out of every counter,
# "count" records them under EMPTY without checking.
empty_files = "skip"

# Parallel workers. 1 = sequential, 0 = one per CPU core.
jobs = 1

[extensions]
# Lowercase suffixes per category. The lists must not overlap.
raster = ["png", "jpg", "jpeg", "tif", "tiff", "webp", "gif", "bmp"]
hdr = ["exr"]
movie = ["mp4", "mov", "m4v", "mkv", "avi", "webm", "mpg", "mpeg", "mxf"]

[movie]
# Inspection tool, resolved through PATH unless given as a path.
tool = "ffmpeg"

# Seconds of silence from the tool before an inspection is abandoned and
# counted as TIMEOUT. A long movie that keeps reporting progress never
# times out. 0 waits forever.
timeout_secs = 600
"#
}
