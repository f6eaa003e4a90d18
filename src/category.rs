//! Check categories and extension-based classification.
//!
//! Every candidate file is routed to exactly one [`CheckCategory`] by its
//! lowercase filename suffix:
//!
//! | Category | Default extensions | Failure label |
//! |---|---|---|
//! | `raster` | png, jpg, jpeg, tif, tiff, webp, gif, bmp | `RASTER_ERROR` |
//! | `hdr` | exr | `HDR_ERROR` |
//! | `movie` | mp4, mov, m4v, mkv, avi, webm, mpg, mpeg, mxf | `MOVIE_ERROR` |
//!
//! Extension lists are configurable (see [`crate::config::ExtensionsConfig`]),
//! and config validation guarantees they are pairwise disjoint. A `.exr` file
//! therefore never also matches a raster rule, and the first match is the only
//! match.

use crate::config::ExtensionsConfig;
use crate::stats::Outcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A class of file extensions routed to the same checker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Raster,
    Hdr,
    Movie,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 3] = [Self::Raster, Self::Hdr, Self::Movie];

    pub fn default_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Raster => &["png", "jpg", "jpeg", "tif", "tiff", "webp", "gif", "bmp"],
            Self::Hdr => &["exr"],
            Self::Movie => &[
                "mp4", "mov", "m4v", "mkv", "avi", "webm", "mpg", "mpeg", "mxf",
            ],
        }
    }

    /// The counter a structural decode failure in this category lands in.
    pub fn failure(self) -> Outcome {
        match self {
            Self::Raster => Outcome::RasterError,
            Self::Hdr => Outcome::HdrError,
            Self::Movie => Outcome::MovieError,
        }
    }

    /// Log tag emitted when a file of this category is opened.
    pub fn open_tag(self) -> &'static str {
        match self {
            Self::Raster | Self::Hdr => "OPEN_IMAGE",
            Self::Movie => "OPEN_MOVIE",
        }
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Raster => "raster image",
            Self::Hdr => "HDR image",
            Self::Movie => "movie",
        })
    }
}

/// Maps filenames to the enabled category whose suffix they carry.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// `(category, [".png", ".jpg", ...])` for enabled categories only.
    rules: Vec<(CheckCategory, Vec<String>)>,
}

impl Classifier {
    /// Build a classifier for `enabled` using the configured extension lists.
    ///
    /// Duplicated categories are collapsed; order follows [`CheckCategory::ALL`].
    pub fn new(enabled: &[CheckCategory], extensions: &ExtensionsConfig) -> Self {
        let rules = CheckCategory::ALL
            .iter()
            .filter(|c| enabled.contains(c))
            .map(|&category| {
                let suffixes = extensions
                    .for_category(category)
                    .iter()
                    .map(|ext| format!(".{}", normalize_extension(ext)))
                    .collect();
                (category, suffixes)
            })
            .collect();
        Self { rules }
    }

    /// Classifier over the built-in extension lists.
    pub fn with_defaults(enabled: &[CheckCategory]) -> Self {
        Self::new(enabled, &ExtensionsConfig::default())
    }

    /// Return the category whose suffix `path`'s filename ends with, if any.
    pub fn classify(&self, path: &Path) -> Option<CheckCategory> {
        self.classify_name(&path.file_name()?.to_string_lossy())
    }

    /// Same as [`classify`](Self::classify), for a bare filename.
    pub fn classify_name(&self, file_name: &str) -> Option<CheckCategory> {
        let name = file_name.to_lowercase();
        self.rules
            .iter()
            .find(|(_, suffixes)| suffixes.iter().any(|s| name.ends_with(s.as_str())))
            .map(|(category, _)| *category)
    }

    pub fn categories(&self) -> impl Iterator<Item = CheckCategory> + '_ {
        self.rules.iter().map(|(c, _)| *c)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Lowercase and strip a leading dot: `".PNG"` → `"png"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_extension_sets_are_disjoint() {
        let mut seen = HashSet::new();
        for category in CheckCategory::ALL {
            for ext in category.default_extensions() {
                assert!(seen.insert(*ext), "{ext} appears in more than one category");
            }
        }
    }

    #[test]
    fn classify_matches_each_category() {
        let classifier = Classifier::with_defaults(&CheckCategory::ALL);
        assert_eq!(
            classifier.classify(Path::new("/a/b/photo.png")),
            Some(CheckCategory::Raster)
        );
        assert_eq!(
            classifier.classify(Path::new("render.exr")),
            Some(CheckCategory::Hdr)
        );
        assert_eq!(
            classifier.classify(Path::new("clip.mov")),
            Some(CheckCategory::Movie)
        );
    }

    #[test]
    fn classify_is_case_insensitive() {
        let classifier = Classifier::with_defaults(&[CheckCategory::Raster]);
        assert_eq!(
            classifier.classify(Path::new("SCAN.JPEG")),
            Some(CheckCategory::Raster)
        );
        assert_eq!(
            classifier.classify_name("Mixed.Png"),
            Some(CheckCategory::Raster)
        );
    }

    #[test]
    fn classify_ignores_disabled_categories() {
        let classifier = Classifier::with_defaults(&[CheckCategory::Raster]);
        assert_eq!(classifier.classify(Path::new("render.exr")), None);
        assert_eq!(classifier.classify(Path::new("clip.mp4")), None);
    }

    #[test]
    fn classify_requires_dot_before_suffix() {
        let classifier = Classifier::with_defaults(&[CheckCategory::Raster]);
        assert_eq!(classifier.classify_name("notapng"), None);
        assert_eq!(classifier.classify_name("png"), None);
        assert_eq!(classifier.classify_name("archive.png.bak"), None);
    }

    #[test]
    fn classify_returns_at_most_one_category() {
        let classifier = Classifier::with_defaults(&CheckCategory::ALL);
        for name in ["a.png", "a.exr", "a.mkv", "a.txt", "a.tar.gz", ".exr"] {
            let hits = CheckCategory::ALL
                .iter()
                .filter(|c| {
                    Classifier::with_defaults(&[**c]).classify_name(name) == Some(**c)
                })
                .count();
            assert!(hits <= 1, "{name} matched {hits} categories");
            assert_eq!(classifier.classify_name(name).is_some(), hits == 1);
        }
    }

    #[test]
    fn custom_extensions_are_normalized() {
        let extensions = ExtensionsConfig {
            raster: vec![".PNG".into(), " Dpx ".into()],
            ..ExtensionsConfig::default()
        };
        let classifier = Classifier::new(&[CheckCategory::Raster], &extensions);
        assert_eq!(classifier.classify_name("a.dpx"), Some(CheckCategory::Raster));
        assert_eq!(classifier.classify_name("a.png"), Some(CheckCategory::Raster));
        assert_eq!(classifier.classify_name("a.jpg"), None);
    }

    #[test]
    fn duplicate_categories_collapse() {
        let classifier = Classifier::with_defaults(&[
            CheckCategory::Movie,
            CheckCategory::Raster,
            CheckCategory::Movie,
        ]);
        let categories: Vec<_> = classifier.categories().collect();
        assert_eq!(categories, vec![CheckCategory::Raster, CheckCategory::Movie]);
    }

    #[test]
    fn empty_classifier_matches_nothing() {
        let classifier = Classifier::with_defaults(&[]);
        assert!(classifier.is_empty());
        assert_eq!(classifier.classify_name("a.png"), None);
    }

    #[test]
    fn failure_labels_per_category() {
        assert_eq!(CheckCategory::Raster.failure(), Outcome::RasterError);
        assert_eq!(CheckCategory::Hdr.failure(), Outcome::HdrError);
        assert_eq!(CheckCategory::Movie.failure(), Outcome::MovieError);
    }
}
