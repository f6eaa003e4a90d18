//! Startup capability checks.
//!
//! Before anything is walked, every requested category must be serviceable:
//!
//! | Category | Requirement | Failure | Exit code |
//! |---|---|---|---|
//! | any | at least one category enabled | [`PreflightError::NothingToDo`] | 3 |
//! | HDR | built with the `hdr` feature | [`PreflightError::HdrLibraryUnavailable`] | 4 |
//! | Movie | built with the `movie` feature | [`PreflightError::MovieBindingUnavailable`] | 5 |
//! | Movie | tool found on `PATH` | [`PreflightError::MovieToolNotInstalled`] | 6 |
//! | Movie | tool answers with its version banner | [`PreflightError::MovieToolNotFunctional`] | 7 |
//!
//! [`Capabilities`] is the registry of what this build and host provide. It
//! is populated once by [`Capabilities::detect`] and then only queried, so
//! tests can hand-build one to exercise every branch.

use crate::category::CheckCategory;
use crate::checks::{hdr, movie};
use crate::config::MovieConfig;
use std::io;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreflightError {
    #[error("Nothing to do: enable at least one of --raster, --hdr, --movies")]
    NothingToDo,
    #[error("HDR checks requested, but this build has no OpenEXR support (enable the `hdr` feature)")]
    HdrLibraryUnavailable,
    #[error(
        "Movie checks requested, but this build has no movie inspection support (enable the `movie` feature)"
    )]
    MovieBindingUnavailable,
    #[error("Movie checks requested, but '{tool}' is not installed or not on PATH")]
    MovieToolNotInstalled { tool: String },
    #[error("Movie checks requested, but '{tool}' does not work: {detail}")]
    MovieToolNotFunctional { tool: String, detail: String },
}

impl PreflightError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NothingToDo => 3,
            Self::HdrLibraryUnavailable => 4,
            Self::MovieBindingUnavailable => 5,
            Self::MovieToolNotInstalled { .. } => 6,
            Self::MovieToolNotFunctional { .. } => 7,
        }
    }
}

/// Result of invoking an external tool with no arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// Answered with its own version banner (first line kept).
    Ready { banner: String },
    NotInstalled,
    NotFunctional { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProbe {
    pub tool: String,
    pub status: ToolStatus,
}

/// What this build and host can verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub hdr_library: bool,
    pub movie_binding: bool,
    /// Only probed when movies are requested.
    pub movie_tool: Option<ToolProbe>,
}

impl Capabilities {
    /// Populate the registry. Spawns the movie tool only if movies are
    /// requested and the binding is compiled in.
    pub fn detect(requested: &[CheckCategory], movie_config: &MovieConfig) -> Self {
        let movie_tool = (requested.contains(&CheckCategory::Movie) && movie::AVAILABLE)
            .then(|| probe_tool(&movie_config.tool));
        Self {
            hdr_library: hdr::AVAILABLE,
            movie_binding: movie::AVAILABLE,
            movie_tool,
        }
    }

    /// Confirm `category` can be serviced.
    pub fn require(&self, category: CheckCategory) -> Result<(), PreflightError> {
        match category {
            CheckCategory::Raster => Ok(()),
            CheckCategory::Hdr if self.hdr_library => Ok(()),
            CheckCategory::Hdr => Err(PreflightError::HdrLibraryUnavailable),
            CheckCategory::Movie if !self.movie_binding => {
                Err(PreflightError::MovieBindingUnavailable)
            }
            CheckCategory::Movie => match &self.movie_tool {
                Some(ToolProbe {
                    status: ToolStatus::Ready { .. },
                    ..
                }) => Ok(()),
                Some(ToolProbe {
                    tool,
                    status: ToolStatus::NotFunctional { detail },
                }) => Err(PreflightError::MovieToolNotFunctional {
                    tool: tool.clone(),
                    detail: detail.clone(),
                }),
                Some(ToolProbe { tool, .. }) => {
                    Err(PreflightError::MovieToolNotInstalled { tool: tool.clone() })
                }
                None => Err(PreflightError::MovieToolNotInstalled {
                    tool: MovieConfig::default().tool,
                }),
            },
        }
    }
}

/// Abort unless every requested category is serviceable.
pub fn preflight(requested: &[CheckCategory], caps: &Capabilities) -> Result<(), PreflightError> {
    if requested.is_empty() {
        return Err(PreflightError::NothingToDo);
    }
    for &category in requested {
        caps.require(category)?;
        debug!("preflight: {category} checks available");
    }
    if let Some(ToolProbe {
        tool,
        status: ToolStatus::Ready { banner },
    }) = &caps.movie_tool
    {
        info!("Using {tool}: {banner}");
    }
    Ok(())
}

/// Run `tool` without arguments and judge its reply.
pub fn probe_tool(tool: &str) -> ToolProbe {
    let status = match Command::new(tool)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
    {
        Err(e) if e.kind() == io::ErrorKind::NotFound => ToolStatus::NotInstalled,
        Err(e) => ToolStatus::NotFunctional {
            detail: e.to_string(),
        },
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
            text.push('\n');
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            let name = movie::MovieChecker::new(tool, None).tool_name();
            classify_banner(&name, &text)
        }
    };
    ToolProbe {
        tool: tool.to_string(),
        status,
    }
}

/// Banner prefix printed by every ffmpeg build, whatever the binary is called.
const BANNER_FAMILY: &str = "ffmpeg";

/// Decide from a tool's first line of output whether it is the real thing.
///
/// `ffmpeg version 6.1 Copyright ...` is ready even when the binary is
/// installed as `ffmpeg7` or `ffmpeg-static`; a wrapper announcing itself
/// as `<name> version` is accepted too. A shell's `command not found` means
/// not installed; anything else is broken.
pub fn classify_banner(name: &str, output: &str) -> ToolStatus {
    let Some(first) = output.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return ToolStatus::NotFunctional {
            detail: "no output".to_string(),
        };
    };
    if first.contains("command not found") || first.contains("is not recognized as") {
        return ToolStatus::NotInstalled;
    }
    let lowered = first.to_lowercase();
    let announces = |family: &str| lowered.starts_with(&format!("{family} version"));
    if announces(BANNER_FAMILY) || announces(name.to_lowercase().as_str()) {
        ToolStatus::Ready {
            banner: first.to_string(),
        }
    } else {
        ToolStatus::NotFunctional {
            detail: format!("unexpected reply: {first}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(movie_tool: Option<ToolStatus>) -> Capabilities {
        Capabilities {
            hdr_library: true,
            movie_binding: true,
            movie_tool: movie_tool.map(|status| ToolProbe {
                tool: "ffmpeg".into(),
                status,
            }),
        }
    }

    fn ready() -> Option<ToolStatus> {
        Some(ToolStatus::Ready {
            banner: "ffmpeg version 6.1".into(),
        })
    }

    #[test]
    fn nothing_requested_is_nothing_to_do() {
        let err = preflight(&[], &caps(ready())).unwrap_err();
        assert_eq!(err, PreflightError::NothingToDo);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn raster_needs_nothing_extra() {
        let bare = Capabilities {
            hdr_library: false,
            movie_binding: false,
            movie_tool: None,
        };
        preflight(&[CheckCategory::Raster], &bare).unwrap();
    }

    #[test]
    fn hdr_without_library_fails() {
        let mut c = caps(ready());
        c.hdr_library = false;
        let err = preflight(&[CheckCategory::Raster, CheckCategory::Hdr], &c).unwrap_err();
        assert_eq!(err, PreflightError::HdrLibraryUnavailable);
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn movie_without_binding_fails() {
        let mut c = caps(ready());
        c.movie_binding = false;
        let err = preflight(&[CheckCategory::Movie], &c).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn movie_tool_missing_fails() {
        let err = preflight(&[CheckCategory::Movie], &caps(Some(ToolStatus::NotInstalled)))
            .unwrap_err();
        assert!(matches!(err, PreflightError::MovieToolNotInstalled { ref tool } if tool == "ffmpeg"));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn movie_tool_broken_fails() {
        let status = ToolStatus::NotFunctional {
            detail: "segfault".into(),
        };
        let err = preflight(&[CheckCategory::Movie], &caps(Some(status))).unwrap_err();
        assert_eq!(err.exit_code(), 7);
        assert!(err.to_string().contains("segfault"));
    }

    #[test]
    fn movie_tool_unprobed_counts_as_missing() {
        let err = preflight(&[CheckCategory::Movie], &caps(None)).unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn every_capability_present_passes() {
        preflight(&CheckCategory::ALL, &caps(ready())).unwrap();
    }

    #[test]
    fn distinct_exit_codes() {
        let codes = [
            PreflightError::NothingToDo.exit_code(),
            PreflightError::HdrLibraryUnavailable.exit_code(),
            PreflightError::MovieBindingUnavailable.exit_code(),
            PreflightError::MovieToolNotInstalled { tool: "x".into() }.exit_code(),
            PreflightError::MovieToolNotFunctional {
                tool: "x".into(),
                detail: "y".into(),
            }
            .exit_code(),
        ];
        let mut unique = codes.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
        assert!(!codes.contains(&0) && !codes.contains(&1) && !codes.contains(&2));
    }

    // =========================================================================
    // Banner classification
    // =========================================================================

    #[test]
    fn ffmpeg_banner_is_ready() {
        let out = "ffmpeg version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers\n  built with gcc\n";
        assert!(matches!(
            classify_banner("ffmpeg", out),
            ToolStatus::Ready { banner } if banner.starts_with("ffmpeg version 6.1.1")
        ));
    }

    #[test]
    fn renamed_binary_with_ffmpeg_banner_is_ready() {
        let out = "ffmpeg version 7.0-static https://johnvansickle.com/ffmpeg/ Copyright (c) 2000-2024\n";
        for name in ["ffmpeg7", "ffmpeg-static", "FFmpeg"] {
            assert!(
                matches!(classify_banner(name, out), ToolStatus::Ready { .. }),
                "{name}"
            );
        }
    }

    #[test]
    fn banner_of_unrelated_tool_is_not_functional() {
        assert!(matches!(
            classify_banner("ffmpeg7", "ffprobe version 7.0 Copyright (c) 2007-2024\n"),
            ToolStatus::NotFunctional { .. }
        ));
    }

    #[test]
    fn leading_blank_lines_are_skipped() {
        assert!(matches!(
            classify_banner("ffmpeg", "\n\n  ffmpeg version n7.0\n"),
            ToolStatus::Ready { .. }
        ));
    }

    #[test]
    fn shell_not_found_is_not_installed() {
        assert_eq!(
            classify_banner("ffmpeg", "sh: 1: ffmpeg: command not found\n"),
            ToolStatus::NotInstalled
        );
    }

    #[test]
    fn other_reply_is_not_functional() {
        assert!(matches!(
            classify_banner("ffmpeg", "error while loading shared libraries: libavdevice.so.60\n"),
            ToolStatus::NotFunctional { .. }
        ));
        assert!(matches!(
            classify_banner("ffmpeg", ""),
            ToolStatus::NotFunctional { .. }
        ));
    }

    #[test]
    fn probe_of_missing_binary_is_not_installed() {
        let probe = probe_tool("media-verify-no-such-tool-xyz");
        assert_eq!(probe.status, ToolStatus::NotInstalled);
        assert_eq!(probe.tool, "media-verify-no-such-tool-xyz");
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use crate::test_helpers::fake_tool;
        use tempfile::TempDir;

        fn probe(path: &std::path::Path) -> ToolProbe {
            let tool = path.to_string_lossy().to_string();
            for _ in 0..10 {
                let probe = probe_tool(&tool);
                match &probe.status {
                    ToolStatus::NotFunctional { detail } if detail.contains("busy") => {
                        std::thread::sleep(std::time::Duration::from_millis(20));
                    }
                    _ => return probe,
                }
            }
            probe_tool(&tool)
        }

        #[test]
        fn scripted_banner_is_ready() {
            let tmp = TempDir::new().unwrap();
            let tool = fake_tool(
                tmp.path(),
                "ffmpeg",
                "echo 'ffmpeg version 7.0-static' >&2\nexit 1",
            );
            assert!(matches!(probe(&tool).status, ToolStatus::Ready { .. }));
        }

        #[test]
        fn versioned_binary_name_is_ready() {
            let tmp = TempDir::new().unwrap();
            let tool = fake_tool(
                tmp.path(),
                "ffmpeg7",
                "echo 'ffmpeg version 7.0-static Copyright (c) 2000-2024' >&2\nexit 1",
            );
            let probe = probe(&tool);
            assert!(
                matches!(&probe.status, ToolStatus::Ready { banner } if banner.starts_with("ffmpeg version 7.0")),
                "{:?}",
                probe.status
            );
        }

        #[test]
        fn scripted_garbage_is_not_functional() {
            let tmp = TempDir::new().unwrap();
            let tool = fake_tool(tmp.path(), "ffmpeg", "echo 'Segmentation fault' >&2\nexit 139");
            assert!(matches!(
                probe(&tool).status,
                ToolStatus::NotFunctional { .. }
            ));
        }
    }
}
