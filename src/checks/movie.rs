//! Movie verification through an external decode-to-null.
//!
//! The inspection tool (ffmpeg unless configured otherwise) is run as
//!
//! ```text
//! <tool> -hide_banner -nostdin -i <path> -f null -
//! ```
//!
//! and its diagnostic stream is scanned line by line. Each line is checked
//! in this order:
//!
//! 1. contains `damaged`, `error`, `invalid`, `Error` or `Invalid` → invalid, stop
//! 2. contains `No such file or directory` → [`CheckError::NotFound`], stop
//! 3. anything else (progress, stream info) → keep reading
//!
//! End of stream without a match is a pass. Progress updates are separated
//! by `\r`, so both `\r` and `\n` end a line. The path itself is blanked out
//! before matching so a file called `error_reel.mp4` is not flagged by name.
//!
//! A reader thread forwards lines over a channel; the checker waits on it
//! for at most the configured timeout per line. The clock restarts with
//! every line, so a long movie that keeps reporting progress is never cut
//! off. When the tool stays silent for the whole timeout it is killed and
//! the file is reported as [`CheckError::Timeout`].

use super::{CheckError, VerificationResult};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Whether this build carries the movie inspection binding.
pub const AVAILABLE: bool = cfg!(feature = "movie");

const ERROR_MARKERS: &[&str] = &["damaged", "error", "invalid", "Error", "Invalid"];
const NOT_FOUND_MARKER: &str = "No such file or directory";

/// What a single line of tool output means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Corrupt,
    NotFound,
    Progress,
}

pub fn classify_line(line: &str) -> LineClass {
    if ERROR_MARKERS.iter().any(|m| line.contains(m)) {
        LineClass::Corrupt
    } else if line.contains(NOT_FOUND_MARKER) {
        LineClass::NotFound
    } else {
        LineClass::Progress
    }
}

/// Consume tool output until a verdict is reached.
///
/// Stops at the first corrupt or not-found line; remaining lines are never
/// pulled from `lines`.
pub fn scan_output<I>(lines: I, path: &Path, tool: &str) -> Result<VerificationResult, CheckError>
where
    I: IntoIterator<Item = Result<String, CheckError>>,
{
    let needle = path.to_string_lossy();
    for line in lines {
        let line = line?;
        let class = if needle.is_empty() {
            classify_line(&line)
        } else {
            classify_line(&line.replace(needle.as_ref(), ""))
        };
        match class {
            LineClass::Corrupt => {
                return Ok(VerificationResult::invalid(format!(
                    "{tool} error: {}",
                    line.trim()
                )));
            }
            LineClass::NotFound => return Err(CheckError::NotFound(path.to_path_buf())),
            LineClass::Progress => {}
        }
    }
    Ok(VerificationResult::ok())
}

/// Split a raw output chunk on `\n` and `\r`, dropping empty pieces.
pub fn split_segments(chunk: &[u8]) -> impl Iterator<Item = String> + '_ {
    chunk
        .split(|b| *b == b'\n' || *b == b'\r')
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
}

/// Movie checker bound to one tool and deadline.
#[derive(Debug, Clone)]
pub struct MovieChecker {
    tool: PathBuf,
    timeout: Option<Duration>,
}

impl MovieChecker {
    pub fn new(tool: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }

    /// Short tool name used in messages: `/opt/bin/ffmpeg` → `ffmpeg`.
    pub fn tool_name(&self) -> String {
        self.tool
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.tool.display().to_string())
    }

    #[cfg(feature = "movie")]
    pub fn check(&self, path: &Path) -> Result<VerificationResult, CheckError> {
        use std::process::{Command, Stdio};

        let mut child = Command::new(&self.tool)
            .args(["-hide_banner", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let Some(stderr) = child.stderr.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::other("inspection tool stderr was not captured").into());
        };

        let (tx, rx) = std::sync::mpsc::channel();
        let reader =
            std::thread::spawn(move || forward_lines(io::BufReader::new(stderr), &tx));

        let verdict = scan_output(
            OutputFeed::new(&rx, path, self.timeout),
            path,
            &self.tool_name(),
        );

        // The verdict may arrive before the tool exits; don't leave it running.
        let _ = child.kill();
        let _ = child.wait();
        drop(rx);
        let _ = reader.join();

        verdict
    }

    #[cfg(not(feature = "movie"))]
    pub fn check(&self, _path: &Path) -> Result<VerificationResult, CheckError> {
        Err(CheckError::Unavailable(crate::category::CheckCategory::Movie))
    }
}

/// Reader-thread body: forward each output segment until EOF or the
/// receiver hangs up.
#[cfg_attr(not(feature = "movie"), allow(dead_code))]
fn forward_lines<R: BufRead>(mut reader: R, tx: &Sender<io::Result<String>>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                for segment in split_segments(&buf) {
                    if tx.send(Ok(segment)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

/// Channel-backed line iterator with an optional inactivity timeout.
///
/// Yields a single [`CheckError::Timeout`] once no line has arrived for
/// `timeout`, then ends.
#[cfg_attr(not(feature = "movie"), allow(dead_code))]
struct OutputFeed<'a> {
    rx: &'a Receiver<io::Result<String>>,
    path: &'a Path,
    timeout: Option<Duration>,
    expired: bool,
}

#[cfg_attr(not(feature = "movie"), allow(dead_code))]
impl<'a> OutputFeed<'a> {
    fn new(rx: &'a Receiver<io::Result<String>>, path: &'a Path, timeout: Option<Duration>) -> Self {
        Self {
            rx,
            path,
            timeout,
            expired: false,
        }
    }
}

impl Iterator for OutputFeed<'_> {
    type Item = Result<String, CheckError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.expired {
            return None;
        }
        let received = match self.timeout {
            None => self.rx.recv().ok()?,
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(item) => item,
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {
                    self.expired = true;
                    return Some(Err(CheckError::Timeout {
                        path: self.path.to_path_buf(),
                        after: timeout,
                    }));
                }
            },
        };
        Some(received.map_err(CheckError::Io))
    }
}
