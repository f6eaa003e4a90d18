//! Outcome labels and the run-wide counters.
//!
//! Each dispatched file lands in exactly one [`Outcome`]. The [`Stats`]
//! aggregator is shared by reference with the dispatcher; its counters are
//! atomic so parallel workers can record into a single instance.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Classification of one dispatched file.
///
/// Variant order is the order counters are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Ok,
    RasterError,
    HdrError,
    MovieError,
    /// The inspected file vanished between walk and check.
    NotFound,
    /// The inspection process exceeded its deadline.
    Timeout,
    /// Anything outside a checker's own classification (I/O, permissions).
    OtherError,
    /// Zero-byte file, only recorded under [`EmptyFilePolicy::Count`](crate::config::EmptyFilePolicy::Count).
    Empty,
}

impl Outcome {
    pub const ALL: [Outcome; 8] = [
        Self::Ok,
        Self::RasterError,
        Self::HdrError,
        Self::MovieError,
        Self::NotFound,
        Self::Timeout,
        Self::OtherError,
        Self::Empty,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::RasterError => "RASTER_ERROR",
            Self::HdrError => "HDR_ERROR",
            Self::MovieError => "MOVIE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::OtherError => "OTHER_ERROR",
            Self::Empty => "EMPTY",
        }
    }

    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Ok | Self::Empty)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const OUTCOME_COUNT: usize = Outcome::ALL.len();

/// Thread-safe label → count accumulator.
#[derive(Debug, Default)]
pub struct Stats {
    counts: [AtomicU64; OUTCOME_COUNT],
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        self.counts[outcome.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        self.counts[outcome.index()].load(Ordering::Relaxed)
    }

    /// Number of files that landed in any counter.
    pub fn total(&self) -> u64 {
        Outcome::ALL.iter().map(|&o| self.count(o)).sum()
    }

    pub fn failures(&self) -> u64 {
        Outcome::ALL
            .iter()
            .filter(|o| o.is_failure())
            .map(|&o| self.count(o))
            .sum()
    }

    /// Freeze the current counts into a plain map for reporting.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            counts: Outcome::ALL.iter().map(|&o| (o, self.count(o))).collect(),
        }
    }
}

/// Point-in-time copy of [`Stats`], ordered by [`Outcome`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatsSnapshot {
    counts: BTreeMap<Outcome, u64>,
}

impl StatsSnapshot {
    pub fn get(&self, outcome: Outcome) -> u64 {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, u64)> + '_ {
        self.counts.iter().map(|(&o, &n)| (o, n))
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn failures(&self) -> u64 {
        self.iter().filter(|(o, _)| o.is_failure()).map(|(_, n)| n).sum()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(o, n)| format!("{o}={n}"))
            .collect();
        if parts.is_empty() {
            write!(f, "no files checked")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
