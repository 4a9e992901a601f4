//! Shared types for lz4scope
//!
//! This crate contains data structures and error types used across multiple
//! lz4scope crates.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// LZ4 Log Types
// ============================================================================

/// Which side of the codec produced a log line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lz4EntryKind {
    Compress,
    Decompress,
}

impl Lz4EntryKind {
    /// Literal marker the SDK prints for this kind of log line
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Compress => "LZ4 compress success",
            Self::Decompress => "LZ4 decompress success",
        }
    }
}

impl fmt::Display for Lz4EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compress => write!(f, "compress"),
            Self::Decompress => write!(f, "decompress"),
        }
    }
}

/// A single parsed LZ4 success line
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lz4Entry {
    /// Timestamp taken from the log prefix, or the local time of parsing
    pub timestamp: String,

    /// Compressed payload size in bytes
    pub compressed_size: u64,

    /// Original size (compress) or decompressed size (decompress) in bytes
    pub original_size: u64,

    /// Ratio as printed by the SDK, in percent
    pub ratio: f64,

    pub kind: Lz4EntryKind,
}

/// Running aggregates of a collection session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollectorStats {
    pub entry_count: u64,
    pub total_compressed_size: u64,
    pub total_original_size: u64,
}

impl CollectorStats {
    /// Fold one entry into the aggregates
    pub fn record(&mut self, entry: &Lz4Entry) {
        self.entry_count += 1;
        self.total_compressed_size = self
            .total_compressed_size
            .saturating_add(entry.compressed_size);
        self.total_original_size = self.total_original_size.saturating_add(entry.original_size);
    }

    /// Aggregate ratio in percent, 0.0 when nothing original was recorded
    pub fn average_ratio(&self) -> f64 {
        if self.total_original_size == 0 {
            return 0.0;
        }
        self.total_compressed_size as f64 / self.total_original_size as f64 * 100.0
    }
}

/// Result of a finished collection session
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectSummary {
    pub entry_count: u64,
    pub total_compressed_size: u64,
    pub total_original_size: u64,
    pub average_ratio: f64,
    pub output_path: PathBuf,
}

impl CollectSummary {
    pub fn new(stats: CollectorStats, output_path: PathBuf) -> Self {
        Self {
            entry_count: stats.entry_count,
            total_compressed_size: stats.total_compressed_size,
            total_original_size: stats.total_original_size,
            average_ratio: stats.average_ratio(),
            output_path,
        }
    }
}

// ============================================================================
// Replay Types
// ============================================================================

/// Outcome counters of a replay run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    /// Lines handed to the sink successfully
    pub sent: u64,

    /// Lines the sink rejected
    pub failed: u64,

    /// Lines with no extractable action
    pub skipped: u64,
}

impl ReplayStats {
    pub fn total(&self) -> u64 {
        self.sent + self.failed + self.skipped
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors reported by the log collector
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to create output file {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log collection is not running")]
    NotCollecting,

    #[error("Invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to start collector worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Collector worker is no longer running")]
    WorkerGone,
}

/// Errors reported while preparing a file queue
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No readable files found in {}", path.display())]
    Empty { path: PathBuf },

    #[error("Failed to open file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File queue has not been prepared")]
    NotPrepared,
}
