use chrono::{Local, NaiveDateTime};
use regex::Regex;

use lz4scope_types::{Lz4Entry, Lz4EntryKind};

/// Layout of the timestamp the SDK prints in its log prefix
/// (e.g. `2026/02/02 13:51:48:144`)
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S:%3f";

const COMPRESS_PATTERN: &str = r"LZ4 compress success: compressed size=(?P<compressed>\d+) bytes, original size=(?P<original>\d+), ratio=(?P<ratio>[\d.]+) %";
const DECOMPRESS_PATTERN: &str = r"LZ4 decompress success: compressed size=(?P<compressed>\d+) bytes, decompressed size=(?P<original>\d+), ratio=(?P<ratio>[\d.]+) %";
const TIMESTAMP_PATTERN: &str = r"\[(?P<ts>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}:\d{3})";

/// Parser for SDK log lines reporting LZ4 compress/decompress results
///
/// Patterns are compiled once when the parser is built.
#[derive(Clone, Debug)]
pub struct Lz4LineParser {
    compress: Regex,
    decompress: Regex,
    timestamp: Regex,
}

impl Lz4LineParser {
    /// Compile the line patterns
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            compress: Regex::new(COMPRESS_PATTERN)?,
            decompress: Regex::new(DECOMPRESS_PATTERN)?,
            timestamp: Regex::new(TIMESTAMP_PATTERN)?,
        })
    }

    /// Cheap substring check run before any regex work.
    ///
    /// Returns true if the line carries at least one success marker.
    pub fn prefilter(line: &str) -> bool {
        line.contains(Lz4EntryKind::Compress.marker())
            || line.contains(Lz4EntryKind::Decompress.marker())
    }

    /// Parse a raw log line into an entry.
    ///
    /// Returns `None` for lines without a marker and for lines whose marker
    /// is present but whose fields do not match (truncated output, etc).
    pub fn parse(&self, line: &str) -> Option<Lz4Entry> {
        if !Self::prefilter(line) {
            return None;
        }

        [Lz4EntryKind::Compress, Lz4EntryKind::Decompress]
            .into_iter()
            .filter(|kind| line.contains(kind.marker()))
            .find_map(|kind| self.parse_kind(line, kind))
    }

    fn parse_kind(&self, line: &str, kind: Lz4EntryKind) -> Option<Lz4Entry> {
        let pattern = match kind {
            Lz4EntryKind::Compress => &self.compress,
            Lz4EntryKind::Decompress => &self.decompress,
        };
        let caps = pattern.captures(line)?;

        let compressed_size = caps["compressed"].parse::<u64>().ok()?;
        let original_size = caps["original"].parse::<u64>().ok()?;
        let ratio = caps["ratio"].parse::<f64>().ok()?;

        Some(Lz4Entry {
            timestamp: self
                .extract_timestamp(line)
                .unwrap_or_else(current_timestamp),
            compressed_size,
            original_size,
            ratio,
            kind,
        })
    }

    /// Extract the bracketed SDK timestamp, rejecting impossible dates
    pub fn extract_timestamp(&self, line: &str) -> Option<String> {
        let caps = self.timestamp.captures(line)?;
        let ts = &caps["ts"];
        NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()?;
        Some(ts.to_string())
    }
}

/// Local wall-clock time in the same layout as SDK timestamps
pub fn current_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
