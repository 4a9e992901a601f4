//! LZ4 log collection for lz4scope
//!
//! This crate filters SDK log lines for LZ4 compress/decompress results and
//! streams them into a Markdown statistics report.

mod collector;
mod parser;
mod report;

pub use collector::LogCollector;
pub use parser::{Lz4LineParser, TIMESTAMP_FORMAT, current_timestamp};
pub use report::ReportWriter;

// Re-export types used in our public API
pub use lz4scope_types::{CollectSummary, CollectorError, CollectorStats, Lz4Entry, Lz4EntryKind};
