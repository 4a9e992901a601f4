//! Corpus streaming and message replay for lz4scope
//!
//! This crate reads large newline-delimited corpora without loading them
//! into memory and paces the extracted messages into a sink.

mod driver;
mod payload;
mod queue;
mod reader;

pub use driver::{MessageSink, ReplayDriver};
pub use payload::extract_action;
pub use queue::FileQueueManager;
pub use reader::{DEFAULT_CHUNK_SIZE, StreamingFileReader};

// Re-export types used in our public API
pub use lz4scope_types::{QueueError, ReplayStats};
