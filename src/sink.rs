use std::io::{self, Write};

use lz4scope_replay::MessageSink;

/// Writes each replayed action as one line
///
/// Stands in for the chat SDK's send call when replaying from the CLI.
pub struct LineSink<W: Write> {
    out: W,
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MessageSink for LineSink<W> {
    type Error = io::Error;

    fn send(&mut self, action: &str) -> io::Result<()> {
        writeln!(self.out, "{}", action)?;
        self.out.flush()
    }
}
