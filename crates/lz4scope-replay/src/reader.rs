use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Default number of bytes pulled from disk per read
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Chunked line reader over a single file
///
/// Memory stays bounded by the longest line plus one chunk. The file handle
/// is released on `close`, on the next `open`, or when the reader is dropped.
pub struct StreamingFileReader {
    file: Option<File>,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no delimiter
    scanned: usize,
    at_eof: bool,
    chunk_size: usize,
}

impl StreamingFileReader {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a reader that pulls `chunk_size` bytes per read (minimum 1)
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            file: None,
            buffer: Vec::new(),
            scanned: 0,
            at_eof: false,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Close any open file and open `path` from its start
    pub fn open(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        self.close();
        self.file = Some(File::open(path)?);
        Ok(())
    }

    /// Release the file handle and drop buffered bytes
    pub fn close(&mut self) {
        self.file = None;
        self.clear_buffer();
    }

    /// Seek back to the start of the open file
    pub fn reset(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.seek(SeekFrom::Start(0))?;
        }
        self.clear_buffer();
        Ok(())
    }

    /// Read the next line, trimmed of surrounding whitespace.
    ///
    /// Returns `Ok(None)` at end of file (or when nothing is open). Blank
    /// lines in the middle of the file come back as empty strings; an empty
    /// trailing remainder is end of file, not a line.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        loop {
            if let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
                let end = self.scanned + offset;
                let line = decode(&self.buffer[..end]);
                self.buffer.drain(..=end);
                self.scanned = 0;
                return Ok(Some(line));
            }
            self.scanned = self.buffer.len();

            if self.at_eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = decode(&self.buffer);
                self.buffer.clear();
                self.scanned = 0;
                return Ok(if line.is_empty() { None } else { Some(line) });
            }

            let filled = self.buffer.len();
            self.buffer.resize(filled + self.chunk_size, 0);
            let result = file.read(&mut self.buffer[filled..]);
            self.buffer.truncate(filled + *result.as_ref().unwrap_or(&0));
            match result {
                Ok(0) => self.at_eof = true,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.at_eof = false;
    }
}

impl Default for StreamingFileReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
