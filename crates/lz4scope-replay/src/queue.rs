use std::fs;
use std::path::{Path, PathBuf};

use lz4scope_types::QueueError;

use crate::reader::StreamingFileReader;

/// Presents a directory (or a single file) as one stream of non-blank lines
///
/// Files are read one at a time through a single `StreamingFileReader`.
/// Files that fail to open or read are skipped. Not thread-safe; drive it
/// from one task.
pub struct FileQueueManager {
    reader: StreamingFileReader,
    source: Option<PathBuf>,
    file_paths: Vec<PathBuf>,
    current_file_index: usize,
    total_lines_read: u64,
    ready: bool,
}

impl FileQueueManager {
    pub fn new() -> Self {
        Self::with_reader(StreamingFileReader::new())
    }

    /// Use a preconfigured reader (e.g. a custom chunk size)
    pub fn with_reader(reader: StreamingFileReader) -> Self {
        Self {
            reader,
            source: None,
            file_paths: Vec::new(),
            current_file_index: 0,
            total_lines_read: 0,
            ready: false,
        }
    }

    /// Queue the files under `path` and open the first one.
    ///
    /// A directory contributes its immediate, non-hidden regular files in
    /// file-name order; any other path is queued on its own. Returns the
    /// number of queued files.
    pub fn prepare(&mut self, path: impl AsRef<Path>) -> Result<usize, QueueError> {
        self.reset();
        let path = path.as_ref();

        let metadata = fs::metadata(path).map_err(|_| QueueError::NotFound {
            path: path.to_path_buf(),
        })?;

        let file_paths = if metadata.is_dir() {
            list_files(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let Some(first) = file_paths.first() else {
            return Err(QueueError::Empty {
                path: path.to_path_buf(),
            });
        };
        self.reader.open(first).map_err(|source| QueueError::Open {
            path: first.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), files = file_paths.len(), "file queue prepared");
        self.file_paths = file_paths;
        self.source = Some(path.to_path_buf());
        self.ready = true;
        Ok(self.file_paths.len())
    }

    /// Prepare the most recently prepared path again, from its first line
    pub fn restart(&mut self) -> Result<usize, QueueError> {
        let source = self.source.clone().ok_or(QueueError::NotPrepared)?;
        self.prepare(source)
    }

    /// Next non-blank line across all queued files, `None` once exhausted
    pub fn read_next_line(&mut self) -> Option<String> {
        if !self.ready {
            return None;
        }

        while self.current_file_index < self.file_paths.len() {
            match self.reader.read_line() {
                Ok(Some(line)) if line.is_empty() => continue,
                Ok(Some(line)) => {
                    self.total_lines_read += 1;
                    return Some(line);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %self.file_paths[self.current_file_index].display(),
                        error = %e,
                        "read failed, skipping rest of file"
                    );
                }
            }

            self.advance();
        }

        None
    }

    /// Move to the next file that can be opened
    fn advance(&mut self) {
        self.reader.close();
        self.current_file_index += 1;

        while let Some(path) = self.file_paths.get(self.current_file_index) {
            match self.reader.open(path) {
                Ok(()) => return,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    self.current_file_index += 1;
                }
            }
        }
    }

    /// Close the reader and forget all queued files and counters
    pub fn reset(&mut self) {
        self.reader.close();
        self.source = None;
        self.file_paths.clear();
        self.current_file_index = 0;
        self.total_lines_read = 0;
        self.ready = false;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// 1-based position of the file being read
    pub fn current_file_number(&self) -> usize {
        (self.current_file_index + 1).min(self.file_paths.len())
    }

    pub fn total_files(&self) -> usize {
        self.file_paths.len()
    }

    /// Non-blank lines returned since `prepare`
    pub fn total_lines_read(&self) -> u64 {
        self.total_lines_read
    }
}

impl Default for FileQueueManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Immediate, non-hidden regular files of `dir`, sorted by name
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, QueueError> {
    let read_dir_error = |source| QueueError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        // Follows symlinks, so a link to a regular file is queued
        if fs::metadata(&path).is_ok_and(|m| m.is_file()) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
