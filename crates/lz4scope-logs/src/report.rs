use std::fs::{self, File};
use std::io::{self, LineWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local};

use lz4scope_types::{CollectorStats, Lz4Entry};

const TITLE: &str = "# LZ4 压缩统计报告\n";
const TABLE_HEADER: &str =
    "\n| 时间 | Compressed Size | Original Size | Ratio |\n| --- | --- | --- | --- |\n";
const NO_DATA: &str = "\n> 未收集到任何 LZ4 压缩日志\n";

/// Incremental Markdown report
///
/// Rows are appended as entries arrive; `finish` closes the table with a
/// summary section (or a no-data notice when nothing was written).
pub struct ReportWriter<W: Write> {
    out: W,
    header_written: bool,
}

impl ReportWriter<LineWriter<File>> {
    /// Replace any file at `path` with a fresh, empty report
    pub fn create(path: &Path) -> io::Result<Self> {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed previous report"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let file = File::create(path)?;
        Ok(Self::new(LineWriter::new(file)))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    /// Append one table row, writing the title and header first if needed
    pub fn write_entry(&mut self, entry: &Lz4Entry) -> io::Result<()> {
        if !self.header_written {
            self.out.write_all(TITLE.as_bytes())?;
            self.out.write_all(TABLE_HEADER.as_bytes())?;
            self.header_written = true;
        }
        writeln!(
            self.out,
            "| {} | {} | {} | {:.2}% |",
            entry.timestamp, entry.compressed_size, entry.original_size, entry.ratio
        )
    }

    /// Write the closing section and flush, returning the underlying writer
    pub fn finish(mut self, stats: &CollectorStats, generated_at: DateTime<Local>) -> io::Result<W> {
        if self.header_written || stats.entry_count > 0 {
            write!(
                self.out,
                "\n## 统计汇总\n\n\
                 | 统计项 | 值 |\n\
                 | --- | --- |\n\
                 | 总条数 | {} |\n\
                 | 压缩后总大小 | {} bytes |\n\
                 | 压缩前总大小 | {} bytes |\n\
                 | 平均压缩率 | {:.2}% |\n\
                 \n\
                 - 生成时间: {}\n",
                stats.entry_count,
                stats.total_compressed_size,
                stats.total_original_size,
                stats.average_ratio(),
                generated_at.format("%Y-%m-%d %H:%M:%S %z"),
            )?;
        } else {
            self.out.write_all(TITLE.as_bytes())?;
            self.out.write_all(NO_DATA.as_bytes())?;
        }
        self.out.flush()?;
        Ok(self.out)
    }
}
