use std::fs::File;
use std::io::LineWriter;
use std::path::PathBuf;
use std::sync::mpsc::{SyncSender, sync_channel};
use std::thread;

use chrono::Local;
use tokio::sync::mpsc;

use lz4scope_types::{CollectSummary, CollectorError, CollectorStats};

use crate::parser::Lz4LineParser;
use crate::report::ReportWriter;

/// Work items processed by the collector worker, strictly in send order
enum Command {
    Start {
        output_path: PathBuf,
        reply: SyncSender<Result<(), CollectorError>>,
    },
    Collect(String),
    Stop {
        reply: SyncSender<Result<CollectSummary, CollectorError>>,
    },
    Stats {
        reply: SyncSender<CollectorStats>,
    },
    Collecting {
        reply: SyncSender<bool>,
    },
    Reset,
    Shutdown,
}

/// Real-time collector of LZ4 statistics from SDK log lines
///
/// All state lives on a single worker thread that drains one FIFO queue.
/// `collect_log` only enqueues and never waits; the other operations
/// enqueue and block until the worker has processed everything sent before
/// them. Replies come back over a std channel, so the blocking operations
/// are also safe on async runtime threads; they only wait for the worker to
/// drain its queue.
///
/// Share it between producers with `Arc<LogCollector>`.
pub struct LogCollector {
    tx: mpsc::UnboundedSender<Command>,
    worker: Option<thread::JoinHandle<()>>,
}

impl LogCollector {
    /// Compile the line patterns and start the worker thread
    pub fn spawn() -> Result<Self, CollectorError> {
        let parser = Lz4LineParser::new()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = thread::Builder::new()
            .name("lz4-log-collector".to_string())
            .spawn(move || Worker::new(parser).run(rx))
            .map_err(CollectorError::Spawn)?;

        Ok(Self {
            tx,
            worker: Some(worker),
        })
    }

    /// Begin a new session writing to `output_path`.
    ///
    /// Any existing file at the path is replaced and all counters are
    /// zeroed. A running session is finalised once the new file exists; if
    /// the new file cannot be created the running session continues.
    pub fn start_collecting(&self, output_path: impl Into<PathBuf>) -> Result<(), CollectorError> {
        let output_path = output_path.into();
        self.request(|reply| Command::Start { output_path, reply })?
    }

    /// Submit one raw log line without waiting for it to be processed
    pub fn collect_log(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !Lz4LineParser::prefilter(line) {
            return;
        }
        // Send fails only after the worker is gone; the line is dropped like any other
        let _ = self.tx.send(Command::Collect(line.to_string()));
    }

    /// Finish the session: write the summary, close the file
    pub fn stop_collecting(&self) -> Result<CollectSummary, CollectorError> {
        self.request(|reply| Command::Stop { reply })?
    }

    /// Number of entries collected, after all previously submitted lines
    pub fn count(&self) -> u64 {
        self.stats().entry_count
    }

    /// Running aggregates, after all previously submitted lines
    pub fn stats(&self) -> CollectorStats {
        self.request(|reply| Command::Stats { reply })
            .unwrap_or_default()
    }

    /// Whether a session is active
    pub fn collecting(&self) -> bool {
        self.request(|reply| Command::Collecting { reply })
            .unwrap_or(false)
    }

    /// Zero the counters without touching the session or the file
    pub fn reset(&self) {
        let _ = self.tx.send(Command::Reset);
    }

    fn request<T>(
        &self,
        make: impl FnOnce(SyncSender<T>) -> Command,
    ) -> Result<T, CollectorError> {
        let (reply, rx) = sync_channel(1);
        self.tx
            .send(make(reply))
            .map_err(|_| CollectorError::WorkerGone)?;
        rx.recv().map_err(|_| CollectorError::WorkerGone)
    }
}

impl Drop for LogCollector {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("LZ4 collector worker panicked");
            }
        }
    }
}

/// An open output report
struct Session {
    output_path: PathBuf,
    report: ReportWriter<LineWriter<File>>,
}

/// State owned by the worker thread
struct Worker {
    parser: Lz4LineParser,
    session: Option<Session>,
    stats: CollectorStats,
}

impl Worker {
    fn new(parser: Lz4LineParser) -> Self {
        Self {
            parser,
            session: None,
            stats: CollectorStats::default(),
        }
    }

    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Start { output_path, reply } => {
                    let _ = reply.send(self.start(output_path));
                }
                Command::Collect(line) => self.collect(&line),
                Command::Stop { reply } => {
                    let _ = reply.send(self.stop());
                }
                Command::Stats { reply } => {
                    let _ = reply.send(self.stats);
                }
                Command::Collecting { reply } => {
                    let _ = reply.send(self.session.is_some());
                }
                Command::Reset => self.stats = CollectorStats::default(),
                Command::Shutdown => break,
            }
        }

        if self.session.is_some() {
            // Handle dropped mid-session: leave a complete report behind
            let _ = self.stop();
        }
    }

    fn start(&mut self, output_path: PathBuf) -> Result<(), CollectorError> {
        // Same file: the running report must be closed before it is replaced
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.output_path == output_path)
        {
            self.finish_previous();
        }

        let report = ReportWriter::create(&output_path).map_err(|source| {
            CollectorError::CreateOutput {
                path: output_path.clone(),
                source,
            }
        })?;
        self.finish_previous();

        self.stats = CollectorStats::default();

        tracing::info!(path = %output_path.display(), "LZ4 log collection started");
        self.session = Some(Session {
            output_path,
            report,
        });
        Ok(())
    }

    fn collect(&mut self, line: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(entry) = self.parser.parse(line) else {
            tracing::debug!(line, "dropping unparsable LZ4 log line");
            return;
        };

        if let Err(e) = session.report.write_entry(&entry) {
            tracing::warn!(error = %e, "failed to append LZ4 report row");
        }
        self.stats.record(&entry);
    }

    fn finish_previous(&mut self) {
        if let Ok(previous) = self.stop() {
            tracing::info!(
                entries = previous.entry_count,
                path = %previous.output_path.display(),
                "finalised previous LZ4 session on restart"
            );
        }
    }

    fn stop(&mut self) -> Result<CollectSummary, CollectorError> {
        let session = self.session.take().ok_or(CollectorError::NotCollecting)?;

        if let Err(e) = session.report.finish(&self.stats, Local::now()) {
            tracing::warn!(error = %e, "failed to finalise LZ4 report");
        }

        tracing::info!(
            entries = self.stats.entry_count,
            path = %session.output_path.display(),
            "LZ4 log collection stopped"
        );
        Ok(CollectSummary::new(self.stats, session.output_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    fn compress_line(compressed: u64, original: u64) -> String {
        format!(
            "[0][2026/02/02 13:51:48:144(08)]: log: level: 0, area: 4, LZ4 compress success: compressed size={} bytes, original size={}, ratio=50.0 %",
            compressed, original
        )
    }

    #[test]
    fn test_start_stop_without_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.md");
        let collector = LogCollector::spawn().unwrap();

        collector.start_collecting(&path).unwrap();
        assert!(collector.collecting());

        let summary = collector.stop_collecting().unwrap();
        assert_eq!(summary.entry_count, 0);
        assert_eq!(summary.output_path, path);
        assert!(!collector.collecting());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# LZ4 压缩统计报告\n\n> 未收集到任何 LZ4 压缩日志\n"
        );
    }

    #[test]
    fn test_stop_when_idle() {
        let collector = LogCollector::spawn().unwrap();
        assert!(matches!(
            collector.stop_collecting(),
            Err(CollectorError::NotCollecting)
        ));
    }

    #[test]
    fn test_collect_ignored_when_idle() {
        let collector = LogCollector::spawn().unwrap();
        collector.collect_log(compress_line(1, 2));
        assert_eq!(collector.count(), 0);
    }

    #[test]
    fn test_aggregate_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.md");
        let collector = LogCollector::spawn().unwrap();

        collector.start_collecting(&path).unwrap();
        collector.collect_log(compress_line(10, 20));
        collector.collect_log(compress_line(30, 40));

        let summary = collector.stop_collecting().unwrap();
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.total_compressed_size, 40);
        assert_eq!(summary.total_original_size, 60);
        assert!((summary.average_ratio - 66.67).abs() < 0.01);

        let report = fs::read_to_string(&path).unwrap();
        assert!(report.contains("| 2026/02/02 13:51:48:144 | 10 | 20 | 50.00% |"));
        assert!(report.contains("| 平均压缩率 | 66.67% |"));
    }

    #[test]
    fn test_unrelated_lines_leave_counters() {
        let dir = tempfile::tempdir().unwrap();
        let collector = LogCollector::spawn().unwrap();
        collector.start_collecting(dir.path().join("output.md")).unwrap();

        for i in 0..1000 {
            collector.collect_log(format!("log: level: 0, area: 2, heartbeat {}", i));
        }
        collector.collect_log("LZ4 compress success: compressed size=13 by");

        assert_eq!(collector.stats(), CollectorStats::default());
    }

    #[test]
    fn test_concurrent_submissions_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Arc::new(LogCollector::spawn().unwrap());
        collector.start_collecting(dir.path().join("output.md")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for i in 0..50 {
                        collector.collect_log(compress_line(t * 100 + i, 1000));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.count(), 400);
        let summary = collector.stop_collecting().unwrap();
        assert_eq!(summary.entry_count, 400);
        assert_eq!(summary.total_original_size, 400_000);
    }

    #[test]
    fn test_restart_resets_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.md");
        let collector = LogCollector::spawn().unwrap();

        collector.start_collecting(&path).unwrap();
        collector.collect_log(compress_line(1, 2));
        assert_eq!(collector.count(), 1);
        collector.stop_collecting().unwrap();

        collector.start_collecting(&path).unwrap();
        assert_eq!(collector.count(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_reset_keeps_collecting() {
        let dir = tempfile::tempdir().unwrap();
        let collector = LogCollector::spawn().unwrap();
        collector.start_collecting(dir.path().join("output.md")).unwrap();

        collector.collect_log(compress_line(1, 2));
        collector.reset();
        assert_eq!(collector.count(), 0);
        assert!(collector.collecting());

        collector.collect_log(compress_line(3, 4));
        assert_eq!(collector.stats().total_compressed_size, 3);
    }

    #[test]
    fn test_start_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let collector = LogCollector::spawn().unwrap();
        let result = collector.start_collecting(dir.path().join("missing").join("output.md"));

        assert!(matches!(result, Err(CollectorError::CreateOutput { .. })));
        assert!(!collector.collecting());
    }

    #[test]
    fn test_failed_restart_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.md");
        let collector = LogCollector::spawn().unwrap();

        collector.start_collecting(&path).unwrap();
        collector.collect_log(compress_line(10, 20));

        let result = collector.start_collecting(dir.path().join("missing").join("o.md"));
        assert!(matches!(result, Err(CollectorError::CreateOutput { .. })));
        assert!(collector.collecting());
        assert_eq!(collector.count(), 1);

        collector.collect_log(compress_line(30, 40));
        let summary = collector.stop_collecting().unwrap();
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.output_path, path);
        assert!(fs::read_to_string(&path).unwrap().contains("| 总条数 | 2 |"));
    }

    #[test]
    fn test_restart_to_new_path_finalises_previous() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.md");
        let second = dir.path().join("second.md");
        let collector = LogCollector::spawn().unwrap();

        collector.start_collecting(&first).unwrap();
        collector.collect_log(compress_line(10, 20));
        collector.start_collecting(&second).unwrap();

        assert_eq!(collector.count(), 0);
        assert!(fs::read_to_string(&first).unwrap().contains("| 总条数 | 1 |"));
        assert_eq!(fs::read_to_string(&second).unwrap(), "");
    }

    #[tokio::test]
    async fn test_queries_from_async_context() {
        let dir = tempfile::tempdir().unwrap();
        let collector = LogCollector::spawn().unwrap();
        assert_eq!(collector.count(), 0);
        assert!(!collector.collecting());

        collector.start_collecting(dir.path().join("output.md")).unwrap();
        collector.collect_log(compress_line(10, 20));
        assert_eq!(collector.count(), 1);
        assert_eq!(collector.stop_collecting().unwrap().entry_count, 1);
    }

    #[test]
    fn test_drop_finalises_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.md");
        {
            let collector = LogCollector::spawn().unwrap();
            collector.start_collecting(&path).unwrap();
            collector.collect_log(compress_line(5, 10));
        }

        let report = fs::read_to_string(&path).unwrap();
        assert!(report.contains("| 总条数 | 1 |"));
    }
}
