mod config;
mod sink;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lz4scope_logs::{CollectSummary, LogCollector};
use lz4scope_replay::{FileQueueManager, ReplayDriver, StreamingFileReader};

use crate::config::Config;
use crate::sink::LineSink;

/// lz4scope - LZ4 statistics from SDK logs and paced corpus replay
#[derive(Parser, Debug)]
#[command(name = "lz4scope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an LZ4 statistics report from SDK log output
    Collect {
        /// Log file or directory of log files, `-` for stdin
        #[arg(value_name = "LOG_PATH")]
        input: PathBuf,

        /// Report file (overrides the config file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay the messages of a corpus file or directory to stdout
    Replay {
        /// Corpus file or directory of newline-delimited JSON records
        #[arg(value_name = "CORPUS_PATH")]
        corpus: PathBuf,

        /// Delay between two messages (overrides the config file)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many messages
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(args.verbose))
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// `RUST_LOG` when set, otherwise warnings; each `-v` raises the floor
fn env_filter(verbose: u8) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let level = match verbose {
        0 => return filter,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    filter.add_directive(level.into())
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Collect {
            input,
            output,
            json,
        } => {
            let output = output.unwrap_or_else(|| config.collector.output.clone());
            let chunk_size = config.replay.chunk_size;
            // File and stdin reads block, keep them off the runtime threads
            let summary =
                tokio::task::spawn_blocking(move || collect(&input, &output, chunk_size))
                    .await
                    .context("Collector task failed")??;
            print_summary(&summary, json)
        }
        Command::Replay {
            corpus,
            interval_ms,
            limit,
        } => {
            let interval = Duration::from_millis(interval_ms.unwrap_or(config.replay.interval_ms));
            replay(&corpus, interval, limit, config.replay.chunk_size).await
        }
    }
}

/// Feed every line of `input` through a fresh collector session
fn collect(input: &Path, output: &Path, chunk_size: usize) -> Result<CollectSummary> {
    let collector = LogCollector::spawn()?;
    collector.start_collecting(output)?;

    if input == Path::new("-") {
        feed_lines(&collector, io::stdin().lock()).context("Failed to read stdin")?;
    } else {
        let mut queue = FileQueueManager::with_reader(StreamingFileReader::with_chunk_size(chunk_size));
        let files = queue.prepare(input)?;
        tracing::info!(files, "reading SDK logs");
        while let Some(line) = queue.read_next_line() {
            collector.collect_log(line);
        }
    }

    Ok(collector.stop_collecting()?)
}

/// Submit every line of `reader`; invalid UTF-8 is replaced, not fatal
fn feed_lines(collector: &LogCollector, mut reader: impl BufRead) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        collector.collect_log(String::from_utf8_lossy(&buf).trim_end_matches(['\n', '\r']));
    }
}

fn print_summary(summary: &CollectSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("Collected {} LZ4 entries", summary.entry_count);
    println!(
        "Compressed {} bytes / original {} bytes ({:.2}%)",
        summary.total_compressed_size, summary.total_original_size, summary.average_ratio
    );
    println!("Report written to {}", summary.output_path.display());
    Ok(())
}

async fn replay(corpus: &Path, interval: Duration, limit: Option<u64>, chunk_size: usize) -> Result<()> {
    let mut queue = FileQueueManager::with_reader(StreamingFileReader::with_chunk_size(chunk_size));
    let files = queue.prepare(corpus)?;
    tracing::info!(files, interval_ms = interval.as_millis() as u64, "replaying corpus");

    let mut driver = ReplayDriver::new(queue, LineSink::new(io::stdout()));
    if let Some(limit) = limit {
        driver = driver.with_limit(limit);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let stats = driver.run(interval, cancel).await;
    ctrl_c.abort();

    eprintln!(
        "Replay done: {} sent, {} failed, {} skipped ({} lines from {} files)",
        stats.sent,
        stats.failed,
        stats.skipped,
        driver.queue().total_lines_read(),
        driver.queue().total_files()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["lz4scope", "-vv", "collect", "sdk.log", "-o", "out.md"]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Collect { input, output, json } => {
                assert_eq!(input, PathBuf::from("sdk.log"));
                assert_eq!(output, Some(PathBuf::from("out.md")));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_collect_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir(&logs).unwrap();
        fs::write(
            logs.join("sdk-1.log"),
            "[0][2026/02/02 13:51:48:144(08)]: log: level: 0, area: 4, LZ4 compress success: compressed size=10 bytes, original size=20, ratio=50.000000 %\n\
             [0][2026/02/02 13:51:49:000(08)]: log: level: 0, area: 4, login ok\n",
        )
        .unwrap();
        fs::write(
            logs.join("sdk-2.log"),
            "[0][2026/02/02 13:54:40:004(08)]: log: level: 0, area: 1, LZ4 decompress success: compressed size=30 bytes, decompressed size=40, ratio=75.000000 %\n",
        )
        .unwrap();

        let output = dir.path().join("output.md");
        let summary = collect(&logs, &output, 16).unwrap();
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.total_compressed_size, 40);
        assert_eq!(summary.total_original_size, 60);

        let report = fs::read_to_string(&output).unwrap();
        assert!(report.contains("| 2026/02/02 13:51:48:144 | 10 | 20 | 50.00% |"));
        assert!(report.contains("| 2026/02/02 13:54:40:004 | 30 | 40 | 75.00% |"));
        assert!(report.contains("| 平均压缩率 | 66.67% |"));
    }

    #[test]
    fn test_feed_lines_survives_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let collector = LogCollector::spawn().unwrap();
        collector.start_collecting(dir.path().join("out.md")).unwrap();

        let mut input = b"[0][2026/02/02 13:51:48:144(08)]: LZ4 compress success: compressed size=10 bytes, original size=20, ratio=50.000000 %\n".to_vec();
        input.extend_from_slice(b"garbage \xff\xfe bytes\n");
        input.extend_from_slice(b"[0][2026/02/02 13:54:40:004(08)]: LZ4 decompress success: compressed size=30 bytes, decompressed size=40, ratio=75.000000 %\r\n");
        feed_lines(&collector, io::Cursor::new(input)).unwrap();

        let summary = collector.stop_collecting().unwrap();
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.total_original_size, 60);
    }

    #[test]
    fn test_env_filter_default_is_warn() {
        // RUST_LOG set for the test run takes precedence over both
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter(0).to_string(), "warn");
            assert_eq!(env_filter(2).to_string(), "debug");
        }
    }

    #[test]
    fn test_collect_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect(&dir.path().join("missing"), &dir.path().join("out.md"), 4096).is_err());
    }
}
