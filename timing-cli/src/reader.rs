//! Update stream readers
//!
//! One thread per input stream. Each line is one raw update record; lines
//! that do not parse are logged and skipped. End of file ends the stream.
//! With retry enabled, a failed stream signals a disconnect and is reopened
//! after the configured delay (the feed connector replays its retained
//! snapshot on reconnect).

use crate::config::FeedConfig;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use timing_engine::{FeedHandle, RawUpdate};

/// Where a stream is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    Stdin,
    File(PathBuf),
}

impl StreamSource {
    pub fn from_path(path: &Path) -> Self {
        if path == Path::new("-") {
            StreamSource::Stdin
        } else {
            StreamSource::File(path.to_path_buf())
        }
    }

    /// Stream name used for logging and queue tags
    pub fn name(&self) -> String {
        match self {
            StreamSource::Stdin => "stdin".to_string(),
            StreamSource::File(path) => path.display().to_string(),
        }
    }
}

/// Counts for one pass over a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub records: u64,
    pub rejected: u64,
}

/// Read records from `reader` into the queue until EOF
///
/// Returns early with `Ok` if the queue has shut down.
pub fn read_stream<R: BufRead>(reader: R, handle: &FeedHandle) -> io::Result<ReadStats> {
    let mut stats = ReadStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match RawUpdate::from_json(&line) {
            Ok(update) => {
                stats.records += 1;
                if !handle.send(update) {
                    log::debug!("{}: queue closed, stopping", handle.stream());
                    break;
                }
            }
            Err(e) => {
                stats.rejected += 1;
                log::warn!("{}:{}: invalid record: {}", handle.stream(), index + 1, e);
            }
        }
    }
    Ok(stats)
}

fn read_source(source: &StreamSource, handle: &FeedHandle) -> io::Result<ReadStats> {
    match source {
        StreamSource::Stdin => read_stream(io::stdin().lock(), handle),
        StreamSource::File(path) => read_stream(BufReader::new(File::open(path)?), handle),
    }
}

/// Read a stream to completion, applying the retry policy on failure
pub fn run_stream(source: &StreamSource, handle: &FeedHandle, feed: &FeedConfig) -> ReadStats {
    let mut total = ReadStats::default();
    let mut failures = 0u32;

    loop {
        match read_source(source, handle) {
            Ok(stats) => {
                total.records += stats.records;
                total.rejected += stats.rejected;
                log::info!("{}: end of stream ({} records)", handle.stream(), total.records);
                return total;
            }
            Err(e) => {
                failures += 1;
                let retry = feed.retry
                    && *source != StreamSource::Stdin
                    && feed.max_retries.map_or(true, |max| failures <= max);
                if !retry {
                    log::error!("{}: read failed: {}", handle.stream(), e);
                    return total;
                }

                log::warn!(
                    "{}: read failed ({}), reconnecting in {}s",
                    handle.stream(),
                    e,
                    feed.retry_delay_secs
                );
                if !handle.disconnected() {
                    return total;
                }
                thread::sleep(feed.retry_delay());
            }
        }
    }
}

/// Spawn a reader thread for one stream
pub fn spawn_reader(source: StreamSource, handle: FeedHandle, feed: FeedConfig) -> io::Result<JoinHandle<ReadStats>> {
    thread::Builder::new()
        .name(format!("reader-{}", source.name()))
        .spawn(move || run_stream(&source, &handle, &feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use timing_engine::{DerivedEvent, Engine, EngineConfig, FeedQueue};

    #[test]
    fn test_read_stream_skips_bad_lines() {
        let input = concat!(
            r#"{"session": "r", "scope": {"Driver": "1"}, "fields": {"Position": 1}}"#,
            "\n\nnot json\n",
            r#"{"session": "r", "scope": "Session", "kind": "FullReplace", "fields": {"Type": "Race"}}"#,
            "\n"
        );
        let queue = FeedQueue::new();
        let handle = queue.handle("test");

        let stats = read_stream(Cursor::new(input), &handle).unwrap();
        assert_eq!(stats, ReadStats { records: 2, rejected: 1 });
        drop(handle);

        let mut engine = Engine::new(EngineConfig::default(), Vec::<DerivedEvent>::new());
        let summary = queue.drain_into(&mut engine);
        assert_eq!(summary.records, 2);
        assert_eq!(engine.snapshot().driver("1").unwrap().position, Some(1));
    }

    #[test]
    fn test_missing_file_without_retry() {
        let queue = FeedQueue::new();
        let handle = queue.handle("missing");
        let source = StreamSource::File(PathBuf::from("/nonexistent/feed.jsonl"));

        let stats = run_stream(&source, &handle, &FeedConfig::default());
        assert_eq!(stats, ReadStats::default());
    }

    #[test]
    fn test_retry_signals_disconnects() {
        let queue = FeedQueue::new();
        let handle = queue.handle("missing");
        let source = StreamSource::File(PathBuf::from("/nonexistent/feed.jsonl"));
        let feed = FeedConfig {
            retry: true,
            retry_delay_secs: 0,
            max_retries: Some(2),
        };

        run_stream(&source, &handle, &feed);
        drop(handle);

        let mut engine = Engine::new(EngineConfig::default(), Vec::<DerivedEvent>::new());
        assert_eq!(queue.drain_into(&mut engine).disconnects, 2);
    }

    #[test]
    fn test_source_from_path() {
        assert_eq!(StreamSource::from_path(Path::new("-")), StreamSource::Stdin);
        assert_eq!(
            StreamSource::from_path(Path::new("feed.jsonl")).name(),
            "feed.jsonl"
        );
    }
}
