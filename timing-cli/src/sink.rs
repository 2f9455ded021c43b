//! Event sink
//!
//! Drains the publisher channel on its own thread and writes one JSON
//! object per event, flushed line by line so downstream consumers see
//! events as they happen.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use timing_engine::DerivedEvent;

/// Write every event from `events` until the channel closes
pub fn write_events<W: Write>(events: Receiver<DerivedEvent>, mut out: W) -> Result<u64> {
    let mut written = 0;
    for event in events {
        serde_json::to_writer(&mut out, &event).context("Failed to serialize event")?;
        out.write_all(b"\n")?;
        out.flush()?;
        written += 1;
    }
    Ok(written)
}

/// Start the writer thread for a file, or stdout when no path is given
pub fn spawn_writer(events: Receiver<DerivedEvent>, path: Option<&Path>) -> Result<JoinHandle<Result<u64>>> {
    let out: Box<dyn Write + Send> = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    thread::Builder::new()
        .name("event-writer".to_string())
        .spawn(move || write_events(events, out))
        .context("Failed to spawn event writer")
}
