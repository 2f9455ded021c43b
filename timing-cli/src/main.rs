//! Live Timing CLI Application
//!
//! Process shell around the timing-engine library:
//! - Loads configuration (TOML) and sets up logging
//! - Reads raw update records from one or more JSON-lines streams
//! - Serializes them into one ordered feed queue
//! - Drives the engine and writes derived events as JSON lines

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use timing_engine::{ChannelPublisher, Engine, FeedQueue};

mod config;
mod reader;
mod sink;

use reader::StreamSource;

/// Live Timing - derive session events from a timing feed
#[derive(Parser, Debug)]
#[command(name = "timing-cli")]
#[command(about = "Turn live timing field updates into session events", long_about = None)]
#[command(version)]
struct Args {
    /// Update stream(s) to read, one JSON record per line (`-` for stdin; can be repeated)
    #[arg(short, long, value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Output file for derived events (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not reopen streams after a read failure
    #[arg(long)]
    no_retry: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Live Timing CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using engine library v{}", timing_engine::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    // Command line overrides the config file
    if !args.input.is_empty() {
        config.input.streams = args.input.clone();
    }
    if args.output.is_some() {
        config.output.path = args.output.clone();
    }
    if args.no_retry {
        config.feed.retry = false;
    }

    if config.input.streams.is_empty() {
        bail!("No input streams (use --input or [input] streams in the config file)");
    }

    run(config)
}

/// Wire streams → queue → engine → writer and run until every stream ends
fn run(config: config::AppConfig) -> Result<()> {
    let (publisher, events) = ChannelPublisher::new();
    let writer = sink::spawn_writer(events, config.output.path.as_deref())?;
    let mut engine = Engine::new(config.engine.clone(), publisher);

    let queue = FeedQueue::new();
    let mut readers = Vec::new();
    for path in &config.input.streams {
        let source = StreamSource::from_path(path);
        let handle = queue.handle(source.name());
        log::info!("Reading stream: {}", source.name());
        let reader = reader::spawn_reader(source, handle, config.feed.clone())
            .with_context(|| format!("Failed to start reader for {:?}", path))?;
        readers.push(reader);
    }

    let summary = queue.drain_into(&mut engine);

    let mut rejected_lines = 0;
    for reader in readers {
        match reader.join() {
            Ok(stats) => rejected_lines += stats.rejected,
            Err(_) => log::error!("Stream reader thread panicked"),
        }
    }

    let stats = engine.stats();
    drop(engine);

    let written = match writer.join() {
        Ok(result) => result?,
        Err(_) => bail!("Event writer thread panicked"),
    };

    log::info!(
        "Processed {} records ({} rejected, {} invalid lines, {} ignored), {} events written, {} disconnects",
        summary.records,
        summary.rejected,
        rejected_lines,
        stats.ignored,
        written,
        stats.disconnects
    );
    if stats.publish_failures > 0 {
        log::warn!("{} events could not be published", stats.publish_failures);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}
