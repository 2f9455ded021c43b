//! Standalone session replay tool
//!
//! Feeds a recorded JSON-lines update file through the engine and prints the
//! derived events followed by a summary and the final classification.
//!
//! Usage:
//!   replay_session <updates.jsonl> [--show-blue-flags]

use std::collections::BTreeMap;
use std::env;
use std::fs;
use timing_engine::{DerivedEvent, Engine, EngineConfig};

fn main() {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: {} <updates.jsonl> [--show-blue-flags]", args[0]);
        std::process::exit(1);
    };
    let show_blue_flags = args.iter().any(|a| a == "--show-blue-flags");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let config = EngineConfig::default().with_blue_flag_suppression(!show_blue_flags);
    let mut engine = Engine::new(config, Vec::<DerivedEvent>::new());
    let mut per_kind: BTreeMap<String, usize> = BTreeMap::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match engine.process_json(line) {
            Ok(events) => {
                for event in events {
                    *per_kind.entry(event.kind().to_string()).or_default() += 1;
                    println!(
                        "{:>5}  {:<20} {}",
                        line_no + 1,
                        event.kind(),
                        serde_json::to_string(&event.detail).unwrap_or_default()
                    );
                }
            }
            Err(e) => eprintln!("{:>5}  rejected: {}", line_no + 1, e),
        }
    }

    let stats = engine.stats();
    println!("\n=== REPLAY SUMMARY ===");
    println!("Records applied: {}", stats.applied);
    println!("Records rejected: {}", stats.rejected);
    println!("Fields dropped: {}", stats.dropped_fields);
    println!("Events: {}", stats.events);
    for (kind, count) in &per_kind {
        println!("  {}: {}", kind, count);
    }

    println!("\n=== CLASSIFICATION ===");
    for row in engine.classification() {
        let position = row.position.map_or("-".to_string(), |p| p.to_string());
        let tyre = engine
            .tyre(&row.driver)
            .and_then(|t| t.compound)
            .map_or(String::new(), |c| c.to_string());
        let status = if row.retired {
            "OUT"
        } else if row.eliminated {
            "KO"
        } else {
            ""
        };
        println!("{:>3}  {:<4} {:<12} {}", position, row.driver, tyre, status);
    }
    if let Some(best) = engine.session_best() {
        println!("\nFastest lap: {} by {}", best.time, best.driver);
    }
}
