//! Live Timing Session Engine
//!
//! Turns a stream of low-level timing field updates into discrete session
//! events (purple laps, personal bests, knock-outs, lead changes,
//! retirements, pit stops, tyre changes, race-control messages).
//!
//! # Architecture
//!
//! - [`normalizer`]: raw records (full replace or delta, session or driver
//!   scope) into typed field updates
//! - [`state`]: the authoritative session and driver state, swapped as
//!   immutable snapshots
//! - [`lifecycle`]: session phases and the resets tied to them
//! - [`detectors`]: pure functions from an old/new snapshot pair to events
//! - [`publisher`]: hands events to the broker
//! - [`feed`]: merges several update streams into one ordered queue
//!
//! The library does NOT:
//! - Decode the upstream transport (handshake, compression, framing)
//! - Format notification text or deliver it anywhere
//! - Persist state across restarts
//!
//! # Example Usage
//!
//! ```
//! use serde_json::json;
//! use timing_engine::{DerivedEvent, Engine, EngineConfig, RawUpdate};
//!
//! let mut engine = Engine::new(EngineConfig::default(), Vec::<DerivedEvent>::new());
//!
//! engine
//!     .process(RawUpdate::session_delta("9158", json!({"Type": "Race", "Status": "Started"})))
//!     .unwrap();
//! let events = engine
//!     .process(RawUpdate::driver_delta("9158", "1", json!({"LastLapTime": "1:32.608"})))
//!     .unwrap();
//!
//! for event in &events {
//!     println!("{}: {:?}", event.kind(), event.detail);
//! }
//! ```

pub mod config;
pub mod detectors;
pub mod engine;
pub mod events;
pub mod feed;
pub mod lifecycle;
pub mod normalizer;
pub mod publisher;
pub mod query;
pub mod state;
pub mod types;

// Re-export main types for convenience
pub use config::{EngineConfig, PitLaneReference};
pub use detectors::{Detector, DetectorRegistry};
pub use engine::{Engine, EngineStats};
pub use events::{DerivedEvent, EventContext, EventDetail, EventKind};
pub use feed::{FeedHandle, FeedQueue};
pub use lifecycle::Phase;
pub use normalizer::{RawUpdate, Scope, UpdateKind};
pub use publisher::{ChannelPublisher, Publisher};
pub use state::{Snapshot, Transition};
pub use types::{
    Compound, EngineError, FlagStatus, Gap, LapTime, PitStatus, Result, SessionStatus,
    SessionType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
