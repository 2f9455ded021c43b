//! Main engine API
//!
//! The [`Engine`] is the entry point of the library. It owns the state store,
//! the detector registry and the publisher, and runs one raw record at a time
//! through normalize → apply → detect → publish.

use crate::config::EngineConfig;
use crate::detectors::DetectorRegistry;
use crate::events::DerivedEvent;
use crate::normalizer::{normalize, RawUpdate};
use crate::publisher::Publisher;
use crate::query::{ClassifiedDriver, Gaps, TrackStatus, TyreInfo};
use crate::state::{SessionBest, SessionStore, Snapshot};
use crate::types::Result;
use std::sync::Arc;

/// Counters describing what the engine has processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Records applied to the store
    pub applied: u64,
    /// Records rejected as structurally invalid
    pub rejected: u64,
    /// Records ignored while waiting for a snapshot after a disconnect
    pub ignored: u64,
    /// Unknown or uninterpretable fields dropped by the normalizer
    pub dropped_fields: u64,
    pub events: u64,
    pub publish_failures: u64,
    pub disconnects: u64,
}

/// Session state engine for one upstream feed
pub struct Engine<P: Publisher> {
    store: SessionStore,
    detectors: DetectorRegistry,
    publisher: P,
    /// Set on disconnect; cleared by the next retained snapshot
    awaiting_snapshot: bool,
    stats: EngineStats,
}

impl<P: Publisher> Engine<P> {
    /// Create an engine with the default detectors
    pub fn new(config: EngineConfig, publisher: P) -> Self {
        Self::with_detectors(config, DetectorRegistry::default(), publisher)
    }

    /// Create an engine with a custom detector registry
    pub fn with_detectors(config: EngineConfig, detectors: DetectorRegistry, publisher: P) -> Self {
        Self {
            store: SessionStore::new(config),
            detectors,
            publisher,
            awaiting_snapshot: false,
            stats: EngineStats::default(),
        }
    }

    /// Process one raw record and publish the events it produces
    ///
    /// # Returns
    /// * `Ok(events)` - events derived from the record (already published)
    /// * `Err(_)` - the record was structurally invalid; state is unchanged
    pub fn process(&mut self, raw: RawUpdate) -> Result<Vec<DerivedEvent>> {
        let update = match normalize(raw) {
            Ok(update) => update,
            Err(e) => {
                self.stats.rejected += 1;
                return Err(e);
            }
        };
        self.stats.dropped_fields += update.dropped as u64;

        if self.awaiting_snapshot {
            if !update.snapshot {
                log::trace!("Ignoring record for session {} until snapshot", update.session);
                self.stats.ignored += 1;
                return Ok(Vec::new());
            }
            log::info!("Snapshot received for session {}, resuming", update.session);
            self.awaiting_snapshot = false;
        }

        let transition = self.store.apply(&update);
        self.stats.applied += 1;

        let events = self.detectors.run(&transition, self.store.config());
        for event in &events {
            self.stats.events += 1;
            if let Err(e) = self.publisher.publish(event.kind(), event) {
                self.stats.publish_failures += 1;
                log::warn!("Failed to publish {} event: {}", event.kind(), e);
            }
        }
        Ok(events)
    }

    /// Parse one JSON line and process it
    pub fn process_json(&mut self, line: &str) -> Result<Vec<DerivedEvent>> {
        match RawUpdate::from_json(line) {
            Ok(raw) => self.process(raw),
            Err(e) => {
                self.stats.rejected += 1;
                Err(e)
            }
        }
    }

    /// Upstream connection lost: drop all state and wait for a snapshot
    pub fn on_disconnect(&mut self) {
        log::warn!("Feed disconnected, waiting for snapshot");
        self.store.reset();
        self.awaiting_snapshot = true;
        self.stats.disconnects += 1;
    }

    pub fn is_awaiting_snapshot(&self) -> bool {
        self.awaiting_snapshot
    }

    /// Current state snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    pub fn config(&self) -> &EngineConfig {
        self.store.config()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Consume the engine, returning its publisher
    pub fn into_publisher(self) -> P {
        self.publisher
    }

    pub fn tyre(&self, driver: &str) -> Option<TyreInfo> {
        self.store.current().tyre(driver)
    }

    pub fn gaps(&self, driver: &str) -> Option<Gaps> {
        self.store.current().gaps(driver)
    }

    pub fn track_status(&self) -> TrackStatus {
        self.store.current().track_status()
    }

    pub fn classification(&self) -> Vec<ClassifiedDriver> {
        self.store.current().running_order()
    }

    pub fn session_best(&self) -> Option<SessionBest> {
        self.store.current().session_best().cloned()
    }
}
