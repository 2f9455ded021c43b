//! Event detectors
//!
//! One detector per event category. A detector is a plain function of the
//! old and new snapshot; it keeps no state of its own and may push any
//! number of events. Detectors run in registry order, so the order of events
//! produced by one update is deterministic.
//!
//! Whether a detector runs at all is decided by the registry from the
//! session phase (see [`crate::lifecycle::emits_driver_events`]); detectors
//! only decide *what* changed.

pub mod elimination;
pub mod lap_time;
pub mod leader;
pub mod pit_stop;
pub mod race_control;
pub mod retirement;
pub mod tyre;

use crate::config::EngineConfig;
use crate::events::{DerivedEvent, EventContext, EventDetail};
use crate::lifecycle::{emits_driver_events, emits_race_control};
use crate::state::{DriverState, Snapshot, Transition};
use crate::types::Timestamp;

/// Read-only inputs shared by every detector for one transition
pub struct DetectorContext<'a> {
    pub config: &'a EngineConfig,
    pub timestamp: Option<Timestamp>,
    event: EventContext,
}

impl<'a> DetectorContext<'a> {
    pub fn new(config: &'a EngineConfig, new: &Snapshot, timestamp: Option<Timestamp>) -> Self {
        Self {
            config,
            timestamp,
            event: EventContext::from_snapshot(new, timestamp),
        }
    }

    /// Stamp a payload with the session context of this transition
    pub fn event(&self, detail: EventDetail) -> DerivedEvent {
        DerivedEvent::new(self.event.clone(), detail)
    }
}

/// Signature shared by all detectors
pub type DetectFn = fn(&Snapshot, &Snapshot, &DetectorContext<'_>, &mut Vec<DerivedEvent>);

/// Which emission rule applies to a detector's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Events about drivers: only while the session is running
    Driver,
    /// Race-control messages: also before the session starts
    RaceControl,
}

/// A named detector in the registry
#[derive(Clone, Copy)]
pub struct Detector {
    pub name: &'static str,
    pub gate: Gate,
    pub detect: DetectFn,
}

impl Detector {
    pub const fn new(name: &'static str, gate: Gate, detect: DetectFn) -> Self {
        Self { name, gate, detect }
    }
}

/// Ordered list of detectors run for every transition
pub struct DetectorRegistry {
    detectors: Vec<Detector>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self {
            detectors: vec![
                Detector::new("lap_time", Gate::Driver, lap_time::detect),
                Detector::new("elimination", Gate::Driver, elimination::detect),
                Detector::new("tyre", Gate::Driver, tyre::detect),
                Detector::new("leader", Gate::Driver, leader::detect),
                Detector::new("retirement", Gate::Driver, retirement::detect),
                Detector::new("pit_stop", Gate::Driver, pit_stop::detect_stop_time),
                Detector::new("pit_lane", Gate::Driver, pit_stop::detect_slow_pit_lane),
                Detector::new("race_control", Gate::RaceControl, race_control::detect),
            ],
        }
    }
}

impl DetectorRegistry {
    /// Registry with no detectors
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Append a detector; it runs after the ones already registered
    pub fn register(&mut self, detector: Detector) {
        self.detectors.push(detector);
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every applicable detector over one transition
    ///
    /// Retained-snapshot transitions never produce events.
    pub fn run(&self, transition: &Transition, config: &EngineConfig) -> Vec<DerivedEvent> {
        let mut events = Vec::new();
        if transition.snapshot {
            return events;
        }

        let (old, new) = (transition.old.as_ref(), transition.new.as_ref());
        let (before, after) = (old.session.phase, new.session.phase);
        let driver_events = emits_driver_events(before, after);
        let race_control = emits_race_control(before, after);
        if !driver_events && !race_control {
            return events;
        }

        let ctx = DetectorContext::new(config, new, transition.timestamp);
        for detector in &self.detectors {
            let enabled = match detector.gate {
                Gate::Driver => driver_events,
                Gate::RaceControl => race_control,
            };
            if !enabled {
                continue;
            }

            let before_len = events.len();
            (detector.detect)(old, new, &ctx, &mut events);
            for event in &events[before_len..] {
                log::debug!("{} detector: {:?}", detector.name, event.detail);
            }
        }
        events
    }
}

/// Drivers whose state differs between the two snapshots, with their old state
///
/// A driver absent from the old snapshot is paired with `None`.
pub fn changed_drivers<'a>(
    old: &'a Snapshot,
    new: &'a Snapshot,
) -> impl Iterator<Item = (Option<&'a DriverState>, &'a DriverState)> + 'a {
    new.drivers.values().filter_map(move |driver| {
        let prev = old.driver(&driver.id);
        (prev != Some(driver)).then_some((prev, driver))
    })
}
