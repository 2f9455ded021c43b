//! Derived events
//!
//! The engine's output: immutable, serializable records handed to the
//! publisher. Each event names its publish channel through [`EventKind`].

use crate::lifecycle::Phase;
use crate::state::{RaceControlMessage, Snapshot};
use crate::types::{Compound, LapTime, SessionType, Timestamp};
use serde::Serialize;
use std::fmt;

/// Event category; doubles as the publish channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    QuickestOverallLap,
    PersonalBest,
    KnockedOut,
    TyreChange,
    LeaderChange,
    Retirement,
    PitStopTime,
    SlowPitLane,
    RaceControlMessage,
}

impl EventKind {
    /// Channel name used by the broker
    pub fn channel(&self) -> &'static str {
        match self {
            EventKind::QuickestOverallLap => "QuickestOverallLap",
            EventKind::PersonalBest => "PersonalBest",
            EventKind::KnockedOut => "KnockedOut",
            EventKind::TyreChange => "TyreChange",
            EventKind::LeaderChange => "LeaderChange",
            EventKind::Retirement => "Retirement",
            EventKind::PitStopTime => "PitStopTime",
            EventKind::SlowPitLane => "SlowPitLane",
            EventKind::RaceControlMessage => "RaceControlMessage",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel())
    }
}

/// Where and when an event happened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventContext {
    pub session: String,
    pub session_type: Option<SessionType>,
    /// Qualifying segment, if the session has one
    pub segment: Option<u8>,
    pub phase: Phase,
    /// Upstream timestamp of the record that triggered the event
    pub timestamp: Option<Timestamp>,
}

impl EventContext {
    pub fn from_snapshot(snapshot: &Snapshot, timestamp: Option<Timestamp>) -> Self {
        Self {
            session: snapshot.session.id.clone(),
            session_type: snapshot.session.session_type,
            segment: snapshot.session.segment,
            phase: snapshot.session.phase,
            timestamp,
        }
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum EventDetail {
    /// New session (or segment) best
    QuickestOverallLap {
        driver: String,
        lap_time: LapTime,
        previous_best: Option<LapTime>,
        lap: Option<u32>,
        compound: Option<Compound>,
        tyre_age: Option<u32>,
    },
    PersonalBest {
        driver: String,
        lap_time: LapTime,
        previous_best: Option<LapTime>,
    },
    KnockedOut {
        driver: String,
        position: Option<u32>,
        segment: Option<u8>,
    },
    TyreChange {
        driver: String,
        previous: Option<Compound>,
        compound: Compound,
        stint: Option<u32>,
        tyre_age: Option<u32>,
    },
    LeaderChange {
        /// `None` when the previous leader retired and vacated P1
        previous: Option<String>,
        leader: String,
    },
    Retirement {
        driver: String,
        /// Lap on which the car stopped
        lap: Option<u32>,
    },
    PitStopTime {
        driver: String,
        stationary_secs: f64,
    },
    SlowPitLane {
        driver: String,
        pit_lane_secs: f64,
        threshold_secs: f64,
    },
    RaceControlMessage {
        message: RaceControlMessage,
    },
}

impl EventDetail {
    pub fn kind(&self) -> EventKind {
        match self {
            EventDetail::QuickestOverallLap { .. } => EventKind::QuickestOverallLap,
            EventDetail::PersonalBest { .. } => EventKind::PersonalBest,
            EventDetail::KnockedOut { .. } => EventKind::KnockedOut,
            EventDetail::TyreChange { .. } => EventKind::TyreChange,
            EventDetail::LeaderChange { .. } => EventKind::LeaderChange,
            EventDetail::Retirement { .. } => EventKind::Retirement,
            EventDetail::PitStopTime { .. } => EventKind::PitStopTime,
            EventDetail::SlowPitLane { .. } => EventKind::SlowPitLane,
            EventDetail::RaceControlMessage { .. } => EventKind::RaceControlMessage,
        }
    }

    /// Driver the event is about, if any
    pub fn driver(&self) -> Option<&str> {
        match self {
            EventDetail::QuickestOverallLap { driver, .. }
            | EventDetail::PersonalBest { driver, .. }
            | EventDetail::KnockedOut { driver, .. }
            | EventDetail::TyreChange { driver, .. }
            | EventDetail::Retirement { driver, .. }
            | EventDetail::PitStopTime { driver, .. }
            | EventDetail::SlowPitLane { driver, .. } => Some(driver),
            EventDetail::LeaderChange { leader, .. } => Some(leader),
            EventDetail::RaceControlMessage { .. } => None,
        }
    }
}

/// An event derived from one state transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedEvent {
    pub context: EventContext,
    #[serde(flatten)]
    pub detail: EventDetail,
}

impl DerivedEvent {
    pub fn new(context: EventContext, detail: EventDetail) -> Self {
        Self { context, detail }
    }

    pub fn kind(&self) -> EventKind {
        self.detail.kind()
    }

    pub fn driver(&self) -> Option<&str> {
        self.detail.driver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = DerivedEvent::new(
            EventContext {
                session: "9574".to_string(),
                session_type: Some(SessionType::Race),
                segment: None,
                phase: Phase::Active,
                timestamp: None,
            },
            EventDetail::LeaderChange {
                previous: Some("1".to_string()),
                leader: "4".to_string(),
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "LeaderChange");
        assert_eq!(json["leader"], "4");
        assert_eq!(json["context"]["session"], "9574");
        assert_eq!(json["context"]["phase"], "Active");
    }

    #[test]
    fn test_lap_time_serializes_as_text() {
        let detail = EventDetail::PersonalBest {
            driver: "44".to_string(),
            lap_time: LapTime::from_millis(92_000),
            previous_best: None,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["lap_time"], "1:32.000");
        assert_eq!(detail.kind(), EventKind::PersonalBest);
        assert_eq!(detail.driver(), Some("44"));
    }
}
