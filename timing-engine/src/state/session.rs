//! Session-wide state

use crate::lifecycle::Phase;
use crate::normalizer::Field;
use crate::types::{FlagStatus, LapTime, SessionType, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fastest valid lap of the session (or active qualifying segment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionBest {
    pub driver: String,
    pub time: LapTime,
}

/// A race-control message; append-only, never revised
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceControlMessage {
    pub id: u64,
    pub message: String,
    pub category: Option<String>,
    pub flag: Option<String>,
    pub mode: Option<String>,
    pub status: Option<String>,
    pub lap: Option<u32>,
    pub timestamp: Option<Timestamp>,
}

impl RaceControlMessage {
    pub fn is_blue_flag(&self) -> bool {
        self.flag
            .as_deref()
            .is_some_and(|flag| flag.eq_ignore_ascii_case("BLUE"))
    }
}

/// One timed on-track activity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    /// Session key from the feed
    pub id: String,
    pub session_type: Option<SessionType>,
    pub phase: Phase,
    pub flag: FlagStatus,
    /// Qualifying segment (1 = Q1)
    pub segment: Option<u8>,
    pub circuit: Option<String>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,

    /// Session all-time best
    pub best: Option<SessionBest>,
    /// Last driver unambiguously classified P1 while running
    pub leader: Option<String>,
    pub race_control: BTreeMap<u64, RaceControlMessage>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Reset every reported field to its default, keeping phase and derived state
    pub fn reset_reported(&mut self) {
        self.session_type = None;
        self.flag = FlagStatus::default();
        self.segment = None;
        self.circuit = None;
        self.started_at = None;
        self.ended_at = None;
    }

    /// Apply one session-scoped field
    ///
    /// Status signals and best-time resets are lifecycle concerns and are
    /// handled by the lifecycle manager, not here.
    pub fn apply_field(&mut self, field: &Field) {
        match field {
            Field::SessionType(kind) => self.session_type = Some(*kind),
            Field::TrackStatus(flag) => self.flag = *flag,
            Field::Segment(part) => self.segment = Some(*part),
            Field::Circuit(name) => self.circuit = Some(name.clone()),
            Field::StartTime(ts) => self.started_at = Some(*ts),
            Field::EndTime(ts) => self.ended_at = Some(*ts),
            Field::RaceControlMessages(messages) => {
                for message in messages {
                    self.race_control
                        .entry(message.id)
                        .or_insert_with(|| message.clone());
                }
            }
            Field::RaceControlAppend(messages) => {
                let mut next_id = self.race_control.keys().next_back().map_or(0, |id| id + 1);
                for message in messages {
                    self.race_control.insert(
                        next_id,
                        RaceControlMessage {
                            id: next_id,
                            ..message.clone()
                        },
                    );
                    next_id += 1;
                }
            }
            Field::Status(_) | Field::BestTimesReset => {}
            _ => log::trace!("Driver field {:?} applied to session {}", field, self.id),
        }
    }

    /// Offer a valid lap to the all-time best; true if it became the new best
    pub fn offer_lap(&mut self, driver: &str, time: LapTime) -> bool {
        if self.best.as_ref().map_or(true, |best| time < best.time) {
            self.best = Some(SessionBest {
                driver: driver.to_string(),
                time,
            });
            return true;
        }
        false
    }
}
