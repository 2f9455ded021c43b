//! Per-driver session state

use crate::normalizer::Field;
use crate::types::{Compound, Gap, LapTime, PitStatus};
use serde::Serialize;

/// A completed lap as reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletedLap {
    pub time: LapTime,
    /// Lap deleted by race control (track limits etc.)
    pub deleted: bool,
}

impl CompletedLap {
    pub fn valid_time(&self) -> Option<LapTime> {
        (!self.deleted).then_some(self.time)
    }
}

/// State of one competitor within a session
///
/// Reported fields mirror the feed and are reset by a full replace.
/// Derived fields (`best_lap`, `segment_best`, `pit_entry_compound`) and the
/// sticky `retired` / `eliminated` flags are owned by the store and survive
/// a full replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriverState {
    /// Racing number
    pub id: String,
    pub position: Option<u32>,
    pub laps: Option<u32>,
    pub current_lap_time: Option<LapTime>,
    pub last_lap: Option<CompletedLap>,
    pub gap_to_leader: Option<Gap>,
    pub interval_to_ahead: Option<Gap>,
    pub compound: Option<Compound>,
    pub tyre_age: Option<u32>,
    pub stint: Option<u32>,
    pub pit_status: PitStatus,
    /// Stationary time of the latest stop in seconds
    pub pit_stop_time: Option<f64>,
    /// Pit-lane transit of the latest stop in seconds
    pub pit_lane_time: Option<f64>,

    /// Personal best for the whole session
    pub best_lap: Option<LapTime>,
    /// Personal best in the active qualifying segment (whole session otherwise)
    pub segment_best: Option<LapTime>,
    /// Compound fitted when the car last left the track
    pub pit_entry_compound: Option<Compound>,
    pub retired: bool,
    pub eliminated: bool,

    /// Valid times behind `best_lap`, so a deleted lap can be withdrawn
    #[serde(skip)]
    session_laps: Vec<LapTime>,
    /// Valid times behind `segment_best`
    #[serde(skip)]
    segment_laps: Vec<LapTime>,
}

impl DriverState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Reset every reported field to its default, keeping derived state
    pub fn reset_reported(&mut self) {
        *self = Self {
            id: std::mem::take(&mut self.id),
            best_lap: self.best_lap,
            segment_best: self.segment_best,
            pit_entry_compound: self.pit_entry_compound.take(),
            retired: self.retired,
            eliminated: self.eliminated,
            session_laps: std::mem::take(&mut self.session_laps),
            segment_laps: std::mem::take(&mut self.segment_laps),
            ..Self::default()
        };
    }

    /// Apply one driver-scoped field
    pub fn apply_field(&mut self, field: &Field) {
        match field {
            Field::Position(p) => self.position = Some(*p),
            Field::NumberOfLaps(n) => self.laps = Some(*n),
            Field::LastLapTime(lap) => self.last_lap = Some(*lap),
            Field::LapDeleted(flag) => {
                if let Some(lap) = self.last_lap.as_mut() {
                    lap.deleted = *flag;
                }
            }
            Field::BestLapTime(time) => self.offer_reported_best(*time),
            Field::CurrentLapTime(time) => self.current_lap_time = Some(*time),
            Field::GapToLeader(gap) => self.gap_to_leader = Some(*gap),
            Field::IntervalToAhead(gap) => self.interval_to_ahead = Some(*gap),
            Field::Compound(compound) => self.compound = Some(compound.clone()),
            Field::TyreAge(age) => self.tyre_age = Some(*age),
            Field::Stint(stint) => self.stint = Some(*stint),
            Field::PitStatus(status) => self.pit_status = *status,
            Field::PitStopTime(secs) => self.pit_stop_time = *secs,
            Field::PitLaneTime(secs) => self.pit_lane_time = *secs,
            // Both flags are sticky: a driver never un-retires or re-enters
            Field::Retired(flag) => self.retired |= *flag,
            Field::KnockedOut(flag) => self.eliminated |= *flag,
            _ => log::trace!("Session field {:?} applied to driver {}", field, self.id),
        }
    }

    /// Record a valid completed lap against both personal bests
    pub fn offer_lap(&mut self, time: LapTime) {
        self.session_laps.push(time);
        self.segment_laps.push(time);
        self.refresh_bests();
    }

    /// Fold a feed-reported personal best into both bests
    ///
    /// The feed repeats the value in every snapshot, so a time already
    /// on record is not counted twice.
    pub fn offer_reported_best(&mut self, time: LapTime) {
        if !self.session_laps.contains(&time) {
            self.session_laps.push(time);
        }
        if !self.segment_laps.contains(&time) {
            self.segment_laps.push(time);
        }
        self.refresh_bests();
    }

    /// Take a deleted lap back out of both personal bests
    pub fn withdraw_lap(&mut self, time: LapTime) {
        for laps in [&mut self.session_laps, &mut self.segment_laps] {
            if let Some(index) = laps.iter().position(|t| *t == time) {
                laps.swap_remove(index);
            }
        }
        self.refresh_bests();
    }

    /// Forget the personal best of the active segment
    pub fn reset_segment_best(&mut self) {
        self.segment_best = None;
        self.segment_laps.clear();
    }

    /// Forget both personal bests
    pub fn reset_bests(&mut self) {
        self.reset_segment_best();
        self.best_lap = None;
        self.session_laps.clear();
    }

    fn refresh_bests(&mut self) {
        self.best_lap = self.session_laps.iter().min().copied();
        self.segment_best = self.segment_laps.iter().min().copied();
    }

    /// Whether the car is still classified as running
    pub fn is_running(&self) -> bool {
        !self.retired
    }
}
