//! Session lifecycle manager
//!
//! Tracks the session phase (`Idle → Active → Suspended → Active → Finished
//! → Idle`) and applies the state resets that belong to phase and segment
//! boundaries:
//!
//! - starting a session re-initializes the all-time best and every personal best
//! - a qualifying segment change closes the old segment (knock-outs) and
//!   re-initializes segment bests, keeping elimination history
//! - finishing closes the current segment and stops event emission
//! - an explicit upstream best-time reset clears the best-time scalars
//!
//! The manager runs inside the store's apply step, on the snapshot being
//! built, so detectors only ever see the state after these effects.

use crate::config::EngineConfig;
use crate::normalizer::Field;
use crate::state::{Session, Snapshot};
use crate::types::{FlagStatus, SessionStatus};
use serde::Serialize;

/// Phase of the tracked session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Active,
    /// Red flag or stoppage
    Suspended,
    Finished,
}

/// Input that may move the phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    Status(SessionStatus),
    Track(FlagStatus),
}

/// A lifecycle transition applied during one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleChange {
    /// A record for a different session key replaced the tracked session
    NewSession { previous: String },
    Started,
    Suspended,
    Resumed,
    Finished,
    ReturnedToIdle,
    SegmentChanged { from: Option<u8>, to: u8 },
    BestTimesReset,
}

impl Phase {
    /// Active or suspended: the session is running
    pub fn is_live(&self) -> bool {
        matches!(self, Phase::Active | Phase::Suspended)
    }

    /// Next phase for a signal, or `None` if the signal does not apply here
    pub fn on_signal(self, signal: LifecycleSignal) -> Option<(Phase, LifecycleChange)> {
        use LifecycleSignal::{Status, Track};

        match (self, signal) {
            (Phase::Idle | Phase::Finished, Status(SessionStatus::Started)) => {
                Some((Phase::Active, LifecycleChange::Started))
            }
            (Phase::Suspended, Status(SessionStatus::Started)) => {
                Some((Phase::Active, LifecycleChange::Resumed))
            }
            (Phase::Active, Status(SessionStatus::Aborted) | Track(FlagStatus::Red)) => {
                Some((Phase::Suspended, LifecycleChange::Suspended))
            }
            (Phase::Suspended, Track(flag)) if flag != FlagStatus::Red => {
                Some((Phase::Active, LifecycleChange::Resumed))
            }
            (
                Phase::Idle | Phase::Active | Phase::Suspended,
                Status(SessionStatus::Finished | SessionStatus::Finalised | SessionStatus::Ends),
            ) => Some((Phase::Finished, LifecycleChange::Finished)),
            (Phase::Finished, Status(SessionStatus::Inactive)) => {
                Some((Phase::Idle, LifecycleChange::ReturnedToIdle))
            }
            _ => None,
        }
    }
}

/// Whether driver-derived events are published for an `old → new` phase pair
///
/// The update that finishes the session still emits (it closes the last
/// segment); anything after it does not.
pub fn emits_driver_events(old: Phase, new: Phase) -> bool {
    new.is_live() || (old.is_live() && new == Phase::Finished)
}

/// Race-control messages are also published before the session starts
pub fn emits_race_control(old: Phase, new: Phase) -> bool {
    emits_driver_events(old, new) || new == Phase::Idle
}

/// Applies phase transitions and their state effects
pub struct LifecycleManager;

impl LifecycleManager {
    /// Advance the lifecycle for a session-scoped update
    ///
    /// `old` is the session before the update; `next` already has the
    /// update's reported fields applied.
    pub fn advance(
        old: &Session,
        next: &mut Snapshot,
        fields: &[Field],
        config: &EngineConfig,
    ) -> Vec<LifecycleChange> {
        let mut changes = Vec::new();

        if let Some(to) = next.session.segment {
            if old.segment != Some(to) {
                if let Some(from) = old.segment {
                    Self::close_segment(next, from, config);
                    Self::reset_segment_bests(next);
                }
                log::info!("Session {}: segment {:?} -> {}", next.session.id, old.segment, to);
                changes.push(LifecycleChange::SegmentChanged { from: old.segment, to });
            }
        }

        let mut phase = old.phase;
        for field in fields {
            let signal = match field {
                Field::Status(status) => LifecycleSignal::Status(*status),
                Field::TrackStatus(flag) => LifecycleSignal::Track(*flag),
                _ => continue,
            };
            let Some((to, change)) = phase.on_signal(signal) else {
                continue;
            };

            log::info!("Session {}: {:?} -> {:?}", next.session.id, phase, to);
            match change {
                LifecycleChange::Started => Self::reset_all_bests(next),
                LifecycleChange::Finished => {
                    if let Some(segment) = next.session.segment {
                        Self::close_segment(next, segment, config);
                    }
                }
                _ => {}
            }
            phase = to;
            changes.push(change);
        }
        next.session.phase = phase;

        if fields.contains(&Field::BestTimesReset) {
            log::info!("Session {}: best times reset by upstream", next.session.id);
            Self::reset_segment_bests(next);
            changes.push(LifecycleChange::BestTimesReset);
        }

        changes
    }

    /// Mark drivers classified beyond the segment's cutoff as eliminated
    ///
    /// Returns the number of newly eliminated drivers. Drivers already
    /// eliminated are left alone, so closing a segment twice is harmless.
    pub fn close_segment(snapshot: &mut Snapshot, segment: u8, config: &EngineConfig) -> usize {
        let Some(session_type) = snapshot.session.session_type else {
            return 0;
        };
        let Some(advancing) = config.advancing_after(session_type, segment) else {
            return 0;
        };

        let mut eliminated = 0;
        for driver in snapshot.drivers.values_mut() {
            if !driver.eliminated && driver.position.is_some_and(|p| p > advancing) {
                driver.eliminated = true;
                eliminated += 1;
            }
        }

        if eliminated > 0 {
            log::info!(
                "Session {}: segment {} closed, {} driver(s) eliminated",
                snapshot.session.id,
                segment,
                eliminated
            );
        }
        eliminated
    }

    /// Clear the all-time best and every segment personal best
    fn reset_segment_bests(snapshot: &mut Snapshot) {
        snapshot.session.best = None;
        for driver in snapshot.drivers.values_mut() {
            driver.reset_segment_best();
        }
    }

    /// Clear the all-time best and every personal best
    fn reset_all_bests(snapshot: &mut Snapshot) {
        snapshot.session.best = None;
        for driver in snapshot.drivers.values_mut() {
            driver.reset_bests();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DriverState;
    use crate::types::{LapTime, SessionType};

    fn qualifying(positions: &[(&str, u32)]) -> Snapshot {
        let mut snapshot = Snapshot::new("q");
        snapshot.session.session_type = Some(SessionType::Qualifying);
        snapshot.session.phase = Phase::Active;
        snapshot.session.segment = Some(1);
        for (id, pos) in positions {
            let mut driver = DriverState::new(*id);
            driver.position = Some(*pos);
            driver.offer_lap(LapTime::from_millis(80_000 + pos * 100));
            snapshot.drivers.insert(id.to_string(), driver);
        }
        snapshot
    }

    #[test]
    fn test_phase_transitions() {
        use LifecycleSignal::{Status, Track};

        let (phase, _) = Phase::Idle.on_signal(Status(SessionStatus::Started)).unwrap();
        assert_eq!(phase, Phase::Active);
        let (phase, _) = phase.on_signal(Track(FlagStatus::Red)).unwrap();
        assert_eq!(phase, Phase::Suspended);
        assert!(phase.on_signal(Track(FlagStatus::Red)).is_none());
        let (phase, change) = phase.on_signal(Status(SessionStatus::Started)).unwrap();
        assert_eq!((phase, change), (Phase::Active, LifecycleChange::Resumed));
        let (phase, _) = phase.on_signal(Status(SessionStatus::Finalised)).unwrap();
        assert_eq!(phase, Phase::Finished);
        assert!(phase.on_signal(Track(FlagStatus::Green)).is_none());
        let (phase, _) = phase.on_signal(Status(SessionStatus::Inactive)).unwrap();
        assert_eq!(phase, Phase::Idle);
    }

    #[test]
    fn test_emission_policy() {
        assert!(emits_driver_events(Phase::Idle, Phase::Active));
        assert!(emits_driver_events(Phase::Active, Phase::Finished));
        assert!(!emits_driver_events(Phase::Finished, Phase::Finished));
        assert!(!emits_driver_events(Phase::Idle, Phase::Idle));
        assert!(emits_race_control(Phase::Idle, Phase::Idle));
        assert!(!emits_race_control(Phase::Finished, Phase::Finished));
    }

    #[test]
    fn test_segment_change_closes_and_resets() {
        let positions: Vec<(String, u32)> = (1..=20).map(|p| (p.to_string(), p)).collect();
        let borrowed: Vec<(&str, u32)> = positions.iter().map(|(id, p)| (id.as_str(), *p)).collect();
        let old = qualifying(&borrowed);
        let mut next = old.clone();
        next.session.segment = Some(2);

        let changes = LifecycleManager::advance(
            &old.session,
            &mut next,
            &[Field::Segment(2)],
            &EngineConfig::default(),
        );

        assert_eq!(changes, vec![LifecycleChange::SegmentChanged { from: Some(1), to: 2 }]);
        let eliminated: Vec<&str> = next
            .drivers
            .values()
            .filter(|d| d.eliminated)
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(eliminated.len(), 5);
        assert!(eliminated.contains(&"16") && eliminated.contains(&"20"));
        assert!(next.drivers.values().all(|d| d.segment_best.is_none()));
        // Session-wide personal bests survive a segment change
        assert!(next.drivers.values().all(|d| d.best_lap.is_some()));
        assert!(next.session.best.is_none());
    }

    #[test]
    fn test_close_segment_is_idempotent() {
        let mut snapshot = qualifying(&[("1", 1), ("2", 16)]);
        let config = EngineConfig::default();
        assert_eq!(LifecycleManager::close_segment(&mut snapshot, 1, &config), 1);
        assert_eq!(LifecycleManager::close_segment(&mut snapshot, 1, &config), 0);
        // Q3 has no cutoff
        assert_eq!(LifecycleManager::close_segment(&mut snapshot, 3, &config), 0);
    }

    #[test]
    fn test_start_resets_all_bests() {
        let mut old = qualifying(&[("1", 1)]);
        old.session.phase = Phase::Idle;
        let mut next = old.clone();

        let changes = LifecycleManager::advance(
            &old.session,
            &mut next,
            &[Field::Status(SessionStatus::Started)],
            &EngineConfig::default(),
        );

        assert_eq!(changes, vec![LifecycleChange::Started]);
        assert_eq!(next.session.phase, Phase::Active);
        assert!(next.drivers["1"].best_lap.is_none());
        assert!(next.drivers["1"].segment_best.is_none());
    }
}
