//! Pit-stop times and slow pit-lane transits
//!
//! Both values belong to the latest stop; the store clears them when a car
//! leaves the track, so a value that appears after that describes a new stop.

use super::{changed_drivers, DetectorContext};
use crate::events::{DerivedEvent, EventDetail};
use crate::state::Snapshot;
use crate::types::PitStatus;

fn race_format(snapshot: &Snapshot) -> bool {
    snapshot
        .session
        .session_type
        .is_some_and(|kind| kind.is_race_format())
}

/// Stationary time of a completed stop
///
/// Reported when the car reaches pit exit with a time already known, or
/// when the first time arrives while the car is still at pit exit. Later
/// revisions of the same stop's time are not reported again.
pub fn detect_stop_time(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    if !race_format(new) {
        return;
    }

    for (prev, driver) in changed_drivers(old, new) {
        if driver.pit_status != PitStatus::PitExit {
            continue;
        }
        let Some(stationary) = driver.pit_stop_time else {
            continue;
        };
        let entered = prev.map_or(true, |p| p.pit_status != PitStatus::PitExit);
        let arrived = prev.map_or(true, |p| p.pit_stop_time.is_none());
        if entered || arrived {
            out.push(ctx.event(EventDetail::PitStopTime {
                driver: driver.id.clone(),
                stationary_secs: stationary,
            }));
        }
    }
}

/// Pit-lane transit at or above the circuit's slow threshold
///
/// Transits beyond the configured upper bound are cars parked in the pit
/// lane (red flag), not slow stops.
pub fn detect_slow_pit_lane(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    if !race_format(new) {
        return;
    }
    let threshold = ctx
        .config
        .pit_lane_for(new.session.circuit.as_deref())
        .slow_threshold();

    for (prev, driver) in changed_drivers(old, new) {
        let Some(transit) = driver.pit_lane_time else {
            continue;
        };
        if prev.is_some_and(|p| p.pit_lane_time == driver.pit_lane_time) {
            continue;
        }
        if transit < threshold || transit > ctx.config.max_pit_lane_secs {
            log::trace!("Driver {} pit lane {:.1}s not slow", driver.id, transit);
            continue;
        }
        out.push(ctx.event(EventDetail::SlowPitLane {
            driver: driver.id.clone(),
            pit_lane_secs: transit,
            threshold_secs: threshold,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{detect as run, running};
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::SessionType;

    fn race() -> Snapshot {
        let mut snapshot = running(SessionType::Race, &["55"]);
        snapshot.drivers.get_mut("55").unwrap().pit_status = PitStatus::InPit;
        snapshot
    }

    #[test]
    fn test_stop_time_on_pit_exit() {
        let old = race();
        let mut new = old.clone();
        let driver = new.drivers.get_mut("55").unwrap();
        driver.pit_status = PitStatus::PitExit;
        driver.pit_stop_time = Some(2.4);

        let events = run(detect_stop_time, &old, &new, &EngineConfig::default());
        assert_eq!(
            events[0].detail,
            EventDetail::PitStopTime {
                driver: "55".to_string(),
                stationary_secs: 2.4,
            }
        );
    }

    #[test]
    fn test_stop_time_missing_then_arriving() {
        let old = race();
        let mut exited = old.clone();
        exited.drivers.get_mut("55").unwrap().pit_status = PitStatus::PitExit;
        assert!(run(detect_stop_time, &old, &exited, &EngineConfig::default()).is_empty());

        let mut timed = exited.clone();
        timed.drivers.get_mut("55").unwrap().pit_stop_time = Some(3.1);
        assert_eq!(run(detect_stop_time, &exited, &timed, &EngineConfig::default()).len(), 1);

        let mut later = timed.clone();
        later.drivers.get_mut("55").unwrap().position = Some(9);
        assert!(run(detect_stop_time, &timed, &later, &EngineConfig::default()).is_empty());
    }

    #[test]
    fn test_corrected_stop_time_is_not_repeated() {
        let old = race();
        let mut exited = old.clone();
        let driver = exited.drivers.get_mut("55").unwrap();
        driver.pit_status = PitStatus::PitExit;
        driver.pit_stop_time = Some(2.3);
        assert_eq!(run(detect_stop_time, &old, &exited, &EngineConfig::default()).len(), 1);

        let mut corrected = exited.clone();
        corrected.drivers.get_mut("55").unwrap().pit_stop_time = Some(2.4);
        assert!(run(detect_stop_time, &exited, &corrected, &EngineConfig::default()).is_empty());
    }

    #[test]
    fn test_slow_pit_lane_bounds() {
        let config = EngineConfig::default().add_pit_lane_reference("Monza", 24.0, 1.0);
        let mut old = race();
        old.session.circuit = Some("Monza".to_string());

        let transit = |secs: f64| {
            let mut new = old.clone();
            new.drivers.get_mut("55").unwrap().pit_lane_time = Some(secs);
            run(detect_slow_pit_lane, &old, &new, &config)
        };

        assert!(transit(24.9).is_empty());
        assert_eq!(
            transit(25.0)[0].detail,
            EventDetail::SlowPitLane {
                driver: "55".to_string(),
                pit_lane_secs: 25.0,
                threshold_secs: 25.0,
            }
        );
        assert_eq!(transit(600.0).len(), 1);
        assert!(transit(1200.0).is_empty());
    }

    #[test]
    fn test_unchanged_transit_is_silent() {
        let mut old = race();
        old.drivers.get_mut("55").unwrap().pit_lane_time = Some(40.0);
        let mut new = old.clone();
        new.drivers.get_mut("55").unwrap().position = Some(4);

        assert!(run(detect_slow_pit_lane, &old, &new, &EngineConfig::default()).is_empty());
    }
}
