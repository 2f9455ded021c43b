//! Purple laps and personal bests
//!
//! Compares every newly completed valid lap against the bests as they stood
//! *before* the update. The store has already folded the lap into the new
//! snapshot's bests, so the old snapshot is the only place the previous
//! values live.

use super::{changed_drivers, DetectorContext};
use crate::events::{DerivedEvent, EventDetail};
use crate::state::Snapshot;

pub fn detect(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    let qualifying = new
        .session
        .session_type
        .is_some_and(|kind| kind.is_qualifying_format());
    let session_best = old.session.best.as_ref().map(|best| best.time);

    for (prev, driver) in changed_drivers(old, new) {
        let previous_lap = prev.and_then(|p| p.last_lap);
        if driver.last_lap == previous_lap {
            continue;
        }
        let Some(time) = driver.last_lap.and_then(|lap| lap.valid_time()) else {
            continue;
        };

        let purple = session_best.map_or(true, |best| time < best);
        if purple {
            out.push(ctx.event(EventDetail::QuickestOverallLap {
                driver: driver.id.clone(),
                lap_time: time,
                previous_best: session_best,
                lap: driver.laps,
                compound: driver.compound.clone(),
                tyre_age: driver.tyre_age,
            }));
        }

        if !qualifying || (purple && ctx.config.suppress_implied_personal_best) {
            continue;
        }
        let personal = prev.and_then(|p| p.segment_best);
        if personal.map_or(true, |best| time < best) {
            out.push(ctx.event(EventDetail::PersonalBest {
                driver: driver.id.clone(),
                lap_time: time,
                previous_best: personal,
            }));
        }
    }
}
