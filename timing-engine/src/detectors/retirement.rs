//! Retirements

use super::{changed_drivers, DetectorContext};
use crate::events::{DerivedEvent, EventDetail};
use crate::state::Snapshot;

pub fn detect(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    if !new
        .session
        .session_type
        .is_some_and(|kind| kind.is_race_format())
    {
        return;
    }

    for (prev, driver) in changed_drivers(old, new) {
        if driver.retired && !prev.is_some_and(|p| p.retired) {
            out.push(ctx.event(EventDetail::Retirement {
                driver: driver.id.clone(),
                lap: driver.laps,
            }));
        }
    }
}
