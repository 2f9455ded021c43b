//! Qualifying knock-outs

use super::{changed_drivers, DetectorContext};
use crate::events::{DerivedEvent, EventDetail};
use crate::state::Snapshot;

/// Rising edge of the eliminated flag
///
/// The flag is raised by the lifecycle manager when a segment closes, or by
/// upstream directly. The segment reported is the one that was running
/// before the update.
pub fn detect(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    if !new
        .session
        .session_type
        .is_some_and(|kind| kind.is_qualifying_format())
    {
        return;
    }
    let segment = old.session.segment.or(new.session.segment);

    let mut knocked_out: Vec<_> = changed_drivers(old, new)
        .filter(|(prev, driver)| driver.eliminated && !prev.is_some_and(|p| p.eliminated))
        .map(|(_, driver)| driver)
        .collect();
    knocked_out.sort_by_key(|d| d.position.unwrap_or(u32::MAX));

    for driver in knocked_out {
        out.push(ctx.event(EventDetail::KnockedOut {
            driver: driver.id.clone(),
            position: driver.position,
            segment,
        }));
    }
}
