//! Tyre changes at pit exit

use super::{changed_drivers, DetectorContext};
use crate::events::{DerivedEvent, EventDetail};
use crate::state::Snapshot;
use crate::types::PitStatus;

/// Compound fitted at pit exit differs from the one the car came in on
///
/// Checked on the transition into `PitExit` and again whenever the compound
/// is (re)reported while the car is still in `PitExit`, since the feed often
/// sends the new compound a moment after the pit status. Without a known
/// pit-entry compound there is nothing to compare against.
pub fn detect(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    for (prev, driver) in changed_drivers(old, new) {
        if driver.pit_status != PitStatus::PitExit {
            continue;
        }
        let Some(prev) = prev else { continue };
        let entered = prev.pit_status != PitStatus::PitExit;
        if !entered && prev.compound == driver.compound {
            continue;
        }

        let (Some(compound), Some(entry)) = (&driver.compound, &driver.pit_entry_compound) else {
            continue;
        };
        if compound == entry {
            continue;
        }

        out.push(ctx.event(EventDetail::TyreChange {
            driver: driver.id.clone(),
            previous: Some(entry.clone()),
            compound: compound.clone(),
            stint: driver.stint,
            tyre_age: driver.tyre_age,
        }));
    }
}
