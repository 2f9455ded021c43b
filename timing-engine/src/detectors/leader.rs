//! Race lead changes

use super::DetectorContext;
use crate::events::{DerivedEvent, EventDetail};
use crate::state::{DriverState, Snapshot};

/// The stable leader moved to a different driver
///
/// The store only moves the leader to an unambiguous, running P1, so this
/// detector just compares the two snapshots. A previous leader who has
/// retired in the meantime is not named.
pub fn detect(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    if !new
        .session
        .session_type
        .is_some_and(|kind| kind.is_race_format())
    {
        return;
    }
    let Some(leader) = &new.session.leader else {
        return;
    };
    if old.session.leader.as_ref() == Some(leader) {
        return;
    }

    let previous = old
        .session
        .leader
        .clone()
        .filter(|id| new.driver(id).is_some_and(DriverState::is_running));
    out.push(ctx.event(EventDetail::LeaderChange {
        previous,
        leader: leader.clone(),
    }));
}
