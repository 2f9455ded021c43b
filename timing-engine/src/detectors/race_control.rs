//! Race-control messages

use super::DetectorContext;
use crate::events::{DerivedEvent, EventDetail};
use crate::state::Snapshot;

/// Every message id not present before the update, in id order
pub fn detect(old: &Snapshot, new: &Snapshot, ctx: &DetectorContext<'_>, out: &mut Vec<DerivedEvent>) {
    let seen = &old.session.race_control;
    for (id, message) in &new.session.race_control {
        if seen.contains_key(id) {
            continue;
        }
        if ctx.config.suppress_blue_flags && message.is_blue_flag() {
            log::trace!("Suppressed blue flag message {}", id);
            continue;
        }
        out.push(ctx.event(EventDetail::RaceControlMessage {
            message: message.clone(),
        }));
    }
}
