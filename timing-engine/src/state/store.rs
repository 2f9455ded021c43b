//! Session state store
//!
//! `apply` is the only way state changes. Each call clones the current
//! snapshot, applies the update (and any lifecycle effects) to the clone, and
//! swaps the result in. The previous snapshot stays alive inside the returned
//! [`Transition`], so detectors always diff two complete, immutable states.

use super::{DriverState, Session, SessionBest};
use crate::config::EngineConfig;
use crate::lifecycle::{LifecycleChange, LifecycleManager};
use crate::normalizer::{Field, NormalizedUpdate, Scope, UpdateKind};
use crate::types::{PitStatus, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Complete state of the tracked session at one point in the stream
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub session: Session,
    /// Drivers by racing number
    pub drivers: BTreeMap<String, DriverState>,
}

impl Snapshot {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session: Session::new(session_id),
            drivers: BTreeMap::new(),
        }
    }

    pub fn driver(&self, id: &str) -> Option<&DriverState> {
        self.drivers.get(id)
    }

    /// Drivers ordered by classified position; unclassified drivers last
    pub fn classification(&self) -> Vec<&DriverState> {
        let mut order: Vec<&DriverState> = self.drivers.values().collect();
        order.sort_by_key(|d| (d.position.unwrap_or(u32::MAX), d.id.clone()));
        order
    }
}

/// The old/new snapshot pair produced by one `apply`
#[derive(Debug, Clone)]
pub struct Transition {
    pub old: Arc<Snapshot>,
    pub new: Arc<Snapshot>,
    /// Driver targeted by the update, if it was driver-scoped
    pub driver: Option<String>,
    /// Lifecycle transitions applied as part of the update
    pub changes: Vec<LifecycleChange>,
    /// The update was retained snapshot state
    pub snapshot: bool,
    pub timestamp: Option<Timestamp>,
}

impl Transition {
    pub fn old_session(&self) -> &Session {
        &self.old.session
    }

    pub fn new_session(&self) -> &Session {
        &self.new.session
    }

    pub fn old_driver(&self) -> Option<&DriverState> {
        self.driver.as_deref().and_then(|id| self.old.driver(id))
    }

    pub fn new_driver(&self) -> Option<&DriverState> {
        self.driver.as_deref().and_then(|id| self.new.driver(id))
    }
}

/// Owner of the tracked session and all of its driver state
pub struct SessionStore {
    current: Arc<Snapshot>,
    config: EngineConfig,
}

impl SessionStore {
    /// Create an empty store; the first update names the session
    pub fn new(config: EngineConfig) -> Self {
        Self {
            current: Arc::new(Snapshot::default()),
            config,
        }
    }

    /// Current snapshot (cheap shared handle)
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Discard all session state
    pub fn reset(&mut self) {
        if !self.current.session.id.is_empty() {
            log::info!("Discarding state of session {}", self.current.session.id);
        }
        self.current = Arc::new(Snapshot::default());
    }

    /// Apply one normalized update and return the old/new snapshot pair
    pub fn apply(&mut self, update: &NormalizedUpdate) -> Transition {
        let mut changes = Vec::new();
        let mut old = Arc::clone(&self.current);

        if old.session.id != update.session {
            if old.session.id.is_empty() {
                log::info!("Tracking session {}", update.session);
            } else {
                log::info!(
                    "Record for session {} while tracking {}: resetting session state",
                    update.session,
                    old.session.id
                );
                changes.push(LifecycleChange::NewSession {
                    previous: old.session.id.clone(),
                });
            }
            old = Arc::new(Snapshot::new(update.session.clone()));
        }

        let mut next = (*old).clone();
        let driver = match &update.scope {
            Scope::Session => {
                if update.kind == UpdateKind::FullReplace {
                    next.session.reset_reported();
                }
                for field in &update.fields {
                    next.session.apply_field(field);
                }
                changes.extend(LifecycleManager::advance(
                    &old.session,
                    &mut next,
                    &update.fields,
                    &self.config,
                ));
                None
            }
            Scope::Driver(id) => {
                Self::apply_driver(&mut next, id, update);
                Some(id.clone())
            }
        };

        next.session.leader = resolve_leader(&next);

        let new = Arc::new(next);
        self.current = Arc::clone(&new);

        Transition {
            old,
            new,
            driver,
            changes,
            snapshot: update.snapshot,
            timestamp: update.timestamp,
        }
    }

    fn apply_driver(next: &mut Snapshot, id: &str, update: &NormalizedUpdate) {
        let prev = next
            .drivers
            .get(id)
            .cloned()
            .unwrap_or_else(|| DriverState::new(id));
        let mut driver = prev.clone();

        if update.kind == UpdateKind::FullReplace {
            driver.reset_reported();
        }
        for field in &update.fields {
            driver.apply_field(field);
        }

        // Leaving the track starts a new stop
        if prev.pit_status == PitStatus::OnTrack && driver.pit_status != PitStatus::OnTrack {
            driver.pit_entry_compound = prev.compound.clone();
            if !update.fields.iter().any(|f| matches!(f, Field::PitStopTime(_))) {
                driver.pit_stop_time = None;
            }
            if !update.fields.iter().any(|f| matches!(f, Field::PitLaneTime(_))) {
                driver.pit_lane_time = None;
            }
        }

        // Only a newly reported lap counts toward the bests
        let mut withdrawn = None;
        if driver.last_lap != prev.last_lap {
            match (prev.last_lap, driver.last_lap) {
                (Some(before), Some(after))
                    if before.time == after.time && !before.deleted && after.deleted =>
                {
                    driver.withdraw_lap(after.time);
                    withdrawn = Some(after.time);
                }
                (_, Some(after)) => {
                    if let Some(time) = after.valid_time() {
                        driver.offer_lap(time);
                        next.session.offer_lap(id, time);
                    }
                }
                _ => {}
            }
        }
        for field in &update.fields {
            if let Field::BestLapTime(time) = field {
                next.session.offer_lap(id, *time);
            }
        }

        next.drivers.insert(id.to_string(), driver);

        if let Some(time) = withdrawn {
            let held = next
                .session
                .best
                .as_ref()
                .is_some_and(|best| best.driver == id && best.time == time);
            if held {
                log::debug!("Lap {} by {} deleted, recomputing session best", time, id);
                next.session.best = fastest_segment_best(next);
            }
        }
    }
}

/// The session best is the fastest personal best of the active segment
fn fastest_segment_best(snapshot: &Snapshot) -> Option<SessionBest> {
    snapshot
        .drivers
        .values()
        .filter_map(|d| d.segment_best.map(|time| (time, &d.id)))
        .min()
        .map(|(time, driver)| SessionBest {
            driver: driver.clone(),
            time,
        })
}

/// The stable leader: the only running driver at P1, else the previous
/// leader while still running
fn resolve_leader(snapshot: &Snapshot) -> Option<String> {
    let mut at_front = snapshot
        .drivers
        .values()
        .filter(|d| d.position == Some(1) && d.is_running());

    match (at_front.next(), at_front.next()) {
        (Some(leader), None) => Some(leader.id.clone()),
        _ => snapshot
            .session
            .leader
            .clone()
            .filter(|id| snapshot.driver(id).is_some_and(DriverState::is_running)),
    }
}
