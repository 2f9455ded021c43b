//! Read-only queries over a snapshot
//!
//! Served from the live store for consumers that poll rather than subscribe
//! (tyre info, track status, gaps, classification).

use crate::lifecycle::Phase;
use crate::state::{SessionBest, Snapshot};
use crate::types::{Compound, FlagStatus, Gap};
use serde::Serialize;

/// Current tyre of one driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TyreInfo {
    pub compound: Option<Compound>,
    /// Laps on the current set
    pub age: Option<u32>,
    pub stint: Option<u32>,
}

/// Time gaps of one driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gaps {
    pub to_leader: Option<Gap>,
    pub to_ahead: Option<Gap>,
}

/// Flag and phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackStatus {
    pub flag: FlagStatus,
    pub phase: Phase,
}

/// One row of the running order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedDriver {
    pub position: Option<u32>,
    pub driver: String,
    pub retired: bool,
    pub eliminated: bool,
}

impl Snapshot {
    pub fn tyre(&self, driver: &str) -> Option<TyreInfo> {
        self.driver(driver).map(|d| TyreInfo {
            compound: d.compound.clone(),
            age: d.tyre_age,
            stint: d.stint,
        })
    }

    pub fn gaps(&self, driver: &str) -> Option<Gaps> {
        self.driver(driver).map(|d| Gaps {
            to_leader: d.gap_to_leader,
            to_ahead: d.interval_to_ahead,
        })
    }

    pub fn track_status(&self) -> TrackStatus {
        TrackStatus {
            flag: self.session.flag,
            phase: self.session.phase,
        }
    }

    /// Running order, unclassified drivers last
    pub fn running_order(&self) -> Vec<ClassifiedDriver> {
        self.classification()
            .into_iter()
            .map(|d| ClassifiedDriver {
                position: d.position,
                driver: d.id.clone(),
                retired: d.retired,
                eliminated: d.eliminated,
            })
            .collect()
    }

    pub fn session_best(&self) -> Option<&SessionBest> {
        self.session.best.as_ref()
    }
}
