//! Engine configuration types
//!
//! This module defines the rules the engine needs that are not carried by the
//! feed itself: qualifying cutoffs, notification policies and the pit-lane
//! reference statistics used to flag slow stops.

use crate::types::SessionType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the session engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of drivers advancing out of each qualifying segment (Q1, Q2)
    #[serde(default = "default_advancing")]
    pub qualifying_advancing: Vec<u32>,

    /// Number of drivers advancing out of each sprint shootout segment
    #[serde(default = "default_advancing")]
    pub sprint_shootout_advancing: Vec<u32>,

    /// Drop race-control messages carrying a blue flag
    #[serde(default = "default_true")]
    pub suppress_blue_flags: bool,

    /// Emit only the purple-lap event for a lap that is also a personal best
    #[serde(default = "default_true")]
    pub suppress_implied_personal_best: bool,

    /// Pit-lane statistics used when a circuit has no entry of its own
    #[serde(default)]
    pub default_pit_lane: PitLaneReference,

    /// Pit-lane statistics by circuit short name
    #[serde(default)]
    pub pit_lane_reference: HashMap<String, PitLaneReference>,

    /// Pit-lane transits longer than this are stoppages, not slow stops
    #[serde(default = "default_max_pit_lane_secs")]
    pub max_pit_lane_secs: f64,
}

fn default_advancing() -> Vec<u32> {
    vec![15, 10]
}

fn default_true() -> bool {
    true
}

fn default_max_pit_lane_secs() -> f64 {
    600.0
}

/// Mean and standard deviation of the pit-lane transit time at a circuit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitLaneReference {
    pub mean: f64,
    pub std: f64,
}

impl PitLaneReference {
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    /// Transit time from which a stop counts as slow (one sigma above mean)
    pub fn slow_threshold(&self) -> f64 {
        self.mean + self.std
    }
}

impl Default for PitLaneReference {
    fn default() -> Self {
        Self::new(25.0, 5.0)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            qualifying_advancing: default_advancing(),
            sprint_shootout_advancing: default_advancing(),
            suppress_blue_flags: true,
            suppress_implied_personal_best: true,
            default_pit_lane: PitLaneReference::default(),
            pit_lane_reference: HashMap::new(),
            max_pit_lane_secs: default_max_pit_lane_secs(),
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the advancing counts for qualifying segments
    pub fn with_qualifying_advancing(mut self, advancing: Vec<u32>) -> Self {
        self.qualifying_advancing = advancing;
        self
    }

    /// Builder method: set the advancing counts for sprint shootout segments
    pub fn with_sprint_shootout_advancing(mut self, advancing: Vec<u32>) -> Self {
        self.sprint_shootout_advancing = advancing;
        self
    }

    /// Builder method: enable or disable blue-flag suppression
    pub fn with_blue_flag_suppression(mut self, enabled: bool) -> Self {
        self.suppress_blue_flags = enabled;
        self
    }

    /// Builder method: choose whether a purple lap also announces a personal best
    pub fn with_implied_personal_best_suppression(mut self, enabled: bool) -> Self {
        self.suppress_implied_personal_best = enabled;
        self
    }

    /// Builder method: add pit-lane statistics for a circuit
    pub fn add_pit_lane_reference(mut self, circuit: impl Into<String>, mean: f64, std: f64) -> Self {
        self.pit_lane_reference
            .insert(circuit.into(), PitLaneReference::new(mean, std));
        self
    }

    /// Pit-lane statistics for a circuit, falling back to the default
    pub fn pit_lane_for(&self, circuit: Option<&str>) -> PitLaneReference {
        circuit
            .and_then(|c| self.pit_lane_reference.get(c))
            .copied()
            .unwrap_or(self.default_pit_lane)
    }

    /// Number of drivers advancing out of a segment (1-based), if it is a knock-out segment
    pub fn advancing_after(&self, session_type: SessionType, segment: u8) -> Option<u32> {
        let cutoffs = match session_type {
            SessionType::Qualifying => &self.qualifying_advancing,
            SessionType::SprintShootout => &self.sprint_shootout_advancing,
            _ => return None,
        };
        let index = usize::from(segment).checked_sub(1)?;
        cutoffs.get(index).copied()
    }
}
