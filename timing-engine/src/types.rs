//! Core types for the timing engine
//!
//! Value types shared by the normalizer, the state store and the detectors.
//! All of them parse from the textual forms used by the live timing feed and
//! render back to the same forms.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Timestamp type used throughout the engine
pub type Timestamp = DateTime<Utc>;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while ingesting updates or publishing events
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid update record: {0}")]
    InvalidRecord(String),

    #[error("Driver-scoped update without a driver identifier")]
    MissingDriverId,

    #[error("Failed to publish event: {0}")]
    PublishFailed(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A lap or sector time with millisecond resolution
///
/// Parses `m:ss.mmm` and `ss.mmm` and renders back in the same style
/// (minutes are omitted below one minute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LapTime(u32);

impl LapTime {
    pub fn from_millis(millis: u32) -> Self {
        LapTime(millis)
    }

    /// Build from fractional seconds, rounded to the nearest millisecond
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        if !secs.is_finite() || secs <= 0.0 {
            return None;
        }
        Some(LapTime((secs * 1000.0).round() as u32))
    }

    pub fn as_millis(&self) -> u32 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl FromStr for LapTime {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let secs = parse_duration_secs(s)
            .ok_or_else(|| EngineError::InvalidRecord(format!("not a lap time: {:?}", s)))?;
        LapTime::from_secs_f64(secs)
            .ok_or_else(|| EngineError::InvalidRecord(format!("not a lap time: {:?}", s)))
    }
}

impl fmt::Display for LapTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.0 / 60_000;
        let seconds = (self.0 % 60_000) / 1000;
        let millis = self.0 % 1000;
        if minutes > 0 {
            write!(f, "{}:{:02}.{:03}", minutes, seconds, millis)
        } else {
            write!(f, "{}.{:03}", seconds, millis)
        }
    }
}

impl Serialize for LapTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a `[[h:]m:]s[.fff]` duration string into seconds
///
/// Used for lap times as well as pit-lane durations such as `"1:02.3"`.
pub fn parse_duration_secs(s: &str) -> Option<f64> {
    let s = s.trim().trim_end_matches('s');
    if s.is_empty() {
        return None;
    }

    let mut total = 0.0;
    for (part, scale) in s.rsplit(':').zip([1.0, 60.0, 3600.0]) {
        let value: f64 = part.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        total += value * scale;
    }

    // More than three components is not a duration
    if s.split(':').count() > 3 {
        return None;
    }
    Some(total)
}

/// Gap between two cars as reported by the timing feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gap {
    /// The car is the reference itself (feed reports `LAP n` for the leader)
    Leader,
    /// Time gap in milliseconds
    Time(u32),
    /// Whole laps down
    Laps(u32),
}

impl FromStr for Gap {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.starts_with("LAP ") {
            return Ok(Gap::Leader);
        }

        let body = upper.trim_start_matches('+').trim();
        if let Some(laps) = body
            .strip_suffix("LAPS")
            .or_else(|| body.strip_suffix("LAP"))
            .or_else(|| body.strip_suffix('L'))
        {
            return laps
                .trim()
                .parse()
                .map(Gap::Laps)
                .map_err(|_| EngineError::InvalidRecord(format!("not a gap: {:?}", s)));
        }

        body.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| Gap::Time((v * 1000.0).round() as u32))
            .ok_or_else(|| EngineError::InvalidRecord(format!("not a gap: {:?}", s)))
    }
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gap::Leader => write!(f, "LEADER"),
            Gap::Time(ms) => write!(f, "+{}.{:03}", ms / 1000, ms % 1000),
            Gap::Laps(n) => write!(f, "+{}L", n),
        }
    }
}

impl Serialize for Gap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Tyre compound
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    /// Any other label the feed uses (e.g. `UNKNOWN`, `TEST`)
    Other(String),
}

impl FromStr for Compound {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Ok(match upper.as_str() {
            "" => return Err(EngineError::InvalidRecord("empty compound".to_string())),
            "SOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" => Compound::Hard,
            "INTERMEDIATE" | "INTER" => Compound::Intermediate,
            "WET" => Compound::Wet,
            _ => Compound::Other(upper),
        })
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compound::Soft => write!(f, "SOFT"),
            Compound::Medium => write!(f, "MEDIUM"),
            Compound::Hard => write!(f, "HARD"),
            Compound::Intermediate => write!(f, "INTERMEDIATE"),
            Compound::Wet => write!(f, "WET"),
            Compound::Other(label) => write!(f, "{}", label),
        }
    }
}

impl Serialize for Compound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where a car is relative to the pit lane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PitStatus {
    #[default]
    OnTrack,
    InPit,
    PitExit,
}

impl FromStr for PitStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "ontrack" => Ok(PitStatus::OnTrack),
            "inpit" => Ok(PitStatus::InPit),
            "pitexit" | "pitout" => Ok(PitStatus::PitExit),
            _ => Err(EngineError::InvalidRecord(format!("not a pit status: {:?}", s))),
        }
    }
}

/// Session-wide track condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FlagStatus {
    #[default]
    Green,
    Yellow,
    Red,
    SafetyCar,
    VirtualSafetyCar,
}

impl FromStr for FlagStatus {
    type Err = EngineError;

    /// Accepts the numeric track status codes of the feed as well as names
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace(['_', ' '], "").as_str() {
            "1" | "ALLCLEAR" | "GREEN" | "CLEAR" => Ok(FlagStatus::Green),
            "2" | "YELLOW" => Ok(FlagStatus::Yellow),
            "4" | "SCDEPLOYED" | "SAFETYCAR" | "SC" => Ok(FlagStatus::SafetyCar),
            "5" | "RED" => Ok(FlagStatus::Red),
            "6" | "7" | "VSCDEPLOYED" | "VSCENDING" | "VIRTUALSAFETYCAR" | "VSC" => {
                Ok(FlagStatus::VirtualSafetyCar)
            }
            _ => Err(EngineError::InvalidRecord(format!("not a track status: {:?}", s))),
        }
    }
}

/// Kind of on-track session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionType {
    Practice,
    Qualifying,
    SprintShootout,
    Race,
    Sprint,
}

impl SessionType {
    /// Sessions split into knock-out segments with personal-best notifications
    pub fn is_qualifying_format(&self) -> bool {
        matches!(self, SessionType::Qualifying | SessionType::SprintShootout)
    }

    /// Sessions with a race leader, retirements and pit stops
    pub fn is_race_format(&self) -> bool {
        matches!(self, SessionType::Race | SessionType::Sprint)
    }
}

impl FromStr for SessionType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' ', '-'], "");
        match normalized.as_str() {
            "race" => Ok(SessionType::Race),
            "sprint" => Ok(SessionType::Sprint),
            "qualifying" => Ok(SessionType::Qualifying),
            "sprintshootout" | "sprintqualifying" => Ok(SessionType::SprintShootout),
            p if p.starts_with("practice") => Ok(SessionType::Practice),
            _ => Err(EngineError::InvalidRecord(format!("not a session type: {:?}", s))),
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Practice => write!(f, "Practice"),
            SessionType::Qualifying => write!(f, "Qualifying"),
            SessionType::SprintShootout => write!(f, "Sprint Shootout"),
            SessionType::Race => write!(f, "Race"),
            SessionType::Sprint => write!(f, "Sprint"),
        }
    }
}

/// Session status signal as sent by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Inactive,
    Started,
    Aborted,
    Finished,
    Finalised,
    Ends,
}

impl FromStr for SessionStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inactive" => Ok(SessionStatus::Inactive),
            "started" => Ok(SessionStatus::Started),
            "aborted" => Ok(SessionStatus::Aborted),
            "finished" => Ok(SessionStatus::Finished),
            "finalised" | "finalized" => Ok(SessionStatus::Finalised),
            "ends" => Ok(SessionStatus::Ends),
            _ => Err(EngineError::InvalidRecord(format!("not a session status: {:?}", s))),
        }
    }
}
