//! Field update normalizer
//!
//! Turns raw feed records (a scope, a replace/merge kind and a loose map of
//! field names to JSON values) into typed [`NormalizedUpdate`]s. Field names
//! are resolved against a closed set of [`FieldKind`]s; anything outside that
//! set, or a value that cannot be interpreted, is dropped rather than treated
//! as an error so the engine keeps working when the feed schema grows.

use crate::state::{CompletedLap, RaceControlMessage};
use crate::types::{
    Compound, EngineError, FlagStatus, Gap, LapTime, PitStatus, Result, SessionStatus,
    SessionType, Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a record is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Session-wide fields (status, track status, race control, ...)
    Session,
    /// Fields of one driver, identified by racing number
    Driver(String),
}

/// How the payload combines with existing state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// Fields missing from the payload are reset to their defaults
    FullReplace,
    /// Only the named fields change
    #[default]
    IncrementalMerge,
}

/// A decoded record as delivered by the feed connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUpdate {
    /// Session key the record belongs to
    pub session: String,
    pub scope: Scope,
    #[serde(default)]
    pub kind: UpdateKind,
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Part of the retained state replayed on (re)connect
    #[serde(default)]
    pub snapshot: bool,
    /// Upstream timestamp of the record, if known
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl RawUpdate {
    pub fn new(session: impl Into<String>, scope: Scope, kind: UpdateKind, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            session: session.into(),
            scope,
            kind,
            fields,
            snapshot: false,
            timestamp: None,
        }
    }

    /// Incremental update of session-wide fields
    pub fn session_delta(session: impl Into<String>, fields: Value) -> Self {
        Self::new(session, Scope::Session, UpdateKind::IncrementalMerge, fields)
    }

    /// Incremental update of one driver's fields
    pub fn driver_delta(session: impl Into<String>, driver: impl Into<String>, fields: Value) -> Self {
        Self::new(session, Scope::Driver(driver.into()), UpdateKind::IncrementalMerge, fields)
    }

    /// Builder method: turn the record into a full replace
    pub fn full_replace(mut self) -> Self {
        self.kind = UpdateKind::FullReplace;
        self
    }

    /// Builder method: mark the record as retained snapshot state
    pub fn as_snapshot(mut self) -> Self {
        self.snapshot = true;
        self
    }

    /// Builder method: attach the upstream timestamp
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Parse a record from one line of JSON
    pub fn from_json(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Scope a known field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    Session,
    Driver,
}

/// Closed set of field names the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    SessionType,
    Status,
    TrackStatus,
    Part,
    Circuit,
    StartTime,
    EndTime,
    RaceControlMessages,
    BestTimesReset,
    Position,
    NumberOfLaps,
    LastLapTime,
    BestLapTime,
    CurrentLapTime,
    GapToLeader,
    IntervalToPositionAhead,
    Compound,
    TyreAge,
    Stint,
    PitStatus,
    PitStopTime,
    PitLaneTime,
    Retired,
    KnockedOut,
    /// Anything else; ignored
    Unknown,
}

impl FieldKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Type" | "SessionType" => FieldKind::SessionType,
            "Status" | "SessionStatus" => FieldKind::Status,
            "TrackStatus" => FieldKind::TrackStatus,
            "Part" => FieldKind::Part,
            "Circuit" => FieldKind::Circuit,
            "StartTime" | "StartDate" => FieldKind::StartTime,
            "EndTime" | "EndDate" => FieldKind::EndTime,
            "RaceControlMessages" => FieldKind::RaceControlMessages,
            "BestTimesReset" => FieldKind::BestTimesReset,
            "Position" => FieldKind::Position,
            "NumberOfLaps" => FieldKind::NumberOfLaps,
            "LastLapTime" => FieldKind::LastLapTime,
            "BestLapTime" => FieldKind::BestLapTime,
            "CurrentLapTime" => FieldKind::CurrentLapTime,
            "GapToLeader" => FieldKind::GapToLeader,
            "IntervalToPositionAhead" => FieldKind::IntervalToPositionAhead,
            "Compound" => FieldKind::Compound,
            "TyreAge" | "TotalLaps" => FieldKind::TyreAge,
            "Stint" => FieldKind::Stint,
            "PitStatus" => FieldKind::PitStatus,
            "PitStopTime" => FieldKind::PitStopTime,
            "PitLaneTime" | "Duration" => FieldKind::PitLaneTime,
            "Retired" => FieldKind::Retired,
            "KnockedOut" => FieldKind::KnockedOut,
            _ => FieldKind::Unknown,
        }
    }

    /// Scope the field is valid in (`None` for unknown fields)
    pub fn scope(&self) -> Option<FieldScope> {
        match self {
            FieldKind::SessionType
            | FieldKind::Status
            | FieldKind::TrackStatus
            | FieldKind::Part
            | FieldKind::Circuit
            | FieldKind::StartTime
            | FieldKind::EndTime
            | FieldKind::RaceControlMessages
            | FieldKind::BestTimesReset => Some(FieldScope::Session),
            FieldKind::Unknown => None,
            _ => Some(FieldScope::Driver),
        }
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    SessionType(SessionType),
    Status(SessionStatus),
    TrackStatus(FlagStatus),
    Segment(u8),
    Circuit(String),
    StartTime(Timestamp),
    EndTime(Timestamp),
    RaceControlMessages(Vec<RaceControlMessage>),
    /// Messages without an identifier, numbered after the ones already logged
    RaceControlAppend(Vec<RaceControlMessage>),
    BestTimesReset,
    Position(u32),
    NumberOfLaps(u32),
    LastLapTime(CompletedLap),
    /// Deletion flag for the lap already on record
    LapDeleted(bool),
    BestLapTime(LapTime),
    CurrentLapTime(LapTime),
    GapToLeader(Gap),
    IntervalToAhead(Gap),
    Compound(Compound),
    TyreAge(u32),
    Stint(u32),
    PitStatus(PitStatus),
    /// Stationary time in seconds; `None` when the feed has no usable number
    PitStopTime(Option<f64>),
    /// Pit-lane transit in seconds; `None` when the feed has no usable number
    PitLaneTime(Option<f64>),
    Retired(bool),
    KnockedOut(bool),
}

/// A record after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUpdate {
    pub session: String,
    pub scope: Scope,
    pub kind: UpdateKind,
    pub fields: Vec<Field>,
    pub snapshot: bool,
    pub timestamp: Option<Timestamp>,
    /// Number of fields that were unknown or uninterpretable
    pub dropped: usize,
}

impl NormalizedUpdate {
    /// Driver the update targets, if any
    pub fn driver_id(&self) -> Option<&str> {
        match &self.scope {
            Scope::Driver(id) => Some(id.as_str()),
            Scope::Session => None,
        }
    }
}

/// Normalize a raw record
///
/// Fails only when the record itself is structurally unusable (no session key,
/// or a driver scope without an identifier). Unknown fields and bad values are
/// dropped and counted.
pub fn normalize(raw: RawUpdate) -> Result<NormalizedUpdate> {
    if raw.session.trim().is_empty() {
        return Err(EngineError::InvalidRecord("missing session key".to_string()));
    }

    let wanted = match &raw.scope {
        Scope::Session => FieldScope::Session,
        Scope::Driver(id) if id.trim().is_empty() => return Err(EngineError::MissingDriverId),
        Scope::Driver(_) => FieldScope::Driver,
    };

    let mut fields = Vec::with_capacity(raw.fields.len());
    let mut dropped = 0;
    // Arrays in a delta extend the log; in a full list they are the log
    let appending = raw.kind == UpdateKind::IncrementalMerge && !raw.snapshot;

    for (name, value) in &raw.fields {
        let kind = FieldKind::from_name(name);
        if kind.scope() != Some(wanted) {
            log::trace!("Ignoring field '{}' in {:?} record", name, raw.scope);
            dropped += 1;
            continue;
        }

        if kind == FieldKind::RaceControlMessages {
            fields.extend(parse_race_control(value, appending));
            continue;
        }

        match parse_field(kind, value) {
            Some(field) => fields.push(field),
            None => {
                log::trace!("Dropping uninterpretable value for '{}': {}", name, value);
                dropped += 1;
            }
        }
    }

    Ok(NormalizedUpdate {
        session: raw.session,
        scope: raw.scope,
        kind: raw.kind,
        fields,
        snapshot: raw.snapshot,
        timestamp: raw.timestamp,
        dropped,
    })
}

fn parse_field(kind: FieldKind, value: &Value) -> Option<Field> {
    match kind {
        FieldKind::SessionType => parse_str(value).map(Field::SessionType),
        FieldKind::Status => parse_str(value).map(Field::Status),
        FieldKind::TrackStatus => parse_str(value).map(Field::TrackStatus),
        FieldKind::Part => as_u32(value)
            .and_then(|p| u8::try_from(p).ok())
            .filter(|p| *p > 0)
            .map(Field::Segment),
        FieldKind::Circuit => as_str(value)
            .filter(|s| !s.is_empty())
            .map(|s| Field::Circuit(s.to_string())),
        FieldKind::StartTime => parse_str(value).map(Field::StartTime),
        FieldKind::EndTime => parse_str(value).map(Field::EndTime),
        FieldKind::RaceControlMessages => None,
        FieldKind::BestTimesReset => as_bool(value).filter(|b| *b).map(|_| Field::BestTimesReset),
        FieldKind::Position => as_u32(value).filter(|p| *p > 0).map(Field::Position),
        FieldKind::NumberOfLaps => as_u32(value).map(Field::NumberOfLaps),
        FieldKind::LastLapTime => parse_completed_lap(value)
            .map(Field::LastLapTime)
            .or_else(|| lap_deleted_flag(value).map(Field::LapDeleted)),
        FieldKind::BestLapTime => parse_lap_time(unwrap_value(value)).map(Field::BestLapTime),
        FieldKind::CurrentLapTime => parse_lap_time(value).map(Field::CurrentLapTime),
        FieldKind::GapToLeader => parse_str(value).map(Field::GapToLeader),
        FieldKind::IntervalToPositionAhead => parse_str(unwrap_value(value)).map(Field::IntervalToAhead),
        FieldKind::Compound => parse_str(value).map(Field::Compound),
        FieldKind::TyreAge => as_u32(value).map(Field::TyreAge),
        FieldKind::Stint => as_u32(value).map(Field::Stint),
        FieldKind::PitStatus => parse_str(value).map(Field::PitStatus),
        FieldKind::PitStopTime => Some(Field::PitStopTime(as_secs(value))),
        FieldKind::PitLaneTime => Some(Field::PitLaneTime(as_secs(value))),
        FieldKind::Retired => as_bool(value).map(Field::Retired),
        FieldKind::KnockedOut => as_bool(value).map(Field::KnockedOut),
        FieldKind::Unknown => None,
    }
}

/// Timing values often arrive wrapped as `{"Value": ...}`
fn unwrap_value(value: &Value) -> &Value {
    value.get("Value").unwrap_or(value)
}

fn as_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim)
}

fn parse_str<T: std::str::FromStr>(value: &Value) -> Option<T> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Seconds from a number or a duration string; anything else is "unavailable"
fn as_secs(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        Value::String(s) => crate::types::parse_duration_secs(s),
        _ => None,
    }
}

fn parse_lap_time(value: &Value) -> Option<LapTime> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64().and_then(LapTime::from_secs_f64),
        _ => None,
    }
}

fn parse_completed_lap(value: &Value) -> Option<CompletedLap> {
    let time = parse_lap_time(unwrap_value(value))?;
    let deleted = lap_deleted_flag(value).unwrap_or(false);
    Some(CompletedLap { time, deleted })
}

/// `Deleted` / `Invalid` flags; `None` when the value carries neither
fn lap_deleted_flag(value: &Value) -> Option<bool> {
    ["Deleted", "Invalid"]
        .iter()
        .filter_map(|key| value.get(key))
        .filter_map(as_bool)
        .reduce(|a, b| a || b)
}

/// Messages arrive as an array, an index-keyed object, or wrapped in `Messages`
///
/// Keyed messages and messages with an `Id` keep their identifier. Array
/// entries without one are positions in a full list, or new messages when
/// `appending`.
fn parse_race_control(value: &Value, appending: bool) -> Vec<Field> {
    if let Some(inner) = value.get("Messages") {
        return parse_race_control(inner, appending);
    }

    let mut keyed = Vec::new();
    let mut appended = Vec::new();
    match value {
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                let Some(message) = parse_race_control_message(idx as u64, item) else {
                    continue;
                };
                if appending && message_id(item).is_none() {
                    appended.push(message);
                } else {
                    keyed.push(message);
                }
            }
        }
        Value::Object(map) => {
            keyed.extend(map.iter().filter_map(|(key, item)| {
                let idx = key.trim().parse().ok()?;
                parse_race_control_message(idx, item)
            }));
        }
        _ => {}
    }

    let mut fields = Vec::new();
    if !keyed.is_empty() {
        fields.push(Field::RaceControlMessages(keyed));
    }
    if !appended.is_empty() {
        fields.push(Field::RaceControlAppend(appended));
    }
    fields
}

fn message_id(value: &Value) -> Option<u64> {
    value
        .get("Id")
        .or_else(|| value.get("id"))
        .and_then(|v| v.as_u64())
}

fn parse_race_control_message(index: u64, value: &Value) -> Option<RaceControlMessage> {
    let text = value.get("Message").and_then(as_str)?.to_string();
    let id = message_id(value).unwrap_or(index);
    let opt_string = |key: &str| {
        value
            .get(key)
            .and_then(as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(RaceControlMessage {
        id,
        message: text,
        category: opt_string("Category"),
        flag: opt_string("Flag"),
        mode: opt_string("Mode"),
        status: opt_string("Status"),
        lap: value.get("Lap").and_then(as_u32),
        timestamp: value.get("Utc").and_then(parse_str),
    })
}
