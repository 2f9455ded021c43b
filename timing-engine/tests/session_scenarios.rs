// End-to-end session scenarios through the public Engine API
use serde_json::{json, Value};
use timing_engine::{
    Compound, DerivedEvent, Engine, EngineConfig, EventDetail, EventKind, LapTime, Phase, RawUpdate,
};

const SESSION: &str = "9472";

fn engine() -> Engine<Vec<DerivedEvent>> {
    let _ = env_logger::builder().is_test(true).try_init();
    Engine::new(EngineConfig::default(), Vec::new())
}

fn session(engine: &mut Engine<Vec<DerivedEvent>>, fields: Value) -> Vec<DerivedEvent> {
    engine
        .process(RawUpdate::session_delta(SESSION, fields))
        .expect("valid session record")
}

fn driver(engine: &mut Engine<Vec<DerivedEvent>>, id: &str, fields: Value) -> Vec<DerivedEvent> {
    engine
        .process(RawUpdate::driver_delta(SESSION, id, fields))
        .expect("valid driver record")
}

/// Retained state for a driver, applied without events
fn seed(engine: &mut Engine<Vec<DerivedEvent>>, id: &str, fields: Value) {
    let events = engine
        .process(RawUpdate::driver_delta(SESSION, id, fields).full_replace().as_snapshot())
        .expect("valid snapshot record");
    assert!(events.is_empty());
}

fn kinds(events: &[DerivedEvent]) -> Vec<EventKind> {
    events.iter().map(DerivedEvent::kind).collect()
}

#[test]
fn test_qualifying_lap_sequence() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Qualifying", "Status": "Started", "Part": 1}));

    let events = driver(&mut engine, "A", json!({"LastLapTime": "1:32.500"}));
    assert_eq!(kinds(&events), vec![EventKind::QuickestOverallLap]);
    assert_eq!(
        engine.session_best().map(|b| b.time),
        Some(LapTime::from_millis(92_500))
    );

    let events = driver(&mut engine, "B", json!({"LastLapTime": "1:31.000"}));
    assert_eq!(kinds(&events), vec![EventKind::QuickestOverallLap]);
    assert_eq!(events[0].driver(), Some("B"));

    let events = driver(&mut engine, "B", json!({"LastLapTime": "1:31.500"}));
    assert!(events.is_empty());

    let events = driver(&mut engine, "A", json!({"LastLapTime": "1:32.000"}));
    assert_eq!(kinds(&events), vec![EventKind::PersonalBest]);
    assert_eq!(
        events[0].detail,
        EventDetail::PersonalBest {
            driver: "A".to_string(),
            lap_time: LapTime::from_millis(92_000),
            previous_best: Some(LapTime::from_millis(92_500)),
        }
    );
}

#[test]
fn test_practice_has_no_personal_bests() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Practice 2", "Status": "Started"}));

    driver(&mut engine, "A", json!({"LastLapTime": "1:32.500"}));
    driver(&mut engine, "B", json!({"LastLapTime": "1:31.000"}));
    let events = driver(&mut engine, "A", json!({"LastLapTime": "1:32.000"}));
    assert!(events.is_empty());
}

#[test]
fn test_segment_change_knocks_out_and_resets_bests() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Qualifying", "Status": "Started", "Part": 1}));
    for position in 1..=20u32 {
        seed(&mut engine, &position.to_string(), json!({"Position": position}));
    }
    driver(&mut engine, "1", json!({"LastLapTime": "1:29.900"}));

    let events = session(&mut engine, json!({"Part": 2}));
    let knocked_out: Vec<&str> = events.iter().filter_map(DerivedEvent::driver).collect();
    assert_eq!(knocked_out, vec!["16", "17", "18", "19", "20"]);
    assert!(events
        .iter()
        .all(|e| matches!(e.detail, EventDetail::KnockedOut { segment: Some(1), .. })));
    assert!(engine.session_best().is_none());

    // The first lap of the new segment is purple again
    let events = driver(&mut engine, "3", json!({"LastLapTime": "1:30.400"}));
    assert_eq!(kinds(&events), vec![EventKind::QuickestOverallLap]);

    // Repeated segment marker and upstream flags do not re-fire
    assert!(session(&mut engine, json!({"Part": 2})).is_empty());
    assert!(driver(&mut engine, "17", json!({"KnockedOut": true})).is_empty());

    let events = session(&mut engine, json!({"Part": 3}));
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.kind() == EventKind::KnockedOut));

    // Q3 has no cutoff; finishing closes it without knock-outs
    let events = session(&mut engine, json!({"Status": "Finished"}));
    assert!(events.is_empty());
    assert_eq!(engine.track_status().phase, Phase::Finished);
}

#[test]
fn test_upstream_knock_out_fires_once() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Sprint Shootout", "Status": "Started", "Part": 1}));
    seed(&mut engine, "2", json!({"Position": 19}));

    let events = driver(&mut engine, "2", json!({"KnockedOut": true}));
    assert_eq!(kinds(&events), vec![EventKind::KnockedOut]);
    assert!(driver(&mut engine, "2", json!({"KnockedOut": true})).is_empty());
    assert!(session(&mut engine, json!({"Part": 2})).is_empty());
}

#[test]
fn test_leader_retires_while_p1() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race"}));
    seed(&mut engine, "1", json!({"Position": 1, "NumberOfLaps": 30}));
    seed(&mut engine, "11", json!({"Position": 2, "NumberOfLaps": 30}));
    seed(&mut engine, "16", json!({"Position": 3, "NumberOfLaps": 30}));
    session(&mut engine, json!({"Status": "Started"}));

    let events = driver(&mut engine, "1", json!({"Retired": true}));
    assert_eq!(
        events.iter().map(|e| &e.detail).collect::<Vec<_>>(),
        vec![&EventDetail::Retirement {
            driver: "1".to_string(),
            lap: Some(30),
        }]
    );

    // Still shown at P1 by upstream: no leader yet
    assert!(driver(&mut engine, "16", json!({"Position": 2})).is_empty());

    let events = driver(&mut engine, "11", json!({"Position": 1}));
    assert_eq!(
        events.iter().map(|e| &e.detail).collect::<Vec<_>>(),
        vec![&EventDetail::LeaderChange {
            previous: None,
            leader: "11".to_string(),
        }]
    );

    // Retirement never re-fires, even after a full replace drops the flag
    assert!(driver(&mut engine, "1", json!({"Retired": true})).is_empty());
    let events = engine
        .process(RawUpdate::driver_delta(SESSION, "1", json!({"Position": 20})).full_replace())
        .unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_lead_change_between_running_cars() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Sprint"}));
    seed(&mut engine, "4", json!({"Position": 1}));
    seed(&mut engine, "81", json!({"Position": 2}));
    session(&mut engine, json!({"Status": "Started"}));

    // Mid-reorder both cars briefly show P1
    assert!(driver(&mut engine, "81", json!({"Position": 1})).is_empty());
    let events = driver(&mut engine, "4", json!({"Position": 2}));
    assert_eq!(
        events[0].detail,
        EventDetail::LeaderChange {
            previous: Some("4".to_string()),
            leader: "81".to_string(),
        }
    );
}

#[test]
fn test_pit_stop_sequence() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race", "Circuit": "Silverstone"}));
    seed(&mut engine, "44", json!({"Compound": "MEDIUM", "Stint": 1, "TyreAge": 18}));
    session(&mut engine, json!({"Status": "Started"}));

    assert!(driver(&mut engine, "44", json!({"PitStatus": "InPit"})).is_empty());
    let events = driver(
        &mut engine,
        "44",
        json!({
            "PitStatus": "PitExit",
            "Compound": "HARD",
            "Stint": 2,
            "TyreAge": 0,
            "PitStopTime": 2.3,
            "PitLaneTime": "31.2"
        }),
    );
    assert_eq!(
        kinds(&events),
        vec![EventKind::TyreChange, EventKind::PitStopTime, EventKind::SlowPitLane]
    );
    assert_eq!(
        events[0].detail,
        EventDetail::TyreChange {
            driver: "44".to_string(),
            previous: Some(Compound::Medium),
            compound: Compound::Hard,
            stint: Some(2),
            tyre_age: Some(0),
        }
    );

    assert!(driver(&mut engine, "44", json!({"PitStatus": "OnTrack"})).is_empty());
    assert_eq!(engine.tyre("44").unwrap().compound, Some(Compound::Hard));

    // Next stop without timing data
    driver(&mut engine, "44", json!({"PitStatus": "InPit"}));
    let events = driver(&mut engine, "44", json!({"PitStatus": "PitExit", "PitStopTime": "-"}));
    assert!(events.is_empty());
}

#[test]
fn test_red_flag_suspends_and_resumes() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race", "Status": "Started"}));
    driver(&mut engine, "10", json!({"LastLapTime": "1:40.000"}));

    session(&mut engine, json!({"TrackStatus": "5"}));
    assert_eq!(engine.track_status().phase, Phase::Suspended);

    // Red-flag parking is not a slow pit lane
    driver(&mut engine, "10", json!({"PitStatus": "InPit"}));
    let events = driver(&mut engine, "10", json!({"PitStatus": "PitExit", "PitLaneTime": "24:10.0"}));
    assert!(events.iter().all(|e| e.kind() != EventKind::SlowPitLane));

    session(&mut engine, json!({"TrackStatus": "1"}));
    assert_eq!(engine.track_status().phase, Phase::Active);
    // Bests carry through the suspension
    assert_eq!(engine.session_best().unwrap().driver, "10");
}

#[test]
fn test_best_times_reset_while_suspended() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race", "Status": "Started"}));
    driver(&mut engine, "10", json!({"LastLapTime": "1:30.000"}));

    session(&mut engine, json!({"TrackStatus": "5"}));
    session(&mut engine, json!({"BestTimesReset": true}));
    assert!(engine.session_best().is_none());

    session(&mut engine, json!({"TrackStatus": "1"}));
    let events = driver(&mut engine, "10", json!({"LastLapTime": "1:35.000"}));
    assert_eq!(kinds(&events), vec![EventKind::QuickestOverallLap]);
    assert_eq!(
        events[0].detail,
        EventDetail::QuickestOverallLap {
            driver: "10".to_string(),
            lap_time: LapTime::from_millis(95_000),
            previous_best: None,
            lap: None,
            compound: None,
            tyre_age: None,
        }
    );
}

#[test]
fn test_aborted_session_resumes_with_bests() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race", "Status": "Started"}));
    driver(&mut engine, "10", json!({"LastLapTime": "1:30.000"}));

    session(&mut engine, json!({"Status": "Aborted"}));
    assert_eq!(engine.track_status().phase, Phase::Suspended);

    // Restarting an aborted session is a resumption, not a new start
    session(&mut engine, json!({"Status": "Started"}));
    assert_eq!(engine.track_status().phase, Phase::Active);

    let events = driver(&mut engine, "10", json!({"LastLapTime": "1:31.000"}));
    assert!(events.is_empty());
    let best = engine.session_best().unwrap();
    assert_eq!(best.driver, "10");
    assert_eq!(best.time, LapTime::from_millis(90_000));
}

#[test]
fn test_deleted_lap_hands_back_purple() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Qualifying", "Status": "Started", "Part": 1}));
    driver(&mut engine, "1", json!({"LastLapTime": "1:30.000"}));
    driver(&mut engine, "16", json!({"LastLapTime": "1:29.000"}));

    let events = driver(&mut engine, "16", json!({"LastLapTime": {"Deleted": true}}));
    assert!(events.is_empty());
    assert_eq!(engine.session_best().unwrap().driver, "1");

    // Beating the reinstated best is purple again
    let events = driver(&mut engine, "44", json!({"LastLapTime": "1:29.500"}));
    assert_eq!(kinds(&events), vec![EventKind::QuickestOverallLap]);
    assert_eq!(
        events[0].detail,
        EventDetail::QuickestOverallLap {
            driver: "44".to_string(),
            lap_time: LapTime::from_millis(89_500),
            previous_best: Some(LapTime::from_millis(90_000)),
            lap: None,
            compound: None,
            tyre_age: None,
        }
    );
}

#[test]
fn test_race_control_array_deltas_each_announce() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race", "Status": "Started"}));

    let first = session(
        &mut engine,
        json!({"RaceControlMessages": {"Messages": [{"Message": "DRS ENABLED"}]}}),
    );
    let second = session(
        &mut engine,
        json!({"RaceControlMessages": {"Messages": [{"Message": "YELLOW IN TRACK SECTOR 3"}]}}),
    );

    assert_eq!(kinds(&first), vec![EventKind::RaceControlMessage]);
    assert_eq!(kinds(&second), vec![EventKind::RaceControlMessage]);
    let EventDetail::RaceControlMessage { message } = &second[0].detail else {
        panic!("unexpected event {:?}", second[0]);
    };
    assert_eq!(message.id, 1);
    assert_eq!(message.message, "YELLOW IN TRACK SECTOR 3");
}

#[test]
fn test_race_control_messages() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race"}));

    // Before the start messages are still announced
    let events = session(
        &mut engine,
        json!({"RaceControlMessages": {"Messages": [
            {"Message": "GREEN LIGHT - PIT EXIT OPEN", "Category": "Flag", "Flag": "GREEN"}
        ]}}),
    );
    assert_eq!(kinds(&events), vec![EventKind::RaceControlMessage]);

    session(&mut engine, json!({"Status": "Started"}));
    let events = session(
        &mut engine,
        json!({"RaceControlMessages": {
            "0": {"Message": "GREEN LIGHT - PIT EXIT OPEN", "Flag": "GREEN"},
            "1": {"Message": "WAVED BLUE FLAG FOR CAR 22", "Flag": "BLUE"},
            "2": {"Message": "CAR 22 TIME 1:32.004 DELETED", "Category": "Other", "Lap": 4}
        }}),
    );
    let ids: Vec<u64> = events
        .iter()
        .filter_map(|e| match &e.detail {
            EventDetail::RaceControlMessage { message } => Some(message.id),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn test_no_events_after_finish() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Race", "Status": "Started"}));
    session(&mut engine, json!({"Status": "Finalised"}));

    assert!(driver(&mut engine, "1", json!({"LastLapTime": "1:20.000"})).is_empty());
    assert!(driver(&mut engine, "1", json!({"Retired": true})).is_empty());
    assert!(session(&mut engine, json!({"RaceControlMessages": [{"Message": "CHEQUERED FLAG"}]})).is_empty());
}

#[test]
fn test_new_session_key_starts_fresh() {
    let mut engine = engine();
    session(&mut engine, json!({"Type": "Qualifying", "Status": "Started", "Part": 1}));
    driver(&mut engine, "1", json!({"LastLapTime": "1:28.000"}));

    engine
        .process(RawUpdate::session_delta("9473", json!({"Type": "Race", "Status": "Started"})))
        .unwrap();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.session.id, "9473");
    assert!(snapshot.drivers.is_empty());
    assert!(engine.session_best().is_none());
}
