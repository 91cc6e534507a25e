//! Unit tests for sample stream normalization.

use chrono::{Duration, TimeZone, Utc};
use powerlab::recording::{normalize_json, normalize_records, normalize_stream, RawRecord, StreamPayload};

#[test]
fn test_timestamps_take_priority_over_elapsed() {
    let start = Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap();
    let records = vec![
        RawRecord {
            timestamp: Some(start),
            elapsed: Some(100.0),
            power: Some(200.0),
            heart_rate: None,
        },
        RawRecord {
            timestamp: Some(start + Duration::seconds(4)),
            elapsed: Some(500.0),
            power: Some(240.0),
            heart_rate: None,
        },
    ];

    let session = normalize_records(&records);
    assert_eq!(session.len(), 5);
    assert_eq!(session.power[2], Some(220.0));
}

#[test]
fn test_index_cadence_without_time() {
    let records: Vec<RawRecord> = (0..10)
        .map(|_| RawRecord {
            power: Some(150.0),
            ..Default::default()
        })
        .collect();

    let session = normalize_records(&records);
    assert_eq!(session.len(), 10);
    assert!(session.power.iter().all(|p| *p == Some(150.0)));
    assert!(session.heart_rate.iter().all(Option::is_none));
}

#[test]
fn test_zero_power_is_not_missing() {
    let records = vec![
        RawRecord::at(0.0).with_power(0.0),
        RawRecord::at(1.0).with_power(0.0),
        RawRecord::at(2.0),
    ];
    let session = normalize_records(&records);

    assert_eq!(session.power, vec![Some(0.0), Some(0.0), Some(0.0)]);
    assert_eq!(session.valid_power_samples(), 3);
    assert_eq!(session.average_power(), Some(0.0));
}

#[test]
fn test_invalid_values_treated_as_absent() {
    let records = vec![
        RawRecord::at(0.0).with_power(100.0).with_heart_rate(120.0),
        RawRecord::at(1.0).with_power(-5.0).with_heart_rate(f64::NAN),
        RawRecord::at(2.0).with_power(300.0).with_heart_rate(140.0),
    ];
    let session = normalize_records(&records);

    assert_eq!(session.power[1], Some(200.0));
    assert_eq!(session.heart_rate[1], Some(130.0));
}

#[test]
fn test_stream_with_offset_and_gaps() {
    let stream = StreamPayload {
        time: vec![10.0, 11.0, 15.0],
        watts: Some(vec![Some(100.0), Some(100.0), Some(300.0)]),
        heartrate: Some(vec![None, Some(130.0), None]),
    };
    let session = normalize_stream(&stream);

    assert_eq!(session.len(), 6);
    assert_eq!(session.power[0], Some(100.0));
    assert_eq!(session.power[3], Some(200.0));
    assert_eq!(session.power[5], Some(300.0));
    // A single known heart rate is held across the span.
    assert!(session.heart_rate.iter().all(|hr| *hr == Some(130.0)));
}

#[test]
fn test_short_session_has_no_curve_data() {
    let records: Vec<_> = (0..20).map(|i| RawRecord::at(i as f64).with_power(250.0)).collect();
    let session = normalize_records(&records);

    assert!(!session.has_power_curve_data());
    assert_eq!(session.average_power(), Some(250.0));
}

#[test]
fn test_json_inputs() {
    let stream = normalize_json(r#"{"time": [0, 1, 2], "power": [100, null, 300]}"#);
    assert_eq!(stream.power, vec![Some(100.0), Some(200.0), Some(300.0)]);

    let records = normalize_json(r#"[{"elapsed": 0, "heart_rate": 120}, {"elapsed": 2, "heart_rate": 124}]"#);
    assert_eq!(records.heart_rate, vec![Some(120.0), Some(122.0), Some(124.0)]);
    assert!(records.power.iter().all(Option::is_none));

    assert!(normalize_json("not json").is_empty());
    assert!(normalize_json("[]").is_empty());
}

#[test]
fn test_clock_glitch_yields_empty_session() {
    let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
    let records = vec![
        RawRecord {
            timestamp: Some(epoch),
            power: Some(200.0),
            ..Default::default()
        },
        RawRecord {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap()),
            power: Some(210.0),
            ..Default::default()
        },
    ];

    let session = normalize_records(&records);
    assert!(session.is_empty());
    assert!(!session.has_power_curve_data());
}
