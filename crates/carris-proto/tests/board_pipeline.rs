//! Realtime payload → board rows, against a recorded late-evening response.

use carris_proto::arrivals::process;
use carris_proto::model::{Countdown, RawArrival};
use carris_proto::time::normalize;
use chrono::{DateTime, FixedOffset, TimeZone};

const REALTIME: &str = include_str!("fixtures/realtime_120385.json");

fn lisbon_summer(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 7, 3, h, m, s)
        .unwrap()
}

#[test]
fn late_evening_board_crosses_midnight() {
    let raw: Vec<RawArrival> = serde_json::from_str(REALTIME).expect("fixture parses");
    assert_eq!(raw.len(), 7);

    let rows = process(&raw, &lisbon_summer(23, 35, 0));
    let summary: Vec<(&str, i64, bool)> = rows
        .iter()
        .map(|r| (r.line_id.as_str(), r.minutes_until_arrival, r.is_live))
        .collect();

    // 23:32 is three minutes gone and dropped; the record without times is skipped.
    assert_eq!(
        summary,
        vec![
            ("2720", 3, false),
            ("1523", 9, true),
            ("1604", 15, false),
            ("3701", 50, false),
            ("4410", 80, false),
        ]
    );
    assert_eq!(rows[0].countdown(), Countdown::Minutes(3));
    assert_eq!(rows[4].countdown(), Countdown::OverAnHour);
    assert_eq!(rows[0].destination, "Amadora Este (Metro)");
}

#[test]
fn early_evening_does_not_roll_after_midnight_times() {
    let raw: Vec<RawArrival> = serde_json::from_str(REALTIME).unwrap();
    let rows = process(&raw, &lisbon_summer(19, 0, 0));
    // 00:25 at 19:00 is read as this morning and dropped; 24:55 is explicit.
    assert!(rows.iter().all(|r| r.line_id != "3701"));
    assert!(rows.iter().any(|r| r.line_id == "4410"));
}

#[test]
fn normalize_keeps_reference_offset() {
    let reference = lisbon_summer(22, 0, 0);
    let resolved = normalize("01:15:00", &reference).unwrap();
    assert_eq!(resolved, lisbon_summer(1, 15, 0) + chrono::Duration::days(1));
    assert_eq!(resolved.offset(), reference.offset());
}
