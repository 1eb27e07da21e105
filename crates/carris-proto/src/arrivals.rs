//! Raw realtime records → sorted countdown rows.

use chrono::{DateTime, TimeZone};
use tracing::trace;

use crate::model::{LineColor, ProcessedArrival, RawArrival};
use crate::time::{minutes_until, normalize};

/// Arrivals further in the past than this are stale and dropped.
pub const MIN_MINUTES_UNTIL_ARRIVAL: i64 = -1;

/// How many rows the AI briefing is given.
pub const SUMMARY_ARRIVALS: usize = 5;

pub const DEFAULT_LINE_COLOR: LineColor = LineColor::rgb(0x6F, 0x22, 0x82);

/// Badge color keyed on the first character of the line id.
pub fn line_color(line_id: &str) -> LineColor {
    match line_id.chars().next() {
        Some('1') => LineColor::rgb(0xEB, 0xBD, 0x02),
        Some('2') => LineColor::rgb(0xC6, 0x00, 0x7E),
        Some('3') => LineColor::rgb(0x00, 0x8B, 0xD2),
        Some('4') => LineColor::rgb(0xE3, 0x06, 0x13),
        _ => DEFAULT_LINE_COLOR,
    }
}

/// Turn one realtime batch into display rows relative to `reference`.
///
/// Records without a usable time are skipped, rows more than a minute in the
/// past are dropped, and the rest are sorted by countdown. The sort is stable:
/// equal countdowns keep feed order.
pub fn process<Tz: TimeZone>(raw: &[RawArrival], reference: &DateTime<Tz>) -> Vec<ProcessedArrival> {
    let mut rows: Vec<ProcessedArrival> = raw
        .iter()
        .filter_map(|arrival| process_one(arrival, reference))
        .filter(|row| row.minutes_until_arrival >= MIN_MINUTES_UNTIL_ARRIVAL)
        .collect();
    rows.sort_by_key(|row| row.minutes_until_arrival);
    rows
}

fn process_one<Tz: TimeZone>(
    arrival: &RawArrival,
    reference: &DateTime<Tz>,
) -> Option<ProcessedArrival> {
    let time = arrival.time_source()?;
    let at = match normalize(time, reference) {
        Ok(at) => at,
        Err(e) => {
            trace!("[arrivals] skipping trip {}: {}", arrival.trip_id, e);
            return None;
        }
    };

    Some(ProcessedArrival {
        line_id: arrival.line_id.clone(),
        destination: arrival.headsign.clone(),
        minutes_until_arrival: minutes_until(&at, reference),
        is_live: arrival.has_estimate(),
        display_color: line_color(&arrival.line_id),
    })
}

/// First rows of a processed batch, for the AI briefing.
pub fn summary_rows(rows: &[ProcessedArrival]) -> &[ProcessedArrival] {
    &rows[..rows.len().min(SUMMARY_ARRIVALS)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn reference() -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 5, 14)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    fn raw(line: &str, headsign: &str, scheduled: Option<&str>, estimated: Option<&str>) -> RawArrival {
        RawArrival {
            line_id: line.to_string(),
            headsign: headsign.to_string(),
            scheduled_arrival: scheduled.map(str::to_string),
            estimated_arrival: estimated.map(str::to_string),
            stop_id: "120385".to_string(),
            trip_id: format!("{}-{}", line, headsign),
        }
    }

    #[test]
    fn test_drops_records_without_usable_time() {
        let batch = vec![
            raw("1523", "Cacém", Some("12:05:00"), None),
            raw("2720", "Amadora", None, None),
            raw("3701", "Sintra", Some("12:10:00"), Some("12:12:00")),
            raw("4410", "Oeiras", Some("bogus"), None),
            raw("1604", "Queluz", Some("12:20:00"), Some("")),
        ];
        let rows = process(&batch, &reference());
        assert_eq!(rows.len(), 3);
        let lines: Vec<&str> = rows.iter().map(|r| r.line_id.as_str()).collect();
        assert_eq!(lines, vec!["1523", "3701", "1604"]);
    }

    #[test]
    fn test_stale_threshold() {
        let batch = vec![
            raw("1523", "one minute ago", Some("11:59:00"), None),
            raw("1523", "thirty seconds ago", Some("11:59:30"), None),
            raw("1523", "two minutes ago", Some("11:58:00"), None),
            raw("1523", "61 seconds ago", Some("11:58:59"), None),
        ];
        let rows = process(&batch, &reference());
        let dest: Vec<(&str, i64)> = rows
            .iter()
            .map(|r| (r.destination.as_str(), r.minutes_until_arrival))
            .collect();
        assert_eq!(
            dest,
            vec![("one minute ago", -1), ("thirty seconds ago", -1)]
        );
        assert!(rows.iter().all(|r| r.minutes_until_arrival >= -1));
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let batch = vec![
            raw("1001", "later", Some("12:30:00"), None),
            raw("2001", "first tie", Some("12:10:10"), None),
            raw("3001", "second tie", None, Some("12:10:50")),
            raw("4001", "soon", Some("12:02:00"), None),
            raw("5001", "third tie", Some("12:10:00"), None),
        ];
        let rows = process(&batch, &reference());
        let dest: Vec<&str> = rows.iter().map(|r| r.destination.as_str()).collect();
        assert_eq!(dest, vec!["soon", "first tie", "second tie", "third tie", "later"]);
        assert!(rows
            .windows(2)
            .all(|w| w[0].minutes_until_arrival <= w[1].minutes_until_arrival));
    }

    #[test]
    fn test_live_flag_and_color() {
        let batch = vec![
            raw("1523", "a", Some("12:05:00"), Some("12:06:00")),
            raw("2720", "b", Some("12:07:00"), None),
            raw("9999", "c", Some("12:08:00"), None),
        ];
        let rows = process(&batch, &reference());
        assert!(rows[0].is_live);
        assert_eq!(rows[0].minutes_until_arrival, 6);
        assert!(!rows[1].is_live);
        assert_eq!(rows[0].display_color.hex(), "#EBBD02");
        assert_eq!(rows[1].display_color.hex(), "#C6007E");
        assert_eq!(rows[2].display_color, DEFAULT_LINE_COLOR);
    }

    #[test]
    fn test_line_color_lookup() {
        assert_eq!(line_color("3701").hex(), "#008BD2");
        assert_eq!(line_color("4410").hex(), "#E30613");
        assert_eq!(line_color(""), DEFAULT_LINE_COLOR);
        assert_eq!(line_color("CP"), DEFAULT_LINE_COLOR);
    }

    #[test]
    fn test_summary_rows_caps_at_five() {
        let batch: Vec<RawArrival> = (0..8)
            .map(|i| raw("1523", "x", Some(&format!("12:{:02}:00", 10 + i)), None))
            .collect();
        let rows = process(&batch, &reference());
        assert_eq!(summary_rows(&rows).len(), 5);
        assert_eq!(summary_rows(&rows[..2]).len(), 2);
    }
}
