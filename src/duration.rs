// Timestamp helpers for itinerary durations and time-of-day filtering

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike};

// Provider timestamps carry no offset: "2025-03-01T06:00:00"
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_naive(at: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(at, format).ok())
}

// Wall-clock reading of a timestamp, as the traveller sees it on the ticket.
// Offset-less timestamps are taken as-is; timestamps with an offset keep
// their local wall-clock time.
pub fn parse_local(at: &str) -> Option<NaiveDateTime> {
    let at = at.trim();
    parse_naive(at).or_else(|| DateTime::parse_from_rfc3339(at).ok().map(|dt| dt.naive_local()))
}

// A comparable point in time. Offset-less timestamps are read in the
// viewer's zone without normalization; timestamps with an offset are
// converted to UTC.
pub fn parse_instant(at: &str) -> Option<NaiveDateTime> {
    let at = at.trim();
    parse_naive(at).or_else(|| DateTime::parse_from_rfc3339(at).ok().map(|dt| dt.naive_utc()))
}

// Elapsed minutes from departure to arrival, rounded to the nearest minute.
// Negative when the arrival precedes the departure. `None` when either
// timestamp does not parse.
pub fn duration_minutes(departure_at: &str, arrival_at: &str) -> Option<i64> {
    let departure = parse_instant(departure_at)?;
    let arrival = parse_instant(arrival_at)?;
    let millis = (arrival - departure).num_milliseconds();
    Some((millis as f64 / 60_000.0 + 0.5).floor() as i64)
}

pub fn hour_of_day(at: &str) -> Option<u32> {
    parse_local(at).map(|dt| dt.hour())
}

pub fn format_duration(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{}{}h {}m", sign, hours, mins)
    } else {
        format!("{}{}m", sign, mins)
    }
}

// Parses the itinerary duration the provider sends (`PT2H10M`, `P1DT3H`).
pub fn parse_iso_duration(text: &str) -> Option<i64> {
    let rest = text.trim().strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date_part, time_part)) => (date_part, time_part),
        None => (rest, ""),
    };

    let mut minutes = 0i64;
    let mut units_seen = 0;
    for (part, units) in [
        (date_part, &[('D', 24 * 60)][..]),
        (time_part, &[('H', 60), ('M', 1)][..]),
    ] {
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            if c == 'S' {
                number.clear();
                units_seen += 1;
                continue;
            }
            let (_, factor) = units.iter().find(|(unit, _)| *unit == c)?;
            minutes += number.parse::<i64>().ok()? * factor;
            number.clear();
            units_seen += 1;
        }
        if !number.is_empty() {
            return None;
        }
    }
    // "P" and "PT" carry no duration at all
    (units_seen > 0).then_some(minutes)
}

// "Sat, 06:00 am"
pub fn format_time(at: &str) -> Option<String> {
    parse_local(at).map(|dt| dt.format("%a, %I:%M %P").to_string())
}

// Dates shown around the selected travel date so the traveller can shift
// the search by a few days.
pub fn date_strip(center: NaiveDate, radius: i64) -> Vec<NaiveDate> {
    (-radius..=radius)
        .filter_map(|offset| center.checked_add_signed(Duration::days(offset)))
        .collect()
}
