//! Extraction of match records from the normalized feed document.
//!
//! The feed has no documented schema and has been seen in several shapes. Each shape
//! has a detector; the detectors are tried in order and the first hit decides how the
//! records are read.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

/// Date and time field pairs of structured records, in priority order.
static DATE_TIME_FIELDS: [(&str, &str); 5] = [
    ("match_datetime", "match_time"),
    ("date", "time"),
    ("match_date", "match_time"),
    ("start_date", "start_time"),
    ("game_date", "game_time"),
];

static DATE_TIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Keys under which an encoded record may carry its text.
static TEXT_KEYS: [&str; 5] = ["$", "_", "text", "value", "data"];

/// One match, independent of the shape it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub start: NaiveDateTime,
    pub opponent: Option<String>,
    pub venue: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
}

/// Why a single record was dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("record carries no text")]
    NoText,
    #[error("record text contains no timestamp")]
    NoTimestamp,
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("record has no date and time fields")]
    NoDateFields,
    #[error("invalid date and time {0:?}")]
    InvalidDateTime(String),
}

/// The shapes the feed is known to take.
#[derive(Debug)]
enum Shape<'a> {
    /// Records with named fields like `home_team` and `date`.
    Structured(Vec<&'a Value>),
    /// Records whose fields are run together in one string.
    Encoded(Vec<&'a Value>),
}

type Detector = fn(&Value) -> Option<Shape<'_>>;

/// Shape detectors in priority order.
static SHAPES: [(&str, Detector); 5] = [
    ("matches.match", detect_matches),
    ("data.event", detect_data_event),
    ("event", detect_event),
    ("events", detect_events),
    ("array", detect_array),
];

fn detect_matches(doc: &Value) -> Option<Shape<'_>> {
    let records = doc.get("matches")?.get("match")?;
    Some(Shape::Structured(one_or_many(records)))
}

fn detect_data_event(doc: &Value) -> Option<Shape<'_>> {
    let records = doc.get("data")?.get("event")?;
    Some(Shape::Encoded(one_or_many(records)))
}

fn detect_event(doc: &Value) -> Option<Shape<'_>> {
    doc.get("event").map(|records| Shape::Encoded(one_or_many(records)))
}

fn detect_events(doc: &Value) -> Option<Shape<'_>> {
    doc.get("events").map(|records| Shape::Encoded(one_or_many(records)))
}

fn detect_array(doc: &Value) -> Option<Shape<'_>> {
    doc.as_array()
        .map(|records| Shape::Encoded(records.iter().collect()))
}

/// Extract the matches of `team_name` from a normalized feed document.
///
/// Records which cannot be read are logged and skipped. The result is empty if the
/// document has none of the known shapes.
pub fn extract_matches(doc: &Value, team_name: &str) -> Vec<MatchRecord> {
    let Some((name, shape)) = SHAPES
        .iter()
        .find_map(|(name, detect)| detect(doc).map(|shape| (*name, shape)))
    else {
        tracing::warn!("feed document has no known shape");
        return vec![];
    };
    tracing::debug!(shape = name, "detected feed shape");
    let (records, results): (usize, Vec<Result<MatchRecord, ExtractionError>>) = match shape {
        Shape::Structured(records) => (
            records.len(),
            records
                .into_iter()
                .filter(|record| involves_team(record, team_name))
                .map(|record| extract_structured(record, team_name))
                .collect(),
        ),
        Shape::Encoded(records) => (
            records.len(),
            records.into_iter().map(extract_encoded).collect(),
        ),
    };
    let matches: Vec<MatchRecord> = results
        .into_iter()
        .enumerate()
        .filter_map(|(index, result)| match result {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(index, error = %err, "dropping feed record");
                None
            }
        })
        .collect();
    tracing::info!(records, matches = matches.len(), "extracted matches");
    matches
}

fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(values) => values.iter().collect(),
        value => vec![value],
    }
}

/// Read a named field as text. Elements with attributes keep their text under `_`.
fn field<'a>(record: &'a Value, name: &str) -> Option<&'a str> {
    let value = record.get(name)?;
    let text = match value {
        Value::String(text) => text.as_str(),
        Value::Object(object) => object.get("_")?.as_str()?,
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

fn involves_team(record: &Value, team_name: &str) -> bool {
    ["home_team", "away_team"]
        .into_iter()
        .filter_map(|name| field(record, name))
        .any(|team| team.contains(team_name))
}

fn extract_structured(record: &Value, team_name: &str) -> Result<MatchRecord, ExtractionError> {
    let (date, time) = DATE_TIME_FIELDS
        .iter()
        .find_map(|(date, time)| Some((field(record, date)?, field(record, time)?)))
        .ok_or(ExtractionError::NoDateFields)?;
    let date_time = if date.contains(' ') {
        date.to_string()
    } else {
        format!("{date} {time}")
    };
    let start = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&date_time, format).ok())
        .ok_or(ExtractionError::InvalidDateTime(date_time))?;
    let home_team = field(record, "home_team");
    let away_team = field(record, "away_team");
    let opponent = match (home_team, away_team) {
        (Some(home), Some(away)) if home.contains(team_name) => Some(away),
        (Some(home), Some(_)) => Some(home),
        _ => None,
    };
    Ok(MatchRecord {
        start,
        opponent: opponent.map(String::from),
        venue: field(record, "arena_name").map(String::from),
        home_team: home_team.map(String::from),
        away_team: away_team.map(String::from),
    })
}

/// Only ASCII digits count, other scripts' digits are part of the surrounding text.
fn timestamp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"([0-9]{4})-([0-9]{2})-([0-9]{2}) ([0-9]{2}):([0-9]{2}):[0-9]{2}")
            .expect("valid regex")
    })
}

/// A team name glued to a numeric identifier, e.g. `FAT PIPE Traverza43072`.
fn opponent_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"([A-Za-z\s]+?)([0-9]{5,})").expect("valid regex"))
}

/// Build the start from the captured fields. Seconds are ignored.
fn timestamp_from_captures(captures: &Captures) -> Option<NaiveDateTime> {
    let number = |index: usize| -> Option<u32> { captures.get(index)?.as_str().parse().ok() };
    let year: i32 = captures.get(1)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?
        .and_hms_opt(number(4)?, number(5)?, 0)
}

fn record_text(record: &Value) -> Option<&str> {
    match record {
        Value::String(text) => Some(text),
        Value::Object(object) => TEXT_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str)),
        _ => None,
    }
}

fn extract_encoded(record: &Value) -> Result<MatchRecord, ExtractionError> {
    let text = record_text(record).ok_or(ExtractionError::NoText)?;
    let captures = timestamp_regex()
        .captures(text)
        .ok_or(ExtractionError::NoTimestamp)?;
    let whole = captures.get(0).ok_or(ExtractionError::NoTimestamp)?;
    let start = timestamp_from_captures(&captures)
        .ok_or_else(|| ExtractionError::InvalidTimestamp(whole.as_str().to_string()))?;
    let opponent = opponent_regex()
        .captures(&text[whole.end()..])
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().trim().to_string())
        .filter(|name| !name.is_empty());
    Ok(MatchRecord {
        start,
        opponent,
        venue: None,
        home_team: None,
        away_team: None,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Timelike};
    use serde_json::json;

    use crate::extract::{extract_encoded, extract_matches, ExtractionError};

    static TEAM: &str = "TJ Sokol Královské Vinohrady C";

    #[test]
    fn test_encoded_timestamp() {
        let record = json!("3XM5-A0082025-09-14 09:30:00119247009:30:0090FAT PIPE Traverza43072");
        let parsed = extract_encoded(&record).unwrap();
        assert_eq!(parsed.start.year(), 2025);
        assert_eq!(parsed.start.month(), 9);
        assert_eq!(parsed.start.day(), 14);
        assert_eq!(parsed.start.hour(), 9);
        assert_eq!(parsed.start.minute(), 30);
        assert_eq!(parsed.opponent.as_deref(), Some("FAT PIPE Traverza"));
        assert_eq!(parsed.venue, None);
    }

    #[test]
    fn test_encoded_without_timestamp() {
        let doc = json!({"data": {"event": "FAT PIPE Traverza43072"}});
        assert!(extract_matches(&doc, TEAM).is_empty());
        assert_eq!(
            extract_encoded(&json!("FAT PIPE Traverza43072")),
            Err(ExtractionError::NoTimestamp)
        );
    }

    #[test]
    fn test_encoded_invalid_timestamp() {
        let doc = json!({"data": {"event": ["X2025-13-45 99:99:00Team12345"]}});
        assert!(extract_matches(&doc, TEAM).is_empty());
        assert_eq!(
            extract_encoded(&json!("2025-02-30 10:00:00")),
            Err(ExtractionError::InvalidTimestamp(String::from("2025-02-30 10:00:00")))
        );
    }

    #[test]
    fn test_encoded_non_ascii_digits() {
        let record = json!("١٢٣٤-٠٩-١٤ ٠٩:٣٠:٠٠ 2025-09-14 09:30:00FAT PIPE Traverza43072");
        let parsed = extract_encoded(&record).unwrap();
        assert_eq!(parsed.start.year(), 2025);
        assert_eq!(parsed.start.hour(), 9);
        assert_eq!(parsed.opponent.as_deref(), Some("FAT PIPE Traverza"));
        let parsed = extract_encoded(&json!("2025-09-14 09:30:00Team١٢٣٤٥")).unwrap();
        assert_eq!(parsed.opponent, None);
    }

    #[test]
    fn test_encoded_without_opponent() {
        let parsed = extract_encoded(&json!("A0012025-10-01 18:15:00 nothing here 123")).unwrap();
        assert_eq!(parsed.opponent, None);
        assert_eq!(
            parsed.start,
            NaiveDate::from_ymd_opt(2025, 10, 1)
                .unwrap()
                .and_hms_opt(18, 15, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_encoded_text_keys() {
        let doc = json!({"data": {"event": [
            {"$": "2025-09-14 09:30:00Alpha11111"},
            {"_": "2025-09-15 10:00:00Beta22222"},
            {"text": "2025-09-16 11:00:00Gamma33333"},
            {"value": "2025-09-17 12:00:00Delta44444"},
            {"data": "2025-09-18 13:00:00Epsilon55555"},
            {"other": "2025-09-19 14:00:00Zeta66666"},
        ]}});
        let matches = extract_matches(&doc, TEAM);
        let opponents: Vec<_> = matches
            .iter()
            .map(|record| record.opponent.clone().unwrap())
            .collect();
        assert_eq!(opponents, vec!["Alpha", "Beta", "Gamma", "Delta", "Epsilon"]);
    }

    #[test]
    fn test_encoded_shapes() {
        let event = "2025-09-14 09:30:00FAT PIPE Traverza43072";
        for doc in [
            json!({"data": {"event": event}}),
            json!({"event": [event]}),
            json!({"events": event}),
            json!([event]),
        ] {
            let matches = extract_matches(&doc, TEAM);
            assert_eq!(matches.len(), 1, "{doc}");
            assert_eq!(matches[0].opponent.as_deref(), Some("FAT PIPE Traverza"));
        }
    }

    #[test]
    fn test_unknown_shape() {
        assert!(extract_matches(&json!({"schedule": {"game": []}}), TEAM).is_empty());
        assert!(extract_matches(&json!("text"), TEAM).is_empty());
    }

    #[test]
    fn test_shape_priority() {
        let doc = json!({
            "matches": {"match": {
                "home_team": TEAM,
                "away_team": "Other Team",
                "date": "2025-09-14",
                "time": "09:30:00",
            }},
            "data": {"event": "2026-01-01 10:00:00Someone12345"},
        });
        let matches = extract_matches(&doc, TEAM);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].away_team.as_deref(), Some("Other Team"));
    }

    #[test]
    fn test_structured() {
        let doc = json!({"matches": {"match": [
            {
                "home_team": TEAM,
                "away_team": "Other Team",
                "date": "2025-09-14",
                "time": "09:30:00",
                "arena_name": "Hala Vinohrady",
            },
            {
                "home_team": "Somebody",
                "away_team": "Somebody Else",
                "date": "2025-09-15",
                "time": "10:00:00",
            },
        ]}});
        let matches = extract_matches(&doc, TEAM);
        assert_eq!(matches.len(), 1);
        let record = &matches[0];
        assert_eq!(record.home_team.as_deref(), Some(TEAM));
        assert_eq!(record.away_team.as_deref(), Some("Other Team"));
        assert_eq!(record.venue.as_deref(), Some("Hala Vinohrady"));
        assert_eq!(
            record.start,
            NaiveDate::from_ymd_opt(2025, 9, 14)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_structured_field_priority() {
        let doc = json!({"matches": {"match": {
            "away_team": TEAM,
            "match_datetime": "2025-11-02 17:45:00",
            "match_time": "17:45:00",
            "date": "2025-09-14",
            "time": "09:30:00",
        }}});
        let matches = extract_matches(&doc, TEAM);
        assert_eq!(
            matches[0].start,
            NaiveDate::from_ymd_opt(2025, 11, 2)
                .unwrap()
                .and_hms_opt(17, 45, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_structured_date_formats() {
        let doc = json!({"matches": {"match": [
            {"home_team": TEAM, "game_date": "14.09.2025", "game_time": "09:30"},
            {"home_team": TEAM, "start_date": "2025/09/15", "start_time": "10:00:00"},
            {"home_team": TEAM, "match_date": "2025-09-16", "match_time": "11:00"},
            {"home_team": TEAM, "date": {"_": "2025-09-17", "$": {"tz": "local"}}, "time": "12:00"},
        ]}});
        let hours: Vec<_> = extract_matches(&doc, TEAM)
            .iter()
            .map(|record| (record.start.day(), record.start.hour()))
            .collect();
        assert_eq!(hours, vec![(14, 9), (15, 10), (16, 11), (17, 12)]);
    }

    #[test]
    fn test_structured_dropped() {
        let doc = json!({"matches": {"match": [
            {"home_team": TEAM, "away_team": "Other Team"},
            {"home_team": TEAM, "date": "2025-13-45", "time": "99:99:00"},
            {"home_team": TEAM, "date": "", "time": "09:30:00"},
        ]}});
        assert!(extract_matches(&doc, TEAM).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let doc = json!({"data": {"event": [
            "2025-09-14 09:30:00FAT PIPE Traverza43072",
            "2025-09-21 11:00:00Bulldogs Brno12345",
            "broken",
        ]}});
        assert_eq!(extract_matches(&doc, TEAM), extract_matches(&doc, TEAM));
        assert_eq!(extract_matches(&doc, TEAM).len(), 2);
    }
}
