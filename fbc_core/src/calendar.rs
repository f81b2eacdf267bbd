//! Turns match records into calendar events and serializes them.
//!
//! The calendar is assembled with the `ical` generator types. Content lines are written
//! here: they are folded at character boundaries and parameter values are quoted, so
//! names like `Šumperk, C` are safe.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, Property},
    ical_param, ical_property,
};
use regex::Regex;

use crate::{
    config::CalendarConfig,
    error::{Error, Result},
    extract::MatchRecord,
};

static PRODUCT: &str = "Floorball Calendar";
static FORMAT: &str = "%Y%m%dT%H%M%S";
static UID_DOMAIN: &str = "floorball-calendar";
/// Maximum octets of a content line before it is folded.
const LINE_OCTETS: usize = 75;

/// Location of every event the feed gives no venue for.
pub static PLACEHOLDER_LOCATION: &str = "Floorball Arena";

/// An iCalendar-ready match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub title: String,
    pub description: String,
    pub location: String,
}

impl CalendarEvent {
    pub fn from_record(record: &MatchRecord, config: &CalendarConfig) -> Self {
        let name = &config.calendar_name;
        let (title, description) = match (&record.home_team, &record.away_team, &record.opponent) {
            (Some(home), Some(away), _) => {
                let title = format!("{home} vs {away}");
                let description = with_venue(&title, record.venue.as_deref());
                (title, description)
            }
            (None, None, Some(opponent)) => (
                format!("{name} vs {opponent}"),
                format!("Floorball match: {opponent}"),
            ),
            (None, None, None) => (name.clone(), String::new()),
            _ => {
                let title = format!("{name} Match");
                let description = with_venue(&title, record.venue.as_deref());
                (title, description)
            }
        };
        Self {
            start: record.start,
            duration_minutes: config.event_duration_minutes,
            title,
            description,
            location: record
                .venue
                .clone()
                .unwrap_or_else(|| String::from(PLACEHOLDER_LOCATION)),
        }
    }

    /// Stand-in event for a feed without any match, the evening after `today`.
    pub fn placeholder(today: NaiveDate, config: &CalendarConfig) -> Self {
        let day = today.succ_opt().unwrap_or(today);
        Self {
            start: day.and_hms_opt(18, 0, 0).unwrap_or_default(),
            duration_minutes: config.event_duration_minutes,
            title: format!("{} - no scheduled matches", config.calendar_name),
            description: String::from("The feed contained no matches."),
            location: String::from(PLACEHOLDER_LOCATION),
        }
    }

    fn end(&self) -> Result<NaiveDateTime> {
        if self.duration_minutes == 0 {
            return Err(Error::Serialization(format!(
                "event {:?} has no duration",
                self.title
            )));
        }
        self.start
            .checked_add_signed(Duration::minutes(i64::from(self.duration_minutes)))
            .ok_or_else(|| {
                Error::Serialization(format!("end of event {:?} is out of range", self.title))
            })
    }
}

fn with_venue(title: &str, venue: Option<&str>) -> String {
    match venue {
        Some(venue) => format!("{title}\nVenue: {venue}"),
        None => title.to_string(),
    }
}

/// Map every record to its event.
pub fn build_events(records: &[MatchRecord], config: &CalendarConfig) -> Vec<CalendarEvent> {
    records
        .iter()
        .map(|record| CalendarEvent::from_record(record, config))
        .collect()
}

/// The serialized calendar, once bare and once with calendar-level publishing headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendars {
    pub plain: String,
    pub full: String,
}

/// Serialize the events. A single broken event fails the whole batch.
pub fn generate(events: &[CalendarEvent], config: &CalendarConfig) -> Result<Calendars> {
    if config.timezone.trim().is_empty() {
        return Err(Error::Serialization(String::from("the timezone is empty")));
    }
    let changed = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let mut calendar = get_calendar(events, config, &changed)?;
    let plain = write_calendar(&calendar);
    calendar.properties.extend(publishing_properties(config));
    Ok(Calendars {
        plain,
        full: write_calendar(&calendar),
    })
}

/// Build the calendar from the events.
fn get_calendar(
    events: &[CalendarEvent],
    config: &CalendarConfig,
    changed: &str,
) -> Result<IcalCalendar> {
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(prod_id(&config.calendar_name))
        .build();
    for event in events {
        calendar.events.push(get_event(event, config, changed)?);
    }
    Ok(calendar)
}

fn get_event(event: &CalendarEvent, config: &CalendarConfig, changed: &str) -> Result<IcalEvent> {
    let end = event.end()?;
    let mut ical_event = IcalEvent::new();
    ical_event.properties = vec![
        ical_property!("UID", escape(&uid(&config.calendar_name, event))),
        ical_property!("DTSTAMP", changed),
        ical_property!(
            "DTSTART",
            event.start.format(FORMAT).to_string(),
            ical_param!("TZID", &config.timezone)
        ),
        ical_property!(
            "DTEND",
            end.format(FORMAT).to_string(),
            ical_param!("TZID", &config.timezone)
        ),
        ical_property!("SUMMARY", escape(&event.title)),
        ical_property!("DESCRIPTION", escape(&event.description)),
        ical_property!("LOCATION", escape(&event.location)),
        ical_property!("STATUS", "CONFIRMED"),
        ical_property!("TRANSP", "OPAQUE"),
        ical_property!("X-MICROSOFT-CDO-BUSYSTATUS", "BUSY"),
        ical_property!(
            "ORGANIZER",
            format!("mailto:{}", config.organizer_email),
            ical_param!("CN", &config.calendar_name)
        ),
    ];
    Ok(ical_event)
}

fn publishing_properties(config: &CalendarConfig) -> Vec<Property> {
    vec![
        ical_property!("METHOD", "PUBLISH"),
        ical_property!("X-WR-CALNAME", escape(&config.calendar_name)),
        ical_property!(
            "X-WR-CALDESC",
            escape(&format!("{} Floorball Team Calendar", config.calendar_name))
        ),
        ical_property!("X-WR-TIMEZONE", &config.timezone),
    ]
}

fn prod_id(calendar_name: &str) -> String {
    format!("-//{calendar_name}//{PRODUCT}//EN")
}

/// Get a unique id for a match of a calendar.
///
/// Changing this function is a breaking change!
fn uid(calendar_name: &str, event: &CalendarEvent) -> String {
    static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
    let whitespace_regex =
        WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let whitespace_rep = "-";
    let calendar_name = whitespace_regex.replace_all(calendar_name, whitespace_rep);
    let title = whitespace_regex.replace_all(&event.title, whitespace_rep);
    let start = event.start.format(FORMAT);
    format!("{calendar_name}_{start}_{title}@{UID_DOMAIN}")
}

/// Escape a TEXT value.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Serialize the calendar with CRLF line endings.
fn write_calendar(calendar: &IcalCalendar) -> String {
    let mut ics = String::new();
    write_component(&mut ics, "VCALENDAR", &calendar.properties, |ics| {
        for event in &calendar.events {
            write_component(ics, "VEVENT", &event.properties, |_| {});
        }
    });
    ics
}

fn write_component(
    ics: &mut String,
    name: &str,
    properties: &[Property],
    children: impl FnOnce(&mut String),
) {
    write_line(ics, &format!("BEGIN:{name}"));
    for property in properties {
        write_line(ics, &content_line(property));
    }
    children(ics);
    write_line(ics, &format!("END:{name}"));
}

fn content_line(property: &Property) -> String {
    let mut line = property.name.clone();
    for (name, values) in property.params.iter().flatten() {
        let values: Vec<String> = values.iter().map(|value| param_value(value)).collect();
        line.push_str(&format!(";{name}={}", values.join(",")));
    }
    line.push(':');
    line.push_str(property.value.as_deref().unwrap_or_default());
    line
}

/// A parameter value, quoted when it contains `;`, `:` or `,`.
///
/// Quoted values cannot contain `"` or control characters, so those are dropped.
fn param_value(value: &str) -> String {
    let value: String = value
        .chars()
        .filter(|c| *c != '"' && !c.is_control())
        .collect();
    if value.contains([';', ':', ',']) {
        format!("\"{value}\"")
    } else {
        value
    }
}

/// Append a line folded into chunks of at most [`LINE_OCTETS`] octets.
fn write_line(ics: &mut String, line: &str) {
    let mut octets = 0;
    for c in line.chars() {
        if octets + c.len_utf8() > LINE_OCTETS {
            ics.push_str("\r\n ");
            octets = 1;
        }
        ics.push(c);
        octets += c.len_utf8();
    }
    ics.push_str("\r\n");
}
