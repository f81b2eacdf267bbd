//! Plain configuration values shared by the CLI and the server.
//!
//! The binaries parse their own arguments and convert them into these structs.

use std::time::Duration;

pub static DEFAULT_CALENDAR_NAME: &str = "SKV C";
pub static DEFAULT_TIMEZONE: &str = "Europe/Prague";
pub static DEFAULT_TEAM_NAME: &str = "TJ Sokol Královské Vinohrady C";
pub static DEFAULT_ORGANIZER_EMAIL: &str = "noreply@skv-calendar.com";
pub static DEFAULT_USER_AGENT: &str = "SKV-C-Calendar/1.0";
pub const DEFAULT_EVENT_DURATION_MINUTES: u32 = 90;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Where and how the feed is downloaded.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// The feed URL. It carries an access key, so it is never logged in full.
    pub url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: String::from(DEFAULT_USER_AGENT),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    /// The feed URL without its query string.
    pub fn redacted_url(&self) -> &str {
        self.url
            .split_once('?')
            .map_or(self.url.as_str(), |(base, _)| base)
    }
}

/// What to do when the feed yields no matches at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnEmpty {
    /// Report the run as failed with [`crate::Error::EmptyResult`].
    #[default]
    PropagateEmpty,
    /// Emit a single placeholder event instead.
    InsertPlaceholder,
}

/// Everything needed to turn match records into a calendar.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub calendar_name: String,
    pub timezone: String,
    /// Matches are kept only if a team field contains this exact substring.
    pub team_name: String,
    pub event_duration_minutes: u32,
    pub organizer_email: String,
    pub on_empty: OnEmpty,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_name: String::from(DEFAULT_CALENDAR_NAME),
            timezone: String::from(DEFAULT_TIMEZONE),
            team_name: String::from(DEFAULT_TEAM_NAME),
            event_duration_minutes: DEFAULT_EVENT_DURATION_MINUTES,
            organizer_email: String::from(DEFAULT_ORGANIZER_EMAIL),
            on_empty: OnEmpty::default(),
        }
    }
}
