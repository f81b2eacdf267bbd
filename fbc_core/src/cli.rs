//! Command line arguments shared by the binaries.

use std::time::Duration;

use clap::{builder::NonEmptyStringValueParser, Args, ValueEnum};

use crate::config::{
    CalendarConfig, FeedConfig, OnEmpty, DEFAULT_CALENDAR_NAME, DEFAULT_EVENT_DURATION_MINUTES,
    DEFAULT_ORGANIZER_EMAIL, DEFAULT_TEAM_NAME, DEFAULT_TIMEOUT_SECONDS, DEFAULT_TIMEZONE,
    DEFAULT_USER_AGENT,
};

#[derive(Debug, Args)]
pub struct CalendarArgs {
    /// the feed URL, including its access key
    #[arg(long, env = "FEED_URL", hide_env_values = true)]
    pub feed_url: String,
    /// the calendar's display name
    #[arg(
        long,
        env = "CALENDAR_NAME",
        default_value = DEFAULT_CALENDAR_NAME,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub calendar_name: String,
    /// the timezone the feed's times are in
    #[arg(
        long,
        env = "TIMEZONE",
        default_value = DEFAULT_TIMEZONE,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub timezone: String,
    /// the exact team name matches are filtered by
    #[arg(
        long,
        env = "TEAM_NAME",
        default_value = DEFAULT_TEAM_NAME,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub team_name: String,
    /// the duration of a match in minutes
    #[arg(
        long,
        env = "EVENT_DURATION",
        default_value_t = DEFAULT_EVENT_DURATION_MINUTES,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub event_duration: u32,
    /// the organizer's e-mail address
    #[arg(long, env = "ORGANIZER_EMAIL", default_value = DEFAULT_ORGANIZER_EMAIL)]
    pub organizer_email: String,
    /// the user agent sent to the feed
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
    /// the feed request timeout in seconds
    #[arg(long, env = "FEED_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout: u64,
    /// what to do when the feed contains no matches
    #[arg(long, env = "ON_EMPTY", value_enum, default_value_t = OnEmptyArg::PropagateEmpty)]
    pub on_empty: OnEmptyArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OnEmptyArg {
    /// fail when there are no matches
    PropagateEmpty,
    /// use a placeholder event when there are no matches
    InsertPlaceholder,
}

impl From<OnEmptyArg> for OnEmpty {
    fn from(value: OnEmptyArg) -> Self {
        match value {
            OnEmptyArg::PropagateEmpty => OnEmpty::PropagateEmpty,
            OnEmptyArg::InsertPlaceholder => OnEmpty::InsertPlaceholder,
        }
    }
}

impl From<&CalendarArgs> for FeedConfig {
    fn from(value: &CalendarArgs) -> Self {
        FeedConfig {
            url: value.feed_url.clone(),
            user_agent: value.user_agent.clone(),
            timeout: Duration::from_secs(value.timeout),
        }
    }
}

impl From<&CalendarArgs> for CalendarConfig {
    fn from(value: &CalendarArgs) -> Self {
        CalendarConfig {
            calendar_name: value.calendar_name.clone(),
            timezone: value.timezone.clone(),
            team_name: value.team_name.clone(),
            event_duration_minutes: value.event_duration,
            organizer_email: value.organizer_email.clone(),
            on_empty: value.on_empty.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use crate::{
        cli::CalendarArgs,
        config::{CalendarConfig, FeedConfig, OnEmpty},
    };

    #[derive(Debug, Parser)]
    struct Arguments {
        #[command(flatten)]
        calendar: CalendarArgs,
    }

    fn parse(args: &[&str]) -> Result<Arguments, clap::Error> {
        let base = ["fbc", "--feed-url", "https://data.example.cz/data/?key=secret"];
        Arguments::try_parse_from(base.iter().chain(args))
    }

    #[test]
    fn test_from_arguments() {
        let args = parse(&[
            "--calendar-name",
            "Šumperk C",
            "--timeout",
            "15",
            "--on-empty",
            "insert-placeholder",
        ])
        .unwrap();
        let feed = FeedConfig::from(&args.calendar);
        assert_eq!(feed.url, "https://data.example.cz/data/?key=secret");
        assert_eq!(feed.timeout, Duration::from_secs(15));
        let calendar = CalendarConfig::from(&args.calendar);
        assert_eq!(calendar.calendar_name, "Šumperk C");
        assert_eq!(calendar.on_empty, OnEmpty::InsertPlaceholder);
        if std::env::var_os("EVENT_DURATION").is_none() {
            assert_eq!(calendar.event_duration_minutes, 90);
        }
    }

    #[test]
    fn test_empty_values_rejected() {
        for flag in ["--calendar-name", "--timezone", "--team-name"] {
            assert!(parse(&[flag, ""]).is_err(), "{flag}");
        }
        assert!(parse(&["--event-duration", "0"]).is_err());
    }
}
