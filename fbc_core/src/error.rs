//! Errors which abort a whole calendar generation run.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The feed could not be downloaded: network failure, timeout or a non-2xx status.
    #[error("failed to fetch the feed{}: {source}", status_suffix(.status))]
    Fetch {
        #[source]
        source: reqwest::Error,
        status: Option<StatusCode>,
    },

    /// The feed body is not well-formed XML.
    #[error("failed to parse the feed XML: {0}")]
    Parse(#[from] roxmltree::Error),

    /// The calendar could not be serialized.
    #[error("failed to serialize the calendar: {0}")]
    Serialization(String),

    /// No match could be extracted from the feed.
    #[error("no matches found in the feed")]
    EmptyResult,
}

/// The feed URL carries an access key, so it is stripped from the source.
impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        let status = source.status();
        Error::Fetch {
            source: source.without_url(),
            status,
        }
    }
}

fn status_suffix(status: &Option<StatusCode>) -> String {
    match status {
        Some(status) => format!(" (status {status})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
