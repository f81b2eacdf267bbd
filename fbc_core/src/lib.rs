//! This crate builds an iCalendar feed of a floorball team's matches.
//! It is shared by a CLI writing calendar files and a server serving the calendar.
//!
//! The matches are read from the XML data feed of the Czech Floorball Federation.

pub mod calendar;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod feed_client;

pub use error::{Error, Result};
