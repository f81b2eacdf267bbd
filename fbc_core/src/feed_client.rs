//! This client fetches the match feed and turns it into calendars.

use chrono::NaiveDate;
use reqwest::header::USER_AGENT;
use roxmltree::{Document, Node, ParsingOptions};
use serde_json::{Map, Value};

use crate::{
    calendar::{self, CalendarEvent, Calendars},
    config::{CalendarConfig, FeedConfig, OnEmpty},
    error::{Error, Result},
    extract,
};

/// Key of the attribute object of an element.
static ATTRIBUTES_KEY: &str = "$";
/// Key of the text of an element which also has attributes or children.
static TEXT_KEY: &str = "_";

/// Get both calendar variants for the configured team.
pub async fn get(feed: &FeedConfig, config: &CalendarConfig) -> Result<Calendars> {
    let xml = get_response(feed).await?;
    let today = chrono::Local::now().date_naive();
    get_calendars(&xml, config, today)
}

/// Get the raw feed from the upstream server.
async fn get_response(feed: &FeedConfig) -> Result<String> {
    tracing::info!(url = feed.redacted_url(), "fetching feed");
    let client = reqwest::Client::builder().timeout(feed.timeout).build()?;
    let response = client
        .get(&feed.url)
        .header(USER_AGENT, &feed.user_agent)
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;
    tracing::debug!(bytes = body.len(), "fetched feed");
    Ok(body)
}

/// Build the calendars from the feed body.
fn get_calendars(xml: &str, config: &CalendarConfig, today: NaiveDate) -> Result<Calendars> {
    let doc = normalize(xml)?;
    let records = extract::extract_matches(&doc, &config.team_name);
    let events = match (records.is_empty(), config.on_empty) {
        (false, _) => calendar::build_events(&records, config),
        (true, OnEmpty::PropagateEmpty) => return Err(Error::EmptyResult),
        (true, OnEmpty::InsertPlaceholder) => {
            tracing::warn!("no matches found, inserting a placeholder event");
            vec![CalendarEvent::placeholder(today, config)]
        }
    };
    tracing::info!(events = events.len(), "building calendar");
    calendar::generate(&events, config)
}

/// Convert XML into nested JSON values.
///
/// The document becomes `{root: value}`. A DOCTYPE is accepted. Elements without attributes and children become
/// their text. Other elements become objects: children by name (repeated names become
/// arrays), attributes under `$` and text under `_`.
pub fn normalize(xml: &str) -> Result<Value> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options)?;
    let root = document.root_element();
    let mut map = Map::new();
    map.insert(root.tag_name().name().to_string(), normalize_element(root));
    Ok(Value::Object(map))
}

fn normalize_element(element: Node) -> Value {
    let text: String = element
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();
    let has_children = element.children().any(|child| child.is_element());
    let has_attributes = element.attributes().next().is_some();
    if !has_children && !has_attributes {
        return Value::String(text);
    }
    let mut map = Map::new();
    if has_attributes {
        let attributes = element
            .attributes()
            .map(|attribute| {
                (
                    attribute.name().to_string(),
                    Value::String(attribute.value().to_string()),
                )
            })
            .collect();
        map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
    }
    if !text.trim().is_empty() {
        map.insert(TEXT_KEY.to_string(), Value::String(text));
    }
    for child in element.children().filter(|child| child.is_element()) {
        let name = child.tag_name().name().to_string();
        let value = normalize_element(child);
        match map.get_mut(&name) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name, value);
            }
        }
    }
    Value::Object(map)
}
