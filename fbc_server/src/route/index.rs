use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::HOST, HeaderMap},
    response::Html,
};
use chrono::Local;
use url::form_urlencoded::byte_serialize;

use crate::state::AppState;

static SOURCE: &str = "Czech Floorball Federation";
static FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Render the status page with subscription instructions.
pub async fn handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Html<String> {
    let snapshot = state.cache.snapshot().await;
    let last_update = snapshot
        .last_update
        .map(|last_update| {
            last_update
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| String::from("Not available"));
    let subscription_url = subscription_url(&headers);
    let google_url = format!(
        "https://calendar.google.com/calendar/r?cid={}",
        byte_serialize(subscription_url.as_bytes()).collect::<String>()
    );
    let name = escape(&state.calendar.calendar_name);
    Html(format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{name} Floorball Calendar</title>
        <style>
            body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }}
            .info {{ background: #f0f0f0; padding: 15px; border-radius: 5px; margin: 20px 0; }}
            .button {{ background: #007cba; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; display: inline-block; margin: 10px 5px; }}
            .url {{ background: #f8f8f8; padding: 10px; border-radius: 3px; font-family: monospace; word-break: break-all; }}
        </style>
    </head>
    <body>
        <h1>{name} Floorball Calendar</h1>
        <div class="info">
            <h2>Calendar Information</h2>
            <p><strong>Name:</strong> {name}</p>
            <p><strong>Timezone:</strong> {timezone}</p>
            <p><strong>Last Update:</strong> {last_update}</p>
            <p><strong>Source:</strong> {SOURCE}</p>
        </div>
        <h2>Add to Calendar</h2>
        <h3>Subscribe by URL</h3>
        <div class="url">{subscription_url}</div>
        <h3>Download and Import</h3>
        <a href="/calendar.ics" class="button">Download ICS File</a>
        <h3>Google Calendar</h3>
        <a href="{google_url}" class="button" target="_blank">Add to Google Calendar</a>
        <div class="info">
            <h3>Instructions for Google Calendar:</h3>
            <ol>
                <li>Open Google Calendar</li>
                <li>Click the "+" next to "Other calendars"</li>
                <li>Select "From URL"</li>
                <li>Paste the calendar URL above</li>
                <li>Click "Add calendar"</li>
            </ol>
        </div>
    </body>
</html>
"#,
        timezone = escape(&state.calendar.timezone),
        subscription_url = escape(&subscription_url),
        google_url = escape(&google_url),
    ))
}

/// The absolute calendar URL as seen by the client.
fn subscription_url(headers: &HeaderMap) -> String {
    let protocol = header(headers, FORWARDED_PROTO).unwrap_or("http");
    let host = header(headers, HOST.as_str()).unwrap_or("localhost");
    format!("{protocol}://{host}/calendar.ics")
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
