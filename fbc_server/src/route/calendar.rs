use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Handle calendar requests.
///
/// The cached calendar is refreshed first if it is missing or stale. A stale calendar is
/// still served if the refresh fails.
pub async fn handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, String)> {
    let Some(ics) = state.refresh_if_stale().await.ics else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Error generating calendar data"),
        ));
    };
    let response = (
        [
            (CONTENT_TYPE, String::from("text/calendar; charset=utf-8")),
            (
                CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    file_name(&state.calendar.calendar_name)
                ),
            ),
            (CACHE_CONTROL, String::from("public, max-age=3600")),
        ],
        ics,
    )
        .into_response();
    Ok(response)
}

/// The download file name, e.g. `skv-c-calendar.ics` for `SKV C`.
pub fn file_name(calendar_name: &str) -> String {
    let slug: String = calendar_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        String::from("calendar.ics")
    } else {
        format!("{slug}-calendar.ics")
    }
}
