//! The in-memory calendar cache.
//!
//! At most one refresh runs at a time. Callers who queued up behind a running refresh
//! take its outcome instead of fetching again.

use std::{fmt::Display, future::Future};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};

/// The cached calendar at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub ics: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Whether the calendar is missing or older than `max_age` at `now`.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match (&self.ics, self.last_update) {
            (Some(_), Some(last_update)) => now - last_update > max_age,
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    snapshot: Snapshot,
    /// Number of finished refresh attempts, successful or not.
    attempts: u64,
}

#[derive(Debug, Default)]
pub struct CalendarCache {
    state: RwLock<State>,
    refresh_guard: Mutex<()>,
}

impl CalendarCache {
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Refresh unconditionally.
    pub async fn refresh<F, Fut, E>(&self, fetch: F) -> Snapshot
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Display,
    {
        let attempts = self.state.read().await.attempts;
        self.refresh_after(attempts, fetch).await
    }

    /// Refresh only if the calendar is missing or older than `max_age`.
    pub async fn refresh_if_stale<F, Fut, E>(&self, max_age: Duration, fetch: F) -> Snapshot
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Display,
    {
        let (snapshot, attempts) = {
            let state = self.state.read().await;
            (state.snapshot.clone(), state.attempts)
        };
        if !snapshot.is_stale(max_age, Utc::now()) {
            return snapshot;
        }
        self.refresh_after(attempts, fetch).await
    }

    /// Run `fetch` unless an attempt finished since `seen_attempts` was read.
    ///
    /// A failed fetch keeps the previous calendar.
    async fn refresh_after<F, Fut, E>(&self, seen_attempts: u64, fetch: F) -> Snapshot
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Display,
    {
        let _guard = self.refresh_guard.lock().await;
        {
            let state = self.state.read().await;
            if state.attempts != seen_attempts {
                tracing::debug!("joined a concurrent calendar refresh");
                return state.snapshot.clone();
            }
        }
        let result = fetch().await;
        let mut state = self.state.write().await;
        state.attempts += 1;
        match result {
            Ok(ics) => {
                let now = Utc::now();
                state.snapshot = Snapshot {
                    ics: Some(ics),
                    last_update: Some(now),
                };
                tracing::info!(last_update = %now.to_rfc3339(), "calendar cache updated");
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to update the calendar cache");
            }
        }
        state.snapshot.clone()
    }
}
