use std::{future::Future, pin::Pin, sync::Arc};

use fbc_core::{
    config::{CalendarConfig, FeedConfig},
    feed_client,
};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::cache::{CalendarCache, Snapshot};

pub type Fetch = Pin<Box<dyn Future<Output = fbc_core::Result<String>> + Send>>;

/// Produces a fresh ICS body on every call.
pub type Source = Box<dyn Fn() -> Fetch + Send + Sync>;

/// Everything the request handlers share.
pub struct AppState {
    pub cache: CalendarCache,
    pub calendar: CalendarConfig,
    /// Requests refresh the calendar first once it is older than this.
    pub stale_after: chrono::Duration,
    source: Source,
}

impl AppState {
    pub fn new(calendar: CalendarConfig, stale_after: chrono::Duration, source: Source) -> Self {
        Self {
            cache: CalendarCache::default(),
            calendar,
            stale_after,
            source,
        }
    }

    /// State whose calendar is generated from the live feed.
    pub fn from_feed(
        feed: FeedConfig,
        calendar: CalendarConfig,
        stale_after: chrono::Duration,
    ) -> Self {
        let source_calendar = calendar.clone();
        let source: Source = Box::new(move || -> Fetch {
            let feed = feed.clone();
            let calendar = source_calendar.clone();
            Box::pin(async move {
                let calendars = feed_client::get(&feed, &calendar).await?;
                Ok(calendars.plain)
            })
        });
        Self::new(calendar, stale_after, source)
    }

    pub async fn refresh(&self) -> Snapshot {
        self.cache.refresh(|| (self.source)()).await
    }

    pub async fn refresh_if_stale(&self) -> Snapshot {
        self.cache
            .refresh_if_stale(self.stale_after, || (self.source)())
            .await
    }
}

/// Refresh the calendar every `period`, starting one period from now.
pub fn spawn_scheduled_refresh(
    state: Arc<AppState>,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tracing::info!("scheduled calendar refresh triggered");
            state.refresh().await;
        }
    })
}
