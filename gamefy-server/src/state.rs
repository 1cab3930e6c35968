use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use gamefy_core::feed::http_client;
use gamefy_core::{
    CoreResult, DateRange, EventStore, FeedClient, GamefyConfig, JsonFileStore, Occurrence,
};
use tracing::debug;

use crate::cache::FeedCache;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    feed: Option<FeedClient>,
    pub store: Arc<dyn EventStore>,
    cache: FeedCache,
    past_days: i64,
    future_days: i64,
}

impl AppState {
    pub fn new(config: &GamefyConfig) -> Result<Self> {
        let feed = match config.feed_url() {
            Some(url) => Some(FeedClient::new(http_client(config.feed_timeout()?)?, url)?),
            None => None,
        };

        Ok(AppState::from_parts(
            feed,
            Arc::new(JsonFileStore::new(config.events_path())),
            config.cache_ttl()?,
            config.past_days,
            config.future_days,
        ))
    }

    pub fn from_parts(
        feed: Option<FeedClient>,
        store: Arc<dyn EventStore>,
        cache_ttl: Duration,
        past_days: i64,
        future_days: i64,
    ) -> Self {
        AppState {
            feed,
            store,
            cache: FeedCache::new(cache_ttl),
            past_days,
            future_days,
        }
    }

    pub fn default_range(&self, now: DateTime<Utc>) -> DateRange {
        DateRange::around(now, self.past_days, self.future_days)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Expanded feed for `range`, served from cache while fresh.
    /// Without a configured feed this is always empty.
    pub async fn feed_occurrences(&self, range: &DateRange) -> CoreResult<Vec<Occurrence>> {
        let Some(feed) = &self.feed else {
            return Ok(Vec::new());
        };

        if let Some(cached) = self.cache.get(range).await {
            debug!(start = %range.start, end = %range.end, "Feed cache hit");
            return Ok(cached);
        }

        let occurrences = feed.occurrences(range).await?;
        self.cache.insert(*range, occurrences.clone()).await;
        Ok(occurrences)
    }
}
