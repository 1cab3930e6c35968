//! Short-lived cache of expanded feed occurrences, keyed by window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gamefy_core::{DateRange, Occurrence};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct FeedCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<DateRange, (Instant, Vec<Occurrence>)>>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        FeedCache {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, range: &DateRange) -> Option<Vec<Occurrence>> {
        let entries = self.entries.read().await;
        entries
            .get(range)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, occurrences)| occurrences.clone())
    }

    /// Store a result and drop entries that have expired.
    pub async fn insert(&self, range: DateRange, occurrences: Vec<Occurrence>) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        entries.insert(range, (Instant::now(), occurrences));
    }
}
