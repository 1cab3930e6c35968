//! Sources of natively stored events.
//!
//! Stored events are created and edited elsewhere in GameFy; this module only
//! reads them for the calendar view.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::date_range::DateRange;
use crate::error::{CoreError, CoreResult};
use crate::occurrence::StoredEvent;

/// Read access to application-managed events.
pub trait EventStore: Send + Sync {
    /// Events whose `[start, end]` overlaps `range`.
    fn events_in(&self, range: &DateRange) -> CoreResult<Vec<StoredEvent>>;
}

/// Events kept in a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> CoreResult<Vec<StoredEvent>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No stored events file");
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            CoreError::Store(format!("Could not read {}: {}", self.path.display(), e))
        })
    }
}

impl EventStore for JsonFileStore {
    fn events_in(&self, range: &DateRange) -> CoreResult<Vec<StoredEvent>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|e| e.overlaps(range))
            .collect())
    }
}

/// In-process store, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: Vec<StoredEvent>,
}

impl MemoryStore {
    pub fn new(events: Vec<StoredEvent>) -> Self {
        MemoryStore { events }
    }
}

impl EventStore for MemoryStore {
    fn events_in(&self, range: &DateRange) -> CoreResult<Vec<StoredEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.overlaps(range))
            .cloned()
            .collect())
    }
}
