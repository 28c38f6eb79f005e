//! Events read from a JSON file

use super::{CalendarEvent, EventSource};
use crate::config::CalendarConfig;
use crate::{Result, WeatherAgentError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads a JSON array of events on every call, so edits show up without a restart
pub struct FileEventSource {
    path: Option<PathBuf>,
}

impl FileEventSource {
    pub fn new(config: &CalendarConfig) -> Self {
        let path = config
            .events_file
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if path.is_none() {
            debug!("No calendar events file configured");
        }
        Self { path }
    }

    async fn read_all(path: &Path) -> Result<Vec<CalendarEvent>> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            warn!("Could not read calendar file {}: {}", path.display(), e);
            WeatherAgentError::config(format!(
                "calendar events file {} is not readable",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            WeatherAgentError::config(format!(
                "calendar events file {} is not a JSON event list: {e}",
                path.display()
            ))
        })
    }
}

#[async_trait]
impl EventSource for FileEventSource {
    async fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };

        let mut events: Vec<CalendarEvent> = Self::read_all(path)
            .await?
            .into_iter()
            .filter(|e| e.has_overlap(start, end))
            .collect();
        events.sort_by_key(|e| e.start_time);
        debug!("{} calendar events between {} and {}", events.len(), start, end);
        Ok(events)
    }

    fn is_configured(&self) -> bool {
        self.path.is_some()
    }

    async fn health_check(&self) -> Result<()> {
        match &self.path {
            Some(path) => Self::read_all(path).await.map(|_| ()),
            None => Err(WeatherAgentError::config("no calendar events file configured")),
        }
    }
}
