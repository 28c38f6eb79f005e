//! Calendar events and weather advice for outdoor plans
//!
//! [`EventSource`] is the seam to wherever events live; [`FileEventSource`]
//! reads them from a JSON file. Outdoor events are recognised by keyword
//! and checked against current conditions.

pub mod file;

pub use file::FileEventSource;

use crate::Result;
use crate::agent::composer::format_temperature;
use crate::models::CurrentWeather;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Words marking an event as weather-dependent
pub const OUTDOOR_KEYWORDS: [&str; 13] = [
    "outdoor", "park", "garden", "beach", "picnic", "bbq", "barbecue", "sports", "golf",
    "tennis", "running", "cycling", "hiking",
];

/// Conditions that send outdoor plans indoors
const WET_CONDITIONS: [&str; 3] = ["Rain", "Drizzle", "Thunderstorm"];

/// Source of calendar events
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events overlapping `[start, end)`, ordered by start time
    async fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>>;

    /// Whether an event source is set up at all
    fn is_configured(&self) -> bool;

    /// Check that events can be read
    async fn health_check(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub summary: String,
    #[serde(rename = "start")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "end")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CalendarEvent {
    pub fn has_overlap(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> bool {
        start < self.end_time && stop > self.start_time
    }

    /// Whether summary, description or location name an outdoor activity
    #[must_use]
    pub fn is_outdoor(&self) -> bool {
        let text = [
            Some(self.summary.as_str()),
            self.description.as_deref(),
            self.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

        OUTDOOR_KEYWORDS.iter().any(|keyword| text.contains(keyword))
    }
}

impl Display for CalendarEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} - {})",
            self.summary,
            self.start_time.format("%Y-%m-%d %H:%M"),
            self.end_time.format("%H:%M")
        )?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

/// The weather-dependent subset of `events`
#[must_use]
pub fn outdoor_events(events: &[CalendarEvent]) -> Vec<CalendarEvent> {
    events.iter().filter(|e| e.is_outdoor()).cloned().collect()
}

/// One line of advice per outdoor event, given the current conditions
#[must_use]
pub fn recommendations(events: &[CalendarEvent], weather: &CurrentWeather) -> String {
    if events.is_empty() {
        return "No events found for the specified period.".to_string();
    }
    let outdoor = outdoor_events(events);
    if outdoor.is_empty() {
        return "No weather-dependent events found in your calendar.".to_string();
    }

    let main = weather.main_condition().unwrap_or("Unknown");
    let temperature = weather.current_weather.temperature;

    outdoor
        .iter()
        .map(|event| advise(&event.summary, main, temperature))
        .collect::<Vec<_>>()
        .join("\n")
}

fn advise(name: &str, main: &str, temperature: f64) -> String {
    let temp = format_temperature(temperature);
    if WET_CONDITIONS.contains(&main) {
        format!("⚠️ {name}: Consider rescheduling or moving indoors due to rain.")
    } else if temperature < 5.0 {
        format!("🥶 {name}: Very cold weather ({temp}°C), dress warmly!")
    } else if temperature > 30.0 {
        format!("🌡️ {name}: Hot weather ({temp}°C), stay hydrated and seek shade.")
    } else if main == "Clear" {
        format!("☀️ {name}: Perfect weather for outdoor activities!")
    } else {
        format!("🌤️ {name}: {main} conditions, check details before heading out.")
    }
}
