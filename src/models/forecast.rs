//! Forecast models and daily aggregation of 3-hourly provider samples

use super::location::Coordinates;
use super::weather::WeatherCondition;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One provider forecast sample (typically a 3-hour slot)
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    /// Slot start
    pub timestamp: DateTime<Utc>,
    /// Calendar date at the forecast location
    pub local_date: NaiveDate,
    pub temperature: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    /// Probability of precipitation (0.0-1.0)
    pub precipitation_probability: Option<f64>,
    pub condition: WeatherCondition,
}

/// Aggregated forecast for one local calendar day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// Lowest temperature in Celsius
    pub temperature_min: f64,
    /// Highest temperature in Celsius
    pub temperature_max: f64,
    /// Mean temperature in Celsius
    pub temperature_avg: f64,
    /// Mean relative humidity percentage
    pub humidity: u8,
    /// Strongest wind speed in m/s
    pub wind_speed_max: f64,
    /// Highest precipitation probability in percent
    pub precipitation_probability: Option<u8>,
    /// Dominant condition of the day
    pub conditions: WeatherCondition,
}

/// Daily forecast for a resolved location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherForecast {
    /// Resolved location name
    pub location: String,
    /// Country code
    pub country: Option<String>,
    pub coordinates: Coordinates,
    /// One entry per day, ordered by date
    pub forecast: Vec<DailyForecast>,
    /// Data source
    pub source: String,
}

impl DailyForecast {
    /// Aggregate the samples of a single day. Returns `None` for no samples.
    #[must_use]
    pub fn aggregate(date: NaiveDate, samples: &[ForecastSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len() as f64;
        let temperature_min = samples
            .iter()
            .map(|s| s.temperature_min.min(s.temperature))
            .fold(f64::INFINITY, f64::min);
        let temperature_max = samples
            .iter()
            .map(|s| s.temperature_max.max(s.temperature))
            .fold(f64::NEG_INFINITY, f64::max);
        let temperature_avg = samples.iter().map(|s| s.temperature).sum::<f64>() / count;
        let humidity =
            (samples.iter().map(|s| f64::from(s.humidity)).sum::<f64>() / count).round() as u8;
        let wind_speed_max = samples
            .iter()
            .map(|s| s.wind_speed)
            .fold(0.0_f64, f64::max);
        let precipitation_probability = samples
            .iter()
            .filter_map(|s| s.precipitation_probability)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
            .map(|p| (p.clamp(0.0, 1.0) * 100.0).round() as u8);

        Some(Self {
            date,
            temperature_min: round1(temperature_min),
            temperature_max: round1(temperature_max),
            temperature_avg: round1(temperature_avg),
            humidity,
            wind_speed_max: round1(wind_speed_max),
            precipitation_probability,
            conditions: dominant_condition(samples),
        })
    }
}

/// Group samples by local date and aggregate the first `days` days.
///
/// Days come out in date order. Fewer entries are returned when the samples
/// span fewer days than requested.
#[must_use]
pub fn daily_forecasts(samples: &[ForecastSample], days: usize) -> Vec<DailyForecast> {
    let mut by_date: BTreeMap<NaiveDate, Vec<ForecastSample>> = BTreeMap::new();
    for sample in samples {
        by_date
            .entry(sample.local_date)
            .or_default()
            .push(sample.clone());
    }

    by_date
        .iter()
        .take(days)
        .filter_map(|(date, day_samples)| DailyForecast::aggregate(*date, day_samples))
        .collect()
}

// Most frequent condition group; earliest sample wins ties.
fn dominant_condition(samples: &[ForecastSample]) -> WeatherCondition {
    let mut counts: Vec<(&str, usize, &WeatherCondition)> = Vec::new();
    for sample in samples {
        match counts
            .iter_mut()
            .find(|(main, _, _)| *main == sample.condition.main)
        {
            Some(entry) => entry.1 += 1,
            None => counts.push((sample.condition.main.as_str(), 1, &sample.condition)),
        }
    }

    let mut best = &counts[0];
    for entry in &counts[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best.2.clone()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
