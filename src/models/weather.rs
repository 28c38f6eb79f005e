//! Current weather model and display methods

use super::location::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Core weather readings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherData {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Relative humidity percentage
    pub humidity: u8,
    /// Atmospheric pressure in hPa
    pub pressure: u32,
    /// Visibility in meters
    pub visibility: Option<u32>,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_direction: Option<u16>,
    /// Cloud cover percentage
    pub cloud_cover: Option<u8>,
}

/// Weather condition details
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherCondition {
    /// Main condition group (Clear, Rain, ...)
    pub main: String,
    /// Detailed description
    pub description: String,
    /// Provider icon code
    pub icon: String,
}

/// Current weather for a resolved location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentWeather {
    /// Resolved location name
    pub location: String,
    /// Country code
    pub country: Option<String>,
    pub coordinates: Coordinates,
    pub current_weather: WeatherData,
    pub conditions: Vec<WeatherCondition>,
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Data source
    pub source: String,
}

impl WeatherData {
    /// Convert wind direction from degrees to cardinal direction
    #[must_use]
    pub fn wind_direction_to_cardinal(degrees: u16) -> &'static str {
        match degrees {
            0..=11 | 349..=360 => "N",
            12..=33 => "NNE",
            34..=56 => "NE",
            57..=78 => "ENE",
            79..=101 => "E",
            102..=123 => "ESE",
            124..=146 => "SE",
            147..=168 => "SSE",
            169..=191 => "S",
            192..=213 => "SSW",
            214..=236 => "SW",
            237..=258 => "WSW",
            259..=281 => "W",
            282..=303 => "WNW",
            304..=326 => "NW",
            327..=348 => "NNW",
            _ => "Unknown",
        }
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature)
    }

    /// Format wind information
    #[must_use]
    pub fn format_wind(&self) -> String {
        match self.wind_direction {
            Some(degrees) => format!(
                "{:.1} m/s {}",
                self.wind_speed,
                Self::wind_direction_to_cardinal(degrees)
            ),
            None => format!("{:.1} m/s", self.wind_speed),
        }
    }
}

impl CurrentWeather {
    /// Description of the first reported condition
    #[must_use]
    pub fn description(&self) -> &str {
        self.conditions
            .first()
            .map_or("unknown conditions", |c| c.description.as_str())
    }

    /// Main group of the first reported condition
    #[must_use]
    pub fn main_condition(&self) -> Option<&str> {
        self.conditions.first().map(|c| c.main.as_str())
    }
}
