//! Location input classification and validation

use crate::{Result, WeatherAgentError};

/// Longest accepted location string, in characters
pub const MAX_LOCATION_LENGTH: usize = 100;

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Location name (city, region, etc.)
    Name(String),
    /// Postal code, optionally with a country prefix
    PostalCode(String),
}

/// Trim and check a caller-supplied location
pub fn validate_location(input: &str) -> Result<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WeatherAgentError::validation("Location cannot be empty"));
    }
    if trimmed.chars().count() > MAX_LOCATION_LENGTH {
        return Err(WeatherAgentError::validation(format!(
            "Location cannot exceed {MAX_LOCATION_LENGTH} characters"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(WeatherAgentError::validation(
            "Location contains invalid characters",
        ));
    }
    Ok(trimmed)
}

/// Location parsing utilities
pub struct LocationParser;

impl LocationParser {
    /// Classify location input (coordinates, postal codes, place names)
    #[must_use]
    pub fn parse(input: &str) -> LocationInput {
        let input = input.trim();

        if let Ok((lat, lon)) = Self::parse_coordinates(input) {
            return LocationInput::Coordinates(lat, lon);
        }

        if Self::is_postal_code(input) {
            return LocationInput::PostalCode(input.to_string());
        }

        LocationInput::Name(input.to_string())
    }

    /// Parse coordinates from string like "46.8182,8.2275" or "46.8182 8.2275"
    pub fn parse_coordinates(input: &str) -> Result<(f64, f64)> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(WeatherAgentError::validation(
                "Coordinates must be in format 'lat,lon'",
            ));
        }

        let lat = parts[0]
            .parse::<f64>()
            .map_err(|_| WeatherAgentError::validation(format!("Invalid latitude: {}", parts[0])))?;
        let lon = parts[1].parse::<f64>().map_err(|_| {
            WeatherAgentError::validation(format!("Invalid longitude: {}", parts[1]))
        })?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(WeatherAgentError::validation(format!(
                "Latitude must be between -90 and 90, got: {lat}"
            )));
        }

        if !(-180.0..=180.0).contains(&lon) {
            return Err(WeatherAgentError::validation(format!(
                "Longitude must be between -180 and 180, got: {lon}"
            )));
        }

        Ok((lat, lon))
    }

    /// Check if input looks like a postal code
    pub fn is_postal_code(input: &str) -> bool {
        let normalized = input.replace([' ', '-'], "");

        // US ZIP codes: 5 or 9 digits
        if normalized.len() == 5 || normalized.len() == 9 {
            return normalized.chars().all(|c| c.is_ascii_digit());
        }

        // Country code followed by an alphanumeric code containing digits
        if (3..=10).contains(&normalized.len()) && normalized.is_ascii() {
            let (prefix, suffix) = normalized.split_at(2);
            return prefix.chars().all(|c| c.is_ascii_alphabetic())
                && suffix.len() >= 3
                && suffix.chars().all(|c| c.is_ascii_alphanumeric())
                && suffix.chars().any(|c| c.is_ascii_digit());
        }

        false
    }

    /// Render a postal code as the provider's `zip,country` query
    #[must_use]
    pub fn zip_query(postal: &str) -> String {
        let postal = postal.trim();
        if postal.contains(',') || postal.chars().all(|c| c.is_ascii_digit() || c == '-') {
            return postal.to_string();
        }

        let mut chars = postal.chars();
        let prefix: String = chars.by_ref().take(2).collect();
        let rest = chars.as_str().trim_start_matches(['-', ' ']);
        if prefix.chars().all(|c| c.is_ascii_alphabetic()) && !rest.is_empty() {
            format!("{rest},{}", prefix.to_ascii_uppercase())
        } else {
            postal.to_string()
        }
    }
}
