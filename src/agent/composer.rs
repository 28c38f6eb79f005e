//! Reply composition: localized templates and grounding of model replies

use crate::models::{CurrentWeather, WeatherForecast, WeatherPayload};

/// What the act step produced, as far as the reply is concerned
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Weather data was fetched
    Weather(WeatherPayload),
    /// Weather question without a usable location
    NoLocation,
    /// The provider could not resolve the named location
    LocationNotFound(String),
    /// Intent confidence too low to act on
    Unclear,
    /// Not a weather question
    Conversational,
}

impl Outcome {
    #[must_use]
    pub fn payload(&self) -> Option<&WeatherPayload> {
        match self {
            Outcome::Weather(payload) => Some(payload),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_payload(self) -> Option<WeatherPayload> {
        match self {
            Outcome::Weather(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Instructions for the observe step
#[must_use]
pub fn observe_system_prompt(language: &str) -> String {
    format!(
        "You are a helpful weather assistant. Write the final answer to the user's query \
from the weather data provided.\n\
Requirements:\n\
- ALWAYS respond in the user's language (language code: {language})\n\
- Be natural, concise and conversational (at most three sentences)\n\
- Mention the location name and the temperature in °C exactly as given in the data\n\
- Never invent values that are not in the data\n\
- If the query was not weather-related, answer helpfully and offer weather help"
    )
}

/// Template reply for an outcome in the given language (en, fr, es; others get English)
#[must_use]
pub fn template_reply(language: &str, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Weather(payload) => weather_sentence(language, payload),
        Outcome::NoLocation => match language {
            "fr" => "Je n'ai pas pu déterminer le lieu de votre demande. Pouvez-vous préciser une ville ou un lieu ?".to_string(),
            "es" => "No pude determinar la ubicación de su consulta. ¿Podría especificar una ciudad o un lugar?".to_string(),
            _ => "I couldn't determine the location from your query. Could you please specify a city or location?".to_string(),
        },
        Outcome::LocationNotFound(location) => match language {
            "fr" => format!("Je n'ai pas trouvé d'informations météo pour {location}. Veuillez vérifier le nom du lieu et réessayer."),
            "es" => format!("No encontré información del tiempo para {location}. Por favor, verifique el nombre del lugar e inténtelo de nuevo."),
            _ => format!("I couldn't find weather information for {location}. Please check the location name and try again."),
        },
        Outcome::Unclear => match language {
            "fr" => "Je ne suis pas sûr d'avoir compris votre question. Pouvez-vous la reformuler en précisant la ville ?".to_string(),
            "es" => "No estoy seguro de haber entendido su pregunta. ¿Podría reformularla indicando la ciudad?".to_string(),
            _ => "I'm not sure I understood your question. Could you rephrase it and include the city you're interested in?".to_string(),
        },
        Outcome::Conversational => match language {
            "fr" => "Bonjour ! Je suis un assistant météo. Comment puis-je vous aider avec la météo ?".to_string(),
            "es" => "¡Hola! Soy un asistente del tiempo. ¿Cómo puedo ayudarte con el clima?".to_string(),
            _ => "Hello! I'm a weather assistant. How can I help you with weather information?".to_string(),
        },
    }
}

fn weather_sentence(language: &str, payload: &WeatherPayload) -> String {
    match payload {
        WeatherPayload::Current(current) => current_sentence(language, current),
        WeatherPayload::Forecast(forecast) => forecast_sentence(language, forecast),
    }
}

fn current_sentence(language: &str, current: &CurrentWeather) -> String {
    let location = &current.location;
    let condition = current.description();
    let temp = format_temperature(current.current_weather.temperature);
    match language {
        "fr" => format!("Le temps à {location} est {condition} avec {temp}°C."),
        "es" => format!("El tiempo en {location} es {condition} con {temp}°C."),
        _ => format!("The weather in {location} is {condition} with {temp}°C."),
    }
}

fn forecast_sentence(language: &str, forecast: &WeatherForecast) -> String {
    let location = &forecast.location;
    let Some(day) = forecast.forecast.first() else {
        return match language {
            "fr" => format!("Aucune prévision n'est disponible pour {location}."),
            "es" => format!("No hay pronóstico disponible para {location}."),
            _ => format!("No forecast is available for {location}."),
        };
    };

    let date = day.date.format("%Y-%m-%d");
    let condition = &day.conditions.description;
    let temp = format_temperature(day.temperature_avg);
    let low = format_temperature(day.temperature_min);
    let high = format_temperature(day.temperature_max);
    let mut sentence = match language {
        "fr" => format!(
            "La prévision pour {location} le {date} est {condition} avec {temp}°C (min {low}°C, max {high}°C)."
        ),
        "es" => format!(
            "El pronóstico para {location} el {date} es {condition} con {temp}°C (mín {low}°C, máx {high}°C)."
        ),
        _ => format!(
            "The forecast for {location} on {date} is {condition} with {temp}°C (low {low}°C, high {high}°C)."
        ),
    };

    let days = forecast.forecast.len();
    if days > 1 {
        let extra = match language {
            "fr" => format!(" Prévisions disponibles sur {days} jours."),
            "es" => format!(" Pronóstico disponible para {days} días."),
            _ => format!(" The forecast covers {days} days."),
        };
        sentence.push_str(&extra);
    }
    sentence
}

/// Preformatted facts handed to the model alongside the raw payload
#[must_use]
pub fn highlights(payload: &WeatherPayload) -> serde_json::Value {
    match payload {
        WeatherPayload::Current(current) => serde_json::json!({
            "temperature": current.current_weather.format_temperature(),
            "wind": current.current_weather.format_wind(),
            "condition": current.main_condition(),
        }),
        WeatherPayload::Forecast(forecast) => serde_json::json!({
            "days": forecast.forecast.len(),
            "first_day": forecast.forecast.first().map(|day| day.date),
        }),
    }
}

/// One-decimal rendering used in every reply
#[must_use]
pub fn format_temperature(value: f64) -> String {
    format!("{value:.1}")
}

/// Append the factual template sentence unless `reply` already names the
/// location and the headline temperature.
#[must_use]
pub fn ground(reply: &str, language: &str, payload: &WeatherPayload) -> String {
    let reply = reply.trim();
    let mentions_location = reply
        .to_lowercase()
        .contains(&payload.location().to_lowercase());
    let mentions_temperature = payload
        .headline_temperature()
        .is_none_or(|t| mentions_figure(reply, t));

    if reply.is_empty() {
        weather_sentence(language, payload)
    } else if mentions_location && mentions_temperature {
        reply.to_string()
    } else {
        format!("{reply} {}", weather_sentence(language, payload))
    }
}

fn mentions_figure(reply: &str, value: f64) -> bool {
    let one_decimal = format_temperature(value);
    if reply.contains(&one_decimal) || reply.contains(&one_decimal.replace('.', ",")) {
        return true;
    }
    // "22°C" is fine for 22.0
    one_decimal
        .strip_suffix(".0")
        .is_some_and(|whole| contains_number(reply, whole))
}

fn contains_number(text: &str, number: &str) -> bool {
    text.match_indices(number).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + number.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit() || c == '-')
            && !after.is_some_and(|c| c.is_ascii_digit() || c == '.' || c == ',')
    })
}
