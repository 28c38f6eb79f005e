//! Intent extraction: language-model "thoughts" and the rule-based parser

use crate::llm::extract_json;
use crate::models::{ParsedQuery, QueryType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Confidence reported by the rule-based parser
pub const RULE_BASED_CONFIDENCE: f32 = 0.4;

/// Tool the agent decides to run after thinking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GetCurrentWeather,
    GetWeatherForecast,
    DirectResponse,
    NoAction,
}

impl Action {
    fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "weather_current" | "get_current_weather" => Action::GetCurrentWeather,
            "weather_forecast" | "get_weather_forecast" => Action::GetWeatherForecast,
            "direct_response" => Action::DirectResponse,
            _ => Action::NoAction,
        }
    }
}

/// Result of the think step
#[derive(Debug, Clone, PartialEq)]
pub struct Thought {
    pub is_weather_related: bool,
    pub reasoning: String,
    pub actions: Vec<Action>,
    pub parsed: ParsedQuery,
}

impl Thought {
    #[must_use]
    pub fn language(&self) -> &str {
        &self.parsed.language
    }
}

/// Instructions for the think step
pub const THINK_SYSTEM_PROMPT: &str = r#"You are an intelligent weather agent. Analyze the user's query and reason about what actions to take.

Determine:
1. Is this query weather-related? (true/false)
2. What language is the user using? (language code like "en", "fr", "es")
3. Which actions should be taken? Use EXACTLY these action names:
   - "weather_current" for current weather queries
   - "weather_forecast" for future weather queries (today later, tomorrow, next days)
   - "direct_response" for non-weather queries
   - "no_action" for unclear queries
4. If weather-related, extract the location, time reference and specific weather aspect.

Return ONLY a JSON object with this structure:
{
    "is_weather_related": boolean,
    "detected_language": "language_code",
    "confidence": float (0.0-1.0),
    "reasoning": "short explanation",
    "suggested_actions": ["action"],
    "parsed_query": {
        "location": "extracted location or null",
        "date_time": "time reference or null",
        "weather_aspect": "temperature/rain/wind/humidity/snow or null",
        "query_type": "current/forecast/historical/comparison/other"
    }
}

Examples:
- "What's the weather in Paris?" -> {"suggested_actions": ["weather_current"]}
- "Will it rain tomorrow in London?" -> {"suggested_actions": ["weather_forecast"]}
- "¿Lloverá mañana en Madrid?" -> {"suggested_actions": ["weather_forecast"]}
- "Hello, how are you?" -> {"suggested_actions": ["direct_response"]}"#;

#[derive(Debug, Deserialize)]
struct ModelThought {
    #[serde(default)]
    is_weather_related: bool,
    #[serde(default)]
    detected_language: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    suggested_actions: Vec<String>,
    #[serde(default)]
    parsed_query: Option<ModelParsedQuery>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelParsedQuery {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    weather_aspect: Option<String>,
    #[serde(default)]
    query_type: Option<String>,
}

/// Interpret a think-step completion. `None` when it is not usable JSON.
#[must_use]
pub fn thought_from_completion(query: &str, completion: &str) -> Option<Thought> {
    let json = extract_json(completion)?;
    let model: ModelThought = match serde_json::from_str(json) {
        Ok(model) => model,
        Err(e) => {
            warn!("Unusable think completion: {}", e);
            return None;
        }
    };

    let language = model
        .detected_language
        .as_deref()
        .and_then(normalize_language)
        .unwrap_or_else(|| detect_language(&tokenize(query)).to_string());
    let confidence = model.confidence.unwrap_or(0.5).clamp(0.0, 1.0);
    let details = model.parsed_query.unwrap_or_default();

    let query_type = if model.is_weather_related {
        details
            .query_type
            .as_deref()
            .map_or(QueryType::Current, QueryType::from_label)
    } else {
        QueryType::Other
    };

    let mut actions: Vec<Action> = model
        .suggested_actions
        .iter()
        .map(|a| Action::from_label(a))
        .collect();
    if actions.is_empty() {
        actions.push(default_action(model.is_weather_related, query_type));
    }

    Some(Thought {
        is_weather_related: model.is_weather_related,
        reasoning: model.reasoning,
        actions,
        parsed: ParsedQuery {
            location: details.location.and_then(non_null),
            date_time: details.date_time.and_then(non_null),
            weather_aspect: details.weather_aspect.and_then(non_null),
            query_type,
            confidence,
            original_query: query.to_string(),
            language,
        },
    })
}

// Models sometimes spell null as a string
fn non_null(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || matches!(trimmed.to_lowercase().as_str(), "null" | "none" | "n/a") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_language(code: &str) -> Option<String> {
    let code = code.trim().to_lowercase();
    let primary = code.split(['-', '_']).next().unwrap_or_default();
    (primary.len() == 2 && primary.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| primary.to_string())
}

fn default_action(is_weather_related: bool, query_type: QueryType) -> Action {
    match (is_weather_related, query_type) {
        (false, _) => Action::DirectResponse,
        (true, QueryType::Forecast) => Action::GetWeatherForecast,
        (true, _) => Action::GetCurrentWeather,
    }
}

const WEATHER_WORDS: &[&str] = &[
    // English
    "weather", "temperature", "temp", "rain", "raining", "rainy", "sunny", "cloudy", "forecast",
    "wind", "windy", "humidity", "humid", "snow", "snowing", "storm", "hot", "cold", "warm",
    "umbrella",
    // French
    "météo", "meteo", "temps", "pluie", "pleut", "pleuvoir", "soleil", "vent", "humidité",
    "neige", "chaud", "froid", "température", "prévisions",
    // Spanish
    "tiempo", "clima", "lluvia", "llueve", "lloverá", "sol", "viento", "humedad", "nieve",
    "calor", "frío", "pronóstico",
];

const FRENCH_WORDS: &[&str] = &[
    "bonjour", "quel", "quelle", "temps", "météo", "fait", "il", "demain", "pleut", "aujourd",
    "à", "est", "le", "la", "pour", "prévisions", "va", "pleuvoir",
];

const SPANISH_WORDS: &[&str] = &[
    "hola", "tiempo", "lluvia", "hace", "será", "mañana", "qué", "llueve", "lloverá", "hoy",
    "clima", "el", "en", "para", "cuál", "está",
];

const FORECAST_WORDS: &[&str] = &[
    "tomorrow", "forecast", "next", "week", "weekend", "later", "tonight", "demain", "prévisions",
    "semaine", "mañana", "pronóstico", "semana", "lloverá", "será",
];

const ASPECTS: &[(&str, &[&str])] = &[
    (
        "temperature",
        &["temperature", "temp", "hot", "cold", "warm", "cool", "température", "chaud", "froid", "temperatura", "calor", "frío"],
    ),
    (
        "rain",
        &["rain", "raining", "rainy", "precipitation", "shower", "umbrella", "pluie", "pleut", "pleuvoir", "lluvia", "llueve", "lloverá"],
    ),
    ("wind", &["wind", "windy", "breeze", "vent", "viento"]),
    ("humidity", &["humidity", "humid", "humidité", "humedad"]),
    ("snow", &["snow", "snowy", "snowing", "blizzard", "neige", "nieve"]),
];

// Lowercase key, display name. Multi-word names first.
const KNOWN_CITIES: &[(&str, &str)] = &[
    ("new york", "New York"),
    ("los angeles", "Los Angeles"),
    ("san francisco", "San Francisco"),
    ("mexico city", "Mexico City"),
    ("buenos aires", "Buenos Aires"),
    ("rio de janeiro", "Rio de Janeiro"),
    ("hong kong", "Hong Kong"),
    ("london", "London"),
    ("paris", "Paris"),
    ("tokyo", "Tokyo"),
    ("chicago", "Chicago"),
    ("miami", "Miami"),
    ("madrid", "Madrid"),
    ("barcelona", "Barcelona"),
    ("berlin", "Berlin"),
    ("rome", "Rome"),
    ("lyon", "Lyon"),
    ("marseille", "Marseille"),
    ("brussels", "Brussels"),
    ("amsterdam", "Amsterdam"),
    ("lisbon", "Lisbon"),
    ("montreal", "Montreal"),
    ("toronto", "Toronto"),
    ("sydney", "Sydney"),
    ("dubai", "Dubai"),
    ("seville", "Seville"),
    ("sevilla", "Sevilla"),
];

const PREPOSITIONS: &[&str] = &["in", "at", "for", "near", "à", "a", "en", "pour", "para", "sur"];

const NAME_CONNECTORS: &[&str] = &["de", "del", "la", "le", "sur", "upon", "on"];

const NOT_PLACES: &[&str] = &[
    "today", "tomorrow", "tonight", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "celsius", "fahrenheit", "i", "demain", "mañana", "hoy",
];

/// Deterministic intent extraction for when no language model is available
#[must_use]
pub fn rule_based(query: &str) -> Thought {
    let words = tokenize(query);
    let has = |list: &[&str]| words.iter().any(|w| list.contains(&w.as_str()));

    let is_weather_related = has(WEATHER_WORDS);
    let language = detect_language(&words).to_string();

    let query_type = if !is_weather_related {
        QueryType::Other
    } else if has(FORECAST_WORDS) {
        QueryType::Forecast
    } else {
        QueryType::Current
    };

    let date_time = detect_date_time(&words, query);
    let weather_aspect = ASPECTS
        .iter()
        .find(|entry| has(entry.1))
        .map(|entry| entry.0.to_string());
    let location = extract_location(query, &words);

    let action = default_action(is_weather_related, query_type);
    debug!(
        "Rule-based intent: weather_related={}, language={}, location={:?}, action={:?}",
        is_weather_related, language, location, action
    );

    Thought {
        is_weather_related,
        reasoning: "Rule-based analysis (language model unavailable)".to_string(),
        actions: vec![action],
        parsed: ParsedQuery {
            location,
            date_time,
            weather_aspect,
            query_type,
            confidence: RULE_BASED_CONFIDENCE,
            original_query: query.to_string(),
            language,
        },
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn detect_language(words: &[String]) -> &'static str {
    let score = |list: &[&str]| words.iter().filter(|w| list.contains(&w.as_str())).count();
    let french = score(FRENCH_WORDS);
    let spanish = score(SPANISH_WORDS);

    if french == 0 && spanish == 0 {
        "en"
    } else if french >= spanish {
        "fr"
    } else {
        "es"
    }
}

fn detect_date_time(words: &[String], query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    let has = |w: &str| words.iter().any(|x| x == w);

    if lower.contains("next week") || lower.contains("semaine prochaine") || lower.contains("próxima semana") {
        Some("next week".to_string())
    } else if has("tomorrow") || has("demain") || (has("mañana") && !lower.contains("por la mañana")) {
        Some("tomorrow".to_string())
    } else if has("tonight") {
        Some("tonight".to_string())
    } else if has("today") || has("aujourd") || has("hoy") {
        Some("today".to_string())
    } else if has("weekend") {
        Some("this weekend".to_string())
    } else {
        None
    }
}

fn extract_location(query: &str, words: &[String]) -> Option<String> {
    let joined = format!(" {} ", words.join(" "));
    if let Some((_, display)) = KNOWN_CITIES
        .iter()
        .find(|(key, _)| joined.contains(&format!(" {key} ")))
    {
        return Some((*display).to_string());
    }

    capitalized_after_preposition(query)
}

// "weather in Springfield today" -> "Springfield"
fn capitalized_after_preposition(query: &str) -> Option<String> {
    let tokens: Vec<&str> = query.split_whitespace().collect();

    for (i, token) in tokens.iter().enumerate() {
        let word = strip_punctuation(token).to_lowercase();
        if !PREPOSITIONS.contains(&word.as_str()) || ends_clause(token) {
            continue;
        }

        let mut parts: Vec<&str> = Vec::new();
        let mut j = i + 1;
        while j < tokens.len() {
            let raw = tokens[j];
            let word = strip_punctuation(raw);
            if word.is_empty() {
                break;
            }

            let capitalized = word.chars().next().is_some_and(char::is_uppercase);
            let connector = !parts.is_empty()
                && NAME_CONNECTORS.contains(&word.to_lowercase().as_str())
                && tokens
                    .get(j + 1)
                    .map(|next| strip_punctuation(next))
                    .is_some_and(|next| next.chars().next().is_some_and(char::is_uppercase));

            if !(capitalized || connector) || NOT_PLACES.contains(&word.to_lowercase().as_str()) {
                break;
            }

            parts.push(word);
            if ends_clause(raw) {
                break;
            }
            j += 1;
        }

        if !parts.is_empty() {
            return Some(parts.join(" "));
        }
    }

    None
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '\'')
        .trim_matches(['-', '\''])
}

fn ends_clause(token: &str) -> bool {
    token.ends_with([',', '.', '?', '!', ';', ':'])
}
