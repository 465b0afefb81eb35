use compass_heading::{Heading, HeadingReference};
use serde::{Deserialize, Serialize};

use crate::error::WeatherFetchError;

/// Shown when the response carries no city name.
pub const UNKNOWN_CITY: &str = "Unknown location";

/// Shown when the response carries no condition description.
pub const UNKNOWN_CONDITION: &str = "No description";

/// Current conditions at a fix. Replaced wholesale on every fetch.
///
/// Every numeric field is optional; a missing field in the response is
/// `None` here, never a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub description: String,
    pub temperature_f: Option<f64>,
    pub feels_like_f: Option<f64>,
    pub humidity_pct: Option<u8>,
    pub pressure_hpa: Option<f64>,
    pub wind_mph: Option<f64>,
    /// Direction the wind blows from, relative to true north
    pub wind_direction: Option<Heading>,
}

// OpenWeatherMap current-conditions response; every field optional.

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    name: Option<String>,
    weather: Option<Vec<ConditionEntry>>,
    main: Option<MainBlock>,
    wind: Option<WindBlock>,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: Option<f64>,
    deg: Option<f64>,
}

impl From<CurrentWeatherResponse> for WeatherSnapshot {
    fn from(resp: CurrentWeatherResponse) -> Self {
        let city = resp
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_CITY.to_string());

        let description = resp
            .weather
            .and_then(|entries| entries.into_iter().next())
            .and_then(|entry| entry.description)
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_CONDITION.to_string());

        let (temperature_f, feels_like_f, humidity_pct, pressure_hpa) = match resp.main {
            Some(main) => (
                main.temp,
                main.feels_like,
                main.humidity.and_then(humidity_percent),
                main.pressure,
            ),
            None => (None, None, None, None),
        };

        let (wind_mph, wind_direction) = match resp.wind {
            Some(wind) => (
                wind.speed,
                wind.deg.map(|deg| Heading::new(deg, HeadingReference::True)),
            ),
            None => (None, None),
        };

        Self {
            city,
            description,
            temperature_f,
            feels_like_f,
            humidity_pct,
            pressure_hpa,
            wind_mph,
            wind_direction,
        }
    }
}

fn humidity_percent(value: f64) -> Option<u8> {
    if (0.0..=100.0).contains(&value) {
        Some(value.round() as u8)
    } else {
        None
    }
}

/// Parse the body of a 2xx current-conditions response.
///
/// A `cod` field that is present and not 200 (number or numeric string) is an
/// [`WeatherFetchError::Api`] carrying the body's `message`. Anything that is
/// not a JSON object, or has a field of the wrong type, is a
/// [`WeatherFetchError::Parse`].
pub fn parse_current_weather(body: &str) -> Result<WeatherSnapshot, WeatherFetchError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| WeatherFetchError::Parse(format!("invalid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| WeatherFetchError::Parse("expected a JSON object".to_string()))?;

    if let Some(cod) = object.get("cod") {
        if !is_success_code(cod) {
            let message = object
                .get("message")
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("status code {}", cod));
            return Err(WeatherFetchError::Api(message));
        }
    }

    let response: CurrentWeatherResponse = serde_json::from_value(value)
        .map_err(|e| WeatherFetchError::Parse(e.to_string()))?;

    Ok(response.into())
}

fn is_success_code(cod: &serde_json::Value) -> bool {
    match cod {
        serde_json::Value::Number(n) => n.as_f64() == Some(200.0),
        serde_json::Value::String(s) => s.trim() == "200",
        serde_json::Value::Null => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_heading::Cardinal;

    const FULL_BODY: &str = r#"{
        "cod": 200,
        "name": "San Francisco",
        "weather": [{"id": 801, "main": "Clouds", "description": "few clouds"}],
        "main": {"temp": 61.3, "feels_like": 60.1, "humidity": 72, "pressure": 1015},
        "wind": {"speed": 9.2, "deg": 290}
    }"#;

    #[test]
    fn test_parse_full_body() {
        let snapshot = parse_current_weather(FULL_BODY).unwrap();
        assert_eq!(snapshot.city, "San Francisco");
        assert_eq!(snapshot.description, "few clouds");
        assert_eq!(snapshot.temperature_f, Some(61.3));
        assert_eq!(snapshot.feels_like_f, Some(60.1));
        assert_eq!(snapshot.humidity_pct, Some(72));
        assert_eq!(snapshot.pressure_hpa, Some(1015.0));
        assert_eq!(snapshot.wind_mph, Some(9.2));

        let wind = snapshot.wind_direction.unwrap();
        assert_eq!(wind.cardinal, Cardinal::W);
        assert!(wind.is_true_north());
    }

    #[test]
    fn test_missing_fields_become_placeholders() {
        let snapshot = parse_current_weather(r#"{"cod": 200}"#).unwrap();
        assert_eq!(snapshot.city, UNKNOWN_CITY);
        assert_eq!(snapshot.description, UNKNOWN_CONDITION);
        assert_eq!(snapshot.temperature_f, None);
        assert_eq!(snapshot.feels_like_f, None);
        assert_eq!(snapshot.humidity_pct, None);
        assert_eq!(snapshot.pressure_hpa, None);
        assert_eq!(snapshot.wind_mph, None);
        assert_eq!(snapshot.wind_direction, None);
    }

    #[test]
    fn test_missing_humidity_only() {
        let body = r#"{"name": "Oslo", "main": {"temp": 30.0, "pressure": 1000}}"#;
        let snapshot = parse_current_weather(body).unwrap();
        assert_eq!(snapshot.humidity_pct, None);
        assert_eq!(snapshot.temperature_f, Some(30.0));
    }

    #[test]
    fn test_empty_condition_list_uses_placeholder() {
        let snapshot = parse_current_weather(r#"{"weather": []}"#).unwrap();
        assert_eq!(snapshot.description, UNKNOWN_CONDITION);
    }

    #[test]
    fn test_cod_as_string_success() {
        let snapshot = parse_current_weather(r#"{"cod": "200", "name": "Lima"}"#).unwrap();
        assert_eq!(snapshot.city, "Lima");
    }

    #[test]
    fn test_cod_failure_is_api_error() {
        let err =
            parse_current_weather(r#"{"cod": "404", "message": "city not found"}"#).unwrap_err();
        assert_eq!(err, WeatherFetchError::Api("city not found".to_string()));

        let err = parse_current_weather(r#"{"cod": 401}"#).unwrap_err();
        assert_eq!(err, WeatherFetchError::Api("status code 401".to_string()));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            parse_current_weather("<html>"),
            Err(WeatherFetchError::Parse(_))
        ));
        assert!(matches!(
            parse_current_weather("[1, 2]"),
            Err(WeatherFetchError::Parse(_))
        ));
    }

    #[test]
    fn test_wrong_field_type_is_parse_error() {
        let body = r#"{"main": {"temp": "warm"}}"#;
        assert!(matches!(
            parse_current_weather(body),
            Err(WeatherFetchError::Parse(_))
        ));
    }

    #[test]
    fn test_out_of_range_humidity_is_unavailable() {
        let snapshot = parse_current_weather(r#"{"main": {"humidity": -1}}"#).unwrap();
        assert_eq!(snapshot.humidity_pct, None);
    }
}
