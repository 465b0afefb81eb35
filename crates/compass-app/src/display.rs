//! Published display state and the text labels derived from it.

use compass_core::GeographicFix;
use compass_heading::Heading;
use compass_location::LocationAvailability;
use compass_weather::{WeatherFetchError, WeatherSnapshot};

/// Placeholder for any value that is not available.
pub const PLACEHOLDER: &str = "—";

const FEET_PER_METER: f64 = 3.28084;

/// Weather slot of the display state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WeatherStatus {
    /// No fix yet, so nothing was requested
    #[default]
    Absent,
    /// First fetch in flight
    Pending,
    Ready(WeatherSnapshot),
    Failed(WeatherFetchError),
}

/// Everything the rendering layer needs, replaced as a whole on each change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayState {
    pub heading: Heading,
    pub fix: Option<GeographicFix>,
    pub availability: LocationAvailability,
    pub weather: WeatherStatus,
}

impl DisplayState {
    /// All labels in display order.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = vec![direction_label(&self.heading)];
        match &self.fix {
            Some(fix) => {
                labels.push(location_label(fix));
                labels.push(maps_link(fix));
            }
            None => labels.push(self.availability.description().to_string()),
        }
        labels.push(weather_label(&self.weather, self.availability));
        labels
    }
}

/// `Direction: 23° (NE)`
pub fn direction_label(heading: &Heading) -> String {
    let shown = (heading.degrees.round() as u32) % 360;
    format!("Direction: {}° ({})", shown, heading.cardinal)
}

pub fn altitude_label(altitude_meters: Option<f64>) -> String {
    match altitude_meters {
        Some(meters) if meters.is_finite() => {
            format!("{} ft", (meters * FEET_PER_METER).round() as i64)
        }
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn location_label(fix: &GeographicFix) -> String {
    format!(
        "Latitude: {}\nLongitude: {}\nAltitude: {}",
        fix.latitude,
        fix.longitude,
        altitude_label(fix.altitude_meters)
    )
}

pub fn maps_link(fix: &GeographicFix) -> String {
    format!(
        "http://maps.google.com/maps?q=loc:{},{}",
        fix.latitude, fix.longitude
    )
}

fn or_placeholder(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.0}{}", v, unit),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn weather_label(status: &WeatherStatus, availability: LocationAvailability) -> String {
    match status {
        WeatherStatus::Absent if availability.needs_user_action() => {
            "Weather: needs location access".to_string()
        }
        WeatherStatus::Absent => "Weather: waiting for location".to_string(),
        WeatherStatus::Pending => "Weather: loading…".to_string(),
        WeatherStatus::Failed(e) => format!("Weather: {}", e.user_message()),
        WeatherStatus::Ready(snapshot) => {
            let humidity = snapshot
                .humidity_pct
                .map(|h| format!("{}%", h))
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            let wind = match (snapshot.wind_mph, &snapshot.wind_direction) {
                (Some(speed), Some(dir)) => format!("{:.1} mph {}", speed, dir.cardinal),
                (Some(speed), None) => format!("{:.1} mph", speed),
                (None, _) => PLACEHOLDER.to_string(),
            };
            format!(
                "{}: {}\nTemperature: {} (feels like {})\nHumidity: {}\nPressure: {}\nWind: {}",
                snapshot.city,
                snapshot.description,
                or_placeholder(snapshot.temperature_f, "°F"),
                or_placeholder(snapshot.feels_like_f, "°F"),
                humidity,
                or_placeholder(snapshot.pressure_hpa, " hPa"),
                wind,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use compass_heading::HeadingReference;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            city: "San Francisco".to_string(),
            description: "fog".to_string(),
            temperature_f: Some(58.4),
            feels_like_f: None,
            humidity_pct: None,
            pressure_hpa: Some(1013.0),
            wind_mph: Some(7.25),
            wind_direction: Some(Heading::new(270.0, HeadingReference::True)),
        }
    }

    #[test]
    fn test_direction_label() {
        let heading = Heading::new(23.0, HeadingReference::True);
        assert_eq!(direction_label(&heading), "Direction: 23° (NE)");

        // Rounds to 360 but must read as 0
        let heading = Heading::new(359.7, HeadingReference::Magnetic);
        assert_eq!(direction_label(&heading), "Direction: 0° (N)");
    }

    #[test]
    fn test_altitude_in_feet() {
        assert_eq!(altitude_label(Some(100.0)), "328 ft");
        assert_eq!(altitude_label(None), PLACEHOLDER);
        assert_eq!(altitude_label(Some(f64::NAN)), PLACEHOLDER);
    }

    #[test]
    fn test_location_label_and_link() {
        let fix = GeographicFix::new(37.7749, -122.4194, Utc::now());
        assert_eq!(
            location_label(&fix),
            "Latitude: 37.7749\nLongitude: -122.4194\nAltitude: —"
        );
        assert_eq!(
            maps_link(&fix),
            "http://maps.google.com/maps?q=loc:37.7749,-122.4194"
        );
    }

    #[test]
    fn test_weather_label_placeholders() {
        let label = weather_label(
            &WeatherStatus::Ready(snapshot()),
            LocationAvailability::Available,
        );
        assert!(label.starts_with("San Francisco: fog"));
        assert!(label.contains("Temperature: 58°F (feels like —)"));
        assert!(label.contains("Humidity: —"));
        assert!(label.contains("Pressure: 1013 hPa"));
        assert!(label.contains("Wind: 7.2 mph W") || label.contains("Wind: 7.3 mph W"));
    }

    #[test]
    fn test_weather_label_failure() {
        let label = weather_label(
            &WeatherStatus::Failed(WeatherFetchError::Http(503)),
            LocationAvailability::Available,
        );
        assert!(label.contains("503"));
    }

    #[test]
    fn test_labels_without_fix_show_availability() {
        let state = DisplayState {
            availability: LocationAvailability::PermissionDenied,
            ..DisplayState::default()
        };
        let labels = state.labels();
        assert_eq!(labels[0], "Direction: 0° (N)");
        assert_eq!(labels[1], "Location permission denied");
        assert_eq!(labels[2], "Weather: needs location access");
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_absent_weather_waits_while_acquiring() {
        let label = weather_label(&WeatherStatus::Absent, LocationAvailability::Acquiring);
        assert_eq!(label, "Weather: waiting for location");
        let label = weather_label(&WeatherStatus::Absent, LocationAvailability::ProviderDisabled);
        assert_eq!(label, "Weather: needs location access");
    }
}
