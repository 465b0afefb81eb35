use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when no API key is configured.
pub const WEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather API settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location subscription settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Heading computation settings
    #[serde(default)]
    pub heading: HeadingConfig,

    /// Simulated platform used by the desktop binary
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the current-conditions API
    pub base_url: String,

    /// API key (optional, can be set via environment)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WeatherConfig {
    /// Configured key, falling back to `OPENWEATHER_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(WEATHER_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Target interval between fixes
    pub update_interval_ms: u64,

    /// Fastest interval the app accepts fixes at
    pub fastest_interval_ms: u64,

    /// Prefer GPS-grade accuracy over battery
    pub high_accuracy: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 10_000,
            fastest_interval_ms: 5_000,
            high_accuracy: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadingConfig {
    /// Screen rotation relative to the device's natural orientation (0, 90, 180, 270)
    #[serde(default)]
    pub display_rotation_deg: u16,

    /// Fixed declination used instead of the geomagnetic model
    #[serde(default)]
    pub declination_override_deg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_m: Option<f64>,

    /// How fast the simulated device spins, degrees per second
    pub rotation_deg_per_sec: f64,

    /// Interval between simulated orientation samples
    pub sample_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latitude: 37.7749,
            longitude: -122.4194,
            altitude_m: None,
            rotation_deg_per_sec: 15.0,
            sample_interval_ms: 200,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("compass");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
            heading: HeadingConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating a default file if missing
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 60 {
            result.add_warning(
                "weather.timeout_secs",
                "Weather timeout is unusually long (>60s)",
            );
        }

        if self.weather.resolved_api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!(
                    "No API key configured (set weather.api_key or {})",
                    WEATHER_API_KEY_ENV
                ),
            );
        }

        if self.location.update_interval_ms == 0 {
            result.add_error(
                "location.update_interval_ms",
                "Update interval must be greater than 0",
            );
        }
        if self.location.fastest_interval_ms > self.location.update_interval_ms {
            result.add_error(
                "location.fastest_interval_ms",
                "Fastest interval cannot exceed the update interval",
            );
        }

        if !matches!(self.heading.display_rotation_deg, 0 | 90 | 180 | 270) {
            result.add_error(
                "heading.display_rotation_deg",
                format!(
                    "Display rotation must be 0, 90, 180 or 270, got {}",
                    self.heading.display_rotation_deg
                ),
            );
        }

        if let Some(declination) = self.heading.declination_override_deg {
            if !declination.is_finite() || declination.abs() > 180.0 {
                result.add_error(
                    "heading.declination_override_deg",
                    "Declination override must be within [-180, 180]",
                );
            }
        }

        if !(-90.0..=90.0).contains(&self.simulation.latitude) {
            result.add_error("simulation.latitude", "Latitude must be within [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&self.simulation.longitude) {
            result.add_error(
                "simulation.longitude",
                "Longitude must be within [-180, 180]",
            );
        }
        if self.simulation.sample_interval_ms == 0 {
            result.add_error(
                "simulation.sample_interval_ms",
                "Sample interval must be greater than 0",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        std::fs::write(config_path, contents)?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join("compass");

        Ok(config_dir.join("config.toml"))
    }
}
