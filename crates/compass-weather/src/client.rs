//! OpenWeatherMap current-conditions client.

use std::future::Future;
use std::time::Duration;

use compass_core::{GeographicFix, WeatherConfig};
use tracing::instrument;

use crate::error::WeatherFetchError;
use crate::types::{parse_current_weather, WeatherSnapshot};

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// Fahrenheit, mph, hPa
const UNITS: &str = "imperial";

/// Anything that can turn a fix into current conditions.
pub trait WeatherSource: Send + Sync + 'static {
    fn fetch_weather(
        &self,
        fix: &GeographicFix,
    ) -> impl Future<Output = Result<WeatherSnapshot, WeatherFetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherFetchError> {
        Self::with_timeout(
            &config.base_url,
            config.resolved_api_key(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_timeout(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherFetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherFetchError::Network(format!("failed to build HTTP client: {}", e)))?;

        if api_key.is_none() {
            tracing::warn!("No weather API key configured; requests will likely be rejected");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch current conditions at `fix`. One request per call, no retry.
    #[instrument(
        skip(self, fix),
        fields(lat = fix.latitude, lon = fix.longitude),
        level = "info"
    )]
    pub async fn fetch_weather(
        &self,
        fix: &GeographicFix,
    ) -> Result<WeatherSnapshot, WeatherFetchError> {
        let result = self.request(fix).await;
        match &result {
            Ok(snapshot) => tracing::info!(city = %snapshot.city, "Weather fetched"),
            Err(e) => tracing::error!(error = %e, "Weather fetch failed"),
        }
        result
    }

    async fn request(&self, fix: &GeographicFix) -> Result<WeatherSnapshot, WeatherFetchError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);

        let mut query = vec![
            ("lat", fix.latitude.to_string()),
            ("lon", fix.longitude.to_string()),
            ("units", UNITS.to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("appid", key.clone()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| WeatherFetchError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherFetchError::Http(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherFetchError::from_transport(&e))?;

        parse_current_weather(&body)
    }
}

impl WeatherSource for WeatherClient {
    async fn fetch_weather(
        &self,
        fix: &GeographicFix,
    ) -> Result<WeatherSnapshot, WeatherFetchError> {
        WeatherClient::fetch_weather(self, fix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fix() -> GeographicFix {
        GeographicFix::new(37.7749, -122.4194, Utc::now())
    }

    #[tokio::test]
    async fn test_request_carries_position_units_and_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "37.7749"))
            .and(query_param("lon", "-122.4194"))
            .and(query_param("units", "imperial"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cod": 200,
                "name": "San Francisco"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = WeatherClient::with_timeout(
            &mock_server.uri(),
            Some("test_key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let snapshot = client.fetch_weather(&fix()).await.unwrap();
        assert_eq!(snapshot.city, "San Francisco");
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let base = format!("{}/", mock_server.uri());
        let client = WeatherClient::with_timeout(&base, None, Duration::from_secs(5)).unwrap();
        assert!(client.fetch_weather(&fix()).await.is_ok());
    }

    #[tokio::test]
    async fn test_new_uses_config() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("appid", "from_config"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"Paris"}"#))
            .mount(&mock_server)
            .await;

        let config = WeatherConfig {
            base_url: mock_server.uri(),
            api_key: Some("from_config".to_string()),
            ..WeatherConfig::default()
        };
        let client = WeatherClient::new(&config).unwrap();
        let snapshot = client.fetch_weather(&fix()).await.unwrap();
        assert_eq!(snapshot.city, "Paris");
    }
}
