//! Current-conditions weather for the compass.
//!
//! One HTTP GET per geographic fix against an OpenWeatherMap-compatible
//! endpoint. No polling, caching or retry; the next fix is the retry.

pub mod client;
pub mod error;
pub mod types;

pub use client::{WeatherClient, WeatherSource};
pub use error::WeatherFetchError;
pub use types::{parse_current_weather, WeatherSnapshot};
