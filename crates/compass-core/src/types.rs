//! Domain types shared by every compass crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single resolved position reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl GeographicFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude_meters: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude_meters: f64) -> Self {
        self.altitude_meters = Some(altitude_meters);
        self
    }

    /// True if this fix was taken strictly before `other`.
    pub fn is_older_than(&self, other: &GeographicFix) -> bool {
        self.timestamp < other.timestamp
    }
}

/// Opaque token returned by a platform subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);
