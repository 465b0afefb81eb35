use compass_core::LocationConfig;
use serde::{Deserialize, Serialize};

/// What the user-facing layer needs to know about location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationAvailability {
    PermissionDenied,
    ProviderDisabled,
    #[default]
    Acquiring,
    Available,
}

impl LocationAvailability {
    pub fn description(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Location permission denied",
            Self::ProviderDisabled => "Location provider disabled",
            Self::Acquiring => "Acquiring location",
            Self::Available => "Location available",
        }
    }

    /// True if the user has to change something before a fix can arrive.
    pub fn needs_user_action(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::ProviderDisabled)
    }
}

/// Internal states of the acquisition state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    #[default]
    Unrequested,
    /// Waiting on the permission self-check or the OS prompt
    PermissionPending,
    PermissionDenied,
    /// Waiting on the provider-enabled check
    ProviderCheck,
    /// Provider off; settings screen launched, waiting for the user to return
    ProviderDisabled,
    Subscribed,
}

/// Parameters for a location stream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
    pub high_accuracy: bool,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            fastest_interval_ms: 5_000,
            high_accuracy: true,
        }
    }
}

impl From<&LocationConfig> for LocationRequest {
    fn from(config: &LocationConfig) -> Self {
        Self {
            interval_ms: config.update_interval_ms,
            fastest_interval_ms: config.fastest_interval_ms.min(config.update_interval_ms),
            high_accuracy: config.high_accuracy,
        }
    }
}
