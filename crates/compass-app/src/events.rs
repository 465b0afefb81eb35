use compass_core::GeographicFix;
use compass_heading::{DisplayRotation, OrientationSample};
use compass_weather::{WeatherFetchError, WeatherSnapshot};

/// Everything the orchestrator reacts to.
///
/// Events produced by callbacks or spawned work carry the generation that was
/// current when they were set up; the orchestrator drops any whose generation
/// has since been retired by a trip to the background.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// App became visible: subscribe sensors and start location acquisition
    Foreground,
    /// App left the screen: unsubscribe everything
    Background,
    /// Display rotation of the host changed
    RotationChanged(DisplayRotation),
    Orientation {
        generation: u64,
        sample: OrientationSample,
    },
    PermissionResolved {
        generation: u64,
        granted: bool,
    },
    SettingsReturned {
        generation: u64,
    },
    LocationFix {
        generation: u64,
        fix: GeographicFix,
    },
    WeatherFetched {
        generation: u64,
        /// Weather trigger this result answers
        seq: u64,
        result: Result<WeatherSnapshot, WeatherFetchError>,
    },
}

impl AppEvent {
    /// Generation stamped on the event, if it came from async work.
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Foreground | Self::Background | Self::RotationChanged(_) => None,
            Self::Orientation { generation, .. }
            | Self::PermissionResolved { generation, .. }
            | Self::SettingsReturned { generation }
            | Self::LocationFix { generation, .. }
            | Self::WeatherFetched { generation, .. } => Some(*generation),
        }
    }
}
