//! Location acquisition for the compass.
//!
//! Coordinates permission, provider status and the location subscription as
//! a pure state machine; the platform layer performs the side effects.

pub mod controller;
pub mod platform;
pub mod types;

pub use controller::{ControllerCommand, ControllerEvent, LocationController};
pub use platform::{FixCallback, LocationPlatform};
pub use types::{AcquisitionState, LocationAvailability, LocationRequest};
