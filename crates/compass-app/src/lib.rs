//! Compass application core.
//!
//! The [`Orchestrator`] owns the display state and is its only writer. Every
//! platform callback and async completion is turned into an [`AppEvent`] and
//! processed one at a time on the orchestrator's channel.

pub mod display;
pub mod events;
pub mod orchestrator;
pub mod simulator;

pub use display::{DisplayState, WeatherStatus};
pub use events::AppEvent;
pub use orchestrator::{fusion_from_config, Orchestrator, OrchestratorHandle};
pub use simulator::SimulatedPlatform;
