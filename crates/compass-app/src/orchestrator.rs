//! The application event loop.
//!
//! ```text
//!  platform callbacks ──┐
//!  spawned async work ──┼──► mpsc<AppEvent> ──► Orchestrator ──► watch<DisplayState>
//!  OrchestratorHandle ──┘                          │
//!                                                  ├─ HeadingFusion
//!                                                  ├─ LocationController
//!                                                  └─ WeatherSource (spawned)
//! ```
//!
//! Staleness is handled with two counters. `generation` is bumped on every
//! trip to the background and stamped on everything that can complete later;
//! `weather_seq` is bumped on every weather trigger so only the newest fetch
//! may land.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use compass_core::{GeographicFix, HeadingConfig, SubscriptionHandle};
use compass_heading::{
    DeclinationModel, DisplayRotation, FixedDeclination, HeadingFusion, OrientationSource,
    WorldMagneticModel,
};
use compass_location::{
    ControllerCommand, ControllerEvent, LocationController, LocationPlatform, LocationRequest,
};
use compass_weather::WeatherSource;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::display::{DisplayState, WeatherStatus};
use crate::events::AppEvent;

/// Build the heading pipeline described by the `[heading]` config section.
pub fn fusion_from_config(config: &HeadingConfig) -> HeadingFusion {
    let model: Arc<dyn DeclinationModel> = match config.declination_override_deg {
        Some(degrees) => {
            info!(degrees, "Using fixed magnetic declination");
            Arc::new(FixedDeclination(degrees))
        }
        None => Arc::new(WorldMagneticModel::new()),
    };

    let rotation = DisplayRotation::from_degrees(config.display_rotation_deg).unwrap_or_else(|| {
        warn!(
            degrees = config.display_rotation_deg,
            "Unsupported display rotation, using 0"
        );
        DisplayRotation::Rotation0
    });

    HeadingFusion::new(model, rotation)
}

/// Send into the orchestrator's queue. Returns false once it has stopped.
fn deliver(events: &mpsc::UnboundedSender<AppEvent>, event: AppEvent) -> bool {
    match events.send(event) {
        Ok(()) => true,
        Err(mpsc::error::SendError(event)) => {
            debug!(?event, "Orchestrator stopped, dropping event");
            false
        }
    }
}

/// Cloneable handle for feeding lifecycle events and observing state.
#[derive(Clone)]
pub struct OrchestratorHandle {
    events: mpsc::UnboundedSender<AppEvent>,
    state: watch::Receiver<DisplayState>,
}

impl OrchestratorHandle {
    pub fn send(&self, event: AppEvent) {
        deliver(&self.events, event);
    }

    pub fn foreground(&self) {
        self.send(AppEvent::Foreground);
    }

    pub fn background(&self) {
        self.send(AppEvent::Background);
    }

    /// Receiver that observes every published display state.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.clone()
    }

    pub fn current(&self) -> DisplayState {
        self.state.borrow().clone()
    }
}

pub struct Orchestrator<P, W> {
    platform: Arc<P>,
    weather: Arc<W>,
    fusion: HeadingFusion,
    controller: LocationController,

    state: DisplayState,
    state_tx: watch::Sender<DisplayState>,

    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,

    active: bool,
    generation: u64,
    weather_seq: u64,
    location_sub: Option<SubscriptionHandle>,
    orientation_sub: Option<SubscriptionHandle>,
}

impl<P, W> Orchestrator<P, W>
where
    P: LocationPlatform + OrientationSource,
    W: WeatherSource,
{
    pub fn new(
        platform: Arc<P>,
        weather: Arc<W>,
        fusion: HeadingFusion,
        request: LocationRequest,
    ) -> (Self, OrchestratorHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(DisplayState::default());

        let handle = OrchestratorHandle {
            events: events_tx.clone(),
            state: state_rx,
        };

        let orchestrator = Self {
            platform,
            weather,
            fusion,
            controller: LocationController::new(request),
            state: DisplayState::default(),
            state_tx,
            events_tx,
            events_rx,
            active: false,
            generation: 0,
            weather_seq: 0,
            location_sub: None,
            orientation_sub: None,
        };

        (orchestrator, handle)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Process events until `shutdown` fires, then release every subscription.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Orchestrator started");
        loop {
            let event = tokio::select! {
                biased;

                _ = shutdown.cancelled() => None,

                event = self.events_rx.recv() => event,
            };

            match event {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
        info!("Orchestrator shutting down");
        self.enter_background();
        self.publish();
        info!("Orchestrator stopped");
    }

    /// Wait for the next event and process it.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply one event and publish the resulting state if it changed.
    pub fn handle_event(&mut self, event: AppEvent) {
        if let Some(generation) = event.generation() {
            if generation != self.generation {
                debug!(
                    event_generation = generation,
                    current_generation = self.generation,
                    "Dropping event from a previous session"
                );
                return;
            }
        }

        match event {
            AppEvent::Foreground => self.enter_foreground(),
            AppEvent::Background => self.enter_background(),
            AppEvent::RotationChanged(rotation) => {
                debug!(?rotation, "Display rotation changed");
                self.fusion.set_rotation(rotation);
            }
            AppEvent::Orientation { sample, .. } => {
                self.state.heading =
                    self.fusion
                        .update(&sample, self.state.fix.as_ref(), Utc::now());
            }
            AppEvent::PermissionResolved { granted, .. } => {
                self.dispatch(ControllerEvent::PermissionResolved(granted));
            }
            AppEvent::SettingsReturned { .. } => {
                self.dispatch(ControllerEvent::SettingsReturned);
            }
            AppEvent::LocationFix { fix, .. } => {
                self.dispatch(ControllerEvent::FixReceived(fix));
            }
            AppEvent::WeatherFetched { seq, result, .. } => {
                if seq != self.weather_seq {
                    debug!(seq, latest = self.weather_seq, "Dropping superseded weather result");
                } else {
                    self.state.weather = match result {
                        Ok(snapshot) => WeatherStatus::Ready(snapshot),
                        Err(e) => WeatherStatus::Failed(e),
                    };
                }
            }
        }

        self.publish();
    }

    fn publish(&self) {
        let next = &self.state;
        self.state_tx.send_if_modified(|current| {
            if current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }

    fn enter_foreground(&mut self) {
        if self.active {
            debug!("Already in foreground");
            return;
        }
        info!(generation = self.generation, "Entering foreground");
        self.active = true;

        let events = self.events_tx.clone();
        let generation = self.generation;
        let handle = self
            .platform
            .subscribe_orientation(Box::new(move |sample| {
                deliver(&events, AppEvent::Orientation { generation, sample });
            }));
        self.orientation_sub = Some(handle);

        self.dispatch(ControllerEvent::Start);
    }

    fn enter_background(&mut self) {
        if !self.active {
            return;
        }
        info!(generation = self.generation, "Entering background");
        self.active = false;
        self.generation += 1;

        if let Some(handle) = self.orientation_sub.take() {
            self.platform.unsubscribe_orientation(handle);
        }
        self.dispatch(ControllerEvent::Stop);

        // The outstanding fetch now belongs to a retired generation
        if self.state.weather == WeatherStatus::Pending {
            self.state.weather = WeatherStatus::Absent;
        }
    }

    /// Run controller commands to quiescence. Synchronous checks feed their
    /// answer straight back; anything that waits on the user is spawned and
    /// returns through the event channel.
    fn dispatch(&mut self, event: ControllerEvent) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            for command in self.controller.handle(event) {
                if let Some(next) = self.execute(command) {
                    pending.push_back(next);
                }
            }
        }
    }

    fn execute(&mut self, command: ControllerCommand) -> Option<ControllerEvent> {
        match command {
            ControllerCommand::CheckPermission => Some(ControllerEvent::PermissionChecked(
                self.platform.has_location_permission(),
            )),
            ControllerCommand::RequestPermission => {
                let platform = Arc::clone(&self.platform);
                let events = self.events_tx.clone();
                let generation = self.generation;
                tokio::spawn(async move {
                    let granted = platform.request_location_permission().await;
                    deliver(&events, AppEvent::PermissionResolved { generation, granted });
                });
                None
            }
            ControllerCommand::CheckProvider => Some(ControllerEvent::ProviderChecked(
                self.platform.is_location_provider_enabled(),
            )),
            ControllerCommand::LaunchProviderSettings => {
                let platform = Arc::clone(&self.platform);
                let events = self.events_tx.clone();
                let generation = self.generation;
                tokio::spawn(async move {
                    platform.launch_provider_settings().await;
                    deliver(&events, AppEvent::SettingsReturned { generation });
                });
                None
            }
            ControllerCommand::Subscribe(request) => {
                let events = self.events_tx.clone();
                let generation = self.generation;
                let handle = self.platform.subscribe_location(
                    request,
                    Box::new(move |fix| {
                        deliver(&events, AppEvent::LocationFix { generation, fix });
                    }),
                );
                self.location_sub = Some(handle);
                None
            }
            ControllerCommand::Unsubscribe => {
                if let Some(handle) = self.location_sub.take() {
                    self.platform.unsubscribe_location(handle);
                }
                None
            }
            ControllerCommand::NotifyUser(error) => {
                warn!(%error, "Notifying user");
                self.platform.notify_user(error.user_message());
                None
            }
            ControllerCommand::PublishFix(fix) => {
                self.state.fix = Some(fix);
                self.trigger_weather(fix);
                None
            }
            ControllerCommand::AvailabilityChanged(availability) => {
                info!(?availability, "Location availability changed");
                self.state.availability = availability;
                None
            }
        }
    }

    /// One fetch per accepted fix. Earlier fetches still run but lose the race.
    fn trigger_weather(&mut self, fix: GeographicFix) {
        self.weather_seq += 1;
        let seq = self.weather_seq;
        let generation = self.generation;

        if self.state.weather == WeatherStatus::Absent {
            self.state.weather = WeatherStatus::Pending;
        }

        debug!(seq, "Triggering weather fetch");
        let weather = Arc::clone(&self.weather);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = weather.fetch_weather(&fix).await;
            deliver(
                &events,
                AppEvent::WeatherFetched {
                    generation,
                    seq,
                    result,
                },
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_reports_closed_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(deliver(&tx, AppEvent::Foreground));
        drop(rx);
        assert!(!deliver(&tx, AppEvent::SettingsReturned { generation: 3 }));
    }

    #[test]
    fn test_fusion_from_config_defaults() {
        let fusion = fusion_from_config(&HeadingConfig::default());
        assert_eq!(fusion.current().degrees, 0.0);
    }

    #[test]
    fn test_fusion_from_config_with_override() {
        use compass_heading::OrientationSample;

        let config = HeadingConfig {
            display_rotation_deg: 45,
            declination_override_deg: Some(13.0),
        };
        let mut fusion = fusion_from_config(&config);
        let identity = OrientationSample::rotation_vector(0.0, 0.0, 0.0, None);
        let fix = GeographicFix::new(0.0, 0.0, Utc::now());
        let heading = fusion.update(&identity, Some(&fix), Utc::now());
        assert!((heading.degrees - 13.0).abs() < 1e-6);
    }
}
