//! Location acquisition state machine.
//!
//! `Unrequested -> PermissionPending -> {PermissionDenied | ProviderCheck}`,
//! `ProviderCheck -> {ProviderDisabled | Subscribed}`. The controller never
//! performs I/O: every call to [`LocationController::handle`] returns the
//! commands the caller must execute, and results come back as events.

use compass_core::{GeographicFix, LocationError};

use crate::types::{AcquisitionState, LocationAvailability, LocationRequest};

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// App entered the foreground (or the user asked to retry)
    Start,
    /// Result of the silent permission self-check
    PermissionChecked(bool),
    /// Result of the OS permission prompt
    PermissionResolved(bool),
    /// Result of the provider-enabled check
    ProviderChecked(bool),
    /// Control returned from the provider settings screen
    SettingsReturned,
    FixReceived(GeographicFix),
    /// App left the foreground
    Stop,
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerCommand {
    CheckPermission,
    RequestPermission,
    CheckProvider,
    LaunchProviderSettings,
    Subscribe(LocationRequest),
    Unsubscribe,
    NotifyUser(LocationError),
    PublishFix(GeographicFix),
    AvailabilityChanged(LocationAvailability),
}

#[derive(Debug, Clone)]
pub struct LocationController {
    state: AcquisitionState,
    availability: LocationAvailability,
    request: LocationRequest,
    /// Freshness watermark; survives stop/start
    last_fix: Option<GeographicFix>,
}

impl LocationController {
    pub fn new(request: LocationRequest) -> Self {
        Self {
            state: AcquisitionState::Unrequested,
            availability: LocationAvailability::Acquiring,
            request,
            last_fix: None,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn availability(&self) -> LocationAvailability {
        self.availability
    }

    pub fn last_fix(&self) -> Option<&GeographicFix> {
        self.last_fix.as_ref()
    }

    /// Apply one event and return the commands to execute, in order.
    pub fn handle(&mut self, event: ControllerEvent) -> Vec<ControllerCommand> {
        let mut commands = Vec::new();

        match (self.state, event) {
            (
                AcquisitionState::Unrequested
                | AcquisitionState::PermissionDenied
                | AcquisitionState::ProviderDisabled,
                ControllerEvent::Start,
            ) => {
                tracing::info!("Starting location acquisition");
                self.state = AcquisitionState::PermissionPending;
                self.set_availability(LocationAvailability::Acquiring, &mut commands);
                commands.push(ControllerCommand::CheckPermission);
            }

            (AcquisitionState::PermissionPending, ControllerEvent::PermissionChecked(true))
            | (AcquisitionState::PermissionPending, ControllerEvent::PermissionResolved(true)) => {
                tracing::info!("Location permission granted");
                self.enter_provider_check(&mut commands);
            }

            (AcquisitionState::PermissionPending, ControllerEvent::PermissionChecked(false)) => {
                tracing::debug!("Location permission not yet granted, prompting");
                commands.push(ControllerCommand::RequestPermission);
            }

            (AcquisitionState::PermissionPending, ControllerEvent::PermissionResolved(false)) => {
                tracing::warn!("Location permission denied");
                self.state = AcquisitionState::PermissionDenied;
                self.set_availability(LocationAvailability::PermissionDenied, &mut commands);
                commands.push(ControllerCommand::NotifyUser(LocationError::PermissionDenied));
            }

            (AcquisitionState::ProviderCheck, ControllerEvent::ProviderChecked(true)) => {
                tracing::info!(
                    interval_ms = self.request.interval_ms,
                    fastest_interval_ms = self.request.fastest_interval_ms,
                    high_accuracy = self.request.high_accuracy,
                    "Subscribing to location updates"
                );
                self.state = AcquisitionState::Subscribed;
                self.set_availability(LocationAvailability::Acquiring, &mut commands);
                commands.push(ControllerCommand::Subscribe(self.request));
            }

            (AcquisitionState::ProviderCheck, ControllerEvent::ProviderChecked(false)) => {
                tracing::warn!("Location provider disabled, opening settings");
                self.state = AcquisitionState::ProviderDisabled;
                self.set_availability(LocationAvailability::ProviderDisabled, &mut commands);
                commands.push(ControllerCommand::NotifyUser(LocationError::ProviderDisabled));
                commands.push(ControllerCommand::LaunchProviderSettings);
            }

            (AcquisitionState::ProviderDisabled, ControllerEvent::SettingsReturned) => {
                tracing::debug!("Returned from provider settings, re-checking");
                self.enter_provider_check(&mut commands);
            }

            (AcquisitionState::Subscribed, ControllerEvent::FixReceived(fix)) => {
                self.accept_fix(fix, &mut commands);
            }

            (state, ControllerEvent::Stop) => {
                if state == AcquisitionState::Subscribed {
                    commands.push(ControllerCommand::Unsubscribe);
                }
                if state != AcquisitionState::Unrequested {
                    tracing::info!(?state, "Stopping location acquisition");
                }
                self.state = AcquisitionState::Unrequested;
            }

            (state, event) => {
                tracing::debug!(?state, ?event, "Ignoring event in current state");
            }
        }

        commands
    }

    fn enter_provider_check(&mut self, commands: &mut Vec<ControllerCommand>) {
        self.state = AcquisitionState::ProviderCheck;
        commands.push(ControllerCommand::CheckProvider);
    }

    fn accept_fix(&mut self, fix: GeographicFix, commands: &mut Vec<ControllerCommand>) {
        if !is_plausible(&fix) {
            tracing::warn!(
                latitude = fix.latitude,
                longitude = fix.longitude,
                "Dropping implausible location fix"
            );
            return;
        }

        if let Some(last) = &self.last_fix {
            if fix.is_older_than(last) {
                tracing::debug!(
                    fix_time = %fix.timestamp,
                    last_time = %last.timestamp,
                    "Dropping out-of-order location fix"
                );
                return;
            }
        }

        self.last_fix = Some(fix);
        self.set_availability(LocationAvailability::Available, commands);
        commands.push(ControllerCommand::PublishFix(fix));
    }

    fn set_availability(
        &mut self,
        availability: LocationAvailability,
        commands: &mut Vec<ControllerCommand>,
    ) {
        if self.availability != availability {
            self.availability = availability;
            commands.push(ControllerCommand::AvailabilityChanged(availability));
        }
    }
}

fn is_plausible(fix: &GeographicFix) -> bool {
    fix.latitude.is_finite()
        && fix.longitude.is_finite()
        && (-90.0..=90.0).contains(&fix.latitude)
        && (-180.0..=180.0).contains(&fix.longitude)
        && fix.altitude_meters.map_or(true, f64::is_finite)
}
