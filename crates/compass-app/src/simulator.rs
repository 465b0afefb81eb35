//! A stand-in platform for running the compass without device hardware.
//!
//! The device sits still at the configured position and turns at a constant
//! rate. Permission is not granted until the first prompt, like a fresh
//! install, and the provider is always enabled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use compass_core::{GeographicFix, SimulationConfig, SubscriptionHandle};
use compass_heading::{OrientationSample, OrientationSource, SampleCallback};
use compass_location::{FixCallback, LocationPlatform, LocationRequest};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SimulatedPlatform {
    config: SimulationConfig,
    permission_granted: AtomicBool,
    next_handle: AtomicU64,
    streams: Mutex<HashMap<SubscriptionHandle, CancellationToken>>,
}

impl SimulatedPlatform {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            permission_granted: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live sensor and location streams.
    pub fn active_streams(&self) -> usize {
        self.streams.lock().len()
    }

    fn register(&self) -> (SubscriptionHandle, CancellationToken) {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        self.streams.lock().insert(handle, token.clone());
        (handle, token)
    }

    fn cancel(&self, handle: SubscriptionHandle) {
        match self.streams.lock().remove(&handle) {
            Some(token) => token.cancel(),
            None => debug!(?handle, "Unknown subscription handle"),
        }
    }
}

/// Flat device whose top points `degrees` clockwise from magnetic north.
pub(crate) fn flat_sample(degrees: f64) -> OrientationSample {
    let half = (-degrees).to_radians() / 2.0;
    OrientationSample::rotation_vector(0.0, 0.0, half.sin(), Some(half.cos()))
}

impl LocationPlatform for SimulatedPlatform {
    fn has_location_permission(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    async fn request_location_permission(&self) -> bool {
        info!("Simulated permission prompt: granting");
        self.permission_granted.store(true, Ordering::SeqCst);
        true
    }

    fn is_location_provider_enabled(&self) -> bool {
        true
    }

    async fn launch_provider_settings(&self) {
        debug!("Simulated provider settings opened and closed");
    }

    fn subscribe_location(
        &self,
        request: LocationRequest,
        on_fix: FixCallback,
    ) -> SubscriptionHandle {
        let (handle, token) = self.register();
        let period = Duration::from_millis(request.interval_ms.max(1));
        let (latitude, longitude, altitude) = (
            self.config.latitude,
            self.config.longitude,
            self.config.altitude_m,
        );

        info!(
            ?handle,
            interval_ms = request.interval_ms,
            "Simulated location stream started"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let fix = GeographicFix::new(latitude, longitude, Utc::now());
                        on_fix(match altitude {
                            Some(meters) => fix.with_altitude(meters),
                            None => fix,
                        });
                    }
                }
            }
            debug!(?handle, "Simulated location stream stopped");
        });
        handle
    }

    fn unsubscribe_location(&self, handle: SubscriptionHandle) {
        self.cancel(handle);
    }

    fn notify_user(&self, message: &str) {
        warn!(notice = message, "User notice");
    }
}

impl OrientationSource for SimulatedPlatform {
    fn subscribe_orientation(&self, on_sample: SampleCallback) -> SubscriptionHandle {
        let (handle, token) = self.register();
        let period = Duration::from_millis(self.config.sample_interval_ms.max(1));
        let rate = self.config.rotation_deg_per_sec;

        info!(?handle, rate, "Simulated orientation stream started");
        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let degrees = started.elapsed().as_secs_f64() * rate;
                        on_sample(flat_sample(degrees));
                    }
                }
            }
            debug!(?handle, "Simulated orientation stream stopped");
        });
        handle
    }

    fn unsubscribe_orientation(&self, handle: SubscriptionHandle) {
        self.cancel(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_heading::{raw_azimuth, DisplayRotation};
    use std::sync::Arc;

    fn config() -> SimulationConfig {
        SimulationConfig {
            latitude: 47.6062,
            longitude: -122.3321,
            altitude_m: Some(56.0),
            rotation_deg_per_sec: 90.0,
            sample_interval_ms: 100,
        }
    }

    #[test]
    fn test_flat_sample_faces_requested_direction() {
        let azimuth = raw_azimuth(&flat_sample(90.0), DisplayRotation::Rotation0).unwrap();
        assert!((azimuth - 90.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_permission_granted_after_prompt() {
        let platform = SimulatedPlatform::new(config());
        assert!(!platform.has_location_permission());
        assert!(platform.request_location_permission().await);
        assert!(platform.has_location_permission());
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_stream_delivers_until_unsubscribed() {
        let platform = SimulatedPlatform::new(config());
        let fixes = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&fixes);
        let handle = platform.subscribe_location(
            LocationRequest::default(),
            Box::new(move |fix| sink.lock().push(fix)),
        );
        assert_eq!(platform.active_streams(), 1);

        tokio::time::sleep(Duration::from_millis(25_000)).await;
        let delivered = fixes.lock().len();
        // Immediate first tick, then one every 10 s
        assert_eq!(delivered, 3);
        assert_eq!(fixes.lock()[0].altitude_meters, Some(56.0));

        platform.unsubscribe_location(handle);
        assert_eq!(platform.active_streams(), 0);
        tokio::time::sleep(Duration::from_millis(30_000)).await;
        assert_eq!(fixes.lock().len(), delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_orientation_stream_turns() {
        let platform = SimulatedPlatform::new(config());
        let samples = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&samples);
        let handle = platform.subscribe_orientation(Box::new(move |s| sink.lock().push(s)));
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        platform.unsubscribe_orientation(handle);

        let samples = samples.lock();
        assert!(samples.len() >= 10);
        let last = raw_azimuth(samples.last().unwrap(), DisplayRotation::Rotation0).unwrap();
        // 90°/s for about one second
        assert!((last - 90.0).abs() < 10.0);
    }
}
