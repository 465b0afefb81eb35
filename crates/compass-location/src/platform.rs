//! Collaborator interface implemented by the host platform.

use std::future::Future;

use compass_core::{GeographicFix, SubscriptionHandle};

use crate::types::LocationRequest;

/// Callback invoked for every delivered location.
pub type FixCallback = Box<dyn Fn(GeographicFix) + Send + Sync>;

/// Location services of the host platform.
///
/// Implementations must be cheap to call from the orchestrator's event loop;
/// anything that waits on the user is expressed as a future.
pub trait LocationPlatform: Send + Sync + 'static {
    /// Whether fine location permission is already granted.
    fn has_location_permission(&self) -> bool;

    /// Show the OS permission prompt. Resolves to `true` if granted.
    fn request_location_permission(&self) -> impl Future<Output = bool> + Send;

    fn is_location_provider_enabled(&self) -> bool;

    /// Open the provider settings screen. Resolves when control returns to the app.
    fn launch_provider_settings(&self) -> impl Future<Output = ()> + Send;

    fn subscribe_location(&self, request: LocationRequest, on_fix: FixCallback)
        -> SubscriptionHandle;

    fn unsubscribe_location(&self, handle: SubscriptionHandle);

    /// Best-effort, fire-and-forget user notice.
    fn notify_user(&self, message: &str);
}
