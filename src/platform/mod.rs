// src/platform/mod.rs
//! Collaborator interfaces implemented by the host platform, plus the
//! adapters bundled with this crate.

pub mod gpsd;
pub mod unavailable;

use crate::{
    error::Result,
    listener::{ListenerId, LocationCallback},
    location::{Location, LocationRequest},
    source::cloud::ConnectionEvents,
};
use std::fmt;

/// Why a connection to the fused service failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// The capability is absent on this device. Never retried.
    ApiUnavailable,
    ServiceMissing,
    ServiceUpdating,
    NetworkError,
    Timeout,
    Other(i32),
}

impl ConnectionFailure {
    pub fn is_permanent(&self) -> bool {
        matches!(self, ConnectionFailure::ApiUnavailable)
    }
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionFailure::ApiUnavailable => write!(f, "API unavailable"),
            ConnectionFailure::ServiceMissing => write!(f, "service missing"),
            ConnectionFailure::ServiceUpdating => write!(f, "service updating"),
            ConnectionFailure::NetworkError => write!(f, "network error"),
            ConnectionFailure::Timeout => write!(f, "timeout"),
            ConnectionFailure::Other(code) => write!(f, "error code {}", code),
        }
    }
}

/// Why an established connection dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendCause {
    ServiceDisconnected,
    NetworkLost,
    Other(i32),
}

/// Binding to a fused location service that needs a connect handshake.
///
/// `connect` starts the handshake; its outcome is reported later (or
/// synchronously) through the supplied [`ConnectionEvents`].
pub trait FusedLocationClient: Send + Sync {
    fn connect(&self, events: ConnectionEvents);

    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    fn is_connecting(&self) -> bool;

    /// Whether the service currently believes it can produce a fix.
    fn is_location_available(&self) -> bool;

    fn last_location(&self) -> Option<Location>;

    /// Register `callback` for updates matching `request`. The platform may
    /// keep invoking it until [`remove_location_updates`] is called.
    ///
    /// [`remove_location_updates`]: FusedLocationClient::remove_location_updates
    fn request_location_updates(
        &self,
        request: LocationRequest,
        callback: LocationCallback,
    ) -> Result<ListenerId>;

    fn remove_location_updates(&self, id: ListenerId);
}

/// The operating system's set of location providers.
pub trait ProviderRegistry: Send + Sync {
    fn providers(&self) -> Vec<String>;

    fn last_known_location(&self, provider: &str) -> Option<Location>;

    fn is_provider_enabled(&self, provider: &str) -> bool;

    fn request_single_update(&self, provider: &str, callback: LocationCallback) -> Result<ListenerId>;

    fn remove_updates(&self, id: ListenerId);
}
