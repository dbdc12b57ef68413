// src/platform/unavailable.rs
//! Fused client for hosts that have no fused location service

use crate::{
    error::{LocationError, Result},
    listener::{ListenerId, LocationCallback},
    location::{Location, LocationRequest},
    platform::{ConnectionFailure, FusedLocationClient},
    source::ConnectionEvents,
};

/// Every connect attempt reports [`ConnectionFailure::ApiUnavailable`], so
/// requests go straight to the built-in providers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableFusedClient;

impl FusedLocationClient for UnavailableFusedClient {
    fn connect(&self, events: ConnectionEvents) {
        events.failed(ConnectionFailure::ApiUnavailable);
    }

    fn disconnect(&self) {}

    fn is_connected(&self) -> bool {
        false
    }

    fn is_connecting(&self) -> bool {
        false
    }

    fn is_location_available(&self) -> bool {
        false
    }

    fn last_location(&self) -> Option<Location> {
        None
    }

    fn request_location_updates(
        &self,
        _request: LocationRequest,
        _callback: LocationCallback,
    ) -> Result<ListenerId> {
        Err(LocationError::Platform(
            "Fused location service is not available on this host.".to_string(),
        ))
    }

    fn remove_location_updates(&self, _id: ListenerId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CloudSource, ConnectionState};
    use std::{sync::Arc, time::Duration};

    #[test]
    fn test_connect_fails_permanently() {
        let cloud = CloudSource::new(Arc::new(UnavailableFusedClient), 1, Duration::from_secs(1));
        cloud.connect();
        assert_eq!(cloud.state(), ConnectionState::Failed);
        assert!(!cloud.connect());
    }
}
