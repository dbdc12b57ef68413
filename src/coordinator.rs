// src/coordinator.rs
//! Request entry point: orders the fused and built-in sources for each call

use crate::{
    config::CoordinatorConfig,
    error::{LocationError, Result},
    location::{Location, Position, RequestOptions},
    platform::{FusedLocationClient, ProviderRegistry},
    source::{BuiltInSource, CloudSource, ConnectionState},
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Owns both sources and answers `get_location` requests.
///
/// Calls are independent: any number may be in flight on the runtime, each
/// suspending only itself while it waits on the connection or a provider.
#[derive(Debug)]
pub struct LocationCoordinator {
    cloud: CloudSource,
    builtin: BuiltInSource,
    connection_timeout: Duration,
}

impl LocationCoordinator {
    pub fn new(
        fused: Arc<dyn FusedLocationClient>,
        registry: Arc<dyn ProviderRegistry>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            cloud: CloudSource::new(fused, config.max_reconnect_attempts, config.fresh_location_timeout()),
            builtin: BuiltInSource::new(registry, config.min_distance_m, config.fresh_location_timeout()),
            connection_timeout: config.connection_timeout(),
        }
    }

    /// Begin connecting the fused service ahead of the first request.
    pub fn start(&self) {
        self.cloud.connect();
    }

    pub fn shutdown(&self) {
        info!("disconnecting fused location service");
        self.cloud.disconnect();
    }

    pub fn cloud(&self) -> &CloudSource {
        &self.cloud
    }

    /// Resolve the current position, fused service first.
    pub async fn get_location(&self, options: RequestOptions) -> Result<Position> {
        // Fire-and-forget; a no-op while connecting or connected.
        self.cloud.connect();

        if !self.cloud.wait_until_ready(self.connection_timeout).await {
            match self.cloud.state() {
                ConnectionState::Failed => info!("fused service unavailable, using built-in providers"),
                state => debug!(
                    error = %LocationError::ConnectionTimeout,
                    ?state,
                    "fused service not ready, using built-in providers"
                ),
            }
        } else if self.cloud.is_location_available() {
            if let Some(location) = self.try_cloud(&options).await {
                return Ok(location.position());
            }
        } else {
            info!("fused location not available, using built-in providers");
        }

        info!("Getting location from location manager.");
        match self.builtin.get_location(&options).await? {
            Some(location) => Ok(location.position()),
            None => {
                info!("No last known positions.");
                Err(LocationError::Unavailable)
            }
        }
    }

    /// As [`get_location`](Self::get_location), but gives up with
    /// [`LocationError::Cancelled`] once `token` fires. Any listener still
    /// registered at that point is removed.
    pub async fn get_location_with_cancel(
        &self,
        options: RequestOptions,
        token: &CancellationToken,
    ) -> Result<Position> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("location request cancelled");
                Err(LocationError::Cancelled)
            }
            result = self.get_location(options) => result,
        }
    }

    async fn try_cloud(&self, options: &RequestOptions) -> Option<Location> {
        info!("Getting location from fused location service.");
        match self.cloud.locate(options).await {
            Ok(Some(location)) => Some(location),
            Ok(None) => {
                debug!("fused service produced no location");
                None
            }
            Err(e) => {
                warn!(error = %e, "fused location request failed");
                None
            }
        }
    }
}
