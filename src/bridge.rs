// src/bridge.rs
//! JSON boundary to the host application shell

use crate::{coordinator::LocationCoordinator, location::RequestOptions};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const GET_LOCATION: &str = "getLocation";

/// Success payload or the error string handed back to the host.
pub type BridgeResult = std::result::Result<Value, String>;

pub struct Bridge {
    coordinator: Arc<LocationCoordinator>,
    defaults: RequestOptions,
    shutdown: CancellationToken,
}

impl Bridge {
    pub fn new(coordinator: Arc<LocationCoordinator>, defaults: RequestOptions) -> Self {
        Self {
            coordinator,
            defaults,
            shutdown: CancellationToken::new(),
        }
    }

    /// Host is going away: abandon pending calls and drop the connection.
    pub fn shutdown(&self) {
        info!("bridge shutting down");
        self.shutdown.cancel();
        self.coordinator.shutdown();
    }

    /// Dispatch one host action. `None` means the action is not ours.
    pub async fn execute(&self, action: &str, args: &Value) -> Option<BridgeResult> {
        if action != GET_LOCATION {
            debug!(action, "ignoring unknown action");
            return None;
        }

        let options = RequestOptions::from_json_with_defaults(args, self.defaults);
        let outcome = self
            .coordinator
            .get_location_with_cancel(options, &self.shutdown)
            .await;
        let result = match outcome {
            Ok(position) => serde_json::to_value(position).map_err(|e| e.to_string()),
            Err(e) => {
                warn!(error = %e, "location request failed");
                Err(e.bridge_message())
            }
        };
        Some(result)
    }
}
