// src/source/cloud.rs
//! Fused location service wrapper: connection state, readiness wait and
//! single-shot fresh updates.

use crate::{
    error::Result,
    listener::{await_delivery, single_shot, Delivery, Registration},
    location::{now_millis, Location, LocationRequest, Priority, RequestOptions},
    platform::{ConnectionFailure, FusedLocationClient, SuspendCause},
};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use tokio::{sync::watch, time};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Permanent for the lifetime of the source.
    Failed,
}

impl ConnectionState {
    /// No further transition is expected without outside help.
    fn is_settled(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Failed)
    }
}

struct Shared {
    client: Arc<dyn FusedLocationClient>,
    state: watch::Sender<ConnectionState>,
    reconnects: AtomicU32,
    max_reconnects: u32,
    /// Bumped for every launched attempt and every disconnect. Events carrying
    /// an older value belong to a superseded binding.
    generation: AtomicU64,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(?previous, current = ?state, "fused connection state changed");
        }
    }

    /// Compare-and-set `Disconnected -> Connecting`.
    fn begin_connect(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        })
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

fn start_connect(shared: &Arc<Shared>) -> bool {
    if !shared.begin_connect() {
        return false;
    }

    // The binding may have been brought up behind our back.
    if shared.client.is_connected() {
        shared.set_state(ConnectionState::Connected);
        return false;
    }
    if shared.client.is_connecting() {
        debug!("fused client already connecting");
        return false;
    }

    let generation = shared.next_generation();
    info!(generation, "connecting to fused location service");
    shared.client.connect(ConnectionEvents {
        shared: Arc::downgrade(shared),
        generation,
    });
    true
}

fn reconnect(shared: &Arc<Shared>, why: &str) {
    let attempt = shared.reconnects.fetch_add(1, Ordering::AcqRel) + 1;
    if attempt > shared.max_reconnects {
        warn!(why, attempt, "reconnect budget spent, staying disconnected");
        return;
    }
    info!(why, attempt, "reconnecting to fused location service");
    start_connect(shared);
}

/// Handle through which the platform binding reports connection events.
#[derive(Clone)]
pub struct ConnectionEvents {
    shared: Weak<Shared>,
    generation: u64,
}

impl fmt::Debug for ConnectionEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEvents")
            .field("attached", &(self.shared.strong_count() > 0))
            .field("generation", &self.generation)
            .finish()
    }
}

impl ConnectionEvents {
    /// The shared state, unless the source is gone or this attempt has been
    /// superseded by a disconnect or a newer attempt.
    fn current(&self, event: &str) -> Option<Arc<Shared>> {
        let shared = self.shared.upgrade()?;
        let live = shared.generation.load(Ordering::Acquire);
        if live != self.generation {
            debug!(event, generation = self.generation, live, "ignoring event from superseded connection attempt");
            return None;
        }
        Some(shared)
    }

    pub fn connected(&self) {
        if let Some(shared) = self.current("connected") {
            shared.reconnects.store(0, Ordering::Release);
            shared.set_state(ConnectionState::Connected);
            info!("fused location service connected");
        }
    }

    pub fn suspended(&self, cause: SuspendCause) {
        if let Some(shared) = self.current("suspended") {
            warn!(?cause, "fused location service connection suspended");
            shared.set_state(ConnectionState::Disconnected);
            reconnect(&shared, "suspended");
        }
    }

    pub fn failed(&self, reason: ConnectionFailure) {
        let Some(shared) = self.current("failed") else {
            return;
        };

        if reason.is_permanent() {
            info!("Location API is unavailable.");
            shared.set_state(ConnectionState::Failed);
            return;
        }

        warn!(%reason, "fused location service connection failed");
        shared.set_state(ConnectionState::Disconnected);
        reconnect(&shared, "failed");
    }
}

/// Fused location source. Owns the connection state for its client.
pub struct CloudSource {
    shared: Arc<Shared>,
    fresh_timeout: Duration,
}

impl fmt::Debug for CloudSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudSource")
            .field("state", &self.state())
            .field("fresh_timeout", &self.fresh_timeout)
            .finish()
    }
}

impl CloudSource {
    pub fn new(client: Arc<dyn FusedLocationClient>, max_reconnects: u32, fresh_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                client,
                state,
                reconnects: AtomicU32::new(0),
                max_reconnects,
                generation: AtomicU64::new(0),
            }),
            fresh_timeout,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn is_location_available(&self) -> bool {
        self.shared.client.is_location_available()
    }

    /// Start a connection attempt unless one is outstanding or the service is
    /// known to be absent. Returns true if a new attempt was launched.
    pub fn connect(&self) -> bool {
        if self.state() == ConnectionState::Disconnected {
            self.shared.reconnects.store(0, Ordering::Release);
        }
        start_connect(&self.shared)
    }

    pub fn disconnect(&self) {
        self.shared.next_generation();
        self.shared.client.disconnect();
        if self.state() != ConnectionState::Failed {
            self.shared.set_state(ConnectionState::Disconnected);
        }
    }

    /// Wait for the connection to settle, at most `timeout`. Returns true
    /// only if it is connected.
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.shared.state.subscribe();
        let settled = async move { rx.wait_for(ConnectionState::is_settled).await.map(|state| *state) };

        match time::timeout(timeout, settled).await {
            Ok(Ok(ConnectionState::Connected)) => true,
            Ok(Ok(state)) => {
                debug!(?state, "fused connection settled without connecting");
                false
            }
            Ok(Err(_)) => false,
            Err(_) => {
                info!(?timeout, "timed out waiting for fused location service");
                false
            }
        }
    }

    /// The service's last known location if it is young enough.
    pub fn cached_location(&self, options: &RequestOptions) -> Option<Location> {
        let location = self.shared.client.last_location()?;
        let now = now_millis();
        if location.is_fresh(now, options.maximum_age_millis) {
            Some(location)
        } else {
            debug!(
                age_ms = location.age_millis(now),
                max_age_ms = options.maximum_age_millis,
                "fused last location too old"
            );
            None
        }
    }

    /// Ask for exactly one update. `Ok(None)` when nothing arrives in time.
    pub async fn request_fresh_location(&self, options: &RequestOptions) -> Result<Option<Location>> {
        let request = LocationRequest::single(Priority::for_options(options));
        let (callback, rx) = single_shot();

        let id = self.shared.client.request_location_updates(request, callback)?;
        let client = Arc::clone(&self.shared.client);
        let registration = Registration::new(id, move |id| client.remove_location_updates(id));
        debug!(listener = %registration.id(), priority = ?request.priority, "requested fused update");

        let outcome = await_delivery(rx, self.fresh_timeout).await;
        drop(registration);

        match outcome {
            Delivery::Delivered(location) => Ok(Some(location)),
            Delivery::Dropped => {
                debug!("fused client dropped the update listener");
                Ok(None)
            }
            Delivery::TimedOut => {
                warn!(timeout = ?self.fresh_timeout, "no fused update arrived in time");
                Ok(None)
            }
        }
    }

    /// Cached location if fresh enough, otherwise one fresh update.
    pub async fn locate(&self, options: &RequestOptions) -> Result<Option<Location>> {
        if let Some(location) = self.cached_location(options) {
            info!(provider = %location.provider, "using cached fused location");
            return Ok(Some(location));
        }
        self.request_fresh_location(options).await
    }
}
