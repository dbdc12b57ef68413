// src/testing.rs
//! In-memory platform fakes for unit tests

use crate::{
    error::{LocationError, Result},
    listener::{ListenerId, LocationCallback},
    location::{Location, LocationRequest},
    platform::{ConnectionFailure, FusedLocationClient, ProviderRegistry},
    source::ConnectionEvents,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Ordered record of calls made on the fakes, shared between them.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.position_of(prefix).is_some()
    }

    pub fn position_of(&self, prefix: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|entry| entry.starts_with(prefix))
    }
}

/// What the fake fused client does when asked to connect.
#[derive(Debug, Clone, Copy)]
pub enum ConnectBehavior {
    Succeed,
    Fail(ConnectionFailure),
    /// Stay connecting until the test reports an event.
    Hang,
}

pub struct FakeFusedClient {
    behavior: ConnectBehavior,
    connect_calls: AtomicUsize,
    events: Mutex<Option<ConnectionEvents>>,
    available: AtomicBool,
    last: Mutex<Option<Location>>,
    fresh: Mutex<Option<Location>>,
    request_error: Mutex<Option<String>>,
    requests: Mutex<Vec<LocationRequest>>,
    pending: Mutex<HashMap<ListenerId, LocationCallback>>,
    removed: Mutex<Vec<ListenerId>>,
    log: CallLog,
}

impl FakeFusedClient {
    pub fn new(behavior: ConnectBehavior) -> Self {
        Self {
            behavior,
            connect_calls: AtomicUsize::new(0),
            events: Mutex::new(None),
            available: AtomicBool::new(false),
            last: Mutex::new(None),
            fresh: Mutex::new(None),
            request_error: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            removed: Mutex::new(Vec::new()),
            log: CallLog::default(),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Option<ConnectionEvents> {
        self.events.lock().unwrap().clone()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_last_location(&self, location: Option<Location>) {
        *self.last.lock().unwrap() = location;
    }

    /// Location delivered (twice) as soon as an update is requested.
    pub fn set_fresh_location(&self, location: Option<Location>) {
        *self.fresh.lock().unwrap() = location;
    }

    pub fn fail_requests(&self, message: &str) {
        *self.request_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn requests(&self) -> Vec<LocationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<ListenerId> {
        self.removed.lock().unwrap().clone()
    }

    pub fn pending_listeners(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl FusedLocationClient for FakeFusedClient {
    fn connect(&self, events: ConnectionEvents) {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.log.push("fused:connect");
        *self.events.lock().unwrap() = Some(events.clone());

        // Events are reported without holding any lock; they may re-enter.
        match self.behavior {
            ConnectBehavior::Succeed => events.connected(),
            ConnectBehavior::Fail(reason) => events.failed(reason),
            ConnectBehavior::Hang => {}
        }
    }

    fn disconnect(&self) {
        self.log.push("fused:disconnect");
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn is_connecting(&self) -> bool {
        false
    }

    fn is_location_available(&self) -> bool {
        self.log.push("fused:available");
        self.available.load(Ordering::SeqCst)
    }

    fn last_location(&self) -> Option<Location> {
        self.log.push("fused:last_location");
        self.last.lock().unwrap().clone()
    }

    fn request_location_updates(
        &self,
        request: LocationRequest,
        callback: LocationCallback,
    ) -> Result<ListenerId> {
        self.log.push("fused:request");
        if let Some(message) = self.request_error.lock().unwrap().clone() {
            return Err(LocationError::Platform(message));
        }
        self.requests.lock().unwrap().push(request);

        let fresh = self.fresh.lock().unwrap().clone();
        if let Some(location) = fresh {
            callback(location.clone());
            callback(location);
        }

        let id = ListenerId::next();
        self.pending.lock().unwrap().insert(id, callback);
        Ok(id)
    }

    fn remove_location_updates(&self, id: ListenerId) {
        self.log.push("fused:remove");
        self.pending.lock().unwrap().remove(&id);
        self.removed.lock().unwrap().push(id);
    }
}

pub struct FakeProviders {
    providers: Vec<String>,
    last_known: Mutex<HashMap<String, Location>>,
    enabled: Mutex<HashSet<String>>,
    fresh: Mutex<Option<Location>>,
    requests: Mutex<Vec<String>>,
    pending: Mutex<HashMap<ListenerId, LocationCallback>>,
    removed: Mutex<Vec<ListenerId>>,
    log: CallLog,
}

impl FakeProviders {
    pub fn new(providers: &[&str]) -> Self {
        Self {
            providers: providers.iter().map(|p| p.to_string()).collect(),
            last_known: Mutex::new(HashMap::new()),
            enabled: Mutex::new(HashSet::new()),
            fresh: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            removed: Mutex::new(Vec::new()),
            log: CallLog::default(),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn set_last_known(&self, provider: &str, location: Location) {
        self.last_known.lock().unwrap().insert(provider.to_string(), location);
    }

    pub fn enable(&self, provider: &str) {
        self.enabled.lock().unwrap().insert(provider.to_string());
    }

    /// Location delivered as soon as a single update is requested.
    pub fn set_fresh(&self, location: Option<Location>) {
        *self.fresh.lock().unwrap() = location;
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<ListenerId> {
        self.removed.lock().unwrap().clone()
    }

    pub fn pending_listeners(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl ProviderRegistry for FakeProviders {
    fn providers(&self) -> Vec<String> {
        self.log.push("builtin:providers");
        self.providers.clone()
    }

    fn last_known_location(&self, provider: &str) -> Option<Location> {
        self.log.push(format!("builtin:last_known:{}", provider));
        self.last_known.lock().unwrap().get(provider).cloned()
    }

    fn is_provider_enabled(&self, provider: &str) -> bool {
        self.log.push(format!("builtin:enabled:{}", provider));
        self.enabled.lock().unwrap().contains(provider)
    }

    fn request_single_update(&self, provider: &str, callback: LocationCallback) -> Result<ListenerId> {
        self.log.push(format!("builtin:request:{}", provider));
        self.requests.lock().unwrap().push(provider.to_string());

        let fresh = self.fresh.lock().unwrap().clone();
        if let Some(location) = fresh {
            callback(location);
        }

        let id = ListenerId::next();
        self.pending.lock().unwrap().insert(id, callback);
        Ok(id)
    }

    fn remove_updates(&self, id: ListenerId) {
        self.log.push("builtin:remove");
        self.pending.lock().unwrap().remove(&id);
        self.removed.lock().unwrap().push(id);
    }
}
