// src/listener.rs
//! Single-shot listener plumbing shared by both sources

use crate::location::Location;
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};
use tokio::{sync::oneshot, time};

/// Callback handed to a platform collaborator. It may be invoked any number
/// of times by the platform; only the first delivery is forwarded.
pub type LocationCallback = Box<dyn Fn(Location) + Send + Sync>;

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

/// Handle for one registered update listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a process-unique id. Platform adapters use this when they
    /// register a callback.
    pub fn next() -> Self {
        Self(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Build a callback that forwards its first location to the returned receiver
/// and ignores every later invocation.
pub(crate) fn single_shot() -> (LocationCallback, oneshot::Receiver<Location>) {
    let (tx, rx) = oneshot::channel();
    let slot = Mutex::new(Some(tx));
    let callback: LocationCallback = Box::new(move |location| {
        let sender = match slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sender) = sender {
            // Receiver gone means the request was abandoned.
            let _ = sender.send(location);
        }
    });
    (callback, rx)
}

/// Removes a registered listener when dropped, so completion, timeout and
/// cancellation all release the platform subscription.
pub(crate) struct Registration<F: FnMut(ListenerId)> {
    id: ListenerId,
    remove: Option<F>,
}

impl<F: FnMut(ListenerId)> Registration<F> {
    pub(crate) fn new(id: ListenerId, remove: F) -> Self {
        Self {
            id,
            remove: Some(remove),
        }
    }

    pub(crate) fn id(&self) -> ListenerId {
        self.id
    }
}

impl<F: FnMut(ListenerId)> Drop for Registration<F> {
    fn drop(&mut self) {
        if let Some(mut remove) = self.remove.take() {
            tracing::debug!(listener = %self.id, "removing location listener");
            remove(self.id);
        }
    }
}

/// Outcome of waiting on a single-shot receiver.
#[derive(Debug, PartialEq)]
pub(crate) enum Delivery {
    Delivered(Location),
    /// The platform dropped the callback without reporting.
    Dropped,
    TimedOut,
}

pub(crate) async fn await_delivery(rx: oneshot::Receiver<Location>, limit: Duration) -> Delivery {
    match time::timeout(limit, rx).await {
        Ok(Ok(location)) => Delivery::Delivered(location),
        Ok(Err(_)) => Delivery::Dropped,
        Err(_) => Delivery::TimedOut,
    }
}
