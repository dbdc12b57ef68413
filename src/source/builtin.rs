// src/source/builtin.rs
//! Built-in provider source: best cached fix across providers, otherwise a
//! single update from the best enabled provider.

use crate::{
    error::{LocationError, Result},
    listener::{await_delivery, single_shot, Delivery, Registration},
    location::{now_millis, Location, RequestOptions, GPS_PROVIDER, NETWORK_PROVIDER, PASSIVE_PROVIDER},
    platform::ProviderRegistry,
};
use std::{cmp::Ordering, fmt, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Freshness window for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    /// Oldest acceptable timestamp (exclusive), epoch millis.
    pub min_time: i64,
    /// Accuracy above which a cached fix is considered coarse.
    pub min_distance: f32,
}

impl CachePolicy {
    pub fn for_request(options: &RequestOptions, min_distance: f32, now_ms: i64) -> Self {
        Self {
            min_time: now_ms - options.maximum_age_millis,
            min_distance,
        }
    }

    pub fn is_coarse(&self, location: &Location) -> bool {
        location.accuracy_meters().map_or(true, |accuracy| accuracy > self.min_distance)
    }
}

/// Orders candidates best-first: set accuracy beats unset, lower accuracy
/// wins, ties go to the more recent fix.
fn rank(a: &Location, b: &Location) -> Ordering {
    let newer_first = b.timestamp_millis.cmp(&a.timestamp_millis);
    match (a.accuracy_meters(), b.accuracy_meters()) {
        (Some(x), Some(y)) => x.total_cmp(&y).then(newer_first),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => newer_first,
    }
}

/// Pick the best candidate reported after `min_time`.
pub fn select_best<I>(candidates: I, min_time: i64) -> Option<Location>
where
    I: IntoIterator<Item = Location>,
{
    candidates
        .into_iter()
        .filter(|location| location.timestamp_millis > min_time)
        .min_by(rank)
}

pub struct BuiltInSource {
    registry: Arc<dyn ProviderRegistry>,
    min_distance: f32,
    fresh_timeout: Duration,
}

impl fmt::Debug for BuiltInSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltInSource")
            .field("min_distance", &self.min_distance)
            .field("fresh_timeout", &self.fresh_timeout)
            .finish()
    }
}

impl BuiltInSource {
    pub fn new(registry: Arc<dyn ProviderRegistry>, min_distance: f32, fresh_timeout: Duration) -> Self {
        Self {
            registry,
            min_distance,
            fresh_timeout,
        }
    }

    /// Best last-known location across every registered provider.
    pub fn last_best_location(&self, options: &RequestOptions) -> Option<Location> {
        let policy = CachePolicy::for_request(options, self.min_distance, now_millis());

        let candidates = self
            .registry
            .providers()
            .into_iter()
            .filter_map(|provider| self.registry.last_known_location(&provider));

        let best = select_best(candidates, policy.min_time)?;
        debug!(
            provider = %best.provider,
            accuracy = best.accuracy,
            coarse = policy.is_coarse(&best),
            "best cached built-in location"
        );
        Some(best)
    }

    /// Cached fix if one is fresh enough, otherwise one update from
    /// network, then GPS, then whatever the passive provider last saw.
    pub async fn get_location(&self, options: &RequestOptions) -> Result<Option<Location>> {
        debug!("Checking last known positions.");
        if let Some(location) = self.last_best_location(options) {
            info!("Last location found.");
            return Ok(Some(location));
        }

        if self.registry.is_provider_enabled(NETWORK_PROVIDER) {
            info!("Requesting new position from network.");
            return self.request_single_update(NETWORK_PROVIDER).await.map(Some);
        }

        if self.registry.is_provider_enabled(GPS_PROVIDER) {
            info!("Requesting new position from GPS.");
            return self.request_single_update(GPS_PROVIDER).await.map(Some);
        }

        if self.registry.is_provider_enabled(PASSIVE_PROVIDER) {
            info!("Using passive provider's last known position.");
            return Ok(self.registry.last_known_location(PASSIVE_PROVIDER));
        }

        warn!("No provider enabled.");
        Err(LocationError::ProviderDisabled)
    }

    async fn request_single_update(&self, provider: &str) -> Result<Location> {
        let (callback, rx) = single_shot();
        let id = self.registry.request_single_update(provider, callback)?;
        let registry = Arc::clone(&self.registry);
        let registration = Registration::new(id, move |id| registry.remove_updates(id));

        let outcome = await_delivery(rx, self.fresh_timeout).await;
        drop(registration);

        match outcome {
            Delivery::Delivered(location) => Ok(location),
            Delivery::Dropped => {
                warn!(provider, "provider dropped the update listener");
                Err(LocationError::NoKnownPosition)
            }
            Delivery::TimedOut => {
                warn!(provider, timeout = ?self.fresh_timeout, "no update arrived in time");
                Err(LocationError::NoKnownPosition)
            }
        }
    }
}
