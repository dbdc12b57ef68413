// src/location.rs
//! Location records, request options and the caller-facing position

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_HIGH_ACCURACY: bool = true;
pub const DEFAULT_MAXIMUM_AGE_MS: i64 = 60_000;

/// Well-known built-in provider identifiers.
pub const NETWORK_PROVIDER: &str = "network";
pub const GPS_PROVIDER: &str = "gps";
pub const PASSIVE_PROVIDER: &str = "passive";

/// Current wall clock as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// The only shape handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Location> for Position {
    fn from(location: &Location) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

/// A fix as reported by one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,           // meters, lower is better
    pub timestamp_millis: i64,   // Unix epoch
    pub provider: String,
}

impl Location {
    pub fn new(provider: &str, latitude: f64, longitude: f64, accuracy: f32, timestamp_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp_millis,
            provider: provider.to_string(),
        }
    }

    /// Accuracy in meters, or `None` when the provider left it unset.
    pub fn accuracy_meters(&self) -> Option<f32> {
        if self.accuracy.is_finite() && self.accuracy >= 0.0 && self.accuracy < f32::MAX {
            Some(self.accuracy)
        } else {
            None
        }
    }

    /// Age relative to `now_ms`; negative ages (clock skew) count as zero.
    pub fn age_millis(&self, now_ms: i64) -> i64 {
        (now_ms - self.timestamp_millis).max(0)
    }

    /// Fresh if reported after `now - maximum_age`.
    pub fn is_fresh(&self, now_ms: i64, maximum_age_ms: i64) -> bool {
        self.timestamp_millis > now_ms - maximum_age_ms
    }

    pub fn position(&self) -> Position {
        Position::from(self)
    }
}

/// Power/accuracy trade-off asked of the fused service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    HighAccuracy,
    BalancedPower,
}

impl Priority {
    pub fn for_options(options: &RequestOptions) -> Self {
        if options.high_accuracy_enabled {
            Priority::HighAccuracy
        } else {
            Priority::BalancedPower
        }
    }
}

/// One-update request handed to the fused service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub priority: Priority,
    pub num_updates: u32,
}

impl LocationRequest {
    pub fn single(priority: Priority) -> Self {
        Self {
            priority,
            num_updates: 1,
        }
    }
}

/// Per-request options supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub high_accuracy_enabled: bool,
    pub maximum_age_millis: i64,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            high_accuracy_enabled: DEFAULT_HIGH_ACCURACY,
            maximum_age_millis: DEFAULT_MAXIMUM_AGE_MS,
        }
    }
}

impl RequestOptions {
    pub fn new(high_accuracy_enabled: bool, maximum_age_millis: i64) -> Self {
        Self {
            high_accuracy_enabled,
            maximum_age_millis: if maximum_age_millis < 0 {
                DEFAULT_MAXIMUM_AGE_MS
            } else {
                maximum_age_millis
            },
        }
    }

    /// Read options from a bridge JSON object, keeping `defaults` for any
    /// field that is missing or has the wrong type.
    pub fn from_json_with_defaults(value: &Value, defaults: RequestOptions) -> Self {
        let mut options = defaults;

        let object = match value {
            Value::Object(map) => map,
            Value::Array(items) => match items.first() {
                Some(Value::Object(map)) => map,
                _ => return options,
            },
            _ => return options,
        };

        if let Some(high) = object.get("highAccuracyEnabled").and_then(|v| v.as_bool()) {
            options.high_accuracy_enabled = high;
        }

        let age = object
            .get("maximumAge")
            .or_else(|| object.get("maximumAgeMillis"))
            .and_then(|v| v.as_i64());
        if let Some(age) = age.filter(|age| *age >= 0) {
            options.maximum_age_millis = age;
        }

        options
    }

    pub fn from_json(value: &Value) -> Self {
        Self::from_json_with_defaults(value, Self::default())
    }
}
