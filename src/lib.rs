// src/lib.rs
//! Geolocation Coordinator Library
//!
//! Resolves the device's current position from a fused location service
//! when it is connected and available, and from the built-in providers
//! (network, GPS, passive) otherwise.

pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod listener;
pub mod location;
pub mod logging;
pub mod platform;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use coordinator::LocationCoordinator;
pub use error::{LocationError, Result};
pub use location::{Location, Position, RequestOptions};
pub use platform::{FusedLocationClient, ProviderRegistry};
