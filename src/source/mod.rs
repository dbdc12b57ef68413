// src/source/mod.rs
//! The two competing location sources

pub mod builtin;
pub mod cloud;

pub use builtin::{select_best, BuiltInSource, CachePolicy};
pub use cloud::{CloudSource, ConnectionEvents, ConnectionState};
