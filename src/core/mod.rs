//! Core infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Error taxonomy shared by stores and collections
//! - [`telemetry`] - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod telemetry;
