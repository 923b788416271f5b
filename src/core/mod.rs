//! # Core Module
//!
//! Configuration and shared helpers for the noggin service.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod config;
pub mod duration;

// Re-export commonly used items
pub use config::Config;
pub use duration::{format_duration, parse_duration};
