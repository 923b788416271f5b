//! # Outcomes Feature
//!
//! Advice shown after a test attempt, driven by a per-test configuration table instead of
//! one screen per test.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod advisor;
pub mod catalog;

pub use advisor::{OutcomeAdvisor, OutcomeView, ReminderDecision};
pub use catalog::{Destination, OutcomeBucket, OutcomeCatalog, TestEntry, MILESTONES_SCREEN};
