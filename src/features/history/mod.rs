//! # Feature: Test History
//!
//! Child profiles and their pass/fail history per milestone test.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod profile;
pub mod store;

pub use profile::{Profile, TestRecord};
pub use store::{MemoryProfileStore, ProfileStore, TestHistoryStore};
