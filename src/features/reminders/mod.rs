//! # Reminders Feature
//!
//! Retry reminders for failed milestone tests, delivered through the host notification
//! subsystem and mirrored into the app badge.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod events;
pub mod host;
pub mod scheduler;

pub use events::ReminderEvent;
pub use host::{InMemoryNotificationHost, NotificationHost, PermissionStatus, Reminder};
pub use scheduler::{Delivery, ReminderScheduler};
