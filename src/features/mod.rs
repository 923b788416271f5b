//! # Features
//!
//! - `milestones`: test identifiers
//! - `history`: profiles and outcome history
//! - `outcomes`: outcome catalog and advisor
//! - `reminders`: retry reminder scheduling

pub mod history;
pub mod milestones;
pub mod outcomes;
pub mod reminders;

pub use history::{MemoryProfileStore, Profile, ProfileStore, TestHistoryStore, TestRecord};
pub use milestones::TestId;
pub use outcomes::{Destination, OutcomeAdvisor, OutcomeCatalog, OutcomeView, ReminderDecision};
pub use reminders::{
    Delivery, InMemoryNotificationHost, NotificationHost, PermissionStatus, Reminder,
    ReminderEvent, ReminderScheduler,
};
