// Core layer - configuration and shared helpers
pub mod core;

// Features layer - milestone history, outcome advice, reminders
pub mod features;

// Infrastructure
pub mod database;

// Re-export core config
pub use crate::core::Config;

pub use database::Database;

// Re-export feature items
pub use features::{
    // History
    MemoryProfileStore, Profile, ProfileStore, TestHistoryStore, TestRecord,
    // Milestones
    TestId,
    // Outcomes
    Destination, OutcomeAdvisor, OutcomeCatalog, OutcomeView, ReminderDecision,
    // Reminders
    Delivery, InMemoryNotificationHost, NotificationHost, PermissionStatus, Reminder,
    ReminderEvent, ReminderScheduler,
};
