//! Reminder lifecycle events, broadcast to any interested screen.

use crate::features::milestones::TestId;
use serde::{Deserialize, Serialize};

/// Broadcast channel capacity for reminder events
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReminderEvent {
    /// A retry reminder has been scheduled
    Scheduled { test_id: TestId },
    /// A retry reminder has been cancelled or handled
    Removed { test_id: TestId },
}

impl ReminderEvent {
    pub fn test_id(&self) -> TestId {
        match self {
            ReminderEvent::Scheduled { test_id } | ReminderEvent::Removed { test_id } => *test_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = ReminderEvent::Removed {
            test_id: TestId::PlasticJar,
        };
        assert_eq!(event.test_id(), TestId::PlasticJar);
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"Removed","test_id":"plasticJar"}"#
        );
    }
}
