//! Host notification subsystem seam.
//!
//! The host owns actual delivery: it stores pending reminders, raises them at their fire
//! time, and keeps the badge counter shown on the app icon. The scheduler only talks to it
//! through [`NotificationHost`].

use crate::features::milestones::TestId;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Metadata key carrying the test wire name
pub const TEST_NAME_KEY: &str = "NotificationTestName";

/// Outcome of asking the user for notification permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    NotDetermined,
    Granted,
    Denied,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
        }
    }
}

impl std::str::FromStr for PermissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "not_determined" => Ok(PermissionStatus::NotDetermined),
            "granted" => Ok(PermissionStatus::Granted),
            "denied" => Ok(PermissionStatus::Denied),
            _ => Err(anyhow::anyhow!("Invalid permission status: {}", s)),
        }
    }
}

/// A reminder as held by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
    /// Amount added to the badge counter when this reminder was scheduled
    pub badge_delta: i64,
    /// Opaque metadata; `TEST_NAME_KEY` identifies the test
    #[serde(default)]
    pub user_info: BTreeMap<String, String>,
}

impl Reminder {
    /// Raw test name from the metadata, if present
    pub fn test_name(&self) -> Option<&str> {
        self.user_info.get(TEST_NAME_KEY).map(String::as_str)
    }

    /// Parsed test id; `None` for missing or unrecognized metadata
    pub fn test_id(&self) -> Option<TestId> {
        self.test_name().and_then(|name| name.parse().ok())
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }

    /// Text of the in-app prompt shown when the reminder arrives while the app is open
    pub fn prompt_text(&self) -> String {
        format!("{} Select Ok to run the test now.", self.body)
    }
}

/// Injected host collaborator
pub trait NotificationHost {
    /// Ask for permission to present alerts, sounds and badges. Idempotent.
    fn request_permission(&self) -> Result<PermissionStatus>;

    fn submit(&self, reminder: Reminder) -> Result<()>;

    /// Every reminder that has not been cancelled, in submission order
    fn list_pending(&self) -> Result<Vec<Reminder>>;

    /// Remove one reminder; unknown ids are ignored
    fn cancel(&self, reminder: &Reminder) -> Result<()>;

    fn cancel_all(&self) -> Result<()>;

    fn badge(&self) -> Result<i64>;

    fn set_badge(&self, value: i64) -> Result<()>;
}

/// Host kept entirely in memory
pub struct InMemoryNotificationHost {
    pending: Mutex<Vec<Reminder>>,
    badge: Mutex<i64>,
    permission: AtomicU8,
    grant_on_request: bool,
}

impl Default for InMemoryNotificationHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNotificationHost {
    /// A host whose user grants permission when asked
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            badge: Mutex::new(0),
            permission: AtomicU8::new(0),
            grant_on_request: true,
        }
    }

    /// A host whose user declines the permission prompt
    pub fn denying() -> Self {
        Self {
            grant_on_request: false,
            ..Self::new()
        }
    }

    fn lock_pending(&self) -> Result<std::sync::MutexGuard<'_, Vec<Reminder>>> {
        self.pending
            .lock()
            .map_err(|_| anyhow::anyhow!("pending reminders lock poisoned"))
    }

    fn lock_badge(&self) -> Result<std::sync::MutexGuard<'_, i64>> {
        self.badge
            .lock()
            .map_err(|_| anyhow::anyhow!("badge lock poisoned"))
    }
}

impl NotificationHost for InMemoryNotificationHost {
    fn request_permission(&self) -> Result<PermissionStatus> {
        let answer = if self.grant_on_request { 1 } else { 2 };
        // The user is only ever prompted once.
        let _ = self
            .permission
            .compare_exchange(0, answer, Ordering::SeqCst, Ordering::SeqCst);
        let status = match self.permission.load(Ordering::SeqCst) {
            1 => PermissionStatus::Granted,
            2 => PermissionStatus::Denied,
            _ => PermissionStatus::NotDetermined,
        };
        debug!("Notification permission: {status}");
        Ok(status)
    }

    fn submit(&self, reminder: Reminder) -> Result<()> {
        self.lock_pending()?.push(reminder);
        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<Reminder>> {
        Ok(self.lock_pending()?.clone())
    }

    fn cancel(&self, reminder: &Reminder) -> Result<()> {
        self.lock_pending()?.retain(|r| r.id != reminder.id);
        Ok(())
    }

    fn cancel_all(&self) -> Result<()> {
        self.lock_pending()?.clear();
        Ok(())
    }

    fn badge(&self) -> Result<i64> {
        Ok(*self.lock_badge()?)
    }

    fn set_badge(&self, value: i64) -> Result<()> {
        *self.lock_badge()? = value;
        Ok(())
    }
}
