//! # Database
//!
//! SQLite persistence for profiles, pending reminders and app settings. Serves as the
//! durable [`ProfileStore`] and as the [`NotificationHost`] when running outside a device.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::features::history::{Profile, ProfileStore};
use crate::features::reminders::{NotificationHost, PermissionStatus, Reminder};
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use sqlite::{Connection, State};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

const SETTING_BADGE: &str = "badge";
const SETTING_PERMISSION: &str = "notification_permission";
const SETTING_CURRENT_PROFILE: &str = "current_profile";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS profiles (
        name TEXT PRIMARY KEY,
        document TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS reminders (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        fire_at TEXT NOT NULL,
        badge_delta INTEGER NOT NULL,
        user_info TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`; `":memory:"` gives a volatile database
    pub fn new(path: &str) -> Result<Self> {
        let connection = sqlite::open(path)?;
        connection.execute(SCHEMA)?;
        info!("Opened database at {path}");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare("SELECT value FROM settings WHERE key = ?")?;
        statement.bind((1, key))?;
        if let State::Row = statement.next()? {
            Ok(Some(statement.read::<String, _>("value")?))
        } else {
            Ok(None)
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        let mut statement =
            conn.prepare("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")?;
        statement.bind((1, key))?;
        statement.bind((2, value))?;
        statement.next()?;
        Ok(())
    }

    /// Record the answer to the notification permission prompt
    pub fn set_permission(&self, status: PermissionStatus) -> Result<()> {
        self.set_setting(SETTING_PERMISSION, &status.to_string())
    }

    fn read_reminder(statement: &sqlite::Statement<'_>) -> Result<Reminder> {
        let id = statement.read::<String, _>("id")?;
        let fire_at = statement.read::<String, _>("fire_at")?;
        let user_info = statement.read::<String, _>("user_info")?;
        Ok(Reminder {
            id: id.parse()?,
            title: statement.read::<String, _>("title")?,
            body: statement.read::<String, _>("body")?,
            fire_at: DateTime::parse_from_rfc3339(&fire_at)?.with_timezone(&Utc),
            badge_delta: statement.read::<i64, _>("badge_delta")?,
            user_info: serde_json::from_str(&user_info)?,
        })
    }
}

impl ProfileStore for Database {
    fn load_profiles(&self) -> Result<BTreeMap<String, Profile>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare("SELECT name, document FROM profiles")?;
        let mut profiles = BTreeMap::new();
        while let State::Row = statement.next()? {
            let name = statement.read::<String, _>("name")?;
            let document = statement.read::<String, _>("document")?;
            // Saves rewrite the whole table; an unreadable row fails the load.
            let profile = serde_json::from_str::<Profile>(&document).map_err(|e| {
                error!("Unreadable profile {name}: {e}");
                anyhow::anyhow!("Unreadable profile {}: {}", name, e)
            })?;
            profiles.insert(name, profile);
        }
        Ok(profiles)
    }

    fn save_profiles(&self, profiles: &BTreeMap<String, Profile>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("BEGIN TRANSACTION")?;

        let write = || -> Result<()> {
            conn.execute("DELETE FROM profiles")?;
            for (name, profile) in profiles {
                let document = serde_json::to_string(profile)?;
                let mut statement =
                    conn.prepare("INSERT INTO profiles (name, document) VALUES (?, ?)")?;
                statement.bind((1, name.as_str()))?;
                statement.bind((2, document.as_str()))?;
                statement.next()?;
            }
            Ok(())
        };

        match write() {
            Ok(()) => {
                conn.execute("COMMIT")?;
                debug!("Saved {} profiles", profiles.len());
                Ok(())
            }
            Err(e) => {
                conn.execute("ROLLBACK")?;
                Err(e)
            }
        }
    }

    fn current_profile_name(&self) -> Result<Option<String>> {
        self.get_setting(SETTING_CURRENT_PROFILE)
    }

    fn set_current_profile_name(&self, name: &str) -> Result<()> {
        self.set_setting(SETTING_CURRENT_PROFILE, name)
    }
}

impl NotificationHost for Database {
    fn request_permission(&self) -> Result<PermissionStatus> {
        match self.get_setting(SETTING_PERMISSION)? {
            Some(value) => Ok(value.parse().unwrap_or_else(|e| {
                warn!("Ignoring stored notification permission: {e}");
                PermissionStatus::NotDetermined
            })),
            None => {
                // Non-interactive host: the first request is recorded as granted.
                self.set_permission(PermissionStatus::Granted)?;
                Ok(PermissionStatus::Granted)
            }
        }
    }

    fn submit(&self, reminder: Reminder) -> Result<()> {
        let conn = self.conn()?;
        let id = reminder.id.to_string();
        let fire_at = reminder.fire_at.to_rfc3339();
        let user_info = serde_json::to_string(&reminder.user_info)?;

        let mut statement = conn.prepare(
            "INSERT INTO reminders (id, title, body, fire_at, badge_delta, user_info)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, id.as_str()))?;
        statement.bind((2, reminder.title.as_str()))?;
        statement.bind((3, reminder.body.as_str()))?;
        statement.bind((4, fire_at.as_str()))?;
        statement.bind((5, reminder.badge_delta))?;
        statement.bind((6, user_info.as_str()))?;
        statement.next()?;
        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<Reminder>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(
            "SELECT id, title, body, fire_at, badge_delta, user_info
             FROM reminders ORDER BY seq",
        )?;
        let mut reminders = Vec::new();
        while let State::Row = statement.next()? {
            reminders.push(Self::read_reminder(&statement)?);
        }
        Ok(reminders)
    }

    fn cancel(&self, reminder: &Reminder) -> Result<()> {
        let conn = self.conn()?;
        let id = reminder.id.to_string();
        let mut statement = conn.prepare("DELETE FROM reminders WHERE id = ?")?;
        statement.bind((1, id.as_str()))?;
        statement.next()?;
        Ok(())
    }

    fn cancel_all(&self) -> Result<()> {
        self.conn()?.execute("DELETE FROM reminders")?;
        Ok(())
    }

    fn badge(&self) -> Result<i64> {
        match self.get_setting(SETTING_BADGE)? {
            Some(value) => Ok(value.parse()?),
            None => Ok(0),
        }
    }

    fn set_badge(&self, value: i64) -> Result<()> {
        self.set_setting(SETTING_BADGE, &value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::history::TestHistoryStore;
    use crate::features::milestones::TestId;
    use crate::features::outcomes::OutcomeCatalog;
    use crate::features::reminders::host::TEST_NAME_KEY;
    use crate::features::reminders::ReminderScheduler;
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;

    fn reminder(test_name: &str) -> Reminder {
        let mut user_info = BTreeMap::new();
        user_info.insert(TEST_NAME_KEY.to_string(), test_name.to_string());
        Reminder {
            id: Uuid::new_v4(),
            title: "babynoggin Test Reminder".to_string(),
            body: "It's time to retry the test.".to_string(),
            fire_at: Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
            badge_delta: 1,
            user_info,
        }
    }

    #[test]
    fn test_profiles_round_trip() {
        let db = Database::new(":memory:").unwrap();
        assert!(db.load_profiles().unwrap().is_empty());

        let mut lucas = Profile::new("Lucas", NaiveDate::from_ymd_opt(2025, 6, 1));
        lucas.add_outcome(TestId::SelfRecognition, false);
        lucas.add_outcome(TestId::SelfRecognition, true);
        let mia = Profile::new("Mia", None);

        let mut profiles = BTreeMap::new();
        profiles.insert(lucas.name.clone(), lucas.clone());
        profiles.insert(mia.name.clone(), mia.clone());
        db.save_profiles(&profiles).unwrap();
        assert_eq!(db.load_profiles().unwrap(), profiles);

        // Saving replaces the whole store.
        profiles.remove("Mia");
        db.save_profiles(&profiles).unwrap();
        let loaded = db.load_profiles().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["Lucas"], lucas);
    }

    #[test]
    fn test_profiles_persist_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noggin.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new(path).unwrap();
            let mut profiles = BTreeMap::new();
            let mut lucas = Profile::new("Lucas", None);
            lucas.add_outcome(TestId::Hearing, false);
            profiles.insert("Lucas".to_string(), lucas);
            db.save_profiles(&profiles).unwrap();
            db.set_current_profile_name("Lucas").unwrap();
        }

        let db = Database::new(path).unwrap();
        let profiles = db.load_profiles().unwrap();
        assert_eq!(profiles["Lucas"].failed_count(TestId::Hearing), 1);
        assert_eq!(db.current_profile_name().unwrap().as_deref(), Some("Lucas"));
    }

    #[test]
    fn test_unreadable_profile_is_not_overwritten() {
        let db = Database::new(":memory:").unwrap();
        let history = TestHistoryStore::new(db.clone());
        history.create_profile("Lucas", None).unwrap();
        {
            let conn = db.conn().unwrap();
            conn.execute(
                "INSERT INTO profiles (name, document) VALUES ('Mia', '{\"records\":{\"futureTest\":{}}}')",
            )
            .unwrap();
        }

        assert!(db.load_profiles().is_err());
        assert!(history
            .record_outcome("Lucas", TestId::Hearing, false)
            .is_err());

        let conn = db.conn().unwrap();
        let mut statement = conn
            .prepare("SELECT COUNT(*) AS n FROM profiles WHERE name = 'Mia'")
            .unwrap();
        assert!(matches!(statement.next().unwrap(), State::Row));
        assert_eq!(statement.read::<i64, _>("n").unwrap(), 1);
    }

    #[test]
    fn test_garbled_permission_does_not_block_scheduling() {
        let db = Database::new(":memory:").unwrap();
        db.set_setting(SETTING_PERMISSION, "sort of").unwrap();
        assert_eq!(
            db.request_permission().unwrap(),
            PermissionStatus::NotDetermined
        );

        let scheduler = ReminderScheduler::new(
            db.clone(),
            Arc::new(OutcomeCatalog::builtin().unwrap()),
        );
        scheduler
            .schedule(TestId::Hearing, std::time::Duration::from_secs(60))
            .unwrap();
        assert!(scheduler.exists(TestId::Hearing).unwrap());
    }

    #[test]
    fn test_reminders_round_trip_in_submission_order() {
        let db = Database::new(":memory:").unwrap();
        let first = reminder("pincerGrasp");
        let second = reminder("unknownTest");
        db.submit(first.clone()).unwrap();
        db.submit(second.clone()).unwrap();

        assert_eq!(db.list_pending().unwrap(), vec![first.clone(), second.clone()]);

        db.cancel(&first).unwrap();
        assert_eq!(db.list_pending().unwrap(), vec![second]);

        // Cancelling twice is harmless.
        db.cancel(&first).unwrap();
        db.cancel_all().unwrap();
        assert!(db.list_pending().unwrap().is_empty());
    }

    #[test]
    fn test_badge_and_permission_settings() {
        let db = Database::new(":memory:").unwrap();
        assert_eq!(db.badge().unwrap(), 0);
        db.set_badge(2).unwrap();
        db.set_badge(3).unwrap();
        assert_eq!(db.badge().unwrap(), 3);

        assert_eq!(db.request_permission().unwrap(), PermissionStatus::Granted);
        db.set_permission(PermissionStatus::Denied).unwrap();
        assert_eq!(db.request_permission().unwrap(), PermissionStatus::Denied);
    }
}
