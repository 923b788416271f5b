//! # Reminder Scheduler
//!
//! Keeps at most one retry reminder per test with the host notification subsystem and
//! mirrors pending reminders into the badge counter. Reminders are keyed by test id only,
//! so two profiles failing the same test share one reminder.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use super::events::{ReminderEvent, EVENT_CHANNEL_CAPACITY};
use super::host::{NotificationHost, PermissionStatus, Reminder, TEST_NAME_KEY};
use crate::core::duration::format_duration;
use crate::features::milestones::TestId;
use crate::features::outcomes::{Destination, OutcomeCatalog};
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Title of every retry reminder
pub const REMINDER_TITLE: &str = "babynoggin Test Reminder";

/// Title of the alert confirming a scheduled reminder
pub const CONFIRMED_TITLE: &str = "All set!";

/// A due reminder that has been handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub reminder: Reminder,
    pub destination: Destination,
}

pub struct ReminderScheduler<H: NotificationHost> {
    host: H,
    catalog: Arc<OutcomeCatalog>,
    event_tx: broadcast::Sender<ReminderEvent>,
}

impl<H: NotificationHost> ReminderScheduler<H> {
    pub fn new(host: H, catalog: Arc<OutcomeCatalog>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            host,
            catalog,
            event_tx,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn catalog(&self) -> &OutcomeCatalog {
        &self.catalog
    }

    /// Receive "scheduled" and "removed" events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ReminderEvent> {
        self.event_tx.subscribe()
    }

    /// Schedule a retry reminder for `test_id` firing after `delay`.
    ///
    /// Does not deduplicate; gate with [`exists`](Self::exists).
    pub fn schedule(&self, test_id: TestId, delay: Duration) -> Result<Reminder> {
        // Denial only means the reminder will not surface visibly.
        match self.host.request_permission()? {
            PermissionStatus::Granted => {}
            status => debug!("Scheduling {test_id} reminder without alert permission ({status})"),
        }

        let fire_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or_else(|| anyhow::anyhow!("Reminder delay too large: {}", format_duration(delay)))?;
        let mut user_info = BTreeMap::new();
        user_info.insert(TEST_NAME_KEY.to_string(), test_id.as_str().to_string());

        let reminder = Reminder {
            id: Uuid::new_v4(),
            title: REMINDER_TITLE.to_string(),
            body: format!(
                "It's time to retry the {} test if your baby has not yet passed.",
                test_id.display_name()
            ),
            fire_at,
            badge_delta: 1,
            user_info,
        };

        let badge = self.host.badge()?;
        self.host.set_badge(badge + reminder.badge_delta)?;
        self.host.submit(reminder.clone())?;

        info!(
            "Scheduled {} reminder {} for {}",
            test_id,
            reminder.id,
            reminder.fire_at.format("%Y-%m-%d %H:%M:%S")
        );
        self.emit(ReminderEvent::Scheduled { test_id });

        Ok(reminder)
    }

    /// Whether a pending reminder carries `test_id` in its metadata
    pub fn exists(&self, test_id: TestId) -> Result<bool> {
        Ok(self.find(test_id)?.is_some())
    }

    /// Cancel the first pending reminder for `test_id`; `Ok(false)` if there was none
    pub fn cancel(&self, test_id: TestId) -> Result<bool> {
        let Some(reminder) = self.find(test_id)? else {
            debug!("No pending {test_id} reminder to cancel");
            return Ok(false);
        };

        self.host.cancel(&reminder)?;
        self.decrement_badge(reminder.badge_delta)?;

        info!("Cancelled {} reminder {}", test_id, reminder.id);
        self.emit(ReminderEvent::Removed { test_id });
        Ok(true)
    }

    /// Handle a reminder the user opened and return the screen to show.
    ///
    /// Unknown or missing test names fall back to the milestones list.
    pub fn handle_fired(&self, reminder: &Reminder) -> Result<Destination> {
        let test_id = reminder.test_id();

        self.decrement_badge(reminder.badge_delta)?;
        self.host.cancel(reminder)?;

        match test_id {
            Some(test_id) => {
                info!("Handled {} reminder {}", test_id, reminder.id);
                self.emit(ReminderEvent::Removed { test_id });
            }
            None => warn!(
                "Reminder {} has unrecognized test name {:?}",
                reminder.id,
                reminder.test_name()
            ),
        }

        Ok(self.catalog.destination(test_id))
    }

    /// Cancel every pending reminder and reset the badge
    pub fn clear_all(&self) -> Result<()> {
        self.host.cancel_all()?;
        self.host.set_badge(0)?;
        info!("Cleared all reminders");
        Ok(())
    }

    pub fn pending(&self) -> Result<Vec<Reminder>> {
        self.host.list_pending()
    }

    pub fn badge(&self) -> Result<i64> {
        self.host.badge()
    }

    /// Handle every reminder due at `now`, earliest first
    pub fn deliver_due(&self, now: DateTime<Utc>) -> Result<Vec<Delivery>> {
        let mut due: Vec<Reminder> = self
            .host
            .list_pending()?
            .into_iter()
            .filter(|r| r.is_due(now))
            .collect();
        due.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));

        let mut deliveries = Vec::with_capacity(due.len());
        for reminder in due {
            let destination = self.handle_fired(&reminder)?;
            deliveries.push(Delivery {
                reminder,
                destination,
            });
        }
        Ok(deliveries)
    }

    /// Poll for due reminders every `poll` and pass each delivery to `on_delivery`.
    ///
    /// Polling errors are logged and the loop keeps going.
    pub async fn run<F>(&self, poll: Duration, mut on_delivery: F)
    where
        F: FnMut(Delivery),
    {
        info!("Reminder scheduler polling every {}", format_duration(poll));
        let mut interval = tokio::time::interval(poll);
        loop {
            interval.tick().await;
            match self.deliver_due(Utc::now()) {
                Ok(deliveries) => {
                    for delivery in deliveries {
                        on_delivery(delivery);
                    }
                }
                Err(e) => error!("Failed to deliver due reminders: {e}"),
            }
        }
    }

    /// Message of the alert confirming a scheduled reminder
    pub fn confirmation_message(&self, test_id: TestId, delay: Duration) -> String {
        format!(
            "A notification has been scheduled when it is time to try the {} test again in {}",
            test_id.display_name(),
            format_duration(delay)
        )
    }

    fn find(&self, test_id: TestId) -> Result<Option<Reminder>> {
        Ok(self
            .host
            .list_pending()?
            .into_iter()
            .find(|r| r.test_name() == Some(test_id.as_str())))
    }

    fn decrement_badge(&self, delta: i64) -> Result<()> {
        let badge = self.host.badge()?;
        self.host.set_badge((badge - delta).max(0))
    }

    fn emit(&self, event: ReminderEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::host::InMemoryNotificationHost;

    fn scheduler() -> ReminderScheduler<InMemoryNotificationHost> {
        ReminderScheduler::new(
            InMemoryNotificationHost::new(),
            Arc::new(OutcomeCatalog::builtin().unwrap()),
        )
    }

    fn foreign_reminder(test_name: Option<&str>, fire_at: DateTime<Utc>) -> Reminder {
        let mut user_info = BTreeMap::new();
        if let Some(name) = test_name {
            user_info.insert(TEST_NAME_KEY.to_string(), name.to_string());
        }
        Reminder {
            id: Uuid::new_v4(),
            title: REMINDER_TITLE.to_string(),
            body: "body".to_string(),
            fire_at,
            badge_delta: 1,
            user_info,
        }
    }

    #[test]
    fn test_schedule_then_exists() {
        let scheduler = scheduler();
        for test_id in TestId::ALL {
            scheduler.schedule(test_id, Duration::from_secs(60)).unwrap();
            assert!(scheduler.exists(test_id).unwrap());
        }
        assert_eq!(scheduler.badge().unwrap(), TestId::ALL.len() as i64);
    }

    #[test]
    fn test_pincer_grasp_schedule_and_cancel() {
        let scheduler = scheduler();
        scheduler
            .schedule(TestId::PincerGrasp, Duration::from_secs(5))
            .unwrap();
        assert!(scheduler.exists(TestId::PincerGrasp).unwrap());

        assert!(scheduler.cancel(TestId::PincerGrasp).unwrap());
        assert!(!scheduler.exists(TestId::PincerGrasp).unwrap());
    }

    #[test]
    fn test_cancel_restores_badge() {
        let scheduler = scheduler();
        scheduler.host().set_badge(3).unwrap();

        scheduler
            .schedule(TestId::Hearing, Duration::from_secs(60))
            .unwrap();
        assert_eq!(scheduler.badge().unwrap(), 4);

        scheduler.cancel(TestId::Hearing).unwrap();
        assert_eq!(scheduler.badge().unwrap(), 3);
    }

    #[test]
    fn test_cancel_missing_is_silent() {
        let scheduler = scheduler();
        let mut events = scheduler.subscribe();

        assert!(!scheduler.cancel(TestId::Symmetry).unwrap());
        assert_eq!(scheduler.badge().unwrap(), 0);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_cancel_removes_first_match_only() {
        let scheduler = scheduler();
        scheduler
            .schedule(TestId::Symmetry, Duration::from_secs(10))
            .unwrap();
        scheduler
            .schedule(TestId::Symmetry, Duration::from_secs(20))
            .unwrap();

        scheduler.cancel(TestId::Symmetry).unwrap();
        let pending = scheduler.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert!(scheduler.exists(TestId::Symmetry).unwrap());
        assert_eq!(scheduler.badge().unwrap(), 1);
    }

    #[test]
    fn test_clear_all() {
        let scheduler = scheduler();
        scheduler
            .schedule(TestId::FacialMimic, Duration::from_secs(10))
            .unwrap();
        scheduler
            .schedule(TestId::CrossingEyes, Duration::from_secs(10))
            .unwrap();
        scheduler.host().set_badge(9).unwrap();

        scheduler.clear_all().unwrap();
        assert!(!scheduler.exists(TestId::FacialMimic).unwrap());
        assert!(!scheduler.exists(TestId::CrossingEyes).unwrap());
        assert_eq!(scheduler.badge().unwrap(), 0);
    }

    #[test]
    fn test_events_carry_test_id() {
        let scheduler = scheduler();
        let mut events = scheduler.subscribe();

        scheduler
            .schedule(TestId::SocialSmiling, Duration::from_secs(10))
            .unwrap();
        scheduler.cancel(TestId::SocialSmiling).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            ReminderEvent::Scheduled {
                test_id: TestId::SocialSmiling
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            ReminderEvent::Removed {
                test_id: TestId::SocialSmiling
            }
        );
    }

    #[test]
    fn test_reminder_copy() {
        let scheduler = scheduler();
        let reminder = scheduler
            .schedule(TestId::PincerGrasp, Duration::from_secs(10))
            .unwrap();

        assert_eq!(reminder.title, REMINDER_TITLE);
        assert_eq!(
            reminder.body,
            "It's time to retry the Pincer Grasp test if your baby has not yet passed."
        );
        assert_eq!(reminder.test_id(), Some(TestId::PincerGrasp));
        assert_eq!(
            scheduler.confirmation_message(TestId::PincerGrasp, Duration::from_secs(1209600)),
            "A notification has been scheduled when it is time to try the Pincer Grasp test again in 2 weeks"
        );
    }

    #[test]
    fn test_permission_denied_still_schedules() {
        let scheduler = ReminderScheduler::new(
            InMemoryNotificationHost::denying(),
            Arc::new(OutcomeCatalog::builtin().unwrap()),
        );
        scheduler
            .schedule(TestId::Hearing, Duration::from_secs(10))
            .unwrap();
        assert!(scheduler.exists(TestId::Hearing).unwrap());
    }

    #[test]
    fn test_oversized_delay_is_an_error() {
        let scheduler = scheduler();
        let delay = Duration::from_secs(15_000_000 * 7 * 24 * 60 * 60);

        assert!(scheduler.schedule(TestId::Hearing, delay).is_err());
        assert!(!scheduler.exists(TestId::Hearing).unwrap());
        assert_eq!(scheduler.badge().unwrap(), 0);
    }

    #[test]
    fn test_handle_fired_known_test() {
        let scheduler = scheduler();
        let reminder = scheduler
            .schedule(TestId::SelfRecognition, Duration::from_secs(10))
            .unwrap();
        let mut events = scheduler.subscribe();

        let destination = scheduler.handle_fired(&reminder).unwrap();
        assert_eq!(
            destination,
            Destination::Test {
                test_id: TestId::SelfRecognition,
                screen: "WhyIsSelfRecognition".to_string()
            }
        );
        assert!(!scheduler.exists(TestId::SelfRecognition).unwrap());
        assert_eq!(scheduler.badge().unwrap(), 0);
        assert_eq!(
            events.try_recv().unwrap(),
            ReminderEvent::Removed {
                test_id: TestId::SelfRecognition
            }
        );
    }

    #[test]
    fn test_handle_fired_unknown_test_goes_to_milestones() {
        let scheduler = scheduler();
        let reminder = foreign_reminder(Some("unknownTest"), Utc::now());
        scheduler.host().submit(reminder.clone()).unwrap();
        scheduler.host().set_badge(1).unwrap();

        assert_eq!(
            scheduler.handle_fired(&reminder).unwrap(),
            Destination::Milestones
        );
        assert!(scheduler.pending().unwrap().is_empty());
        assert_eq!(scheduler.badge().unwrap(), 0);

        let missing = foreign_reminder(None, Utc::now());
        assert_eq!(
            scheduler.handle_fired(&missing).unwrap(),
            Destination::Milestones
        );
        // Never below zero
        assert_eq!(scheduler.badge().unwrap(), 0);
    }

    #[test]
    fn test_deliver_due_in_fire_order() {
        let scheduler = scheduler();
        let now = Utc::now();
        let later = foreign_reminder(Some("hearing"), now - chrono::Duration::seconds(10));
        let earlier = foreign_reminder(Some("symmetry"), now - chrono::Duration::seconds(60));
        let future = foreign_reminder(Some("plasticJar"), now + chrono::Duration::hours(1));
        for r in [&later, &earlier, &future] {
            scheduler.host().submit(r.clone()).unwrap();
        }
        scheduler.host().set_badge(3).unwrap();

        let deliveries = scheduler.deliver_due(now).unwrap();
        let ids: Vec<Uuid> = deliveries.iter().map(|d| d.reminder.id).collect();
        assert_eq!(ids, vec![earlier.id, later.id]);
        assert_eq!(deliveries[1].destination.screen_id(), "WhyIsHearing");

        assert_eq!(scheduler.pending().unwrap(), vec![future]);
        assert_eq!(scheduler.badge().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_delivers_due_reminders() {
        let scheduler = scheduler();
        scheduler
            .host()
            .submit(foreign_reminder(
                Some("letsCrawl"),
                Utc::now() - chrono::Duration::seconds(1),
            ))
            .unwrap();

        let mut delivered = Vec::new();
        let _ = tokio::time::timeout(
            Duration::from_millis(100),
            scheduler.run(Duration::from_millis(10), |d| delivered.push(d)),
        )
        .await;

        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].destination.screen_id(), "WhyIsCrawling");
    }
}
