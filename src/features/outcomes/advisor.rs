//! # Outcome Advisor
//!
//! The one generic "outcome screen": records an attempt, picks the advice bucket for the
//! profile's failure count, and keeps the retry reminder for the test in step with it.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::features::history::{ProfileStore, TestHistoryStore};
use crate::features::milestones::TestId;
use crate::features::reminders::{NotificationHost, ReminderScheduler};
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::time::Duration;

/// Headline shown for a passed test
pub const PASSED_HEADLINE: &str = "Great job!";

/// Message shown for a passed test
pub const PASSED_MESSAGE: &str = "Baby passed this test. Keep playing together and check back on the next milestone.";

/// What happened to the retry reminder for the test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReminderDecision {
    /// A new reminder was scheduled
    Scheduled {
        fire_at: DateTime<Utc>,
        confirmation: String,
    },
    /// The bucket asks for a reminder but one is already pending
    AlreadyPending,
    /// The test was passed and a pending reminder was cancelled
    Cancelled,
    /// No reminder change
    NotRequested,
}

/// Everything an outcome screen displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeView {
    pub test_id: TestId,
    pub passed: bool,
    pub failed_count: usize,
    pub headline: Option<String>,
    pub message: String,
    pub reminder: ReminderDecision,
}

pub struct OutcomeAdvisor<'a, S: ProfileStore, H: NotificationHost> {
    history: &'a TestHistoryStore<S>,
    scheduler: &'a ReminderScheduler<H>,
}

impl<'a, S: ProfileStore, H: NotificationHost> OutcomeAdvisor<'a, S, H> {
    pub fn new(history: &'a TestHistoryStore<S>, scheduler: &'a ReminderScheduler<H>) -> Self {
        Self { history, scheduler }
    }

    /// Record one attempt and return the view for the resulting history
    pub fn record(&self, profile: &str, test_id: TestId, passed: bool) -> Result<OutcomeView> {
        self.history.record_outcome(profile, test_id, passed)?;
        info!(
            "{} {} the {} test",
            profile,
            if passed { "passed" } else { "failed" },
            test_id
        );

        if passed {
            let failed_count = self.history.failed_count(profile, test_id)?;
            let reminder = if self.scheduler.cancel(test_id)? {
                ReminderDecision::Cancelled
            } else {
                ReminderDecision::NotRequested
            };
            return Ok(Self::passed_view(test_id, failed_count, reminder));
        }

        self.failed_view(profile, test_id, true)
    }

    /// View for the current history without recording or scheduling anything
    pub fn advise(&self, profile: &str, test_id: TestId) -> Result<OutcomeView> {
        let last = self
            .history
            .load(profile)?
            .record(test_id)
            .and_then(|r| r.last_outcome());

        match last {
            Some(true) => {
                let failed_count = self.history.failed_count(profile, test_id)?;
                Ok(Self::passed_view(
                    test_id,
                    failed_count,
                    ReminderDecision::NotRequested,
                ))
            }
            _ => self.failed_view(profile, test_id, false),
        }
    }

    fn failed_view(&self, profile: &str, test_id: TestId, schedule: bool) -> Result<OutcomeView> {
        let failed_count = self.history.failed_count(profile, test_id)?;
        let entry = self
            .scheduler
            .catalog()
            .entry(test_id)
            .ok_or_else(|| anyhow::anyhow!("No outcome configured for {}", test_id))?;
        let bucket = entry.select(failed_count).ok_or_else(|| {
            anyhow::anyhow!("No outcome bucket for {} failures of {}", failed_count, test_id)
        })?;

        let reminder = if !bucket.schedule_reminder {
            ReminderDecision::NotRequested
        } else if self.scheduler.exists(test_id)? {
            debug!("{test_id} reminder already pending");
            ReminderDecision::AlreadyPending
        } else if schedule {
            let delay = Duration::from_secs(entry.reminder_delay_seconds);
            let reminder = self.scheduler.schedule(test_id, delay)?;
            ReminderDecision::Scheduled {
                fire_at: reminder.fire_at,
                confirmation: self.scheduler.confirmation_message(test_id, delay),
            }
        } else {
            ReminderDecision::NotRequested
        };

        Ok(OutcomeView {
            test_id,
            passed: false,
            failed_count,
            headline: bucket.headline.clone(),
            message: bucket.message.clone(),
            reminder,
        })
    }

    fn passed_view(test_id: TestId, failed_count: usize, reminder: ReminderDecision) -> OutcomeView {
        OutcomeView {
            test_id,
            passed: true,
            failed_count,
            headline: Some(PASSED_HEADLINE.to_string()),
            message: PASSED_MESSAGE.to_string(),
            reminder,
        }
    }
}
