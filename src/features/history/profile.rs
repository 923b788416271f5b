//! Child profiles and their per-test outcome records.

use crate::features::milestones::TestId;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered pass/fail results for one test, oldest attempt first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    pub test_id: TestId,
    #[serde(default)]
    pub outcomes: Vec<bool>,
}

impl TestRecord {
    pub fn new(test_id: TestId) -> Self {
        Self {
            test_id,
            outcomes: Vec::new(),
        }
    }

    /// Cumulative number of failed attempts
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|passed| !**passed).count()
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.len() - self.failed_count()
    }

    pub fn last_outcome(&self) -> Option<bool> {
        self.outcomes.last().copied()
    }
}

/// A tracked child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub records: BTreeMap<TestId, TestRecord>,
}

impl Profile {
    pub fn new(name: impl Into<String>, birth_date: Option<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            birth_date,
            records: BTreeMap::new(),
        }
    }

    /// Append an outcome to the record for `test_id`, creating it on first use
    pub fn add_outcome(&mut self, test_id: TestId, passed: bool) {
        self.records
            .entry(test_id)
            .or_insert_with(|| TestRecord::new(test_id))
            .outcomes
            .push(passed);
    }

    pub fn record(&self, test_id: TestId) -> Option<&TestRecord> {
        self.records.get(&test_id)
    }

    pub fn failed_count(&self, test_id: TestId) -> usize {
        self.record(test_id).map(TestRecord::failed_count).unwrap_or(0)
    }

    /// Whole months elapsed between the birth date and `today`
    pub fn age_in_months(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if today < birth {
            return Some(0);
        }
        let mut months = (today.year() - birth.year()) * 12 + today.month() as i32
            - birth.month() as i32;
        if today.day() < birth.day() {
            months -= 1;
        }
        Some(months.max(0) as u32)
    }
}
