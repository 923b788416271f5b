//! # Outcome Catalog
//!
//! YAML-based per-test configuration table: advice buckets keyed by cumulative failure
//! count, the retry reminder delay, and the screen a fired reminder opens.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::features::milestones::TestId;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Catalog shipped with the crate
const BUILTIN_CATALOG: &str = include_str!("../../../catalog/milestones.yaml");

/// Screen opened for reminders whose test is unknown or has no dedicated screen
pub const MILESTONES_SCREEN: &str = "Milestones";

/// Root configuration containing every test entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutcomeCatalog {
    pub tests: Vec<TestEntry>,
}

/// Configuration for a single milestone test
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestEntry {
    pub id: TestId,

    /// Screen to open when a reminder for this test fires
    #[serde(default)]
    pub screen: Option<String>,

    /// Delay before the retry reminder is presented
    pub reminder_delay_seconds: u64,

    /// Ordered advice buckets
    pub outcomes: Vec<OutcomeBucket>,
}

/// One advice bucket, matched when `failed <= max_failed`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutcomeBucket {
    /// Inclusive upper bound; absent means unbounded
    #[serde(default)]
    pub max_failed: Option<u32>,

    #[serde(default)]
    pub headline: Option<String>,

    pub message: String,

    #[serde(default)]
    pub schedule_reminder: bool,
}

/// Where a fired reminder takes the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// The introduction screen of a specific test
    Test { test_id: TestId, screen: String },
    /// The milestones list
    Milestones,
}

impl Destination {
    pub fn screen_id(&self) -> &str {
        match self {
            Destination::Test { screen, .. } => screen,
            Destination::Milestones => MILESTONES_SCREEN,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Test { test_id, screen } => write!(f, "{screen} ({test_id})"),
            Destination::Milestones => write!(f, "{MILESTONES_SCREEN}"),
        }
    }
}

impl OutcomeCatalog {
    /// Load the catalog compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Load a catalog from a YAML file
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let catalog: OutcomeCatalog = serde_yaml::from_str(contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate every entry in the catalog
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for entry in &self.tests {
            if !seen.insert(entry.id) {
                return Err(anyhow::anyhow!("Duplicate catalog entry: {}", entry.id));
            }

            if entry.outcomes.is_empty() {
                return Err(anyhow::anyhow!("Test {} has no outcome buckets", entry.id));
            }

            let last = entry.outcomes.len() - 1;
            let mut previous: Option<u32> = None;
            for (index, bucket) in entry.outcomes.iter().enumerate() {
                if bucket.message.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "Test {} has an empty message in bucket {}",
                        entry.id,
                        index
                    ));
                }

                match bucket.max_failed {
                    Some(max) => {
                        if index == last {
                            return Err(anyhow::anyhow!(
                                "Test {}: last bucket must be unbounded (omit max_failed)",
                                entry.id
                            ));
                        }
                        if previous.is_some_and(|p| max <= p) {
                            return Err(anyhow::anyhow!(
                                "Test {}: max_failed must increase, got {} after {}",
                                entry.id,
                                max,
                                previous.unwrap_or_default()
                            ));
                        }
                        previous = Some(max);
                    }
                    None if index != last => {
                        return Err(anyhow::anyhow!(
                            "Test {}: only the last bucket may omit max_failed",
                            entry.id
                        ));
                    }
                    None => {}
                }
            }

            if let Some(screen) = &entry.screen {
                if screen.trim().is_empty() {
                    return Err(anyhow::anyhow!("Test {} has an empty screen id", entry.id));
                }
            }
        }
        Ok(())
    }

    pub fn entry(&self, test_id: TestId) -> Option<&TestEntry> {
        self.tests.iter().find(|e| e.id == test_id)
    }

    /// Select the advice bucket for a cumulative failure count
    pub fn select(&self, test_id: TestId, failed: usize) -> Option<&OutcomeBucket> {
        self.entry(test_id).and_then(|e| e.select(failed))
    }

    /// Reminder delay for a test, falling back to `default` for tests not in the catalog
    pub fn reminder_delay(&self, test_id: TestId, default: Duration) -> Duration {
        self.entry(test_id)
            .map(|e| Duration::from_secs(e.reminder_delay_seconds))
            .unwrap_or(default)
    }

    /// Resolve the screen for a reminder's test id
    pub fn destination(&self, test_id: Option<TestId>) -> Destination {
        test_id
            .and_then(|id| {
                self.entry(id).and_then(|e| {
                    e.screen.as_ref().map(|screen| Destination::Test {
                        test_id: id,
                        screen: screen.clone(),
                    })
                })
            })
            .unwrap_or(Destination::Milestones)
    }
}

impl TestEntry {
    pub fn select(&self, failed: usize) -> Option<&OutcomeBucket> {
        self.outcomes.iter().find(|b| match b.max_failed {
            Some(max) => failed <= max as usize,
            None => true,
        })
    }
}
