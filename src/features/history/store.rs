//! # Test History Store
//!
//! Per-profile, per-test pass/fail history. Every read reloads the whole profile store from
//! its backend and every write persists the whole store back, so screens never see stale
//! in-memory data. There is no isolation between concurrent read-modify-write cycles.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use super::profile::Profile;
use crate::features::milestones::TestId;
use anyhow::Result;
use chrono::NaiveDate;
use dashmap::DashMap;
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Durable storage for the profile store
pub trait ProfileStore {
    /// Read every persisted profile, keyed by name
    fn load_profiles(&self) -> Result<BTreeMap<String, Profile>>;

    /// Replace the persisted profile store with `profiles`
    fn save_profiles(&self, profiles: &BTreeMap<String, Profile>) -> Result<()>;

    /// Name of the profile selected in the app, if any
    fn current_profile_name(&self) -> Result<Option<String>>;

    fn set_current_profile_name(&self, name: &str) -> Result<()>;
}

/// Volatile profile store for tests and dry runs
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<String, Profile>,
    current: RwLock<Option<String>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_profiles(&self) -> Result<BTreeMap<String, Profile>> {
        Ok(self
            .profiles
            .iter()
            .map(|p| (p.key().clone(), p.value().clone()))
            .collect())
    }

    fn save_profiles(&self, profiles: &BTreeMap<String, Profile>) -> Result<()> {
        self.profiles.clear();
        for (name, profile) in profiles {
            self.profiles.insert(name.clone(), profile.clone());
        }
        Ok(())
    }

    fn current_profile_name(&self) -> Result<Option<String>> {
        let current = self
            .current
            .read()
            .map_err(|_| anyhow::anyhow!("current profile lock poisoned"))?;
        Ok(current.clone())
    }

    fn set_current_profile_name(&self, name: &str) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|_| anyhow::anyhow!("current profile lock poisoned"))?;
        *current = Some(name.to_string());
        Ok(())
    }
}

/// Records outcomes and answers failure-count queries over a [`ProfileStore`]
pub struct TestHistoryStore<S: ProfileStore> {
    store: S,
}

impl<S: ProfileStore> TestHistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Create a new, empty profile. Fails if the name is taken.
    pub fn create_profile(&self, name: &str, birth_date: Option<NaiveDate>) -> Result<Profile> {
        let name = profile_name(name)?;

        let mut profiles = self.store.load_profiles()?;
        if profiles.contains_key(name) {
            return Err(anyhow::anyhow!("Profile already exists: {}", name));
        }

        let profile = Profile::new(name, birth_date);
        profiles.insert(name.to_string(), profile.clone());
        self.persist(&profiles)?;

        info!("Created profile {name}");
        Ok(profile)
    }

    /// Fresh copy of a profile with all test histories
    pub fn load(&self, name: &str) -> Result<Profile> {
        let name = profile_name(name)?;
        self.store
            .load_profiles()?
            .remove(name)
            .ok_or_else(|| anyhow::anyhow!("Profile not found: {}", name))
    }

    pub fn profiles(&self) -> Result<Vec<Profile>> {
        Ok(self.store.load_profiles()?.into_values().collect())
    }

    /// Insert or replace a profile
    pub fn save(&self, profile: &Profile) -> Result<()> {
        let mut profiles = self.store.load_profiles()?;
        profiles.insert(profile.name.clone(), profile.clone());
        self.persist(&profiles)
    }

    /// Remove a profile; returns whether it existed
    pub fn remove_profile(&self, name: &str) -> Result<bool> {
        let name = profile_name(name)?;
        let mut profiles = self.store.load_profiles()?;
        let removed = profiles.remove(name).is_some();
        if removed {
            self.persist(&profiles)?;
            info!("Removed profile {name}");
        }
        Ok(removed)
    }

    /// Append an outcome for (profile, test) and persist the whole store.
    ///
    /// Recording against an unknown profile creates it.
    pub fn record_outcome(&self, profile: &str, test_id: TestId, passed: bool) -> Result<()> {
        let profile = profile_name(profile)?;
        let mut profiles = self.store.load_profiles()?;
        profiles
            .entry(profile.to_string())
            .or_insert_with(|| Profile::new(profile, None))
            .add_outcome(test_id, passed);

        self.persist(&profiles)?;

        debug!(
            "Recorded {} for {} on {}",
            if passed { "pass" } else { "fail" },
            profile,
            test_id
        );
        Ok(())
    }

    /// Cumulative number of failed attempts; 0 for unknown profiles
    pub fn failed_count(&self, profile: &str, test_id: TestId) -> Result<usize> {
        let profile = profile.trim();
        Ok(self
            .store
            .load_profiles()?
            .get(profile)
            .map(|p| p.failed_count(test_id))
            .unwrap_or(0))
    }

    pub fn current_profile(&self) -> Result<Option<String>> {
        self.store.current_profile_name()
    }

    /// Select the profile the app is working with. The profile must exist.
    pub fn set_current_profile(&self, name: &str) -> Result<()> {
        let name = profile_name(name)?;
        if !self.store.load_profiles()?.contains_key(name) {
            return Err(anyhow::anyhow!("Profile not found: {}", name));
        }
        self.store.set_current_profile_name(name)?;
        info!("Current profile set to {name}");
        Ok(())
    }

    fn persist(&self, profiles: &BTreeMap<String, Profile>) -> Result<()> {
        self.store.save_profiles(profiles).map_err(|e| {
            error!("Failed to persist profile store: {e}");
            e
        })
    }
}

/// Profile names are stored trimmed and must not be blank
fn profile_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow::anyhow!("Profile name must not be empty"));
    }
    Ok(name)
}
