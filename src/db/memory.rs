// SPDX-License-Identifier: MIT

//! In-memory profile store for tests and local development.
//!
//! Supports failure injection so persistence outages can be simulated
//! deterministically.

use crate::db::ProfileStore;
use crate::error::AppError;
use crate::models::{Profile, ProfileUpdate};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory `ProfileStore` backed by a concurrent map.
#[derive(Default)]
pub struct MemoryStore {
    profiles: DashMap<String, Profile>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every store operation returns a transient database error.
    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Direct read, bypassing failure injection. Test assertions only.
    pub fn peek(&self, uid: &str) -> Option<Profile> {
        self.profiles.get(uid).map(|p| p.clone())
    }

    /// Direct write, bypassing failure injection. Test seeding only.
    pub fn seed(&self, profile: Profile) {
        self.profiles.insert(profile.uid.clone(), profile);
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "Simulated persistence outage".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, AppError> {
        self.check_available()?;
        Ok(self.profiles.get(uid).map(|p| p.clone()))
    }

    async fn create_profile(&self, profile: &Profile) -> Result<(), AppError> {
        self.check_available()?;
        self.profiles.insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> Result<(), AppError> {
        self.check_available()?;
        let mut entry = self.profiles.get_mut(uid).ok_or_else(|| {
            AppError::Database(format!("No profile document to update: {}", uid))
        })?;

        let profile = entry.value_mut();
        if let Some(email) = &update.email {
            profile.email = Some(email.clone());
        }
        if let Some(display_name) = &update.display_name {
            profile.display_name = display_name.clone();
        }
        if let Some(photo_url) = &update.photo_url {
            profile.photo_url = Some(photo_url.clone());
        }
        if let Some(last_login) = &update.last_login {
            profile.last_login = last_login.clone();
        }
        if let Some(plan) = &update.subscription_plan {
            profile.subscription_plan = plan.clone();
        }
        if let Some(status) = update.subscription_status {
            profile.subscription_status = status;
        }
        if let Some(buy_date) = &update.subscription_buy_date {
            profile.subscription_buy_date = Some(buy_date.clone());
        }
        if let Some(expiry) = &update.subscription_expiry_date {
            profile.subscription_expiry_date = Some(expiry.clone());
        }
        Ok(())
    }
}
