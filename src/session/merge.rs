// SPDX-License-Identifier: MIT

//! Total merge of identity, stored profile, and computed defaults.
//!
//! Field precedence, applied uniformly:
//! - `display_name`: identity (non-empty) > stored (non-empty) > email local
//!   part > `"User"`
//! - `photo_url`: identity (non-empty) > stored > none
//! - `email`: identity > stored (kept in sync with the provider)
//! - `created_at`: stored > now (set exactly once)
//! - `last_login`: always now
//! - subscription fields: stored (post-expiry-check) > free/inactive defaults
//!
//! Callers run the lazy-expiry check before merging, so a stored "active"
//! subscription seen here is always current.

use crate::models::profile::plans;
use crate::models::{Identity, Profile, ProfileUpdate, SubscriptionStatus};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};

const FALLBACK_DISPLAY_NAME: &str = "User";

/// Derive the default display name from an email's local part.
pub fn default_display_name(email: Option<&str>) -> String {
    email
        .and_then(|e| e.split('@').next())
        .filter(|local| !local.is_empty())
        .unwrap_or(FALLBACK_DISPLAY_NAME)
        .to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn canonical_display_name(identity: &Identity, stored: Option<&Profile>) -> String {
    if let Some(name) = non_empty(identity.display_name.as_deref()) {
        return name.to_string();
    }
    if let Some(name) = stored.and_then(|p| non_empty(Some(&p.display_name))) {
        return name.to_string();
    }
    default_display_name(identity.email.as_deref())
}

fn canonical_photo_url(identity: &Identity, stored: Option<&Profile>) -> Option<String> {
    non_empty(identity.photo_url.as_deref())
        .map(str::to_string)
        .or_else(|| stored.and_then(|p| p.photo_url.clone()))
}

/// Compute the canonical profile for one reconciliation pass.
pub fn merge_profile(
    identity: &Identity,
    stored: Option<&Profile>,
    now: DateTime<Utc>,
) -> Profile {
    let now_str = format_utc_rfc3339(now);

    let mut profile = Profile {
        uid: identity.uid.clone(),
        email: identity
            .email
            .clone()
            .or_else(|| stored.and_then(|p| p.email.clone())),
        display_name: canonical_display_name(identity, stored),
        photo_url: canonical_photo_url(identity, stored),
        created_at: stored
            .map(|p| p.created_at.clone())
            .unwrap_or_else(|| now_str.clone()),
        last_login: now_str,
        subscription_plan: stored
            .map(|p| p.subscription_plan.clone())
            .unwrap_or_else(|| plans::FREE.to_string()),
        subscription_status: stored
            .map(|p| p.subscription_status)
            .unwrap_or(SubscriptionStatus::Inactive),
        subscription_buy_date: stored.and_then(|p| p.subscription_buy_date.clone()),
        subscription_expiry_date: stored.and_then(|p| p.subscription_expiry_date.clone()),
    };

    // The free tier is never "active": paid semantics require a paid plan.
    if profile.subscription_plan == plans::FREE
        && profile.subscription_status == SubscriptionStatus::Active
    {
        profile.subscription_status = SubscriptionStatus::Inactive;
    }

    profile
}

/// Degraded in-memory profile used when persistence is unreachable:
/// identity fields plus default subscription values. Never blocks the
/// application on a transient persistence outage.
pub fn fallback_profile(identity: &Identity, now: DateTime<Utc>) -> Profile {
    merge_profile(identity, None, now)
}

/// The partial write for an existing profile: `last_login` always, plus any
/// identity-derived or subscription field the merge changed. `created_at`
/// is never part of an update.
pub fn diff_update(merged: &Profile, previous: &Profile) -> ProfileUpdate {
    let mut update = ProfileUpdate {
        last_login: Some(merged.last_login.clone()),
        ..ProfileUpdate::default()
    };

    if merged.email != previous.email {
        update.email = merged.email.clone();
    }
    if merged.display_name != previous.display_name {
        update.display_name = Some(merged.display_name.clone());
    }
    if merged.photo_url != previous.photo_url {
        update.photo_url = merged.photo_url.clone();
    }
    if merged.subscription_plan != previous.subscription_plan {
        update.subscription_plan = Some(merged.subscription_plan.clone());
    }
    if merged.subscription_status != previous.subscription_status {
        update.subscription_status = Some(merged.subscription_status);
    }

    update
}
