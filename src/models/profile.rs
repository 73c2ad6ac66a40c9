// SPDX-License-Identifier: MIT

//! Profile model for storage and API.

use crate::time_utils::parse_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Subscription plan constants and the mock checkout catalog.
pub mod plans {
    /// The default plan for every new profile.
    pub const FREE: &str = "free";

    /// Paid plans offered by the pricing page. The plan field itself is an
    /// open string set; this list only gates the mock checkout.
    pub const PAID: &[&str] = &["premium", "platinum", "diamond"];

    /// Mock subscription term (the checkout flow is not a real payment).
    pub const TERM_DAYS: i64 = 30;

    /// True if `plan` is a plan the checkout flow sells.
    pub fn is_paid(plan: &str) -> bool {
        PAID.contains(&plan)
    }
}

/// Subscription state stored on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    PastDue,
}

/// User profile stored in Firestore, keyed by identity uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Profile {
    /// Identity uid (also the document ID).
    pub uid: String,
    /// Email address, kept in sync with the identity provider.
    pub email: Option<String>,
    /// Display name (identity-provided, stored, or email-derived default).
    pub display_name: String,
    /// Avatar URL.
    pub photo_url: Option<String>,
    /// First successful authentication (RFC3339). Set once, never overwritten.
    pub created_at: String,
    /// Last reconciliation pass that observed this identity (RFC3339).
    pub last_login: String,
    /// Subscription plan (open string set, `plans::FREE` by default).
    pub subscription_plan: String,
    pub subscription_status: SubscriptionStatus,
    /// When the current subscription was purchased (RFC3339).
    pub subscription_buy_date: Option<String>,
    /// When the current subscription lapses (RFC3339).
    pub subscription_expiry_date: Option<String>,
}

impl Profile {
    /// True if the stored subscription claims to be active but its expiry
    /// date is strictly before `now`. Unparseable expiry dates are treated
    /// as not expired rather than silently downgrading the user.
    pub fn subscription_expired(&self, now: DateTime<Utc>) -> bool {
        if self.subscription_status != SubscriptionStatus::Active {
            return false;
        }
        match self.subscription_expiry_date.as_deref() {
            Some(raw) => match parse_utc_rfc3339(raw) {
                Some(expiry) => expiry < now,
                None => {
                    tracing::warn!(uid = %self.uid, expiry = raw, "Unparseable subscription expiry date");
                    false
                }
            },
            None => false,
        }
    }

    /// Apply the lazy-expiry downgrade in memory: plan to free, status to
    /// inactive. Purchase/expiry timestamps are left as a record of the
    /// lapsed subscription.
    pub fn apply_expiry_downgrade(&mut self) {
        self.subscription_plan = plans::FREE.to_string();
        self.subscription_status = SubscriptionStatus::Inactive;
    }
}

/// Partial profile write. Only fields that are `Some` are persisted; the
/// Firestore impl maps them to a field-masked update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_buy_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_expiry_date: Option<String>,
}

impl ProfileUpdate {
    /// The lazy-expiry downgrade write, persisted before the downgraded
    /// value is exposed.
    pub fn expiry_downgrade() -> Self {
        Self {
            subscription_plan: Some(plans::FREE.to_string()),
            subscription_status: Some(SubscriptionStatus::Inactive),
            ..Self::default()
        }
    }

    /// Field paths that are set, for Firestore field-masked updates.
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if self.email.is_some() {
            paths.push("email".to_string());
        }
        if self.display_name.is_some() {
            paths.push("display_name".to_string());
        }
        if self.photo_url.is_some() {
            paths.push("photo_url".to_string());
        }
        if self.last_login.is_some() {
            paths.push("last_login".to_string());
        }
        if self.subscription_plan.is_some() {
            paths.push("subscription_plan".to_string());
        }
        if self.subscription_status.is_some() {
            paths.push("subscription_status".to_string());
        }
        if self.subscription_buy_date.is_some() {
            paths.push("subscription_buy_date".to_string());
        }
        if self.subscription_expiry_date.is_some() {
            paths.push("subscription_expiry_date".to_string());
        }
        paths
    }

    /// True if nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.field_paths().is_empty()
    }
}
