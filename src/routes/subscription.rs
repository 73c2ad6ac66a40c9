// SPDX-License-Identifier: MIT

//! Mock subscription checkout.
//!
//! The payment flow itself is mocked: a purchase writes the subscription
//! fields to the stored profile and force-refreshes the session so the
//! in-memory view stays consistent.

use axum::{extract::State, routing::post, Extension, Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::profile::plans;
use crate::models::{Profile, ProfileUpdate, SubscriptionStatus};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/subscription", post(purchase))
}

#[derive(Deserialize)]
pub struct PurchasePayload {
    pub plan: String,
}

/// "Purchase" a plan: set plan/status/buy/expiry on the stored profile,
/// then refresh the session. Selecting the free plan downgrades instead.
async fn purchase(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<PurchasePayload>,
) -> Result<Json<Profile>> {
    let plan = payload.plan.trim().to_lowercase();

    let update = if plan == plans::FREE {
        // The free tier is never "active"
        ProfileUpdate {
            subscription_plan: Some(plans::FREE.to_string()),
            subscription_status: Some(SubscriptionStatus::Inactive),
            ..ProfileUpdate::default()
        }
    } else if plans::is_paid(&plan) {
        let now = Utc::now();
        ProfileUpdate {
            subscription_plan: Some(plan.clone()),
            subscription_status: Some(SubscriptionStatus::Active),
            subscription_buy_date: Some(format_utc_rfc3339(now)),
            subscription_expiry_date: Some(format_utc_rfc3339(
                now + Duration::days(plans::TERM_DAYS),
            )),
            ..ProfileUpdate::default()
        }
    } else {
        return Err(AppError::InvalidInput(format!(
            "Unknown subscription plan: {}",
            payload.plan
        )));
    };

    // Resuming first guarantees the profile document exists.
    let (session, profile) = state.sessions.resume(auth.identity).await;
    state.store.update_profile(&profile.uid, &update).await?;

    tracing::info!(uid = %profile.uid, plan = %plan, "Subscription updated (mock checkout)");

    // Out-of-band mutation: re-run reconciliation so the cached view and
    // the stored record agree before returning.
    let refreshed = session
        .refresh_profile(false, false)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(refreshed))
}
