// SPDX-License-Identifier: MIT

//! Session and profile routes for authenticated clients.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Profile;
use crate::session::SessionSnapshot;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/refresh", post(refresh_session))
        .route("/api/profile", get(get_profile))
}

/// Resume the session for a verified identity and return its snapshot.
/// Each call is an auth event: it runs a full reconciliation pass
/// (lazy expiry, last_login, identity-field sync).
async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Json<SessionSnapshot> {
    let (session, _) = state.sessions.resume(auth.identity).await;
    Json(session.snapshot())
}

#[derive(Deserialize, Default)]
pub struct RefreshPayload {
    /// Re-read the live identity from the provider instead of the cached
    /// one (avoids acting on stale identity data).
    #[serde(default)]
    pub force_from_provider: bool,
    /// Skip the loading toggle (no flicker for background refreshes).
    #[serde(default)]
    pub silent: bool,
}

/// Re-run reconciliation without a new authentication event, e.g. after an
/// out-of-band profile mutation.
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: Option<Json<RefreshPayload>>,
) -> Result<Json<SessionSnapshot>> {
    let Json(payload) = payload.unwrap_or_default();

    let session = match state.sessions.get(&auth.identity.uid) {
        Some(session) => {
            session
                .refresh_profile(payload.force_from_provider, payload.silent)
                .await?;
            session
        }
        // No live session (restart/new tab): resuming is the refresh.
        None => state.sessions.resume(auth.identity).await.0,
    };

    Ok(Json(session.snapshot()))
}

/// The reconciled profile for the authenticated identity.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Json<Profile> {
    let (_, profile) = state.sessions.resume(auth.identity).await;
    Json(profile)
}
