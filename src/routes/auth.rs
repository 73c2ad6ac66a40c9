// SPDX-License-Identifier: MIT

//! Authentication routes: password sign-up/sign-in, Google federated
//! sign-in, and sign-out.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Profile;
use crate::session::SessionSnapshot;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_sign_in))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", post(logout))
}

#[derive(Deserialize, Validate)]
pub struct SignupPayload {
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters."))]
    pub password: String,
    #[validate(length(max = 100, message = "Display name is too long."))]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Deserialize)]
pub struct GoogleSignInPayload {
    /// ID token from the browser-side Google consent flow.
    pub id_token: String,
}

/// Successful auth response: the provider-issued session token plus the
/// reconciled profile.
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub profile: Profile,
}

fn validation_error(errors: validator::ValidationErrors) -> AppError {
    // First message only; the frontend shows one inline error at a time.
    let message = errors
        .field_errors()
        .into_values()
        .flatten()
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .next()
        .unwrap_or_else(|| "Invalid input".to_string());
    AppError::InvalidInput(message)
}

/// Create a new account with email/password and reconcile its profile.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupPayload>,
) -> Result<Json<AuthResponse>> {
    payload.validate().map_err(validation_error)?;

    let session = state.sessions.begin_session();
    let profile = session
        .sign_up(
            &payload.email,
            &payload.password,
            payload.display_name.as_deref(),
        )
        .await?;

    let token = session_token(&session).await?;
    state.sessions.adopt(&profile.uid, session);

    tracing::info!(uid = %profile.uid, "Sign-up complete");
    Ok(Json(AuthResponse { token, profile }))
}

/// Authenticate with email/password and reconcile the profile.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>> {
    payload.validate().map_err(validation_error)?;

    let session = state.sessions.begin_session();
    let profile = session.sign_in(&payload.email, &payload.password).await?;

    let token = session_token(&session).await?;
    state.sessions.adopt(&profile.uid, session);

    tracing::info!(uid = %profile.uid, "Sign-in complete");
    Ok(Json(AuthResponse { token, profile }))
}

/// Complete a Google federated sign-in. Creates the profile on the
/// identity's first login; there is no separate federated sign-up.
async fn google_sign_in(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GoogleSignInPayload>,
) -> Result<Json<AuthResponse>> {
    let session = state.sessions.begin_session();
    let profile = session.sign_in_with_google(&payload.id_token).await?;

    let token = session_token(&session).await?;
    state.sessions.adopt(&profile.uid, session);

    tracing::info!(uid = %profile.uid, "Google sign-in complete");
    Ok(Json(AuthResponse { token, profile }))
}

/// Sign out: clears the server-side session state (local-first; a provider
/// failure is surfaced through the returned snapshot's error field).
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Json<SessionSnapshot> {
    let uid = &auth.identity.uid;

    let snapshot = match state.sessions.get(uid) {
        Some(session) => {
            session.sign_out().await;
            session.snapshot()
        }
        None => SessionSnapshot {
            profile: None,
            loading: false,
            error: None,
        },
    };

    state.sessions.end_session(uid);
    tracing::info!(uid = %uid, "Sign-out complete");
    Json(snapshot)
}

async fn session_token(session: &crate::session::SessionReconciler) -> Result<String> {
    session
        .identity()
        .await
        .map(|identity| identity.id_token)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("authenticated session has no identity")))
}
