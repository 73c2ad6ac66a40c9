// SPDX-License-Identifier: MIT

//! Identity provider contract.
//!
//! The reconciler only sees this trait; the production implementation is
//! the Identity Platform REST client in [`crate::services::gcip`], and the
//! test suites substitute an in-memory mock.

use crate::error::AppError;
use crate::models::Identity;
use async_trait::async_trait;

/// Provider failure categories, mapped from provider-specific error codes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// User-correctable input (bad credentials, malformed email, weak
    /// password, email already in use). Shown inline by consumers.
    #[error("{0}")]
    InvalidInput(String),

    /// The user abandoned a federated consent flow. Silent: no error
    /// surfaced, no destructive side effect.
    #[error("Sign-in cancelled")]
    Cancelled,

    /// Permanent misconfiguration (bad/missing credentials). Detected once,
    /// never retried.
    #[error("Identity provider misconfigured: {0}")]
    Misconfigured(String),

    /// Transient provider failure (network, rate limiting). Retryable.
    #[error("Identity provider error: {0}")]
    Transient(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidInput(msg) => AppError::InvalidInput(msg),
            IdentityError::Cancelled => AppError::Cancelled,
            IdentityError::Misconfigured(_) => AppError::ProviderUnavailable,
            IdentityError::Transient(msg) => AppError::Provider(msg),
        }
    }
}

/// Asynchronous identity provider operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new password identity. The display name, when given, is
    /// recorded with the provider so later sign-ins report it.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError>;

    /// Authenticate an existing password identity.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// Complete a federated sign-in with a token obtained from the external
    /// IdP's consent flow (e.g. a Google ID token). Creates the identity on
    /// first federated login.
    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> Result<Identity, IdentityError>;

    /// Re-read the live identity behind a provider-issued ID token
    /// (used by force-refresh to avoid acting on stale identity data).
    async fn lookup(&self, id_token: &str) -> Result<Identity, IdentityError>;

    /// Terminate the provider-side session, if the provider supports it.
    async fn sign_out(&self, id_token: &str) -> Result<(), IdentityError>;
}
