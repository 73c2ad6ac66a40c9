// SPDX-License-Identifier: MIT

//! Google Identity Platform (Identity Toolkit v1) REST client.
//!
//! Handles:
//! - Password sign-up / sign-in
//! - Federated sign-in (signInWithIdp)
//! - Live identity lookup for force-refresh
//! - Provider error-code mapping to the reconciler's failure taxonomy

use crate::models::Identity;
use crate::services::identity::{IdentityError, IdentityProvider};
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity Platform REST client.
#[derive(Clone)]
pub struct GcipClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GcipClient {
    /// Create a new client with the project's web API key.
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        }
    }

    /// Override the endpoint (Identity Platform emulator).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, IdentityError> {
        let url = format!(
            "{}/accounts:{}?key={}",
            self.base_url, method, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| IdentityError::Transient(format!("Invalid response JSON: {}", e)));
        }

        let error_body: ApiErrorEnvelope = response.json().await.unwrap_or_default();
        let code = error_body.error.message;
        tracing::debug!(method, status = %status, code = %code, "Identity Toolkit error");
        Err(map_error_code(&code))
    }
}

#[async_trait]
impl IdentityProvider for GcipClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let created: AuthResponse = self.post_json("signUp", &body).await?;

        // signUp does not accept a display name; record it in a follow-up
        // update so later sign-ins report it.
        let display_name = match display_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                let update = serde_json::json!({
                    "idToken": created.id_token,
                    "displayName": name,
                    "returnSecureToken": false,
                });
                let _: serde_json::Value = self.post_json("update", &update).await?;
                Some(name.to_string())
            }
            None => None,
        };

        Ok(Identity {
            uid: created.local_id,
            email: created.email.or_else(|| Some(email.to_string())),
            display_name,
            photo_url: created.photo_url,
            id_token: created.id_token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let auth: AuthResponse = self.post_json("signInWithPassword", &body).await?;

        Ok(Identity {
            uid: auth.local_id,
            email: auth.email,
            display_name: auth.display_name,
            photo_url: auth.photo_url,
            id_token: auth.id_token,
        })
    }

    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> Result<Identity, IdentityError> {
        let body = serde_json::json!({
            "postBody": format!("id_token={}&providerId={}", provider_token, provider_id),
            "requestUri": "http://localhost",
            "returnSecureToken": true,
            "returnIdpCredential": true,
        });
        let auth: AuthResponse = self.post_json("signInWithIdp", &body).await?;

        Ok(Identity {
            uid: auth.local_id,
            email: auth.email,
            display_name: auth.display_name,
            photo_url: auth.photo_url,
            id_token: auth.id_token,
        })
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, IdentityError> {
        let body = serde_json::json!({ "idToken": id_token });
        let response: LookupResponse = self.post_json("lookup", &body).await?;

        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::Transient("Lookup returned no users".to_string()))?;

        Ok(Identity {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            id_token: id_token.to_string(),
        })
    }

    async fn sign_out(&self, _id_token: &str) -> Result<(), IdentityError> {
        // Identity Toolkit has no API-key-scoped sign-out endpoint; tokens
        // simply expire. Sign-out is local state clearing for this provider.
        Ok(())
    }
}

/// Successful auth response shared by signUp / signInWithPassword /
/// signInWithIdp.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    id_token: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorEnvelope {
    #[serde(default)]
    error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Map an Identity Toolkit error code to the failure taxonomy, with the
/// human-readable messages the frontend shows inline.
fn map_error_code(code: &str) -> IdentityError {
    // Codes may carry a suffix, e.g. "WEAK_PASSWORD : Password should be...".
    let bare = code.split(':').next().unwrap_or(code).trim();

    match bare {
        "EMAIL_EXISTS" => {
            IdentityError::InvalidInput("This email address is already in use.".to_string())
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            IdentityError::InvalidInput("Please enter a valid email address.".to_string())
        }
        "WEAK_PASSWORD" | "MISSING_PASSWORD" => IdentityError::InvalidInput(
            "Password should be at least 6 characters.".to_string(),
        ),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            IdentityError::InvalidInput("Incorrect email or password.".to_string())
        }
        "USER_DISABLED" => {
            IdentityError::InvalidInput("This account has been disabled.".to_string())
        }
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => {
            IdentityError::InvalidInput("Your session has expired. Please sign in again.".to_string())
        }
        "API_KEY_INVALID" | "INVALID_API_KEY" | "PERMISSION_DENIED" | "CONFIGURATION_NOT_FOUND" => {
            IdentityError::Misconfigured(bare.to_string())
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => {
            IdentityError::Transient("Too many attempts, try again later.".to_string())
        }
        other => IdentityError::Transient(format!("Unexpected provider error: {}", other)),
    }
}
