// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Provider misconfiguration is detected once here, at startup: a missing
//! Identity Platform API key puts the server in provider-unavailable mode
//! instead of crashing, and every auth operation short-circuits.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity Platform web API key. None means the provider is not
    /// configured and all auth operations return provider_unavailable.
    pub identity_api_key: Option<String>,
    /// GCP project ID (Firestore database and ID token audience)
    pub gcp_project_id: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let identity_api_key = env::var("IDENTITY_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if identity_api_key.is_none() {
            tracing::warn!(
                "IDENTITY_API_KEY not set; starting in provider-unavailable mode \
                 (all auth operations disabled)"
            );
        }

        Ok(Self {
            identity_api_key,
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            identity_api_key: Some("test_api_key".to_string()),
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
        }
    }

    /// True if auth operations can be attempted at all.
    pub fn provider_configured(&self) -> bool {
        self.identity_api_key.is_some()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
