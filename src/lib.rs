// SPDX-License-Identifier: MIT

//! FlexFit API: backend for the FlexFit AI fitness application.
//!
//! This crate owns the session/profile lifecycle: it reconciles the
//! identity provider's view of a user with the persisted profile record
//! (subscription state included) and exposes the result to web clients.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod time_utils;

use config::Config;
use db::ProfileStore;
use services::IdTokenVerifier;
use session::SessionRegistry;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ProfileStore>,
    pub verifier: Arc<IdTokenVerifier>,
    pub sessions: SessionRegistry,
}
