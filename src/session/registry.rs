// SPDX-License-Identifier: MIT

//! Per-identity session registry.
//!
//! The HTTP layer is stateless between requests; reconcilers live here,
//! keyed by uid, so a verified token can resume its session after a server
//! restart or from a fresh tab.

use crate::db::ProfileStore;
use crate::models::{Identity, Profile};
use crate::services::identity::IdentityProvider;
use crate::session::reconciler::SessionReconciler;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionRegistry {
    provider: Option<Arc<dyn IdentityProvider>>,
    store: Arc<dyn ProfileStore>,
    sessions: Arc<DashMap<String, Arc<SessionReconciler>>>,
}

impl SessionRegistry {
    pub fn new(
        provider: Option<Arc<dyn IdentityProvider>>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            provider,
            store,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Create a fresh, not-yet-authenticated session. Callers adopt it into
    /// the registry once an operation establishes the uid.
    pub fn begin_session(&self) -> Arc<SessionReconciler> {
        Arc::new(SessionReconciler::new(
            self.provider.clone(),
            self.store.clone(),
        ))
    }

    /// Register an authenticated session under its uid. A session already
    /// present for the uid (another tab) is replaced; both share the same
    /// persisted profile, so last-write-wins applies as usual.
    pub fn adopt(&self, uid: &str, session: Arc<SessionReconciler>) {
        self.sessions.insert(uid.to_string(), session);
    }

    pub fn get(&self, uid: &str) -> Option<Arc<SessionReconciler>> {
        self.sessions.get(uid).map(|entry| entry.clone())
    }

    /// Get or create the session for a verified identity and run a
    /// reconciliation pass for it.
    pub async fn resume(&self, identity: Identity) -> (Arc<SessionReconciler>, Profile) {
        let session = self
            .sessions
            .entry(identity.uid.clone())
            .or_insert_with(|| {
                Arc::new(SessionReconciler::new(
                    self.provider.clone(),
                    self.store.clone(),
                ))
            })
            .clone();

        let profile = session.resume(identity).await;
        (session, profile)
    }

    /// Drop a session after sign-out.
    pub fn end_session(&self, uid: &str) {
        self.sessions.remove(uid);
    }
}
