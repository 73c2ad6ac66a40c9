// SPDX-License-Identifier: MIT

//! Session/profile lifecycle reconciliation.
//!
//! One `SessionReconciler` per logical client session. It is the single
//! source of truth for "who is logged in and what is their profile",
//! reconciling the live identity-provider state, the persisted profile
//! record, and the in-memory cached view into one `SessionSnapshot`.
//!
//! Operations are serialized through the internal state mutex: no two
//! reconciliation passes for the same session run concurrently. Sessions
//! for the same identity in different tabs may still race on store writes;
//! that is last-write-wins by design.

use crate::db::ProfileStore;
use crate::error::AppError;
use crate::models::{Identity, Profile, ProfileUpdate};
use crate::services::identity::{IdentityError, IdentityProvider};
use crate::session::merge;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Consumer-facing session state.
///
/// `profile == None && !loading` means "not authenticated"; rendering
/// decisions (redirects, banners) belong to consumers.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionSnapshot {
    pub profile: Option<Profile>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct SessionState {
    identity: Option<Identity>,
    profile: Option<Profile>,
}

/// The session/profile reconciler.
pub struct SessionReconciler {
    /// None when the provider is misconfigured: every auth operation
    /// short-circuits to provider-unavailable without a provider call.
    provider: Option<Arc<dyn IdentityProvider>>,
    store: Arc<dyn ProfileStore>,
    /// Serializes operations and guards the cached identity/profile pair.
    state: Mutex<SessionState>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionReconciler {
    /// Create a reconciler in the initial loading state.
    ///
    /// `loading` stays true until the first pass (or failed operation)
    /// completes.
    pub fn new(provider: Option<Arc<dyn IdentityProvider>>, store: Arc<dyn ProfileStore>) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            profile: None,
            loading: true,
            error: None,
        });

        Self {
            provider,
            store,
            state: Mutex::new(SessionState::default()),
            snapshot_tx,
        }
    }

    /// Current consumer-facing state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The cached identity, if signed in.
    pub async fn identity(&self) -> Option<Identity> {
        self.state.lock().await.identity.clone()
    }

    /// Create a password identity and its profile.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Profile, AppError> {
        let provider = self.require_provider()?;
        self.authenticate(provider.sign_up(email, password, display_name))
            .await
    }

    /// Authenticate with email/password and reconcile.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile, AppError> {
        let provider = self.require_provider()?;
        self.authenticate(provider.sign_in(email, password)).await
    }

    /// Complete a Google federated sign-in with the consent flow's ID token.
    /// Creates the profile if this is the identity's first login.
    pub async fn sign_in_with_google(&self, google_id_token: &str) -> Result<Profile, AppError> {
        let provider = self.require_provider()?;
        self.authenticate(provider.sign_in_with_idp("google.com", google_id_token))
            .await
    }

    /// Sign out. Local-first: in-memory identity and profile are cleared
    /// even when the provider call fails; the failure only surfaces through
    /// the snapshot's error field.
    pub async fn sign_out(&self) {
        let mut state = self.state.lock().await;
        self.begin();

        let token = state.identity.take().map(|identity| identity.id_token);
        state.profile = None;

        let mut error = None;
        if let (Some(provider), Some(token)) = (self.provider.clone(), token) {
            if let Err(e) = provider.sign_out(&token).await {
                tracing::warn!(error = %e, "Provider sign-out failed; local state cleared anyway");
                error = Some(e.to_string());
            }
        }

        self.publish(None, error);
    }

    /// Re-run reconciliation without a new authentication event, e.g. after
    /// an out-of-band profile mutation (subscription purchase).
    ///
    /// `force_from_provider` re-reads the live identity instead of the
    /// cached one. `silent` skips the loading toggle so background
    /// refreshes don't flicker.
    ///
    /// Returns `Ok(None)` when no identity is signed in.
    pub async fn refresh_profile(
        &self,
        force_from_provider: bool,
        silent: bool,
    ) -> Result<Option<Profile>, AppError> {
        let mut state = self.state.lock().await;
        if !silent {
            self.begin();
        }

        let Some(current) = state.identity.clone() else {
            if !silent {
                self.publish(None, None);
            }
            return Ok(None);
        };

        let identity = if force_from_provider {
            let provider = self.require_provider()?;
            match provider.lookup(&current.id_token).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    let err = AppError::from(e);
                    self.fail(&err);
                    return Err(err);
                }
            }
        } else {
            current
        };

        let profile = self.finish_pass(&mut state, identity, silent).await;
        Ok(Some(profile))
    }

    /// Adopt an already-verified identity (token presented on an API
    /// request) and run a reconciliation pass for it. This is the resume
    /// path after a restart or for a fresh tab.
    pub async fn resume(&self, identity: Identity) -> Profile {
        let mut state = self.state.lock().await;
        self.begin();
        self.finish_pass(&mut state, identity, false).await
    }

    // ─── Internals ───────────────────────────────────────────────

    fn require_provider(&self) -> Result<Arc<dyn IdentityProvider>, AppError> {
        match &self.provider {
            Some(provider) => Ok(provider.clone()),
            None => {
                let err = AppError::ProviderUnavailable;
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Run one provider authentication attempt followed by a reconciliation
    /// pass, holding the state lock for the whole operation.
    async fn authenticate<F>(&self, attempt: F) -> Result<Profile, AppError>
    where
        F: Future<Output = Result<Identity, IdentityError>>,
    {
        let mut state = self.state.lock().await;
        self.begin();

        match attempt.await {
            Ok(identity) => Ok(self.finish_pass(&mut state, identity, false).await),
            Err(e) => {
                let err = AppError::from(e);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Steps 2-7 of the reconciliation pass: read, lazy-expire, merge,
    /// create-or-update, cache, publish. Persistence failures degrade to an
    /// in-memory profile rather than failing the pass.
    async fn finish_pass(
        &self,
        state: &mut SessionState,
        identity: Identity,
        silent: bool,
    ) -> Profile {
        let now = Utc::now();

        let (profile, degraded) =
            match reconcile_with_store(self.store.as_ref(), &identity, now).await {
                Ok(profile) => (profile, None),
                Err(e) => {
                    tracing::warn!(
                        uid = %identity.uid,
                        error = %e,
                        "Persistence unavailable; serving degraded in-memory profile"
                    );
                    (merge::fallback_profile(&identity, now), Some(e.to_string()))
                }
            };

        state.identity = Some(identity);
        state.profile = Some(profile.clone());

        if silent {
            let published = profile.clone();
            self.snapshot_tx.send_modify(|snapshot| {
                snapshot.profile = Some(published);
                snapshot.error = degraded;
            });
        } else {
            self.publish(Some(profile.clone()), degraded);
        }

        profile
    }

    fn begin(&self) {
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.loading = true;
            snapshot.error = None;
        });
    }

    fn publish(&self, profile: Option<Profile>, error: Option<String>) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            profile,
            loading: false,
            error,
        });
    }

    fn fail(&self, err: &AppError) {
        // Cancellation is silent: no error banner, no destructive effect.
        let error = match err {
            AppError::Cancelled => None,
            other => Some(other.to_string()),
        };
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.loading = false;
            snapshot.error = error;
        });
    }
}

/// Steps 2-5 against the store: read the persisted profile, persist the
/// lazy-expiry downgrade before the value can be observed, merge, then
/// create on first login or field-update otherwise.
async fn reconcile_with_store(
    store: &dyn ProfileStore,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<Profile, AppError> {
    let mut stored = store.get_profile(&identity.uid).await?;

    if let Some(profile) = stored.as_mut() {
        if profile.subscription_expired(now) {
            store
                .update_profile(&identity.uid, &ProfileUpdate::expiry_downgrade())
                .await?;
            profile.apply_expiry_downgrade();
            tracing::info!(uid = %identity.uid, "Expired subscription downgraded to free");
        }
    }

    let merged = merge::merge_profile(identity, stored.as_ref(), now);

    match &stored {
        None => {
            store.create_profile(&merged).await?;
            tracing::info!(uid = %identity.uid, "Profile created on first login");
        }
        Some(previous) => {
            store
                .update_profile(&identity.uid, &merge::diff_update(&merged, previous))
                .await?;
        }
    }

    Ok(merged)
}
