// SPDX-License-Identifier: MIT

//! Reconciliation-pass behavior: profile creation, merge precedence,
//! lazy subscription expiry, and degraded mode under persistence failure.

use chrono::{Duration, Utc};
use flexfit_api::db::{MemoryStore, ProfileStore};
use flexfit_api::models::profile::plans;
use flexfit_api::models::{Profile, SubscriptionStatus};
use flexfit_api::services::identity::IdentityProvider;
use flexfit_api::session::SessionReconciler;
use std::sync::Arc;

mod common;

use common::MockProvider;

fn reconciler(
    provider: &Arc<MockProvider>,
    store: &Arc<MemoryStore>,
) -> SessionReconciler {
    SessionReconciler::new(
        Some(provider.clone() as Arc<dyn IdentityProvider>),
        store.clone() as Arc<dyn ProfileStore>,
    )
}

fn seed_profile(uid: &str, email: &str) -> Profile {
    Profile {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        display_name: "Seeded".to_string(),
        photo_url: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        last_login: "2024-01-01T00:00:00Z".to_string(),
        subscription_plan: plans::FREE.to_string(),
        subscription_status: SubscriptionStatus::Inactive,
        subscription_buy_date: None,
        subscription_expiry_date: None,
    }
}

#[tokio::test]
async fn test_first_login_creates_profile_with_defaults() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());
    let session = reconciler(&provider, &store);

    let profile = session.sign_up("a@b.com", "password1", None).await.unwrap();

    // Email local part becomes the display name when nothing else is set
    assert_eq!(profile.display_name, "a");
    assert_eq!(profile.subscription_plan, plans::FREE);
    assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);
    assert_eq!(profile.created_at, profile.last_login);

    // The document was persisted, not just computed
    let stored = store.peek(&profile.uid).expect("profile document created");
    assert_eq!(stored, profile);
}

#[tokio::test]
async fn test_repeat_sign_in_is_idempotent_except_last_login() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());
    let session = reconciler(&provider, &store);

    let first = session
        .sign_up("alice@example.com", "password1", Some("Alice"))
        .await
        .unwrap();
    let second = session
        .sign_in("alice@example.com", "password1")
        .await
        .unwrap();

    assert!(second.last_login >= first.last_login);

    let mut normalized = second.clone();
    normalized.last_login = first.last_login.clone();
    assert_eq!(normalized, first);
}

#[tokio::test]
async fn test_created_at_survives_later_logins() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());

    let uid = provider.add_user("old@example.com", "password1", None);
    store.seed(seed_profile(&uid, "old@example.com"));

    let session = reconciler(&provider, &store);
    let profile = session
        .sign_in("old@example.com", "password1")
        .await
        .unwrap();

    assert_eq!(profile.created_at, "2024-01-01T00:00:00Z");
    assert_eq!(
        store.peek(&uid).unwrap().created_at,
        "2024-01-01T00:00:00Z"
    );
    assert_ne!(profile.last_login, "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_expired_subscription_downgraded_and_persisted() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());

    let uid = provider.add_user("pro@example.com", "password1", None);
    let buy = (Utc::now() - Duration::days(45)).to_rfc3339();
    let expiry = (Utc::now() - Duration::days(15)).to_rfc3339();
    let mut seeded = seed_profile(&uid, "pro@example.com");
    seeded.subscription_plan = "premium".to_string();
    seeded.subscription_status = SubscriptionStatus::Active;
    seeded.subscription_buy_date = Some(buy.clone());
    seeded.subscription_expiry_date = Some(expiry.clone());
    store.seed(seeded);

    let session = reconciler(&provider, &store);
    let profile = session
        .sign_in("pro@example.com", "password1")
        .await
        .unwrap();

    // Never observed as active-but-expired
    assert_eq!(profile.subscription_plan, plans::FREE);
    assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);

    // Downgrade is persisted, and the lapsed dates remain as a record
    let stored = store.peek(&uid).unwrap();
    assert_eq!(stored.subscription_plan, plans::FREE);
    assert_eq!(stored.subscription_status, SubscriptionStatus::Inactive);
    assert_eq!(stored.subscription_buy_date, Some(buy));
    assert_eq!(stored.subscription_expiry_date, Some(expiry));
}

#[tokio::test]
async fn test_downgraded_profile_stays_downgraded_on_next_login() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());

    let uid = provider.add_user("pro@example.com", "password1", None);
    let mut seeded = seed_profile(&uid, "pro@example.com");
    seeded.subscription_plan = "platinum".to_string();
    seeded.subscription_status = SubscriptionStatus::Active;
    seeded.subscription_expiry_date = Some((Utc::now() - Duration::days(1)).to_rfc3339());
    store.seed(seeded);

    let session = reconciler(&provider, &store);
    session.sign_in("pro@example.com", "password1").await.unwrap();
    let profile = session
        .sign_in("pro@example.com", "password1")
        .await
        .unwrap();

    assert_eq!(profile.subscription_plan, plans::FREE);
    assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);
    assert!(session.snapshot().error.is_none());
}

#[tokio::test]
async fn test_active_subscription_with_future_expiry_untouched() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());

    let uid = provider.add_user("pro@example.com", "password1", None);
    let expiry = (Utc::now() + Duration::days(10)).to_rfc3339();
    let mut seeded = seed_profile(&uid, "pro@example.com");
    seeded.subscription_plan = "diamond".to_string();
    seeded.subscription_status = SubscriptionStatus::Active;
    seeded.subscription_expiry_date = Some(expiry);
    store.seed(seeded);

    let session = reconciler(&provider, &store);
    let profile = session
        .sign_in("pro@example.com", "password1")
        .await
        .unwrap();

    assert_eq!(profile.subscription_plan, "diamond");
    assert_eq!(profile.subscription_status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_provider_display_name_wins_over_stored() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());

    let uid = provider.add_user("alice@example.com", "password1", Some("Live Alice"));
    store.seed(seed_profile(&uid, "alice@example.com"));

    let session = reconciler(&provider, &store);
    let profile = session
        .sign_in("alice@example.com", "password1")
        .await
        .unwrap();

    assert_eq!(profile.display_name, "Live Alice");
    assert_eq!(store.peek(&uid).unwrap().display_name, "Live Alice");
}

#[tokio::test]
async fn test_persistence_outage_degrades_to_in_memory_profile() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());
    provider.add_user("alice@example.com", "password1", Some("Alice"));
    store.fail_all(true);

    let session = reconciler(&provider, &store);
    let profile = session
        .sign_in("alice@example.com", "password1")
        .await
        .expect("sign-in succeeds despite persistence outage");

    // Identity fields plus subscription defaults, nothing persisted
    assert_eq!(profile.display_name, "Alice");
    assert_eq!(profile.subscription_plan, plans::FREE);
    assert!(store.peek(&profile.uid).is_none());

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.profile.is_some());
    assert!(snapshot.error.is_some());

    // The next pass with a healthy store persists normally
    store.fail_all(false);
    let profile = session
        .sign_in("alice@example.com", "password1")
        .await
        .unwrap();
    assert!(store.peek(&profile.uid).is_some());
    assert!(session.snapshot().error.is_none());
}

#[tokio::test]
async fn test_refresh_without_identity_is_a_no_op() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());
    let session = reconciler(&provider, &store);

    let result = session.refresh_profile(false, false).await.unwrap();
    assert!(result.is_none());

    // Force-from-provider with nobody signed in never touches the provider
    let result = session.refresh_profile(true, false).await.unwrap();
    assert!(result.is_none());

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.profile.is_none());
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_force_refresh_reads_live_identity() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());
    provider.add_user("alice@example.com", "password1", Some("Alice"));

    let session = reconciler(&provider, &store);
    let profile = session
        .sign_in("alice@example.com", "password1")
        .await
        .unwrap();
    assert_eq!(profile.display_name, "Alice");

    // Rename at the provider; only visible through a live lookup
    let mut changed = session.identity().await.unwrap();
    changed.display_name = Some("Alice Renamed".to_string());
    let token = changed.id_token.clone();
    provider.set_issued_identity(&token, changed);

    let cached = session.refresh_profile(false, false).await.unwrap().unwrap();
    assert_eq!(cached.display_name, "Alice");

    let fresh = session.refresh_profile(true, false).await.unwrap().unwrap();
    assert_eq!(fresh.display_name, "Alice Renamed");
}

#[tokio::test]
async fn test_federated_first_login_creates_profile() {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());

    provider.add_federated(
        "google-consent-token",
        flexfit_api::models::Identity {
            uid: "google-uid-1".to_string(),
            email: Some("gal@gmail.com".to_string()),
            display_name: Some("Gal".to_string()),
            photo_url: Some("https://example.com/gal.jpg".to_string()),
            id_token: "mock-token-google-uid-1".to_string(),
        },
    );

    let session = reconciler(&provider, &store);
    let profile = session
        .sign_in_with_google("google-consent-token")
        .await
        .unwrap();

    assert_eq!(profile.uid, "google-uid-1");
    assert_eq!(profile.display_name, "Gal");
    assert_eq!(
        profile.photo_url,
        Some("https://example.com/gal.jpg".to_string())
    );
    assert_eq!(profile.subscription_plan, plans::FREE);
    assert!(store.peek("google-uid-1").is_some());
}
