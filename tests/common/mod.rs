// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use flexfit_api::config::Config;
use flexfit_api::db::{MemoryStore, ProfileStore};
use flexfit_api::models::Identity;
use flexfit_api::routes::create_router;
use flexfit_api::services::identity::{IdentityError, IdentityProvider};
use flexfit_api::services::IdTokenVerifier;
use flexfit_api::session::SessionRegistry;
use flexfit_api::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Key ID the static-key verifier and the test token signer agree on.
pub const TEST_KID: &str = "test-key";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

#[derive(Clone)]
struct MockUser {
    uid: String,
    password: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

/// In-memory identity provider double.
///
/// Password accounts are registered through `sign_up` (or `add_user`);
/// federated tokens are pre-registered with `add_federated`. Failure modes
/// are injected per-call with `fail_next` / `fail_sign_out`.
#[derive(Default)]
pub struct MockProvider {
    users: Mutex<HashMap<String, MockUser>>,
    federated: Mutex<HashMap<String, Identity>>,
    issued: Mutex<HashMap<String, Identity>>,
    next_error: Mutex<Option<IdentityError>>,
    sign_out_fails: AtomicBool,
    uid_counter: AtomicU64,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next provider call fails with `error` instead of running.
    pub fn fail_next(&self, error: IdentityError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Make every `sign_out` call fail (the local-first contract applies).
    pub fn fail_sign_out(&self, fail: bool) {
        self.sign_out_fails.store(fail, Ordering::SeqCst);
    }

    /// Register a password account without going through `sign_up`.
    pub fn add_user(&self, email: &str, password: &str, display_name: Option<&str>) -> String {
        let uid = self.next_uid();
        self.users.lock().unwrap().insert(
            email.to_string(),
            MockUser {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
                photo_url: None,
            },
        );
        uid
    }

    /// Register a federated consent token and the identity it resolves to.
    pub fn add_federated(&self, provider_token: &str, identity: Identity) {
        self.federated
            .lock()
            .unwrap()
            .insert(provider_token.to_string(), identity);
    }

    /// Replace the identity behind an issued token, simulating a
    /// provider-side change visible only to `lookup`.
    pub fn set_issued_identity(&self, id_token: &str, identity: Identity) {
        self.issued
            .lock()
            .unwrap()
            .insert(id_token.to_string(), identity);
    }

    fn next_uid(&self) -> String {
        format!("uid-{}", self.uid_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn take_injected_error(&self) -> Option<IdentityError> {
        self.next_error.lock().unwrap().take()
    }

    fn issue(&self, user: &MockUser, email: &str) -> Identity {
        let identity = Identity {
            uid: user.uid.clone(),
            email: Some(email.to_string()),
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
            id_token: format!("mock-token-{}", user.uid),
        };
        self.issued
            .lock()
            .unwrap()
            .insert(identity.id_token.clone(), identity.clone());
        identity
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        if let Some(error) = self.take_injected_error() {
            return Err(error);
        }

        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(IdentityError::InvalidInput(
                "This email address is already in use.".to_string(),
            ));
        }

        let user = MockUser {
            uid: self.next_uid(),
            password: password.to_string(),
            display_name: display_name.map(str::to_string),
            photo_url: None,
        };
        users.insert(email.to_string(), user.clone());
        drop(users);

        Ok(self.issue(&user, email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        if let Some(error) = self.take_injected_error() {
            return Err(error);
        }

        let user = {
            let users = self.users.lock().unwrap();
            users.get(email).cloned()
        };

        match user {
            Some(user) if user.password == password => Ok(self.issue(&user, email)),
            _ => Err(IdentityError::InvalidInput(
                "Incorrect email or password.".to_string(),
            )),
        }
    }

    async fn sign_in_with_idp(
        &self,
        _provider_id: &str,
        provider_token: &str,
    ) -> Result<Identity, IdentityError> {
        if let Some(error) = self.take_injected_error() {
            return Err(error);
        }

        let identity = {
            let federated = self.federated.lock().unwrap();
            federated.get(provider_token).cloned()
        };

        match identity {
            Some(identity) => {
                self.issued
                    .lock()
                    .unwrap()
                    .insert(identity.id_token.clone(), identity.clone());
                Ok(identity)
            }
            None => Err(IdentityError::InvalidInput(
                "Unknown federated credential.".to_string(),
            )),
        }
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, IdentityError> {
        if let Some(error) = self.take_injected_error() {
            return Err(error);
        }

        self.issued
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidInput("Unknown session token.".to_string()))
    }

    async fn sign_out(&self, _id_token: &str) -> Result<(), IdentityError> {
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(IdentityError::Transient(
                "Simulated sign-out failure".to_string(),
            ));
        }
        Ok(())
    }
}

/// A verified identity for tests that bypass the provider.
#[allow(dead_code)]
pub fn test_identity(uid: &str, email: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        display_name: None,
        photo_url: None,
        id_token: format!("mock-token-{uid}"),
    }
}

fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("Failed to read {path}: {e}"))
}

/// Static verifier for the fixture RSA key pair.
#[allow(dead_code)]
pub fn test_verifier() -> IdTokenVerifier {
    let decoding_key = DecodingKey::from_rsa_pem(&fixture("test_signing_key.pub.pem"))
        .expect("Invalid test public key");
    IdTokenVerifier::new_with_static_key("test-project", TEST_KID, decoding_key)
        .expect("Failed to build static verifier")
}

/// Sign an ID token the static verifier accepts, with securetoken-shaped
/// claims for the test project.
#[allow(dead_code)]
pub fn create_id_token(uid: &str, email: Option<&str>, display_name: Option<&str>) -> String {
    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        iss: String,
        aud: &'a str,
        exp: usize,
        iat: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<&'a str>,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: uid,
        iss: "https://securetoken.google.com/test-project".to_string(),
        aud: "test-project",
        exp: now + 3600,
        iat: now,
        email,
        name: display_name,
    };

    let encoding_key = EncodingKey::from_rsa_pem(&fixture("test_signing_key.pem"))
        .expect("Invalid test private key");

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());

    encode(&header, &claims, &encoding_key).unwrap()
}

/// Create a test app wired to an in-memory store and a mock provider.
/// Returns the router plus handles for seeding and assertions.
#[allow(dead_code)]
pub fn create_test_app() -> (
    axum::Router,
    Arc<AppState>,
    Arc<MemoryStore>,
    Arc<MockProvider>,
) {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MockProvider::new());

    let sessions = SessionRegistry::new(
        Some(provider.clone() as Arc<dyn IdentityProvider>),
        store.clone() as Arc<dyn ProfileStore>,
    );

    let state = Arc::new(AppState {
        config,
        store: store.clone(),
        verifier: Arc::new(test_verifier()),
        sessions,
    });

    (create_router(state.clone()), state, store, provider)
}

/// Same as `create_test_app`, but with no identity provider configured.
#[allow(dead_code)]
pub fn create_test_app_without_provider() -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.identity_api_key = None;

    let store = Arc::new(MemoryStore::new());
    let sessions = SessionRegistry::new(None, store.clone() as Arc<dyn ProfileStore>);

    let state = Arc::new(AppState {
        config,
        store,
        verifier: Arc::new(test_verifier()),
        sessions,
    });

    (create_router(state.clone()), state)
}
