// SPDX-License-Identifier: MIT

//! Profile storage layer (Firestore in production, in-memory for tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Profile, ProfileUpdate};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
}

/// Document store contract for the `profiles` collection.
///
/// No locking or transactions: reconciliation is read-modify-write with
/// last-write-wins semantics at the store, which is an accepted
/// weak-consistency point for concurrent sessions of the same identity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get a profile by identity uid.
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, AppError>;

    /// Create (or fully overwrite) a profile document.
    async fn create_profile(&self, profile: &Profile) -> Result<(), AppError>;

    /// Partially update a profile document; only set fields are written.
    /// Callers check existence first: a masked update against a missing
    /// document is not a supported path.
    async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> Result<(), AppError>;
}
