// SPDX-License-Identifier: MIT

//! Identity as reported by the external identity provider.

/// The externally-authenticated principal.
///
/// This is read-only input to the reconciler: it is produced by the identity
/// provider (sign-up, sign-in, federated sign-in, or token verification) and
/// never written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Provider-assigned unique ID (Firestore document key for the profile).
    pub uid: String,
    /// Email address (may be absent for some federated identities).
    pub email: Option<String>,
    /// Display name as known to the provider.
    pub display_name: Option<String>,
    /// Avatar URL as known to the provider.
    pub photo_url: Option<String>,
    /// Provider-issued ID token for this session.
    pub id_token: String,
}
