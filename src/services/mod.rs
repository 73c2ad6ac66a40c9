// SPDX-License-Identifier: MIT

//! Services module - identity provider integrations.

pub mod gcip;
pub mod identity;
pub mod token_verify;

pub use gcip::GcipClient;
pub use identity::{IdentityError, IdentityProvider};
pub use token_verify::{IdTokenVerifier, VerifiedUser, VerifyError};
