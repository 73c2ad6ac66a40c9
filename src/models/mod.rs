// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod identity;
pub mod profile;

pub use identity::Identity;
pub use profile::{Profile, ProfileUpdate, SubscriptionStatus};
