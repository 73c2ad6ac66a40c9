// SPDX-License-Identifier: MIT

//! Session/profile lifecycle reconciliation core.

pub mod merge;
pub mod reconciler;
pub mod registry;

pub use reconciler::{SessionReconciler, SessionSnapshot};
pub use registry::SessionRegistry;
