//! Custom Axum extractors.
//!
//! Extractors that authenticate callers at the trust boundary.

pub mod principal;
pub mod worker_key;

pub use principal::AuthenticatedPrincipal;
pub use worker_key::{WorkerAuth, WORKER_KEY_HEADER};
