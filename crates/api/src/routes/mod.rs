//! HTTP route handlers.

pub mod downloads;
pub mod health;
pub mod reports;
pub mod threshold_configs;
pub mod worker_events;
