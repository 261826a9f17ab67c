//! Domain layer for the report service.
//!
//! This crate contains:
//! - Domain models (ReportJob, DownloadToken, ThresholdConfig, Principal)
//! - Store traits and their in-memory implementations
//! - The report lifecycle, download token and access services
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
pub mod stores;

pub use errors::ReportError;
