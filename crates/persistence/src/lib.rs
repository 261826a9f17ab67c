//! Persistence layer for the report service.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain store traits
//! - Query and pool metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
