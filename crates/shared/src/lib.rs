//! Shared utilities for the report service backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (secure tokens, hashing, URL signing)
//! - JWT verification and claim normalisation

pub mod crypto;
pub mod jwt;
