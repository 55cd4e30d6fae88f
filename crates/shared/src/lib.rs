//! Shared configuration and signing primitives for Stowage.
//!
//! This crate provides the pieces used across all other crates:
//! - Configuration loading (service selection, secrets, storage settings)
//! - The signed-token primitive backing capability URLs and variant keys

pub mod config;
pub mod token;

pub use config::StowageConfig;
pub use token::{CapabilityClaims, TokenError, Verifier};
