//! Core blob-storage logic for Stowage.
//!
//! This crate contains the storage abstraction with ZERO web or database
//! dependencies. Callers own blob metadata and the HTTP surface; everything
//! here works on opaque keys.
//!
//! # Modules
//!
//! - `sanitize` - Filename and Content-Disposition sanitization
//! - `storage` - The pluggable backend contract (disk, S3-compatible)
//! - `variant` - Derived-image keys and on-demand generation

pub mod sanitize;
pub mod storage;
pub mod variant;
