//! Derived image variants.
//!
//! A variant is a blob plus an ordered transformation pipeline. The pipeline
//! is identified by a signed, non-expiring token; hashing that token yields
//! a deterministic storage key, so a variant is generated at most once and
//! served from storage afterwards.

mod error;
mod service;
mod types;
pub mod variation;

pub use error::VariantError;
pub use service::{WEB_IMAGE_CONTENT_TYPES, key, key_from_variant, processed};
pub use types::{Blob, VariantDescriptor, VariantRecord};
pub use variation::{Transformation, TransformedImage};
