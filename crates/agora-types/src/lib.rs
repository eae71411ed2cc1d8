//! Agora Types - value types shared by the governance components.
//!
//! This crate provides:
//! - Addresses (20-byte account and contract identifiers)
//! - Hashes (32-byte blake3 digests)
//! - `HashBuilder`, the canonical encoder behind every content-derived id

pub mod address;
pub mod hash;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use hash::{Hash, HashBuilder};
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Hash, HashBuilder, TypesError};
}
