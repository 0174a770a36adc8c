//! Wallet Module
//!
//! Mnemonic handling, derivation paths, the derivation engine and
//! per-chain adapter dispatch.

pub mod adapter;
pub mod derivation;
pub mod derivation_path;
pub mod mnemonic;

pub use adapter::{derive_slot, restore_keypairs, slot_public_key, ChainAdapter};
pub use derivation::{derive_path, Curve, DerivationError, ExtendedKey};
pub use derivation_path::{DerivationComponent, DerivationPath};

/// Validate a mnemonic phrase
pub fn validate_mnemonic(phrase: &str) -> bool {
    mnemonic::validate(phrase)
}
