//! Custody Core Library
//!
//! HD key derivation and at-rest key custody for a multi-chain custodial
//! wallet.
//!
//! # Architecture
//!
//! - **wallet**: BIP-39 mnemonics, derivation paths, the BIP-32/SLIP-10
//!   derivation engine and chain adapter dispatch
//! - **ethereum_wallet / solana_wallet / bitcoin_wallet / taproot_wallet**:
//!   chain-native keypairs and addresses
//! - **vault**: AES-256-GCM sealing of keys per owner
//! - **provisioning**: idempotent per-identity wallet provisioning
//! - **config**: runtime configuration
//!
//! # Security
//!
//! This crate uses `zeroize` to securely clear sensitive data from memory.
//! Private keys, seeds and entropy are zeroed when dropped, and plaintext
//! keys never leave the provisioning call; only vault-sealed records reach
//! the store.
//!
//! # Example
//!
//! ```rust,ignore
//! use custody_core::{CustodyConfig, InMemoryWalletStore, WalletProvisioner};
//!
//! let config = CustodyConfig::from_env()?;
//! let provisioner = WalletProvisioner::new(config, InMemoryWalletStore::new())?;
//! let outcome = provisioner.provision("user-1")?;
//! for wallet in &outcome.wallets {
//!     println!("{}: {}", wallet.slot(), wallet.address);
//! }
//! ```

pub mod config;
pub mod error;
pub mod provisioning;
pub mod types;
pub mod utils;
pub mod vault;
pub mod wallet;

pub mod bitcoin_wallet;
pub mod ethereum_wallet;
pub mod solana_wallet;
pub mod taproot_wallet;

pub use config::CustodyConfig;
pub use error::{CustodyError, CustodyResult, ErrorCode};
pub use provisioning::{InMemoryWalletStore, PasswordGate, ProvisioningOutcome, ProvisioningStatus, WalletProvisioner, WalletStore};
pub use types::*;
pub use vault::KeyVault;
pub use wallet::{restore_keypairs, validate_mnemonic, ChainAdapter, DerivationPath};

pub use utils::crypto::{keccak256, to_checksum_address};
