//! Provisioning Module
//!
//! Per-identity wallet provisioning and the persistence collaborator it
//! writes through.

pub mod orchestrator;
pub mod store;

pub use orchestrator::{
    PasswordGate, ProvisioningOutcome, ProvisioningStatus, RecoveryMismatch, RecoveryReport, SlotDeriver,
    SlotFailure, WalletProvisioner,
};
pub use store::{InMemoryWalletStore, WalletStore};
