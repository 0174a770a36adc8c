//! Wallet Provisioning Orchestrator
//!
//! Per identity:
//! 1. read the store
//! 2. every configured slot present: return the stored set unchanged
//! 3. mnemonic present but slots missing: derive only the missing slots
//! 4. nothing stored: generate a mnemonic and derive every slot
//! 5. seal each key (and the mnemonic) for the owner
//! 6. hand everything to the store in one batch
//!
//! Slots are derived in parallel; the batch write is the only join point.
//! A slot whose derivation or sealing fails is left out and reported in
//! `failures`. If no slot survives, nothing is written.

use std::fmt;

use secrecy::SecretString;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::config::CustodyConfig;
use crate::error::{CustodyError, CustodyResult, ErrorCode};
use crate::types::{DerivedKeypair, MnemonicRecord, Network, WalletRecord, WalletSlot};
use crate::vault::KeyVault;
use crate::wallet::adapter::derive_slot;
use crate::wallet::mnemonic;
use crate::{log_debug, log_error, log_info, log_warn};

use super::store::WalletStore;

const MODULE: &str = "provisioning";

/// Derives one wallet slot from a seed
pub type SlotDeriver = fn(&[u8], WalletSlot, Network) -> CustodyResult<DerivedKeypair>;

fn first_address(seed: &[u8], slot: WalletSlot, network: Network) -> CustodyResult<DerivedKeypair> {
    derive_slot(seed, slot, network, 0, 0)
}

/// Re-verifies a user's password before the mnemonic is shown again
pub trait PasswordGate {
    fn verify(&self, owner_id: &str, password: &SecretString) -> CustodyResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStatus {
    /// New mnemonic and wallet set
    Created,
    /// Missing slots derived from the stored mnemonic
    Extended,
    /// Nothing written
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotFailure {
    pub slot: WalletSlot,
    pub code: ErrorCode,
    pub message: String,
}

pub struct ProvisioningOutcome {
    pub owner_id: String,
    pub status: ProvisioningStatus,
    /// Every wallet the owner has after this call
    pub wallets: Vec<WalletRecord>,
    /// Only set when the mnemonic was created by this call
    pub mnemonic: Option<Zeroizing<String>>,
    pub failures: Vec<SlotFailure>,
}

impl ProvisioningOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_slots(&self) -> Vec<WalletSlot> {
        self.failures.iter().map(|f| f.slot).collect()
    }

    /// Turn a partial outcome into a `PartialProvisioning` error
    pub fn ensure_complete(self) -> CustodyResult<Self> {
        if !self.is_partial() {
            return Ok(self);
        }
        let failed = self
            .failed_slots()
            .iter()
            .map(WalletSlot::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(CustodyError::partial_provisioning(format!(
            "Provisioned {} wallets for {}",
            self.wallets.len(),
            self.owner_id
        ))
        .with_details(format!("failed: {}", failed)))
    }
}

impl fmt::Debug for ProvisioningOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningOutcome")
            .field("owner_id", &self.owner_id)
            .field("status", &self.status)
            .field("wallets", &self.wallets)
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "[REDACTED]"))
            .field("failures", &self.failures)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryMismatch {
    pub slot: WalletSlot,
    pub reason: String,
}

/// Result of re-deriving stored wallets from the stored mnemonic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub owner_id: String,
    pub checked: usize,
    pub mismatches: Vec<RecoveryMismatch>,
}

impl RecoveryReport {
    pub fn is_recoverable(&self) -> bool {
        self.mismatches.is_empty()
    }
}

pub struct WalletProvisioner<S: WalletStore> {
    config: CustodyConfig,
    vault: KeyVault,
    store: S,
    deriver: SlotDeriver,
}

impl<S: WalletStore> WalletProvisioner<S> {
    pub fn new(config: CustodyConfig, store: S) -> CustodyResult<Self> {
        config.validate()?;
        let vault = KeyVault::from_config(&config.vault)?;
        Ok(Self {
            config,
            vault,
            store,
            deriver: first_address,
        })
    }

    /// Replace how slots are derived
    pub fn with_deriver(mut self, deriver: SlotDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn vault(&self) -> &KeyVault {
        &self.vault
    }

    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    pub fn provision(&self, owner_id: &str) -> CustodyResult<ProvisioningOutcome> {
        if owner_id.trim().is_empty() {
            return Err(CustodyError::invalid_input("Owner id is empty"));
        }

        let existing = self.store.wallets(owner_id)?;
        let missing: Vec<WalletSlot> = self
            .config
            .chains
            .iter()
            .copied()
            .filter(|slot| !existing.iter().any(|w| w.slot() == *slot))
            .collect();

        if missing.is_empty() {
            log_debug!(MODULE, "Identity already provisioned", owner = owner_id);
            return Ok(self.existing_outcome(owner_id, existing, Vec::new()));
        }

        match self.store.mnemonic(owner_id)? {
            Some(record) => {
                log_info!(MODULE, "Deriving missing wallets", owner = owner_id, missing = missing.len());
                let phrase = self.open_phrase(&record, owner_id)?;
                self.derive_and_store(owner_id, &phrase, existing, &missing, None)
            }
            None if !existing.is_empty() => {
                log_warn!(MODULE, "Wallets exist without a mnemonic, leaving them untouched", owner = owner_id);
                Ok(self.existing_outcome(owner_id, existing, Vec::new()))
            }
            None => {
                log_info!(MODULE, "Creating wallet set", owner = owner_id, chains = self.config.chains.len());
                let phrase = mnemonic::generate_with_words(self.config.mnemonic_words)?;
                let record = MnemonicRecord {
                    owner_id: owner_id.to_string(),
                    encrypted_phrase: self.vault.encrypt(phrase.as_bytes(), owner_id)?,
                    word_count: mnemonic::word_count(&phrase),
                    created_at: chrono::Utc::now().timestamp(),
                };
                self.derive_and_store(owner_id, &phrase, existing, &self.config.chains, Some(record))
                    .map(|mut outcome| {
                        if outcome.status == ProvisioningStatus::Created {
                            outcome.mnemonic = Some(phrase);
                        }
                        outcome
                    })
            }
        }
    }

    fn derive_and_store(
        &self,
        owner_id: &str,
        phrase: &str,
        existing: Vec<WalletRecord>,
        slots: &[WalletSlot],
        mnemonic_record: Option<MnemonicRecord>,
    ) -> CustodyResult<ProvisioningOutcome> {
        let creating = mnemonic_record.is_some();
        let seed = mnemonic::to_seed(phrase, "")?;

        let (records, failures) = self.derive_records(owner_id, seed.as_ref(), slots);

        if records.is_empty() {
            if creating {
                log_error!(MODULE, "No wallet could be provisioned", owner = owner_id);
                let reasons = failures
                    .iter()
                    .map(|f| format!("{}: {}", f.slot, f.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(CustodyError::derivation_failure("No wallet could be provisioned").with_details(reasons));
            }
            return Ok(self.existing_outcome(owner_id, existing, failures));
        }

        let new_count = records.len();
        match self.store.put_batch(owner_id, mnemonic_record, records.clone()) {
            Ok(()) => {}
            Err(e) if e.code == ErrorCode::PersistenceConflict => {
                log_warn!(MODULE, "Concurrent provisioning detected, returning stored set", owner = owner_id);
                let stored = self.store.wallets(owner_id)?;
                return Ok(self.existing_outcome(owner_id, stored, Vec::new()));
            }
            Err(e) => return Err(e),
        }

        log_info!(
            MODULE,
            "Wallets stored",
            owner = owner_id,
            created = new_count,
            failed = failures.len()
        );

        let mut wallets = existing;
        wallets.extend(records);
        Ok(ProvisioningOutcome {
            owner_id: owner_id.to_string(),
            status: if creating {
                ProvisioningStatus::Created
            } else {
                ProvisioningStatus::Extended
            },
            wallets: self.in_config_order(wallets),
            mnemonic: None,
            failures,
        })
    }

    /// Derive and seal each slot; failed slots are reported, never filled in
    fn derive_records(&self, owner_id: &str, seed: &[u8], slots: &[WalletSlot]) -> (Vec<WalletRecord>, Vec<SlotFailure>) {
        let network = self.config.network;
        let deriver = self.deriver;

        let derived: Vec<(WalletSlot, CustodyResult<DerivedKeypair>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = slots
                .iter()
                .map(|slot| {
                    let slot = *slot;
                    (slot, scope.spawn(move || deriver(seed, slot, network)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(slot, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(CustodyError::derivation_failure("Derivation thread panicked")));
                    (slot, result)
                })
                .collect()
        });

        let created_at = chrono::Utc::now().timestamp();
        let mut records = Vec::new();
        let mut failures = Vec::new();

        for (slot, result) in derived {
            let keypair = match result {
                Ok(keypair) if keypair.slot == slot && !keypair.address.is_empty() => keypair,
                Ok(_) => {
                    log_warn!(MODULE, "Adapter returned the wrong slot or an empty address", slot = slot);
                    failures.push(SlotFailure {
                        slot,
                        code: ErrorCode::DerivationFailure,
                        message: "Adapter returned an unusable keypair".to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    log_warn!(MODULE, "Derivation failed", slot = slot, code = format!("{:?}", e.code));
                    failures.push(SlotFailure {
                        slot,
                        code: e.code,
                        message: e.message,
                    });
                    continue;
                }
            };

            let encrypted_key = match self.vault.encrypt(keypair.private_key_bytes(), owner_id) {
                Ok(sealed) => sealed,
                Err(e) => {
                    log_error!(MODULE, "Key sealing failed, dropping wallet", slot = slot);
                    failures.push(SlotFailure {
                        slot,
                        code: ErrorCode::EncryptionFailure,
                        message: e.message,
                    });
                    continue;
                }
            };

            log_debug!(MODULE, "Derived wallet", slot = slot, address = keypair.address);
            records.push(WalletRecord {
                owner_id: owner_id.to_string(),
                chain_family: slot.chain.family(),
                chain: slot.chain,
                currency_symbol: slot.chain.symbol().to_string(),
                address: keypair.address.clone(),
                encrypted_key,
                wallet_variant: slot.variant,
                derivation_path: keypair.derivation_path.clone(),
                public_key_hex: keypair.public_key_hex.clone(),
                created_at,
            });
        }

        (records, failures)
    }

    fn existing_outcome(&self, owner_id: &str, wallets: Vec<WalletRecord>, failures: Vec<SlotFailure>) -> ProvisioningOutcome {
        ProvisioningOutcome {
            owner_id: owner_id.to_string(),
            status: ProvisioningStatus::Existing,
            wallets: self.in_config_order(wallets),
            mnemonic: None,
            failures,
        }
    }

    /// Configured slots first, in configured order; anything else after
    fn in_config_order(&self, mut wallets: Vec<WalletRecord>) -> Vec<WalletRecord> {
        let position = |w: &WalletRecord| {
            self.config
                .chains
                .iter()
                .position(|slot| *slot == w.slot())
                .unwrap_or(usize::MAX)
        };
        wallets.sort_by_key(position);
        wallets
    }

    fn open_phrase(&self, record: &MnemonicRecord, owner_id: &str) -> CustodyResult<Zeroizing<String>> {
        let bytes = self.vault.decrypt(&record.encrypted_phrase, owner_id)?;
        let phrase = std::str::from_utf8(&bytes)
            .map_err(|_| CustodyError::decryption_failure("Stored mnemonic is not UTF-8"))?;
        if !mnemonic::validate(phrase) {
            return Err(CustodyError::invalid_mnemonic("Stored mnemonic failed validation"));
        }
        Ok(Zeroizing::new(phrase.to_string()))
    }

    /// Show the mnemonic again after the password gate says yes
    pub fn reveal_mnemonic(
        &self,
        owner_id: &str,
        password: &SecretString,
        gate: &dyn PasswordGate,
    ) -> CustodyResult<Zeroizing<String>> {
        if !gate.verify(owner_id, password)? {
            log_warn!(MODULE, "Mnemonic reveal refused", owner = owner_id);
            return Err(CustodyError::auth_error("Password verification failed"));
        }

        let record = self
            .store
            .mnemonic(owner_id)?
            .ok_or_else(|| CustodyError::not_found(format!("No mnemonic for {}", owner_id)))?;

        log_info!(MODULE, "Mnemonic revealed", owner = owner_id);
        self.open_phrase(&record, owner_id)
    }

    /// Re-derive every stored wallet from the stored mnemonic
    pub fn verify_recoverability(&self, owner_id: &str) -> CustodyResult<RecoveryReport> {
        let record = self
            .store
            .mnemonic(owner_id)?
            .ok_or_else(|| CustodyError::not_found(format!("No mnemonic for {}", owner_id)))?;
        let phrase = self.open_phrase(&record, owner_id)?;
        let seed = mnemonic::to_seed(&phrase, "")?;

        let wallets = self.store.wallets(owner_id)?;
        let mut mismatches = Vec::new();

        for wallet in &wallets {
            let slot = wallet.slot();
            let reason = match (self.deriver)(seed.as_ref(), slot, self.config.network) {
                Err(e) => Some(format!("re-derivation failed: {}", e.message)),
                Ok(keypair) if keypair.address != wallet.address => Some(format!(
                    "address {} re-derived as {}",
                    wallet.address, keypair.address
                )),
                Ok(keypair) if keypair.derivation_path != wallet.derivation_path => Some(format!(
                    "path {} re-derived as {}",
                    wallet.derivation_path, keypair.derivation_path
                )),
                Ok(keypair) => match self.vault.decrypt_private_key(&wallet.encrypted_key, owner_id) {
                    Ok(stored) if *stored == *keypair.private_key_bytes() => None,
                    Ok(_) => Some("stored key differs from re-derived key".to_string()),
                    Err(e) => Some(format!("stored key unreadable: {}", e.message)),
                },
            };

            if let Some(reason) = reason {
                log_warn!(MODULE, "Wallet not recoverable from mnemonic", slot = slot);
                mismatches.push(RecoveryMismatch { slot, reason });
            }
        }

        Ok(RecoveryReport {
            owner_id: owner_id.to_string(),
            checked: wallets.len(),
            mismatches,
        })
    }
}
