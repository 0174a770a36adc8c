//! Persistence collaborator
//!
//! The orchestrator only needs per-owner reads and one atomic batch write.
//! `put_batch` is the idempotence guard: it refuses the whole batch when any
//! (owner, chain, variant) row or the owner's mnemonic already exists.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::{CustodyError, CustodyResult};
use crate::types::{MnemonicRecord, WalletRecord, WalletSlot};

pub trait WalletStore: Send + Sync {
    /// All wallet rows for an owner
    fn wallets(&self, owner_id: &str) -> CustodyResult<Vec<WalletRecord>>;

    /// The owner's sealed mnemonic, if one was issued
    fn mnemonic(&self, owner_id: &str) -> CustodyResult<Option<MnemonicRecord>>;

    /// Persist a batch all-or-nothing
    ///
    /// Fails with `PersistenceConflict` and writes nothing if the batch would
    /// duplicate an existing row.
    fn put_batch(&self, owner_id: &str, mnemonic: Option<MnemonicRecord>, wallets: Vec<WalletRecord>) -> CustodyResult<()>;
}

#[derive(Default)]
struct StoreState {
    wallets: HashMap<String, Vec<WalletRecord>>,
    mnemonics: HashMap<String, MnemonicRecord>,
}

/// Process-local store
#[derive(Default)]
pub struct InMemoryWalletStore {
    state: RwLock<StoreState>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total wallet rows across all owners
    pub fn wallet_count(&self) -> CustodyResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|_| CustodyError::internal("Wallet store lock poisoned"))?;
        Ok(state.wallets.values().map(Vec::len).sum())
    }
}

impl WalletStore for InMemoryWalletStore {
    fn wallets(&self, owner_id: &str) -> CustodyResult<Vec<WalletRecord>> {
        let state = self
            .state
            .read()
            .map_err(|_| CustodyError::internal("Wallet store lock poisoned"))?;
        Ok(state.wallets.get(owner_id).cloned().unwrap_or_default())
    }

    fn mnemonic(&self, owner_id: &str) -> CustodyResult<Option<MnemonicRecord>> {
        let state = self
            .state
            .read()
            .map_err(|_| CustodyError::internal("Wallet store lock poisoned"))?;
        Ok(state.mnemonics.get(owner_id).cloned())
    }

    fn put_batch(&self, owner_id: &str, mnemonic: Option<MnemonicRecord>, wallets: Vec<WalletRecord>) -> CustodyResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| CustodyError::internal("Wallet store lock poisoned"))?;

        if let Some(record) = &mnemonic {
            if record.owner_id != owner_id {
                return Err(CustodyError::invalid_input("Mnemonic record owner does not match batch owner"));
            }
            if state.mnemonics.contains_key(owner_id) {
                return Err(CustodyError::persistence_conflict(format!(
                    "Mnemonic already issued for {}",
                    owner_id
                )));
            }
        }

        let mut taken: HashSet<WalletSlot> = state
            .wallets
            .get(owner_id)
            .map(|rows| rows.iter().map(WalletRecord::slot).collect())
            .unwrap_or_default();
        for wallet in &wallets {
            if wallet.owner_id != owner_id {
                return Err(CustodyError::invalid_input("Wallet record owner does not match batch owner"));
            }
            if !taken.insert(wallet.slot()) {
                return Err(CustodyError::persistence_conflict(format!(
                    "Wallet {} already exists for {}",
                    wallet.slot(),
                    owner_id
                )));
            }
        }

        if let Some(record) = mnemonic {
            state.mnemonics.insert(owner_id.to_string(), record);
        }
        state
            .wallets
            .entry(owner_id.to_string())
            .or_default()
            .extend(wallets);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{AddressVariant, Chain, ChainFamily, EncryptedKeyRecord, KeyEncoding};

    fn record(owner: &str, chain: Chain, variant: AddressVariant) -> WalletRecord {
        WalletRecord {
            owner_id: owner.to_string(),
            chain_family: chain.family(),
            chain,
            currency_symbol: chain.symbol().to_string(),
            address: format!("{}-{}", chain, variant),
            encrypted_key: EncryptedKeyRecord {
                owner_id: owner.to_string(),
                ciphertext: "AA==".to_string(),
                encoding: KeyEncoding::Aes256GcmV1,
            },
            wallet_variant: variant,
            derivation_path: "m".to_string(),
            public_key_hex: String::new(),
            created_at: 0,
        }
    }

    fn mnemonic(owner: &str) -> MnemonicRecord {
        MnemonicRecord {
            owner_id: owner.to_string(),
            encrypted_phrase: EncryptedKeyRecord {
                owner_id: owner.to_string(),
                ciphertext: "AA==".to_string(),
                encoding: KeyEncoding::Aes256GcmV1,
            },
            word_count: 12,
            created_at: 0,
        }
    }

    #[test]
    fn test_put_and_read() {
        let store = InMemoryWalletStore::new();
        store
            .put_batch(
                "user-1",
                Some(mnemonic("user-1")),
                vec![
                    record("user-1", Chain::Ethereum, AddressVariant::Standard),
                    record("user-1", Chain::Bitcoin, AddressVariant::SegWit),
                ],
            )
            .unwrap();

        assert_eq!(store.wallets("user-1").unwrap().len(), 2);
        assert!(store.mnemonic("user-1").unwrap().is_some());
        assert!(store.wallets("user-2").unwrap().is_empty());
        assert_eq!(store.wallet_count().unwrap(), 2);
        assert_eq!(store.wallets("user-1").unwrap()[0].chain_family, ChainFamily::Evm);
    }

    #[test]
    fn test_duplicate_slot_conflicts_atomically() {
        let store = InMemoryWalletStore::new();
        store
            .put_batch("user-1", None, vec![record("user-1", Chain::Ethereum, AddressVariant::Standard)])
            .unwrap();

        let err = store
            .put_batch(
                "user-1",
                None,
                vec![
                    record("user-1", Chain::Solana, AddressVariant::Standard),
                    record("user-1", Chain::Ethereum, AddressVariant::Standard),
                ],
            )
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::PersistenceConflict);
        // Nothing from the rejected batch landed
        assert_eq!(store.wallet_count().unwrap(), 1);
    }

    #[test]
    fn test_second_mnemonic_conflicts() {
        let store = InMemoryWalletStore::new();
        store.put_batch("user-1", Some(mnemonic("user-1")), vec![]).unwrap();
        let err = store.put_batch("user-1", Some(mnemonic("user-1")), vec![]).unwrap_err();
        assert_eq!(err.code, ErrorCode::PersistenceConflict);
    }

    #[test]
    fn test_duplicate_within_batch_conflicts() {
        let store = InMemoryWalletStore::new();
        let err = store
            .put_batch(
                "user-1",
                None,
                vec![
                    record("user-1", Chain::Bitcoin, AddressVariant::Taproot),
                    record("user-1", Chain::Bitcoin, AddressVariant::Taproot),
                ],
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PersistenceConflict);
        assert_eq!(store.wallet_count().unwrap(), 0);
    }

    #[test]
    fn test_owner_mismatch_rejected() {
        let store = InMemoryWalletStore::new();
        let err = store
            .put_batch("user-1", None, vec![record("user-2", Chain::Ethereum, AddressVariant::Standard)])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let store = std::sync::Arc::new(InMemoryWalletStore::new());
        let holder = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = holder.state.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert_eq!(store.wallet_count().unwrap_err().code, ErrorCode::Internal);
        assert_eq!(store.wallets("user-1").unwrap_err().code, ErrorCode::Internal);
    }
}
