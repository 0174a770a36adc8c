//! Chain adapter dispatch
//!
//! Closed set of adapter families. Adding a chain means adding a `Chain`
//! variant and the compiler points at every match that has to learn it.

use crate::bitcoin_wallet::{derive_utxo_keypair, segwit_address};
use crate::error::{CustodyError, CustodyResult};
use crate::ethereum_wallet::{derive_evm_keypair, evm_address};
use crate::solana_wallet::{derive_solana_keypair, solana_public_key};
use crate::taproot_wallet::derive_taproot_address;
use crate::types::{AddressVariant, Chain, ChainFamily, DerivedKeypair, Network, WalletSlot};

use super::mnemonic;

/// Adapter for one chain family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainAdapter {
    /// secp256k1 + Keccak addresses
    Evm { chain: Chain },
    /// SLIP-10 ed25519 + base58 addresses
    Ed25519Account { chain: Chain },
    /// Bitcoin-style, one keypair per address variant
    Utxo { chain: Chain, network: Network },
}

impl ChainAdapter {
    pub fn for_chain(chain: Chain, network: Network) -> Self {
        match chain.family() {
            ChainFamily::Evm => ChainAdapter::Evm { chain },
            ChainFamily::Ed25519Account => ChainAdapter::Ed25519Account { chain },
            ChainFamily::Utxo => ChainAdapter::Utxo { chain, network },
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            ChainAdapter::Evm { chain }
            | ChainAdapter::Ed25519Account { chain }
            | ChainAdapter::Utxo { chain, .. } => *chain,
        }
    }

    pub fn family(&self) -> ChainFamily {
        self.chain().family()
    }

    /// Derive the keypair for one address variant
    pub fn derive(&self, seed: &[u8], variant: AddressVariant, account: u32, index: u32) -> CustodyResult<DerivedKeypair> {
        let slot = WalletSlot::new(self.chain(), variant);
        if !slot.is_supported() {
            return Err(CustodyError::invalid_input(format!(
                "Unsupported wallet slot {}",
                slot
            )));
        }

        match self {
            ChainAdapter::Evm { chain } => derive_evm_keypair(seed, *chain, account, index),
            ChainAdapter::Ed25519Account { .. } => derive_solana_keypair(seed, account, index),
            ChainAdapter::Utxo { network, .. } => derive_utxo_keypair(seed, variant, *network, account, index),
        }
    }

    /// Public key hex for a raw private key, in the form the adapter stores it
    pub fn public_key_hex(&self, private_key: &[u8; 32], variant: AddressVariant) -> CustodyResult<String> {
        let slot = WalletSlot::new(self.chain(), variant);
        if !slot.is_supported() {
            return Err(CustodyError::invalid_input(format!(
                "Unsupported wallet slot {}",
                slot
            )));
        }

        match (self, variant) {
            (ChainAdapter::Evm { .. }, _) => Ok(evm_address(private_key)?.1),
            (ChainAdapter::Ed25519Account { .. }, _) => Ok(hex::encode(solana_public_key(private_key))),
            (ChainAdapter::Utxo { network, .. }, AddressVariant::Taproot) => {
                Ok(derive_taproot_address(private_key, *network)?.1)
            }
            (ChainAdapter::Utxo { network, .. }, _) => Ok(segwit_address(private_key, *network)?.1),
        }
    }

    /// Derive every variant the chain supports
    pub fn derive_all(&self, seed: &[u8], account: u32, index: u32) -> CustodyResult<Vec<DerivedKeypair>> {
        self.chain()
            .variants()
            .iter()
            .map(|variant| self.derive(seed, *variant, account, index))
            .collect()
    }
}

/// Derive one wallet slot from a seed
pub fn derive_slot(seed: &[u8], slot: WalletSlot, network: Network, account: u32, index: u32) -> CustodyResult<DerivedKeypair> {
    ChainAdapter::for_chain(slot.chain, network).derive(seed, slot.variant, account, index)
}

/// Public key hex of `private_key` for one wallet slot
pub fn slot_public_key(private_key: &[u8; 32], slot: WalletSlot) -> CustodyResult<String> {
    ChainAdapter::for_chain(slot.chain, Network::Mainnet).public_key_hex(private_key, slot.variant)
}

/// Re-derive keypairs for `slots` straight from a mnemonic
///
/// The phrase is validated first; an invalid phrase fails before any key
/// is derived.
pub fn restore_keypairs(
    phrase: &str,
    passphrase: &str,
    slots: &[WalletSlot],
    network: Network,
) -> CustodyResult<Vec<DerivedKeypair>> {
    let seed = mnemonic::to_seed(phrase, passphrase)?;
    slots
        .iter()
        .map(|slot| derive_slot(seed.as_ref(), *slot, network, 0, 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_dispatch_by_family() {
        assert!(matches!(
            ChainAdapter::for_chain(Chain::Bnb, Network::Mainnet),
            ChainAdapter::Evm { chain: Chain::Bnb }
        ));
        assert!(matches!(
            ChainAdapter::for_chain(Chain::Solana, Network::Mainnet),
            ChainAdapter::Ed25519Account { .. }
        ));
        assert_eq!(
            ChainAdapter::for_chain(Chain::Bitcoin, Network::Testnet).family(),
            ChainFamily::Utxo
        );
    }

    #[test]
    fn test_restore_default_slots() {
        let keypairs = restore_keypairs(ABANDON, "", &WalletSlot::defaults(), Network::Mainnet).unwrap();

        assert_eq!(keypairs.len(), 4);
        assert_eq!(keypairs[0].address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
        assert_eq!(keypairs[2].address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert_eq!(
            keypairs[3].address,
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
        for (keypair, slot) in keypairs.iter().zip(WalletSlot::defaults()) {
            assert_eq!(keypair.slot, slot);
        }
    }

    #[test]
    fn test_invalid_mnemonic_fails_fast() {
        for phrase in ["", "abandon abandon", "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo"] {
            let err = restore_keypairs(phrase, "", &WalletSlot::defaults(), Network::Mainnet).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidMnemonic);
        }
    }

    #[test]
    fn test_passphrase_changes_addresses() {
        let slots = [WalletSlot::standard(Chain::Ethereum)];
        let plain = restore_keypairs(ABANDON, "", &slots, Network::Mainnet).unwrap();
        let protected = restore_keypairs(ABANDON, "extra words", &slots, Network::Mainnet).unwrap();
        assert_ne!(plain[0].address, protected[0].address);
    }

    #[test]
    fn test_unsupported_variant_rejected() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        let adapter = ChainAdapter::for_chain(Chain::Ethereum, Network::Mainnet);
        let err = adapter.derive(seed.as_ref(), AddressVariant::Taproot, 0, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_derive_all_utxo_variants() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        let adapter = ChainAdapter::for_chain(Chain::Bitcoin, Network::Mainnet);
        let variants: Vec<_> = adapter
            .derive_all(seed.as_ref(), 0, 0)
            .unwrap()
            .iter()
            .map(|k| k.slot.variant)
            .collect();
        assert_eq!(variants, vec![AddressVariant::SegWit, AddressVariant::Taproot]);
    }

    #[test]
    fn test_slot_public_key_matches_derivation() {
        for keypair in restore_keypairs(ABANDON, "", &WalletSlot::defaults(), Network::Mainnet).unwrap() {
            let public_key = slot_public_key(keypair.private_key_bytes(), keypair.slot).unwrap();
            assert_eq!(public_key, keypair.public_key_hex, "{}", keypair.slot);
        }
        assert!(slot_public_key(&[1u8; 32], WalletSlot::new(Chain::Solana, AddressVariant::Taproot)).is_err());
    }
}
