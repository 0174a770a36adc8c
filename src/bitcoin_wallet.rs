//! UTXO adapter (Bitcoin)
//!
//! Two independent keypairs come out of one mnemonic:
//! - SegWit P2WPKH at `m/84'/coin'/account'/0/index` (`bc1q...`)
//! - Taproot P2TR at `m/86'/coin'/account'/0/index` (`bc1p...`, see `taproot_wallet`)
//!
//! Each keypair is tagged with its `AddressVariant` so re-derivation can tell
//! them apart.

use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, PrivateKey};
use zeroize::Zeroizing;

use crate::error::{CustodyError, CustodyResult};
use crate::taproot_wallet::derive_taproot_keypair;
use crate::types::{AddressVariant, Chain, DerivedKeypair, Network, WalletSlot};
use crate::wallet::derivation::{derive_path, Curve};
use crate::wallet::derivation_path::DerivationPath;

/// Derive both address variants
pub fn derive_utxo_keypairs(seed: &[u8], network: Network, account: u32, index: u32) -> CustodyResult<Vec<DerivedKeypair>> {
    Chain::Bitcoin
        .variants()
        .iter()
        .map(|variant| derive_utxo_keypair(seed, *variant, network, account, index))
        .collect()
}

/// Derive a single variant
pub fn derive_utxo_keypair(
    seed: &[u8],
    variant: AddressVariant,
    network: Network,
    account: u32,
    index: u32,
) -> CustodyResult<DerivedKeypair> {
    match variant {
        AddressVariant::SegWit => derive_segwit_keypair(seed, network, account, index),
        AddressVariant::Taproot => derive_taproot_keypair(seed, network, account, index),
        AddressVariant::Standard => Err(CustodyError::invalid_input(
            "Bitcoin has no standard variant, use segwit or taproot",
        )),
    }
}

pub fn derive_segwit_keypair(seed: &[u8], network: Network, account: u32, index: u32) -> CustodyResult<DerivedKeypair> {
    let slot = WalletSlot::new(Chain::Bitcoin, AddressVariant::SegWit);
    let path = DerivationPath::for_slot(slot, network, account, index)?;
    let extended = derive_path(seed, &path, Curve::Secp256k1)?;

    let private_key = Zeroizing::new(*extended.private_key());
    let (address, public_key_hex) = segwit_address(&private_key, network)?;

    Ok(DerivedKeypair {
        slot,
        derivation_path: path.to_string(),
        address,
        public_key_hex,
        private_key,
    })
}

/// P2WPKH address and compressed public key
pub fn segwit_address(private_key: &[u8; 32], network: Network) -> CustodyResult<(String, String)> {
    let secp = Secp256k1::signing_only();
    let secret_key = SecretKey::from_slice(private_key)?;
    let compressed = CompressedPublicKey(secret_key.public_key(&secp));
    let address = Address::p2wpkh(&compressed, network.bitcoin_network());

    Ok((address.to_string(), hex::encode(compressed.to_bytes())))
}

/// Wallet Import Format for the private key
pub fn private_key_wif(private_key: &[u8; 32], network: Network) -> CustodyResult<Zeroizing<String>> {
    let secret_key = SecretKey::from_slice(private_key)?;
    Ok(Zeroizing::new(
        PrivateKey::new(secret_key, network.bitcoin_network()).to_wif(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::mnemonic;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_bip84_vector() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        let keypair = derive_segwit_keypair(seed.as_ref(), Network::Mainnet, 0, 0).unwrap();

        assert_eq!(keypair.address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert_eq!(
            keypair.public_key_hex,
            "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c"
        );
        assert_eq!(keypair.derivation_path, "m/84'/0'/0'/0/0");
        assert_eq!(
            private_key_wif(keypair.private_key_bytes(), Network::Mainnet).unwrap().as_str(),
            "KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d"
        );
    }

    #[test]
    fn test_both_variants_tagged() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        let keypairs = derive_utxo_keypairs(seed.as_ref(), Network::Mainnet, 0, 0).unwrap();

        assert_eq!(keypairs.len(), 2);
        assert_eq!(keypairs[0].slot.variant, AddressVariant::SegWit);
        assert!(keypairs[0].address.starts_with("bc1q"));
        assert_eq!(keypairs[1].slot.variant, AddressVariant::Taproot);
        assert!(keypairs[1].address.starts_with("bc1p"));
        assert_ne!(keypairs[0].private_key_bytes(), keypairs[1].private_key_bytes());
    }

    #[test]
    fn test_testnet_prefix_and_coin_type() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        let keypair = derive_segwit_keypair(seed.as_ref(), Network::Testnet, 0, 0).unwrap();

        assert!(keypair.address.starts_with("tb1q"));
        assert_eq!(keypair.derivation_path, "m/84'/1'/0'/0/0");
    }

    #[test]
    fn test_standard_variant_rejected() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        assert!(derive_utxo_keypair(seed.as_ref(), AddressVariant::Standard, Network::Mainnet, 0, 0).is_err());
    }
}
