//! Taproot (P2TR) variant of the UTXO adapter
//!
//! BIP-86 key-path only: the output key is the internal key tweaked with an
//! empty script tree.

use bitcoin::secp256k1::{Keypair, Secp256k1, SecretKey};
use bitcoin::Address;
use zeroize::Zeroizing;

use crate::error::CustodyResult;
use crate::types::{AddressVariant, Chain, DerivedKeypair, Network, WalletSlot};
use crate::wallet::derivation::{derive_path, Curve};
use crate::wallet::derivation_path::DerivationPath;

pub fn derive_taproot_keypair(seed: &[u8], network: Network, account: u32, index: u32) -> CustodyResult<DerivedKeypair> {
    let slot = WalletSlot::new(Chain::Bitcoin, AddressVariant::Taproot);
    let path = DerivationPath::for_slot(slot, network, account, index)?;
    let extended = derive_path(seed, &path, Curve::Secp256k1)?;

    let private_key = Zeroizing::new(*extended.private_key());
    let (address, x_only_hex) = derive_taproot_address(&private_key, network)?;

    Ok(DerivedKeypair {
        slot,
        derivation_path: path.to_string(),
        address,
        public_key_hex: x_only_hex,
        private_key,
    })
}

/// P2TR address and x-only internal key
pub fn derive_taproot_address(private_key: &[u8; 32], network: Network) -> CustodyResult<(String, String)> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(private_key)?;

    let keypair = Keypair::from_secret_key(&secp, &secret_key);
    let (x_only_pubkey, _parity) = keypair.x_only_public_key();

    // Address::p2tr applies the BIP-341 tweak itself
    let address = Address::p2tr(&secp, x_only_pubkey, None, network.bitcoin_network());

    Ok((address.to_string(), hex::encode(x_only_pubkey.serialize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::mnemonic;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_bip86_vector() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        let keypair = derive_taproot_keypair(seed.as_ref(), Network::Mainnet, 0, 0).unwrap();

        assert_eq!(
            keypair.address,
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
        assert_eq!(keypair.derivation_path, "m/86'/0'/0'/0/0");
        assert_eq!(keypair.public_key_hex.len(), 64);
    }

    #[test]
    fn test_testnet_address() {
        let seed = mnemonic::to_seed(ABANDON, "").unwrap();
        let keypair = derive_taproot_keypair(seed.as_ref(), Network::Testnet, 0, 0).unwrap();

        assert!(keypair.address.starts_with("tb1p"));
        assert_eq!(keypair.derivation_path, "m/86'/1'/0'/0/0");
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(derive_taproot_address(&[0u8; 32], Network::Mainnet).is_err());
    }
}
