//! EVM account adapter
//!
//! Ethereum and BNB Smart Chain share the secp256k1 BIP-44 tree under coin
//! type 60 and the same Keccak address scheme.

use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use crate::error::{CustodyError, CustodyResult};
use crate::types::{Chain, ChainFamily, DerivedKeypair, Network, WalletSlot};
use crate::utils::crypto::{keccak256, to_checksum_address};
use crate::wallet::derivation::{derive_path, Curve};
use crate::wallet::derivation_path::DerivationPath;

/// Derive the EVM keypair at `m/44'/60'/account'/0/index`
pub fn derive_evm_keypair(seed: &[u8], chain: Chain, account: u32, index: u32) -> CustodyResult<DerivedKeypair> {
    if chain.family() != ChainFamily::Evm {
        return Err(CustodyError::invalid_input(format!("{} is not an EVM chain", chain)));
    }

    let slot = WalletSlot::standard(chain);
    let path = DerivationPath::for_slot(slot, Network::Mainnet, account, index)?;
    let extended = derive_path(seed, &path, Curve::Secp256k1)?;

    let private_key = Zeroizing::new(*extended.private_key());
    let (address, public_key_hex) = evm_address(&private_key)?;

    Ok(DerivedKeypair {
        slot,
        derivation_path: path.to_string(),
        address,
        public_key_hex,
        private_key,
    })
}

/// EIP-55 address and uncompressed public key (without the 0x04 prefix)
pub fn evm_address(private_key: &[u8; 32]) -> CustodyResult<(String, String)> {
    let secp = Secp256k1::signing_only();
    let secret_key = SecretKey::from_slice(private_key)?;
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);

    let uncompressed = public_key.serialize_uncompressed();
    let public_key_bytes = &uncompressed[1..];
    let hash = keccak256(public_key_bytes);

    Ok((to_checksum_address(&hash[12..]), hex::encode(public_key_bytes)))
}

/// Check `0x` + 40 hex chars, and the EIP-55 casing when mixed case is used
pub fn is_valid_evm_address(address: &str) -> bool {
    let Some(body) = address.strip_prefix("0x") else {
        return false;
    };
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let all_lower = body.chars().all(|c| !c.is_ascii_uppercase());
    let all_upper = body.chars().all(|c| !c.is_ascii_lowercase());
    if all_lower || all_upper {
        return true;
    }

    match hex::decode(body.to_ascii_lowercase()) {
        Ok(bytes) => to_checksum_address(&bytes) == address,
        Err(_) => false,
    }
}
