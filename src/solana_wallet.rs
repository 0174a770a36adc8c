//! ed25519 account adapter (Solana)
//!
//! SLIP-10 derivation at `m/44'/501'/account'/index'`; every segment is
//! hardened. The address is the base58 of the 32-byte public key.

use ed25519_dalek::SigningKey;
use zeroize::Zeroizing;

use crate::error::CustodyResult;
use crate::types::{Chain, DerivedKeypair, Network, WalletSlot};
use crate::wallet::derivation::{derive_path, Curve};
use crate::wallet::derivation_path::DerivationPath;

pub fn derive_solana_keypair(seed: &[u8], account: u32, index: u32) -> CustodyResult<DerivedKeypair> {
    let slot = WalletSlot::standard(Chain::Solana);
    let path = DerivationPath::for_slot(slot, Network::Mainnet, account, index)?;
    let extended = derive_path(seed, &path, Curve::Ed25519)?;

    let private_key = Zeroizing::new(*extended.private_key());
    let public_key = solana_public_key(&private_key);

    Ok(DerivedKeypair {
        slot,
        derivation_path: path.to_string(),
        address: bs58::encode(public_key).into_string(),
        public_key_hex: hex::encode(public_key),
        private_key,
    })
}

/// Public key for a 32-byte ed25519 secret seed
pub fn solana_public_key(private_key: &[u8; 32]) -> [u8; 32] {
    let signing_key = SigningKey::from_bytes(private_key);
    signing_key.verifying_key().to_bytes()
}

/// 64-byte `secret || public` keypair in base58, the form Solana wallets import
pub fn keypair_base58(keypair: &DerivedKeypair) -> Zeroizing<String> {
    let public_key = solana_public_key(keypair.private_key_bytes());
    let mut bytes = Zeroizing::new([0u8; 64]);
    bytes[..32].copy_from_slice(keypair.private_key_bytes());
    bytes[32..].copy_from_slice(&public_key);
    Zeroizing::new(bs58::encode(&bytes[..]).into_string())
}
