//! First-generation key protection
//!
//! Keystream XOR keyed only by the owner id and a fixed salt. It has no
//! integrity check and anyone holding the salt can open it, so records in
//! this format are only ever read and then resealed.
//!
//! Keystream block `i` is `SHA-512(LEGACY_SALT || owner_id || be32(i))`.

use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use crate::error::{CustodyError, CustodyResult};
use crate::utils::crypto::{base64_decode, base64_encode};

const LEGACY_SALT: &[u8] = b"wallet-key-salt";

fn apply_keystream(data: &[u8], owner_id: &str) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(data.to_vec());

    for (counter, chunk) in out.chunks_mut(64).enumerate() {
        let mut hasher = Sha512::new();
        hasher.update(LEGACY_SALT);
        hasher.update(owner_id.as_bytes());
        hasher.update((counter as u32).to_be_bytes());
        let mut block = Zeroizing::new([0u8; 64]);
        block.copy_from_slice(&hasher.finalize());

        for (byte, k) in chunk.iter_mut().zip(block.iter()) {
            *byte ^= k;
        }
    }

    out
}

/// Open a legacy ciphertext
///
/// A wrong owner id yields garbage rather than an error; the only caller,
/// `KeyVault::reseal`, checks the key against the wallet's public key.
pub fn decrypt(ciphertext_b64: &str, owner_id: &str) -> CustodyResult<Zeroizing<Vec<u8>>> {
    let bytes = Zeroizing::new(base64_decode(ciphertext_b64)?);
    if bytes.is_empty() {
        return Err(CustodyError::decryption_failure("Legacy ciphertext is empty"));
    }
    Ok(apply_keystream(&bytes, owner_id))
}

/// Seal in the legacy format
///
/// Only used to build migration fixtures; the vault never writes this format.
pub fn encrypt(plaintext: &[u8], owner_id: &str) -> String {
    base64_encode(&apply_keystream(plaintext, owner_id))
}
