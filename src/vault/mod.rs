//! Key Vault
//!
//! Seals private keys (and mnemonics) before they reach storage:
//! - per-owner key: `HMAC-SHA256(master_secret, "custody-vault/v1" || owner_id)`
//! - AES-256-GCM with a random 96-bit nonce and the owner id as AAD
//! - envelope: `base64(version || nonce || ciphertext || tag)`
//!
//! Opening a record under any other owner id fails with `DecryptionFailure`.
//! Records in the first-generation XOR format (see `legacy`) carry no
//! integrity check, so `decrypt` refuses them. They can only be upgraded with
//! [`KeyVault::reseal`], which checks the opened key against the wallet's
//! stored public key.

pub mod legacy;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::ExposeSecret;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::error::{CustodyError, CustodyResult};
use crate::types::{EncryptedKeyRecord, KeyEncoding, WalletRecord};
use crate::utils::crypto::{base64_decode, base64_encode};
use crate::wallet::adapter::slot_public_key;

type HmacSha256 = Hmac<Sha256>;

const ENVELOPE_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KDF_DOMAIN: &[u8] = b"custody-vault/v1";

/// Shortest master secret accepted, in bytes
pub const MIN_MASTER_SECRET_LEN: usize = 32;

pub struct KeyVault {
    master_secret: Zeroizing<Vec<u8>>,
    accept_legacy: bool,
}

impl KeyVault {
    pub fn new(master_secret: &[u8]) -> CustodyResult<Self> {
        if master_secret.len() < MIN_MASTER_SECRET_LEN {
            return Err(CustodyError::config_error(format!(
                "Master secret must be at least {} bytes",
                MIN_MASTER_SECRET_LEN
            )));
        }
        Ok(Self {
            master_secret: Zeroizing::new(master_secret.to_vec()),
            accept_legacy: false,
        })
    }

    /// Build from a hex-encoded master secret
    pub fn from_hex(master_secret_hex: &str) -> CustodyResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(master_secret_hex.trim())
                .map_err(|_| CustodyError::config_error("Master secret is not valid hex"))?,
        );
        Self::new(&bytes)
    }

    pub fn from_config(config: &VaultConfig) -> CustodyResult<Self> {
        let secret = config
            .master_secret
            .as_ref()
            .ok_or_else(|| CustodyError::config_error("Vault master secret is not configured"))?;
        Ok(Self::from_hex(secret.expose_secret())?.with_legacy(config.accept_legacy))
    }

    /// Allow or refuse resealing legacy XOR records
    pub fn with_legacy(mut self, accept_legacy: bool) -> Self {
        self.accept_legacy = accept_legacy;
        self
    }

    fn owner_key(&self, owner_id: &str) -> CustodyResult<Zeroizing<[u8; 32]>> {
        if owner_id.is_empty() {
            return Err(CustodyError::invalid_input("Owner id is empty"));
        }

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.master_secret)
            .map_err(|e| CustodyError::internal(format!("HMAC init failed: {}", e)))?;
        mac.update(KDF_DOMAIN);
        mac.update(owner_id.as_bytes());
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&mac.finalize().into_bytes());
        Ok(key)
    }

    /// Seal `plaintext` for `owner_id`
    pub fn encrypt(&self, plaintext: &[u8], owner_id: &str) -> CustodyResult<EncryptedKeyRecord> {
        if plaintext.is_empty() {
            return Err(CustodyError::encryption_failure("Nothing to encrypt"));
        }

        let key = self.owner_key(owner_id)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| CustodyError::encryption_failure(format!("Failed to create cipher: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: owner_id.as_bytes(),
                },
            )
            .map_err(|e| CustodyError::encryption_failure(format!("Encryption failed: {}", e)))?;

        let mut envelope = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(EncryptedKeyRecord {
            owner_id: owner_id.to_string(),
            ciphertext: base64_encode(&envelope),
            encoding: KeyEncoding::Aes256GcmV1,
        })
    }

    /// Open a record sealed for `owner_id`
    pub fn decrypt(&self, record: &EncryptedKeyRecord, owner_id: &str) -> CustodyResult<Zeroizing<Vec<u8>>> {
        if record.owner_id != owner_id {
            return Err(CustodyError::decryption_failure("Record belongs to a different owner"));
        }

        match record.encoding {
            KeyEncoding::Aes256GcmV1 => self.open_envelope(&record.ciphertext, owner_id),
            KeyEncoding::LegacyXor => Err(CustodyError::decryption_failure(
                "Legacy record must be resealed before use",
            )),
        }
    }

    fn open_envelope(&self, ciphertext_b64: &str, owner_id: &str) -> CustodyResult<Zeroizing<Vec<u8>>> {
        let envelope = base64_decode(ciphertext_b64)?;
        if envelope.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CustodyError::decryption_failure("Ciphertext is truncated"));
        }
        if envelope[0] != ENVELOPE_VERSION {
            return Err(CustodyError::decryption_failure(format!(
                "Unsupported envelope version: {}",
                envelope[0]
            )));
        }

        let (nonce_bytes, ciphertext) = envelope[1..].split_at(NONCE_LEN);
        let key = self.owner_key(owner_id)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| CustodyError::internal(format!("Failed to create cipher: {}", e)))?;

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: owner_id.as_bytes(),
                },
            )
            .map_err(|_| CustodyError::decryption_failure("Wrong owner or corrupted ciphertext"))?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Seal a hex-encoded key; the exact string comes back from `decrypt_hex`
    pub fn encrypt_hex(&self, key_hex: &str, owner_id: &str) -> CustodyResult<EncryptedKeyRecord> {
        if key_hex.is_empty() || !key_hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CustodyError::invalid_input("Key is not a hex string"));
        }
        self.encrypt(key_hex.as_bytes(), owner_id)
    }

    pub fn decrypt_hex(&self, record: &EncryptedKeyRecord, owner_id: &str) -> CustodyResult<Zeroizing<String>> {
        let bytes = self.decrypt(record, owner_id)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| CustodyError::decryption_failure("Plaintext is not a hex string"))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// Open a record holding a raw 32-byte private key
    pub fn decrypt_private_key(&self, record: &EncryptedKeyRecord, owner_id: &str) -> CustodyResult<Zeroizing<[u8; 32]>> {
        let bytes = self.decrypt(record, owner_id)?;
        if bytes.len() != 32 {
            return Err(CustodyError::decryption_failure(format!(
                "Expected a 32-byte key, got {} bytes",
                bytes.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&bytes);
        Ok(key)
    }

    /// Upgrade a wallet's legacy key record to the current envelope
    ///
    /// The opened key must reproduce `wallet.public_key_hex`; a record moved
    /// to another owner or otherwise damaged opens to a different key and is
    /// refused. Current-format records are returned unchanged.
    pub fn reseal(&self, wallet: &WalletRecord) -> CustodyResult<EncryptedKeyRecord> {
        let record = &wallet.encrypted_key;
        if record.owner_id != wallet.owner_id {
            return Err(CustodyError::decryption_failure("Record belongs to a different owner"));
        }

        match record.encoding {
            KeyEncoding::Aes256GcmV1 => Ok(record.clone()),
            KeyEncoding::LegacyXor if !self.accept_legacy => Err(CustodyError::decryption_failure(
                "Legacy records are disabled",
            )),
            KeyEncoding::LegacyXor => {
                let plaintext = legacy::decrypt(&record.ciphertext, &wallet.owner_id)?;
                if plaintext.len() != 32 {
                    return Err(CustodyError::decryption_failure("Legacy record does not hold a 32-byte key"));
                }
                let mut key = Zeroizing::new([0u8; 32]);
                key.copy_from_slice(&plaintext);

                let public_key = slot_public_key(&key, wallet.slot())
                    .map_err(|_| CustodyError::decryption_failure("Legacy record opened to an invalid key"))?;
                if !public_key.eq_ignore_ascii_case(&wallet.public_key_hex) {
                    return Err(CustodyError::decryption_failure(
                        "Legacy record does not match the wallet's public key",
                    ));
                }

                self.encrypt(&key[..], &wallet.owner_id)
            }
        }
    }
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("master_secret", &"[REDACTED]")
            .field("accept_legacy", &self.accept_legacy)
            .finish()
    }
}
