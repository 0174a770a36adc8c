//! Path Derivation Engine
//!
//! Walks a derivation path one segment at a time over a
//! (key, chain code) pair:
//!
//! - master: `I = HMAC-SHA512(domain, seed)`, `IL` = key, `IR` = chain code
//! - hardened child: `I = HMAC-SHA512(chain_code, 0x00 || key || ser32(i))`
//! - normal child (secp256k1 only): `I = HMAC-SHA512(chain_code, serP(K) || ser32(i))`
//!
//! secp256k1 follows BIP-32 (`IL` is added to the parent key mod n); ed25519
//! follows SLIP-10 (`IL` is the child key and only hardened children exist).
//!
//! SECURITY: intermediate keys and HMAC output are zeroized.

use bitcoin::secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Signing};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CustodyError;
use super::derivation_path::{DerivationComponent, DerivationPath};

type HmacSha512 = Hmac<Sha512>;

/// Shortest and longest seeds BIP-32 accepts
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

/// Curve a derivation tree lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    Secp256k1,
    Ed25519,
}

impl Curve {
    /// HMAC key for the master node
    fn master_domain(&self) -> &'static [u8] {
        match self {
            Curve::Secp256k1 => b"Bitcoin seed",
            Curve::Ed25519 => b"ed25519 seed",
        }
    }
}

/// Derivation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("Seed must be {MIN_SEED_LEN}-{MAX_SEED_LEN} bytes, got {0}")]
    InvalidSeedLength(usize),

    #[error("Derived key at depth {0} is not a valid secp256k1 scalar")]
    InvalidKey(u8),

    #[error("ed25519 only supports hardened derivation, got segment {0}")]
    NonHardenedEd25519(String),

    #[error("Derivation depth exceeds 255")]
    DepthOverflow,

    #[error("HMAC initialization failed")]
    Hmac,
}

impl From<DerivationError> for CustodyError {
    fn from(e: DerivationError) -> Self {
        CustodyError::derivation_failure(e.to_string())
    }
}

/// (key, chain code) pair at one level of the tree
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    key: [u8; 32],
    chain_code: [u8; 32],
    depth: u8,
    #[zeroize(skip)]
    curve: Curve,
}

impl ExtendedKey {
    /// Master node from a binary seed
    pub fn master(seed: &[u8], curve: Curve) -> Result<Self, DerivationError> {
        if seed.len() < MIN_SEED_LEN || seed.len() > MAX_SEED_LEN {
            return Err(DerivationError::InvalidSeedLength(seed.len()));
        }

        let mut mac = HmacSha512::new_from_slice(curve.master_domain()).map_err(|_| DerivationError::Hmac)?;
        mac.update(seed);
        let output = hmac_output(mac);

        let (key, chain_code) = split(&output);
        if curve == Curve::Secp256k1 && SecretKey::from_slice(&key[..]).is_err() {
            return Err(DerivationError::InvalidKey(0));
        }

        Ok(Self {
            key: *key,
            chain_code: *chain_code,
            depth: 0,
            curve,
        })
    }

    pub fn private_key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Derive one child
    pub fn derive_child(&self, component: DerivationComponent) -> Result<Self, DerivationError> {
        let secp = Secp256k1::signing_only();
        self.child(&secp, component)
    }

    fn child<C: Signing>(&self, secp: &Secp256k1<C>, component: DerivationComponent) -> Result<Self, DerivationError> {
        let depth = self.depth.checked_add(1).ok_or(DerivationError::DepthOverflow)?;

        if self.curve == Curve::Ed25519 && !component.is_hardened() {
            return Err(DerivationError::NonHardenedEd25519(component.to_string()));
        }

        let mut mac = HmacSha512::new_from_slice(&self.chain_code).map_err(|_| DerivationError::Hmac)?;
        if component.is_hardened() {
            mac.update(&[0x00]);
            mac.update(&self.key);
        } else {
            let parent = SecretKey::from_slice(&self.key).map_err(|_| DerivationError::InvalidKey(self.depth))?;
            let public = PublicKey::from_secret_key(secp, &parent);
            mac.update(&public.serialize());
        }
        mac.update(&component.child_number().to_be_bytes());
        let output = hmac_output(mac);

        let (il, chain_code) = split(&output);
        let key = match self.curve {
            Curve::Ed25519 => il,
            Curve::Secp256k1 => {
                // BIP-32: child = parse256(IL) + k_par (mod n); IL >= n or a zero
                // result makes this index unusable.
                let tweak = Scalar::from_be_bytes(*il).map_err(|_| DerivationError::InvalidKey(depth))?;
                let mut parent =
                    SecretKey::from_slice(&self.key).map_err(|_| DerivationError::InvalidKey(self.depth))?;
                let child = parent.add_tweak(&tweak);
                parent.non_secure_erase();
                let mut child = child.map_err(|_| DerivationError::InvalidKey(depth))?;
                let bytes = Zeroizing::new(child.secret_bytes());
                child.non_secure_erase();
                bytes
            }
        };

        Ok(Self {
            key: *key,
            chain_code: *chain_code,
            depth,
            curve: self.curve,
        })
    }
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("curve", &self.curve)
            .field("depth", &self.depth)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the extended key at `path`
///
/// For ed25519 every segment is hardened first, whatever the path says.
pub fn derive_path(seed: &[u8], path: &DerivationPath, curve: Curve) -> Result<ExtendedKey, DerivationError> {
    let path = match curve {
        Curve::Ed25519 => path.to_hardened(),
        Curve::Secp256k1 => path.clone(),
    };

    let secp = Secp256k1::signing_only();
    let mut current = ExtendedKey::master(seed, curve)?;
    for component in path.components() {
        current = current.child(&secp, *component)?;
    }
    Ok(current)
}

fn hmac_output(mac: HmacSha512) -> Zeroizing<[u8; 64]> {
    let mut output = Zeroizing::new([0u8; 64]);
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

fn split(output: &[u8; 64]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let mut left = Zeroizing::new([0u8; 32]);
    let mut right = Zeroizing::new([0u8; 32]);
    left.copy_from_slice(&output[..32]);
    right.copy_from_slice(&output[32..]);
    (left, right)
}
