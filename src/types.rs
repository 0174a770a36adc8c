//! Shared types for the custody core
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization between the core and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

// =============================================================================
// Chain Types
// =============================================================================

/// Network the UTXO adapters encode addresses for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn bitcoin_network(&self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

/// Key-derivation family a chain belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainFamily {
    /// secp256k1 account chains with Keccak addresses
    Evm,
    /// ed25519 account chains derived with SLIP-10
    Ed25519Account,
    /// Bitcoin-style UTXO chains
    Utxo,
}

/// Supported blockchains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Ethereum,
    Bnb,
    Solana,
    Bitcoin,
}

impl Chain {
    pub const ALL: [Chain; 4] = [Chain::Ethereum, Chain::Bnb, Chain::Solana, Chain::Bitcoin];

    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Ethereum | Chain::Bnb => ChainFamily::Evm,
            Chain::Solana => ChainFamily::Ed25519Account,
            Chain::Bitcoin => ChainFamily::Utxo,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::Bnb => "BNB",
            Chain::Solana => "SOL",
            Chain::Bitcoin => "BTC",
        }
    }

    /// Address variants a chain can be provisioned with
    pub fn variants(&self) -> &'static [AddressVariant] {
        match self {
            Chain::Ethereum | Chain::Bnb | Chain::Solana => &[AddressVariant::Standard],
            Chain::Bitcoin => &[AddressVariant::SegWit, AddressVariant::Taproot],
        }
    }

    pub fn is_utxo(&self) -> bool {
        self.family() == ChainFamily::Utxo
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Chain::Ethereum => "ethereum",
            Chain::Bnb => "bnb",
            Chain::Solana => "solana",
            Chain::Bitcoin => "bitcoin",
        };
        f.write_str(name)
    }
}

/// Address encoding variant for a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressVariant {
    /// The only address form of an account chain
    Standard,
    /// Native SegWit P2WPKH (BIP-84)
    #[serde(rename = "segwit")]
    SegWit,
    /// Taproot P2TR key-path (BIP-86)
    Taproot,
}

impl fmt::Display for AddressVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressVariant::Standard => "standard",
            AddressVariant::SegWit => "segwit",
            AddressVariant::Taproot => "taproot",
        };
        f.write_str(name)
    }
}

/// One provisioned wallet position: a chain plus its address variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletSlot {
    pub chain: Chain,
    pub variant: AddressVariant,
}

impl WalletSlot {
    pub const fn new(chain: Chain, variant: AddressVariant) -> Self {
        Self { chain, variant }
    }

    pub const fn standard(chain: Chain) -> Self {
        Self::new(chain, AddressVariant::Standard)
    }

    pub fn is_supported(&self) -> bool {
        self.chain.variants().contains(&self.variant)
    }

    /// Default wallet set handed to every new identity
    pub fn defaults() -> Vec<WalletSlot> {
        vec![
            WalletSlot::standard(Chain::Ethereum),
            WalletSlot::standard(Chain::Solana),
            WalletSlot::new(Chain::Bitcoin, AddressVariant::SegWit),
            WalletSlot::new(Chain::Bitcoin, AddressVariant::Taproot),
        ]
    }
}

impl fmt::Display for WalletSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.variant)
    }
}

// =============================================================================
// Key Material
// =============================================================================

/// Chain-native keypair derived from a seed
///
/// The private key is wiped on drop and never serialized.
#[derive(Clone)]
pub struct DerivedKeypair {
    pub slot: WalletSlot,
    pub derivation_path: String,
    pub address: String,
    pub public_key_hex: String,
    pub private_key: Zeroizing<[u8; 32]>,
}

impl DerivedKeypair {
    pub fn private_key_bytes(&self) -> &[u8; 32] {
        &self.private_key
    }

    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.private_key[..]))
    }
}

impl fmt::Debug for DerivedKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeypair")
            .field("slot", &self.slot)
            .field("derivation_path", &self.derivation_path)
            .field("address", &self.address)
            .field("public_key_hex", &self.public_key_hex)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Public projection of a derived keypair, safe to print or serialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    pub chain: Chain,
    pub variant: AddressVariant,
    pub derivation_path: String,
    pub address: String,
    pub public_key_hex: String,
}

impl From<&DerivedKeypair> for PublicKeyInfo {
    fn from(keypair: &DerivedKeypair) -> Self {
        Self {
            chain: keypair.slot.chain,
            variant: keypair.slot.variant,
            derivation_path: keypair.derivation_path.clone(),
            address: keypair.address.clone(),
            public_key_hex: keypair.public_key_hex.clone(),
        }
    }
}

// =============================================================================
// Persisted Records
// =============================================================================

/// How an encrypted key record was sealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEncoding {
    /// AES-256-GCM under a per-owner key derived from the master secret
    Aes256GcmV1,
    /// Keystream XOR from the first-generation backend. Read-only.
    LegacyXor,
}

/// Sealed secret, the only form key material takes in durable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyRecord {
    pub owner_id: String,
    /// Base64 envelope
    pub ciphertext: String,
    pub encoding: KeyEncoding,
}

/// One wallet row handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub owner_id: String,
    pub chain_family: ChainFamily,
    pub chain: Chain,
    pub currency_symbol: String,
    pub address: String,
    pub encrypted_key: EncryptedKeyRecord,
    pub wallet_variant: AddressVariant,
    pub derivation_path: String,
    pub public_key_hex: String,
    /// Unix seconds
    pub created_at: i64,
}

impl WalletRecord {
    pub fn slot(&self) -> WalletSlot {
        WalletSlot::new(self.chain, self.wallet_variant)
    }
}

/// The identity's mnemonic, sealed with the same vault as its keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnemonicRecord {
    pub owner_id: String,
    pub encrypted_phrase: EncryptedKeyRecord,
    pub word_count: usize,
    /// Unix seconds
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_families() {
        assert_eq!(Chain::Ethereum.family(), ChainFamily::Evm);
        assert_eq!(Chain::Bnb.family(), ChainFamily::Evm);
        assert_eq!(Chain::Solana.family(), ChainFamily::Ed25519Account);
        assert_eq!(Chain::Bitcoin.family(), ChainFamily::Utxo);
    }

    #[test]
    fn test_slot_support() {
        assert!(WalletSlot::new(Chain::Bitcoin, AddressVariant::Taproot).is_supported());
        assert!(!WalletSlot::new(Chain::Ethereum, AddressVariant::Taproot).is_supported());
        assert!(!WalletSlot::standard(Chain::Bitcoin).is_supported());
        assert!(WalletSlot::defaults().iter().all(|s| s.is_supported()));
    }

    #[test]
    fn test_slot_serialization() {
        let slot = WalletSlot::new(Chain::Bitcoin, AddressVariant::SegWit);
        let json = serde_json::to_string(&slot).unwrap();
        assert_eq!(json, r#"{"chain":"bitcoin","variant":"segwit"}"#);
        assert_eq!(slot.to_string(), "bitcoin:segwit");
    }

    #[test]
    fn test_keypair_debug_redacts_private_key() {
        let keypair = DerivedKeypair {
            slot: WalletSlot::standard(Chain::Ethereum),
            derivation_path: "m/44'/60'/0'/0/0".to_string(),
            address: "0x0".to_string(),
            public_key_hex: String::new(),
            private_key: Zeroizing::new([0xAB; 32]),
        };
        let printed = format!("{:?}", keypair);
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("abab"));
        assert_eq!(keypair.private_key_hex().as_str(), "ab".repeat(32));
    }
}
