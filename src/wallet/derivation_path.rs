//! Derivation Paths
//!
//! Parses and builds BIP-32/44/84/86 style paths
//! (`purpose'/coin_type'/account'/change/address_index`) and fixes the
//! standard path for every wallet slot so external wallets recover the
//! same addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::{CustodyError, CustodyResult};
use crate::types::{AddressVariant, Chain, Network, WalletSlot};

/// Standard BIP purposes
pub mod bip_purposes {
    pub const BIP44: u32 = 44; // Account chains
    pub const BIP84: u32 = 84; // Native SegWit (P2WPKH)
    pub const BIP86: u32 = 86; // Taproot (P2TR)
}

/// Coin types from SLIP-0044
pub mod coin_types {
    pub const BITCOIN: u32 = 0;
    pub const BITCOIN_TESTNET: u32 = 1;
    pub const ETHEREUM: u32 = 60;
    pub const SOLANA: u32 = 501;
}

/// Hardened offset for BIP-32 derivation
pub const HARDENED: u32 = 0x8000_0000;

/// Single component of a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivationComponent {
    index: u32,
    hardened: bool,
}

impl DerivationComponent {
    /// Build a component from a raw index below 2^31
    pub fn new(index: u32, hardened: bool) -> CustodyResult<Self> {
        if index >= HARDENED {
            return Err(CustodyError::invalid_path(format!(
                "Path component {} exceeds maximum value {}",
                index,
                HARDENED - 1
            )));
        }
        Ok(Self { index, hardened })
    }

    pub fn normal(index: u32) -> CustodyResult<Self> {
        Self::new(index, false)
    }

    pub fn hardened(index: u32) -> CustodyResult<Self> {
        Self::new(index, true)
    }

    /// Split a serialized child number back into index and hardened flag
    pub fn from_child_number(child_number: u32) -> Self {
        Self {
            index: child_number & !HARDENED,
            hardened: child_number & HARDENED != 0,
        }
    }

    /// Raw index without the hardened bit
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    /// Index as serialized into the HMAC input (hardened bit applied)
    pub fn child_number(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED
        } else {
            self.index
        }
    }

    /// Same index, hardened
    pub fn to_hardened(self) -> Self {
        Self {
            index: self.index,
            hardened: true,
        }
    }
}

impl fmt::Display for DerivationComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// Parsed derivation path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    components: Vec<DerivationComponent>,
}

impl DerivationPath {
    pub fn new(components: Vec<DerivationComponent>) -> Self {
        Self { components }
    }

    /// Parse `m/44'/60'/0'/0/0`; `'`, `h` and `H` mark hardened segments
    pub fn parse(path: &str) -> CustodyResult<Self> {
        let trimmed = path.trim();

        let rest = if trimmed == "m" || trimmed == "M" {
            ""
        } else if let Some(rest) = trimmed.strip_prefix("m/").or_else(|| trimmed.strip_prefix("M/")) {
            if rest.is_empty() {
                return Err(CustodyError::invalid_path("Empty derivation path"));
            }
            rest
        } else {
            return Err(CustodyError::invalid_path(format!(
                "Derivation path must start with 'm/': {}",
                path
            )));
        };

        let components = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/')
                .map(parse_component)
                .collect::<CustodyResult<Vec<_>>>()?
        };

        Ok(Self { components })
    }

    pub fn components(&self) -> &[DerivationComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_fully_hardened(&self) -> bool {
        self.components.iter().all(|c| c.is_hardened())
    }

    /// Copy of this path with every segment hardened (SLIP-10 ed25519)
    pub fn to_hardened(&self) -> Self {
        Self {
            components: self.components.iter().map(|c| c.to_hardened()).collect(),
        }
    }

    /// Append one component
    pub fn child(&self, component: DerivationComponent) -> Self {
        let mut components = self.components.clone();
        components.push(component);
        Self { components }
    }

    pub fn purpose(&self) -> Option<u32> {
        self.components.first().map(|c| c.index())
    }

    pub fn coin_type(&self) -> Option<u32> {
        self.components.get(1).map(|c| c.index())
    }

    pub fn account(&self) -> Option<u32> {
        self.components.get(2).map(|c| c.index())
    }

    /// Standard path for a wallet slot
    ///
    /// - EVM: `m/44'/60'/{account}'/0/{index}`
    /// - Solana: `m/44'/501'/{account}'/{index}'`
    /// - Bitcoin SegWit: `m/84'/{coin}'/{account}'/0/{index}`
    /// - Bitcoin Taproot: `m/86'/{coin}'/{account}'/0/{index}`
    pub fn for_slot(slot: WalletSlot, network: Network, account: u32, index: u32) -> CustodyResult<Self> {
        use DerivationComponent as C;

        if !slot.is_supported() {
            return Err(CustodyError::invalid_input(format!(
                "Unsupported wallet slot {}",
                slot
            )));
        }

        let components = match (slot.chain, slot.variant) {
            (Chain::Ethereum | Chain::Bnb, _) => vec![
                C::hardened(bip_purposes::BIP44)?,
                C::hardened(coin_types::ETHEREUM)?,
                C::hardened(account)?,
                C::normal(0)?,
                C::normal(index)?,
            ],
            (Chain::Solana, _) => vec![
                C::hardened(bip_purposes::BIP44)?,
                C::hardened(coin_types::SOLANA)?,
                C::hardened(account)?,
                C::hardened(index)?,
            ],
            (Chain::Bitcoin, variant) => {
                let purpose = if variant == AddressVariant::Taproot {
                    bip_purposes::BIP86
                } else {
                    bip_purposes::BIP84
                };
                let coin_type = if network.is_testnet() {
                    coin_types::BITCOIN_TESTNET
                } else {
                    coin_types::BITCOIN
                };
                vec![
                    C::hardened(purpose)?,
                    C::hardened(coin_type)?,
                    C::hardened(account)?,
                    C::normal(0)?,
                    C::normal(index)?,
                ]
            }
        };

        Ok(Self { components })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a single path component
fn parse_component(s: &str) -> CustodyResult<DerivationComponent> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err(CustodyError::invalid_path("Empty path component"));
    }

    let (number_str, hardened) = match trimmed.strip_suffix(&['\'', 'h', 'H'][..]) {
        Some(number) => (number, true),
        None => (trimmed, false),
    };

    if number_str.is_empty() || !number_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CustodyError::invalid_path(format!(
            "Invalid path component '{}'",
            s
        )));
    }

    let index: u32 = number_str
        .parse()
        .map_err(|e| CustodyError::invalid_path(format!("Invalid path component '{}': {}", s, e)))?;

    DerivationComponent::new(index, hardened)
}
