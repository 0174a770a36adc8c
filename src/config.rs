//! Custody configuration
//!
//! Loaded from JSON (`CUSTODY_CONFIG` points at a file) with environment
//! overrides:
//! - `CUSTODY_MASTER_SECRET`: hex vault master secret, at least 32 bytes
//! - `CUSTODY_NETWORK`: `mainnet` or `testnet`
//! - `CUSTODY_LOG`: minimum log level
//!
//! The master secret is never read from or written to JSON.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CustodyError, CustodyResult};
use crate::types::{Network, WalletSlot};
use crate::utils::logging::{self, LogLevel};
use crate::vault::MIN_MASTER_SECRET_LEN;
use crate::wallet::mnemonic::{DEFAULT_WORD_COUNT, SUPPORTED_WORD_COUNTS};

pub const ENV_CONFIG_PATH: &str = "CUSTODY_CONFIG";
pub const ENV_MASTER_SECRET: &str = "CUSTODY_MASTER_SECRET";
pub const ENV_NETWORK: &str = "CUSTODY_NETWORK";
pub const ENV_LOG: &str = "CUSTODY_LOG";

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyConfig {
    pub network: Network,
    /// Wallet slots provisioned for every identity, in order
    pub chains: Vec<WalletSlot>,
    pub mnemonic_words: usize,
    pub vault: VaultConfig,
    pub log_level: LogLevel,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    #[serde(skip)]
    pub master_secret: Option<SecretString>,
    /// Allow resealing first-generation XOR records (off unless migrating)
    pub accept_legacy: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            master_secret: None,
            accept_legacy: false,
        }
    }
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            chains: WalletSlot::defaults(),
            mnemonic_words: DEFAULT_WORD_COUNT,
            vault: VaultConfig::default(),
            log_level: LogLevel::Info,
        }
    }
}

impl CustodyConfig {
    pub fn from_json(json: &str) -> CustodyResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CustodyError::config_error(format!("Invalid configuration: {}", e)))
    }

    /// Load the configuration file (if any) and apply environment overrides
    pub fn from_env() -> CustodyResult<Self> {
        let mut config = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| {
                    CustodyError::config_error(format!("Cannot read {}: {}", path, e))
                })?;
                Self::from_json(&json)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(secret) = std::env::var(ENV_MASTER_SECRET) {
            config.vault.master_secret = Some(SecretString::from(secret));
        }

        if let Ok(network) = std::env::var(ENV_NETWORK) {
            config.network = match network.trim().to_ascii_lowercase().as_str() {
                "mainnet" => Network::Mainnet,
                "testnet" => Network::Testnet,
                other => {
                    return Err(CustodyError::config_error(format!(
                        "Unknown network '{}'",
                        other
                    )))
                }
            };
        }

        if let Ok(level) = std::env::var(ENV_LOG) {
            config.log_level = LogLevel::parse(&level).ok_or_else(|| {
                CustodyError::config_error(format!("Unknown log level '{}'", level))
            })?;
        }

        Ok(config)
    }

    pub fn with_master_secret(mut self, master_secret_hex: impl Into<String>) -> Self {
        self.vault.master_secret = Some(SecretString::from(master_secret_hex.into()));
        self
    }

    pub fn validate(&self) -> CustodyResult<()> {
        let secret = self
            .vault
            .master_secret
            .as_ref()
            .ok_or_else(|| CustodyError::config_error(format!("{} is not set", ENV_MASTER_SECRET)))?;
        let secret_len = hex::decode(secret.expose_secret().trim())
            .map_err(|_| CustodyError::config_error("Master secret is not valid hex"))?
            .len();
        if secret_len < MIN_MASTER_SECRET_LEN {
            return Err(CustodyError::config_error(format!(
                "Master secret is {} bytes, need at least {}",
                secret_len, MIN_MASTER_SECRET_LEN
            )));
        }

        if self.chains.is_empty() {
            return Err(CustodyError::config_error("No chains configured"));
        }

        let mut seen = HashSet::new();
        for slot in &self.chains {
            if !slot.is_supported() {
                return Err(CustodyError::config_error(format!("Unsupported wallet slot {}", slot)));
            }
            if !seen.insert(*slot) {
                return Err(CustodyError::config_error(format!("Duplicate wallet slot {}", slot)));
            }
        }

        if !SUPPORTED_WORD_COUNTS.contains(&self.mnemonic_words) {
            return Err(CustodyError::config_error(format!(
                "mnemonic_words must be one of {:?}",
                SUPPORTED_WORD_COUNTS
            )));
        }

        Ok(())
    }

    /// Push the configured log level to the global logger
    pub fn apply_logging(&self) {
        logging::set_min_level(self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{AddressVariant, Chain};

    const SECRET_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_defaults() {
        let config = CustodyConfig::default();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.chains, WalletSlot::defaults());
        assert_eq!(config.mnemonic_words, 12);
        assert!(!config.vault.accept_legacy);
    }

    #[test]
    fn test_validate_requires_master_secret() {
        let err = CustodyConfig::default().validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);

        assert!(CustodyConfig::default().with_master_secret(SECRET_HEX).validate().is_ok());
        assert!(CustodyConfig::default().with_master_secret("0011").validate().is_err());
        assert!(CustodyConfig::default().with_master_secret("not-hex").validate().is_err());
    }

    #[test]
    fn test_validate_chain_list() {
        let mut config = CustodyConfig::default().with_master_secret(SECRET_HEX);
        config.chains.clear();
        assert!(config.validate().is_err());

        config.chains = vec![WalletSlot::standard(Chain::Ethereum), WalletSlot::standard(Chain::Ethereum)];
        assert!(config.validate().is_err());

        config.chains = vec![WalletSlot::new(Chain::Solana, AddressVariant::Taproot)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_word_count() {
        let mut config = CustodyConfig::default().with_master_secret(SECRET_HEX);
        config.mnemonic_words = 24;
        assert!(config.validate().is_ok());
        config.mnemonic_words = 13;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = CustodyConfig::from_json(
            r#"{
                "network": "testnet",
                "chains": [{"chain": "bitcoin", "variant": "taproot"}],
                "vault": {"accept_legacy": true},
                "log_level": "warn"
            }"#,
        )
        .unwrap();

        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.chains, vec![WalletSlot::new(Chain::Bitcoin, AddressVariant::Taproot)]);
        assert_eq!(config.mnemonic_words, 12);
        assert!(config.vault.accept_legacy);
        assert!(config.vault.master_secret.is_none());
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_master_secret_never_serialized() {
        let config = CustodyConfig::default().with_master_secret(SECRET_HEX);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains(SECRET_HEX));
        assert!(!format!("{:?}", config).contains(SECRET_HEX));
    }
}
