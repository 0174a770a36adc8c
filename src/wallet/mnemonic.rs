//! Mnemonic Engine
//!
//! Generates and validates BIP-39 phrases and stretches them into the
//! 64-byte binary seed (PBKDF2-HMAC-SHA512, 2048 rounds, salt
//! `"mnemonic" + passphrase`).
//!
//! SECURITY: entropy and seeds are wrapped in `Zeroizing` and wiped on drop.

use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CustodyError, CustodyResult};

/// Word counts allowed by BIP-39 (128 to 256 bits of entropy)
pub const SUPPORTED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Default phrase length for new identities
pub const DEFAULT_WORD_COUNT: usize = 12;

/// 64-byte BIP-39 seed
pub type Seed = Zeroizing<[u8; 64]>;

/// Generate a fresh 12-word mnemonic from the OS RNG
pub fn generate() -> CustodyResult<Zeroizing<String>> {
    generate_with_words(DEFAULT_WORD_COUNT)
}

/// Generate a fresh mnemonic with the given word count
pub fn generate_with_words(word_count: usize) -> CustodyResult<Zeroizing<String>> {
    let entropy_len = entropy_len_for(word_count)?;

    let mut entropy = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut entropy[..entropy_len]);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy[..entropy_len])
        .map_err(|e| CustodyError::internal(format!("Failed to create mnemonic: {}", e)))?;

    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Check word-list membership and checksum
///
/// Empty or whitespace-only input is rejected.
pub fn validate(phrase: &str) -> bool {
    parse(phrase).is_ok()
}

/// Parse a phrase, failing closed on anything that is not a valid mnemonic
pub fn parse(phrase: &str) -> CustodyResult<Mnemonic> {
    let normalized = normalize(phrase);
    if normalized.is_empty() {
        return Err(CustodyError::invalid_mnemonic("Mnemonic is empty"));
    }

    let word_count = normalized.split(' ').count();
    if !SUPPORTED_WORD_COUNTS.contains(&word_count) {
        return Err(CustodyError::invalid_mnemonic(format!(
            "Mnemonic has {} words, expected one of {:?}",
            word_count, SUPPORTED_WORD_COUNTS
        )));
    }

    Mnemonic::parse_in(Language::English, normalized.as_str())
        .map_err(|e| CustodyError::invalid_mnemonic(format!("Invalid mnemonic: {}", e)))
}

/// Convert a phrase into the 64-byte binary seed
///
/// Validation runs first; an invalid phrase never reaches PBKDF2.
pub fn to_seed(phrase: &str, passphrase: &str) -> CustodyResult<Seed> {
    let mnemonic = parse(phrase)?;
    Ok(Zeroizing::new(mnemonic.to_seed(passphrase)))
}

/// Number of words in a normalized phrase
pub fn word_count(phrase: &str) -> usize {
    phrase.split_whitespace().count()
}

/// Collapse whitespace and lowercase so pasted phrases parse
fn normalize(phrase: &str) -> Zeroizing<String> {
    Zeroizing::new(
        phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn entropy_len_for(word_count: usize) -> CustodyResult<usize> {
    if !SUPPORTED_WORD_COUNTS.contains(&word_count) {
        return Err(CustodyError::invalid_input(format!(
            "Unsupported word count {}, expected one of {:?}",
            word_count, SUPPORTED_WORD_COUNTS
        )));
    }
    // 3 words per 32 bits of entropy
    Ok(word_count / 3 * 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_default() {
        let phrase = generate().unwrap();
        assert_eq!(word_count(&phrase), 12);
        assert!(validate(&phrase));
    }

    #[test]
    fn test_generate_all_lengths() {
        for words in SUPPORTED_WORD_COUNTS {
            let phrase = generate_with_words(words).unwrap();
            assert_eq!(word_count(&phrase), words);
            assert!(validate(&phrase));
        }
        assert!(generate_with_words(13).is_err());
    }

    #[test]
    fn test_generate_is_random() {
        assert_ne!(*generate().unwrap(), *generate().unwrap());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(validate(ABANDON));
        assert!(!validate(""));
        assert!(!validate("   "));
        // Bad checksum: last word changed
        assert!(!validate(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
        ));
        // Word outside the list
        assert!(!validate(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon zzzz"
        ));
        // Unsupported length
        assert!(!validate("abandon abandon abandon"));
    }

    #[test]
    fn test_parse_normalizes_whitespace_and_case() {
        let messy = "  Abandon abandon\tabandon abandon abandon abandon abandon abandon abandon abandon abandon ABOUT ";
        assert!(validate(messy));
        assert_eq!(*to_seed(messy, "").unwrap(), *to_seed(ABANDON, "").unwrap());
    }

    #[test]
    fn test_to_seed_bip39_vector() {
        // Trezor reference vector (passphrase "TREZOR")
        let seed = to_seed(ABANDON, "TREZOR").unwrap();
        assert_eq!(
            hex::encode(&seed[..]),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn test_to_seed_empty_passphrase_vector() {
        let seed = to_seed(ABANDON, "").unwrap();
        assert_eq!(
            hex::encode(&seed[..]),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn test_to_seed_rejects_invalid_phrase() {
        let err = to_seed("", "").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidMnemonic);
    }

    #[test]
    fn test_passphrase_changes_seed() {
        assert_ne!(*to_seed(ABANDON, "").unwrap(), *to_seed(ABANDON, "x").unwrap());
    }
}
