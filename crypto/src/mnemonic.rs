//! BIP39 mnemonic generation and seed derivation.
//!
//! The 64-byte seed is the root every SLIP-10 chain in [`crate::slip10`] is
//! derived from.

use bip39::Mnemonic;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors arising from mnemonic and key derivation operations.
#[derive(Debug, Error)]
pub enum MnemonicError {
    #[error("invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}

/// Generate a new 24-word BIP39 mnemonic from 256-bit entropy.
pub fn generate_mnemonic() -> Result<Zeroizing<String>, MnemonicError> {
    let mut entropy = Zeroizing::new([0u8; 32]);
    getrandom::getrandom(&mut entropy[..])
        .map_err(|e| MnemonicError::DerivationFailed(e.to_string()))?;
    let mnemonic = Mnemonic::from_entropy(&entropy[..])
        .map_err(|e| MnemonicError::DerivationFailed(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Derive the 64-byte BIP39 seed (PBKDF2-HMAC-SHA512, 2048 rounds).
pub fn seed_from_mnemonic(
    mnemonic: &str,
    passphrase: &str,
) -> Result<Zeroizing<[u8; 64]>, MnemonicError> {
    let mnemonic = Mnemonic::parse_normalized(mnemonic)
        .map_err(|e| MnemonicError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_seed_normalized(passphrase)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    // BIP39 reference vector, passphrase "TREZOR".
    #[test]
    fn matches_reference_seed() {
        let seed = seed_from_mnemonic(ABANDON_ABOUT, "TREZOR").unwrap();
        assert_eq!(
            hex::encode(&seed[..]),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn generated_phrase_yields_a_seed() {
        let mnemonic = generate_mnemonic().unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), 24);
        assert!(seed_from_mnemonic(&mnemonic, "").is_ok());
    }

    #[test]
    fn bad_checksum_word_rejected() {
        let broken = ABANDON_ABOUT.replace("about", "abandon");
        assert!(matches!(
            seed_from_mnemonic(&broken, ""),
            Err(MnemonicError::InvalidMnemonic(_))
        ));
    }
}
