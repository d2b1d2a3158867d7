//! Signing capability.
//!
//! Seeds and private keys live behind [`SecretManager::sign`]; the rest of the
//! wallet only ever sees the signature and the public key that made it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use tangle_crypto::{derive_address, derive_keypair, seed_from_mnemonic, sign_message};
use tangle_types::{Address, Bip44, Ed25519Signature};

use crate::error::WalletError;
use crate::keystore::{decrypt_keystore, encrypt_keystore, load_keystore, save_keystore};

#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Sign `payload` with the key at `chain`.
    async fn sign(&self, chain: &Bip44, payload: &[u8]) -> Result<Ed25519Signature, WalletError>;
}

const SEED_LEN: usize = 64;

fn sign_with_seed(
    seed: &[u8],
    chain: &Bip44,
    payload: &[u8],
) -> Result<Ed25519Signature, WalletError> {
    let keypair = derive_keypair(seed, chain)
        .map_err(|e| WalletError::SigningFailed(format!("key derivation for {chain}: {e}")))?;
    Ok(Ed25519Signature {
        public_key: keypair.public,
        signature: sign_message(payload, &keypair.private),
    })
}

fn address_with_seed(seed: &[u8], chain: &Bip44, hrp: &str) -> Result<Address, WalletError> {
    let keypair = derive_keypair(seed, chain)
        .map_err(|e| WalletError::Keystore(format!("key derivation for {chain}: {e}")))?;
    Ok(derive_address(&keypair.public, hrp)?)
}

// ── MnemonicSecretManager ───────────────────────────────────────────────

/// Holds a BIP39 seed in memory. For development and tests.
pub struct MnemonicSecretManager {
    seed: Zeroizing<[u8; SEED_LEN]>,
}

impl MnemonicSecretManager {
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self, WalletError> {
        let seed = seed_from_mnemonic(mnemonic, "")
            .map_err(|e| WalletError::Keystore(format!("mnemonic: {e}")))?;
        Ok(Self { seed })
    }

    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            seed: Zeroizing::new(seed),
        }
    }

    /// The address controlled by the key at `chain`.
    pub fn address(&self, chain: &Bip44, hrp: &str) -> Result<Address, WalletError> {
        address_with_seed(&self.seed[..], chain, hrp)
    }
}

#[async_trait]
impl SecretManager for MnemonicSecretManager {
    async fn sign(&self, chain: &Bip44, payload: &[u8]) -> Result<Ed25519Signature, WalletError> {
        sign_with_seed(&self.seed[..], chain, payload)
    }
}

// ── KeystoreSecretManager ───────────────────────────────────────────────

/// Seed kept in an encrypted keystore file, decrypted on first use.
pub struct KeystoreSecretManager {
    path: PathBuf,
    passphrase: Zeroizing<String>,
    seed: Mutex<Option<Zeroizing<Vec<u8>>>>,
}

impl KeystoreSecretManager {
    /// Point at an existing keystore. Nothing is read until the first signature.
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            passphrase: Zeroizing::new(passphrase.into()),
            seed: Mutex::new(None),
        }
    }

    /// Write a new keystore holding the seed of `mnemonic`.
    pub fn create(
        path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
        mnemonic: &str,
    ) -> Result<Self, WalletError> {
        let path = path.into();
        let passphrase = passphrase.into();
        let seed = seed_from_mnemonic(mnemonic, "")
            .map_err(|e| WalletError::Keystore(format!("mnemonic: {e}")))?;
        let keystore = encrypt_keystore(&seed[..], &passphrase)?;
        save_keystore(&keystore, &path)?;
        tracing::info!(path = %path.display(), "keystore created");
        Ok(Self::new(path, passphrase))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_unlocked(&self) -> bool {
        self.seed.lock().await.is_some()
    }

    /// Decrypt the keystore now instead of on the first signature.
    pub async fn unlock(&self) -> Result<(), WalletError> {
        let mut guard = self.seed.lock().await;
        if guard.is_none() {
            *guard = Some(self.decrypt().await?);
        }
        Ok(())
    }

    /// Wipe the cached seed. The next signature decrypts the store again.
    pub async fn lock(&self) {
        *self.seed.lock().await = None;
    }

    /// The address controlled by the key at `chain`. Unlocks the store.
    pub async fn address(&self, chain: &Bip44, hrp: &str) -> Result<Address, WalletError> {
        self.unlock().await?;
        let guard = self.seed.lock().await;
        let seed = guard
            .as_ref()
            .ok_or_else(|| WalletError::Keystore("keystore is locked".into()))?;
        address_with_seed(&seed[..], chain, hrp)
    }

    async fn decrypt(&self) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        let path = self.path.clone();
        let passphrase = self.passphrase.clone();
        // Argon2 is deliberately slow; keep it off the async workers.
        let seed = tokio::task::spawn_blocking(move || {
            let keystore = load_keystore(&path)?;
            decrypt_keystore(&keystore, &passphrase)
        })
        .await
        .map_err(|e| WalletError::Keystore(format!("keystore task failed: {e}")))??;

        if seed.len() != SEED_LEN {
            return Err(WalletError::Keystore(format!(
                "decrypted seed has wrong length: expected {SEED_LEN}, got {}",
                seed.len()
            )));
        }
        tracing::debug!(path = %self.path.display(), "keystore unlocked");
        Ok(seed)
    }
}

#[async_trait]
impl SecretManager for KeystoreSecretManager {
    async fn sign(&self, chain: &Bip44, payload: &[u8]) -> Result<Ed25519Signature, WalletError> {
        self.unlock()
            .await
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let guard = self.seed.lock().await;
        let seed = guard
            .as_ref()
            .ok_or_else(|| WalletError::SigningFailed("keystore is locked".into()))?;
        sign_with_seed(&seed[..], chain, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_crypto::verify_ed25519_signature;
    use tangle_types::CoinType;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[tokio::test]
    async fn mnemonic_manager_signs_verifiably() {
        let manager = MnemonicSecretManager::from_mnemonic(MNEMONIC).unwrap();
        let chain = Bip44::new(CoinType::Shimmer);
        let sig = manager.sign(&chain, b"essence").await.unwrap();
        assert!(verify_ed25519_signature(b"essence", &sig));
        assert!(!verify_ed25519_signature(b"other", &sig));

        let address = manager.address(&chain, "rms").unwrap();
        assert_eq!(address, derive_address(&sig.public_key, "rms").unwrap());
    }

    #[tokio::test]
    async fn chains_sign_with_different_keys() {
        let manager = MnemonicSecretManager::from_seed([5u8; 64]);
        let a = Bip44::new(CoinType::Shimmer);
        let b = a.with_address_index(1);
        let sa = manager.sign(&a, b"x").await.unwrap();
        let sb = manager.sign(&b, b"x").await.unwrap();
        assert_ne!(sa.public_key, sb.public_key);
    }

    #[test]
    fn invalid_mnemonic_rejected() {
        assert!(MnemonicSecretManager::from_mnemonic("not a mnemonic").is_err());
    }

    #[tokio::test]
    async fn keystore_manager_unlocks_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let created = KeystoreSecretManager::create(&path, "hunter2", MNEMONIC).unwrap();
        assert!(!created.is_unlocked().await);

        let chain = Bip44::new(CoinType::Iota);
        let sig = created.sign(&chain, b"payload").await.unwrap();
        assert!(created.is_unlocked().await);

        let reference = MnemonicSecretManager::from_mnemonic(MNEMONIC).unwrap();
        let expected = reference.sign(&chain, b"payload").await.unwrap();
        assert_eq!(sig, expected);

        created.lock().await;
        assert!(!created.is_unlocked().await);
    }

    #[tokio::test]
    async fn wrong_passphrase_is_signing_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        KeystoreSecretManager::create(&path, "right", MNEMONIC).unwrap();

        let manager = KeystoreSecretManager::new(&path, "wrong");
        let err = manager
            .sign(&Bip44::new(CoinType::Shimmer), b"payload")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::SigningFailed(_)));
    }

    #[tokio::test]
    async fn missing_store_is_signing_failure() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeystoreSecretManager::new(dir.path().join("absent.json"), "x");
        assert!(matches!(
            manager.sign(&Bip44::new(CoinType::Shimmer), b"p").await,
            Err(WalletError::SigningFailed(_))
        ));
    }
}
