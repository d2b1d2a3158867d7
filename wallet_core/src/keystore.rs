//! Passphrase-sealed seed file.
//!
//! The seed is sealed with AES-256-GCM under a key stretched from the
//! passphrase by Argon2id. The file records the salt, nonce and KDF cost so a
//! keystore written with other parameters still opens.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

use crate::error::WalletError;

const KEYSTORE_VERSION: u32 = 1;
const CIPHER: &str = "aes-256-gcm";
const KDF: &str = "argon2id";

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeystoreFile {
    pub version: u32,
    pub crypto: KeystoreCrypto,
}

/// Hex strings throughout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeystoreCrypto {
    pub cipher: String,
    pub kdf: String,
    pub kdf_params: KdfParams,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

/// Argon2id cost. Memory is in KiB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

fn keystore_error(context: &str, e: impl fmt::Display) -> WalletError {
    WalletError::Keystore(format!("{context}: {e}"))
}

fn random<const N: usize>(what: &str) -> Result<[u8; N], WalletError> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes).map_err(|e| keystore_error(what, e))?;
    Ok(bytes)
}

fn from_hex(field: &str, value: &str) -> Result<Vec<u8>, WalletError> {
    hex::decode(value).map_err(|e| keystore_error(field, e))
}

fn cipher_for(
    passphrase: &str,
    salt: &[u8],
    kdf_params: &KdfParams,
) -> Result<Aes256Gcm, WalletError> {
    let params = Params::new(
        kdf_params.memory,
        kdf_params.iterations,
        kdf_params.parallelism,
        Some(32),
    )
    .map_err(|e| keystore_error("argon2 parameters", e))?;

    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| keystore_error("argon2", e))?;
    Aes256Gcm::new_from_slice(&key[..]).map_err(|e| keystore_error("cipher key", e))
}

/// Seal `secret` with the default KDF cost.
pub fn encrypt_keystore(secret: &[u8], passphrase: &str) -> Result<KeystoreFile, WalletError> {
    encrypt_keystore_with(secret, passphrase, KdfParams::default())
}

pub fn encrypt_keystore_with(
    secret: &[u8],
    passphrase: &str,
    kdf_params: KdfParams,
) -> Result<KeystoreFile, WalletError> {
    let salt: [u8; SALT_LEN] = random("salt")?;
    let nonce: [u8; NONCE_LEN] = random("nonce")?;

    let ciphertext = cipher_for(passphrase, &salt, &kdf_params)?
        .encrypt(Nonce::from_slice(&nonce), secret)
        .map_err(|e| keystore_error("seal", e))?;

    Ok(KeystoreFile {
        version: KEYSTORE_VERSION,
        crypto: KeystoreCrypto {
            cipher: CIPHER.to_string(),
            kdf: KDF.to_string(),
            kdf_params,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        },
    })
}

/// Open a keystore. A wrong passphrase and a tampered file look the same.
pub fn decrypt_keystore(
    keystore: &KeystoreFile,
    passphrase: &str,
) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    let crypto = &keystore.crypto;
    if keystore.version != KEYSTORE_VERSION || crypto.cipher != CIPHER || crypto.kdf != KDF {
        return Err(WalletError::Keystore(format!(
            "unsupported keystore: version {} with {}/{}",
            keystore.version, crypto.kdf, crypto.cipher
        )));
    }

    let salt = from_hex("salt", &crypto.salt)?;
    let nonce = from_hex("nonce", &crypto.nonce)?;
    let ciphertext = from_hex("ciphertext", &crypto.ciphertext)?;
    if nonce.len() != NONCE_LEN {
        return Err(WalletError::Keystore(format!(
            "nonce is {} bytes, expected {NONCE_LEN}",
            nonce.len()
        )));
    }

    cipher_for(passphrase, &salt, &crypto.kdf_params)?
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map(Zeroizing::new)
        .map_err(|_| WalletError::Keystore("wrong passphrase or corrupted keystore".into()))
}

/// Write through a temporary file so an interrupted save never leaves a
/// truncated keystore behind.
pub fn save_keystore(keystore: &KeystoreFile, path: &Path) -> Result<(), WalletError> {
    let json = serde_json::to_string_pretty(keystore)
        .map_err(|e| WalletError::Serialization(format!("keystore encoding failed: {e}")))?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| WalletError::Keystore(format!("failed to write {}: {e}", path.display())))
}

pub fn load_keystore(path: &Path) -> Result<KeystoreFile, WalletError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| WalletError::Keystore(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&json)
        .map_err(|e| WalletError::Keystore(format!("invalid keystore JSON: {e}")))
}
