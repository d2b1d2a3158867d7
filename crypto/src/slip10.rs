//! SLIP-10 hardened key derivation for Ed25519.
//!
//! Ed25519 has no public-key derivation, so every segment must be hardened.
//! `Bip44::segments` already returns hardened indices.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use tangle_types::{Bip44, KeyPair};
use zeroize::Zeroizing;

use crate::keys::keypair_from_seed;
use crate::mnemonic::MnemonicError;

type HmacSha512 = Hmac<Sha512>;

const ED25519_CURVE_KEY: &[u8] = b"ed25519 seed";

/// Secret key and chain code at one derivation level.
struct ExtendedKey {
    key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

fn hmac_split(key: &[u8], parts: &[&[u8]]) -> Result<ExtendedKey, MnemonicError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| MnemonicError::DerivationFailed(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());

    let mut extended = ExtendedKey {
        key: Zeroizing::new([0u8; 32]),
        chain_code: Zeroizing::new([0u8; 32]),
    };
    extended.key.copy_from_slice(&out[..32]);
    extended.chain_code.copy_from_slice(&out[32..]);
    Ok(extended)
}

fn master_key(seed: &[u8]) -> Result<ExtendedKey, MnemonicError> {
    hmac_split(ED25519_CURVE_KEY, &[seed])
}

fn derive_child(parent: &ExtendedKey, index: u32) -> Result<ExtendedKey, MnemonicError> {
    if index & tangle_types::bip44::HARDENED == 0 {
        return Err(MnemonicError::DerivationFailed(format!(
            "segment {index} is not hardened"
        )));
    }
    hmac_split(
        &parent.chain_code[..],
        &[&[0u8][..], &parent.key[..], &index.to_be_bytes()[..]],
    )
}

fn derive_path(seed: &[u8], segments: &[u32]) -> Result<ExtendedKey, MnemonicError> {
    let mut current = master_key(seed)?;
    for &index in segments {
        current = derive_child(&current, index)?;
    }
    Ok(current)
}

/// Derive the Ed25519 key pair for a BIP44 chain from a BIP39 seed.
pub fn derive_keypair(seed: &[u8], chain: &Bip44) -> Result<KeyPair, MnemonicError> {
    let extended = derive_path(seed, &chain.segments())?;
    Ok(keypair_from_seed(&extended.key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_types::bip44::HARDENED;
    use tangle_types::CoinType;

    fn vector_seed() -> Vec<u8> {
        hex::decode("000102030405060708090a0b0c0d0e0f").unwrap()
    }

    // SLIP-10 test vector 1 for ed25519.
    #[test]
    fn master_key_matches_vector() {
        let master = master_key(&vector_seed()).unwrap();
        assert_eq!(
            hex::encode(&master.key[..]),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        assert_eq!(
            hex::encode(&master.chain_code[..]),
            "90046a93de5380a72b5e45010748567d5ea02bbf6522f979e05c0d8d8ca9fffb"
        );
    }

    #[test]
    fn first_hardened_child_matches_vector() {
        let child = derive_path(&vector_seed(), &[HARDENED]).unwrap();
        assert_eq!(
            hex::encode(&child.key[..]),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn non_hardened_segment_rejected() {
        assert!(derive_path(&vector_seed(), &[1]).is_err());
    }

    #[test]
    fn chains_derive_distinct_keys() {
        let seed = [5u8; 64];
        let base = Bip44::new(CoinType::Shimmer);
        let a = derive_keypair(&seed, &base).unwrap();
        let b = derive_keypair(&seed, &base.with_address_index(1)).unwrap();
        let c = derive_keypair(&seed, &base.with_account(1)).unwrap();
        assert_ne!(a.public, b.public);
        assert_ne!(a.public, c.public);
        assert_eq!(a.public, derive_keypair(&seed, &base).unwrap().public);
    }
}
