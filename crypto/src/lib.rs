//! Cryptographic primitives for the Tangle wallet core.
//!
//! - **Ed25519** for signing and signature verification
//! - **Blake2b-256** for transaction ids and address payloads
//! - **SLIP-10** hardened derivation of Ed25519 keys along BIP44 chains
//! - **BIP39** mnemonics and seeds
//! - Address encoding with a network prefix and base32 payload

pub mod address;
pub mod hash;
pub mod keys;
pub mod mnemonic;
pub mod sign;
pub mod slip10;

pub use address::{decode_address, derive_address, validate_address};
pub use hash::{blake2b_256, hash_essence};
pub use keys::keypair_from_seed;
pub use mnemonic::{generate_mnemonic, seed_from_mnemonic, MnemonicError};
pub use sign::{sign_message, verify_ed25519_signature};
pub use slip10::derive_keypair;
