//! Blake2b-256, the hash behind transaction ids and address payloads.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use tangle_types::TransactionId;

type Blake2b256 = Blake2b<U32>;

/// Blake2b-256 over the concatenation of `parts`.
pub fn blake2b_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// The id of a transaction is the hash of its encoded essence.
pub fn hash_essence(essence_bytes: &[u8]) -> TransactionId {
    TransactionId::new(blake2b_256(&[essence_bytes]))
}
