//! Ed25519 signing over transaction payloads.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use tangle_types::{Ed25519Signature, PrivateKey, Signature};

pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    Signature(SigningKey::from_bytes(&private_key.0).sign(message).to_bytes())
}

/// Check a signature against the public key it carries.
///
/// Says nothing about which address that key controls; callers compare the
/// derived address themselves.
pub fn verify_ed25519_signature(message: &[u8], signature: &Ed25519Signature) -> bool {
    let sig = ed25519_dalek::Signature::from_bytes(signature.signature.as_bytes());
    VerifyingKey::from_bytes(signature.public_key.as_bytes())
        .and_then(|key| key.verify(message, &sig))
        .is_ok()
}
