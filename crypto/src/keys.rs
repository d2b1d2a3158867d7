//! Ed25519 key pairs from 32-byte secrets.

use ed25519_dalek::SigningKey;
use tangle_types::{KeyPair, PrivateKey, PublicKey};

pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 8032, section 7.1, test 1.
    #[test]
    fn matches_rfc8032_vector() {
        let mut secret = [0u8; 32];
        hex::decode_to_slice(
            "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
            &mut secret,
        )
        .unwrap();
        let kp = keypair_from_seed(&secret);
        assert_eq!(
            hex::encode(kp.public.as_bytes()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }
}
