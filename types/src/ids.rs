//! 32-byte ledger identifiers (outputs, NFTs, aliases, native tokens, transactions).
//!
//! All identifiers share the same textual form: `0x` followed by 64 hex digits.
//! Parsing is strict so that malformed input from a binding or CLI layer is
//! rejected before it reaches the transaction builder.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::error::TypesError;

/// Length in bytes of every identifier in this module.
pub const ID_LEN: usize = 32;

const HEX_PREFIX: &str = "0x";

fn parse_id(kind: &'static str, value: &str) -> Result<[u8; ID_LEN], TypesError> {
    let invalid = |reason: &str| TypesError::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let digits = value
        .strip_prefix(HEX_PREFIX)
        .ok_or_else(|| invalid("missing 0x prefix"))?;
    if digits.len() != ID_LEN * 2 {
        return Err(invalid(&format!(
            "expected {} hex digits, got {}",
            ID_LEN * 2,
            digits.len()
        )));
    }

    let mut bytes = [0u8; ID_LEN];
    hex::decode_to_slice(digits, &mut bytes).map_err(|e| invalid(&e.to_string()))?;
    Ok(bytes)
}

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; ID_LEN]);

        impl $name {
            pub const ZERO: Self = Self([0u8; ID_LEN]);

            pub fn new(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; ID_LEN]
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_id($kind, s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", HEX_PREFIX, hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}{}…)", stringify!($name), HEX_PREFIX, hex::encode(&self.0[..4]))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

ledger_id!(
    /// Identifies one output on the ledger.
    OutputId,
    "output"
);
ledger_id!(
    /// Identifies an NFT independently of the output currently holding it.
    NftId,
    "NFT"
);
ledger_id!(
    /// Identifies an alias (account-like chain output).
    AliasId,
    "alias"
);
ledger_id!(
    /// Identifies a native token class.
    TokenId,
    "token"
);
ledger_id!(
    /// Blake2b-256 hash of a transaction essence.
    TransactionId,
    "transaction"
);

impl OutputId {
    /// Derive the id of the `index`-th output created by transaction `tx`.
    pub fn from_transaction(tx: &TransactionId, index: u16) -> Self {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(tx.as_bytes());
        hasher.update(index.to_le_bytes());
        let mut out = [0u8; ID_LEN];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NFT: &str = "0xf95f4d5344217a2ba19a6c19a47f97d267edf8c4d76a7b8c08072ad35acbebbe";

    #[test]
    fn parses_prefixed_hex() {
        let id: NftId = NFT.parse().unwrap();
        assert_eq!(id.as_bytes()[0], 0xf9);
        assert_eq!(id.to_string(), NFT);
    }

    #[test]
    fn uppercase_hex_accepted() {
        let upper = format!("0x{}", NFT[2..].to_uppercase());
        let id: NftId = upper.parse().unwrap();
        assert_eq!(id.to_string(), NFT);
    }

    #[test]
    fn missing_prefix_rejected() {
        let err = NFT[2..].parse::<NftId>().unwrap_err();
        assert!(matches!(err, TypesError::InvalidIdentifier { kind: "NFT", .. }));
    }

    #[test]
    fn short_identifier_rejected() {
        assert!("0xabcd".parse::<NftId>().is_err());
        assert!("0x".parse::<OutputId>().is_err());
        assert!("".parse::<TokenId>().is_err());
    }

    #[test]
    fn non_hex_rejected() {
        let bad = format!("0x{}", "zz".repeat(32));
        assert!(bad.parse::<AliasId>().is_err());
    }

    #[test]
    fn debug_is_abbreviated() {
        let id: NftId = NFT.parse().unwrap();
        assert_eq!(format!("{id:?}"), "NftId(0xf95f4d53…)");
    }

    #[test]
    fn serde_uses_hex_string() {
        let id: TokenId = NFT.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{NFT}\""));
        let back: TokenId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn serde_rejects_malformed() {
        assert!(serde_json::from_str::<NftId>("\"0x1234\"").is_err());
    }

    #[test]
    fn output_ids_differ_per_index() {
        let tx = TransactionId::new([7u8; 32]);
        let a = OutputId::from_transaction(&tx, 0);
        let b = OutputId::from_transaction(&tx, 1);
        assert_ne!(a, b);
        assert_eq!(a, OutputId::from_transaction(&tx, 0));
    }
}
