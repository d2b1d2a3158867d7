//! Ledger address type: `<hrp>_` followed by a base32 payload.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// A ledger address such as `smr_1k3…`.
///
/// The human-readable part (hrp) names the coin and network; the payload is the
/// base32 encoding of the Blake2b-256 hash of an Ed25519 public key plus a checksum.
/// Construct derived addresses with `tangle_crypto::derive_address`; this type only
/// checks the outer shape.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const SEPARATOR: char = '_';

    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        match s.split_once(Self::SEPARATOR) {
            Some((hrp, data))
                if !hrp.is_empty()
                    && !data.is_empty()
                    && hrp.chars().all(|c| c.is_ascii_lowercase()) =>
            {
                Ok(Self(s))
            }
            _ => Err(TypesError::InvalidAddress(s)),
        }
    }

    /// The human-readable prefix, e.g. `smr`.
    pub fn hrp(&self) -> &str {
        self.0
            .split_once(Self::SEPARATOR)
            .map(|(hrp, _)| hrp)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrp_is_prefix() {
        let addr = Address::new("rms_abc").unwrap();
        assert_eq!(addr.hrp(), "rms");
        assert_eq!(addr.as_str(), "rms_abc");
    }

    #[test]
    fn malformed_rejected() {
        assert!(Address::new("noseparator").is_err());
        assert!(Address::new("_data").is_err());
        assert!(Address::new("smr_").is_err());
        assert!(Address::new("SMR_abc").is_err());
    }

    #[test]
    fn deserialize_validates() {
        assert!(serde_json::from_str::<Address>("\"smr_abc\"").is_ok());
        assert!(serde_json::from_str::<Address>("\"bogus\"").is_err());
    }
}
