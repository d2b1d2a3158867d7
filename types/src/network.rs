//! Network and coin identifiers.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Identifies which ledger network a wallet talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Mainnet,
    /// The public test network.
    Testnet,
}

impl NetworkId {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

/// SLIP-44 coin type, the second segment of every BIP44 chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    Iota,
    Shimmer,
}

impl CoinType {
    pub const IOTA: u32 = 4218;
    pub const SHIMMER: u32 = 4219;

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Iota => Self::IOTA,
            Self::Shimmer => Self::SHIMMER,
        }
    }

    pub fn from_u32(value: u32) -> Result<Self, TypesError> {
        match value {
            Self::IOTA => Ok(Self::Iota),
            Self::SHIMMER => Ok(Self::Shimmer),
            other => Err(TypesError::UnknownCoinType(other)),
        }
    }

    /// Address prefix used for this coin on the given network.
    pub fn hrp(&self, network: NetworkId) -> &'static str {
        match (self, network) {
            (Self::Iota, NetworkId::Mainnet) => "iota",
            (Self::Iota, NetworkId::Testnet) => "atoi",
            (Self::Shimmer, NetworkId::Mainnet) => "smr",
            (Self::Shimmer, NetworkId::Testnet) => "rms",
        }
    }
}
