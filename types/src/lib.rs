//! Fundamental types for the Tangle wallet core.
//!
//! This crate defines the value types shared by every other crate in the workspace:
//! ledger identifiers, addresses, key material wrappers, BIP44 chains, owned outputs,
//! network/coin parameters and timestamps.

pub mod address;
pub mod bip44;
pub mod error;
pub mod ids;
pub mod keys;
pub mod network;
pub mod output;
pub mod time;

pub use address::Address;
pub use bip44::Bip44;
pub use error::TypesError;
pub use ids::{AliasId, NftId, OutputId, TokenId, TransactionId};
pub use keys::{Ed25519Signature, KeyPair, PrivateKey, PublicKey, Signature};
pub use network::{CoinType, NetworkId};
pub use output::{Feature, OutputKind, OwnedOutput};
pub use time::Timestamp;
