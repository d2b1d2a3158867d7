//! BIP44 derivation chains.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::network::CoinType;

/// Offset that marks a derivation segment as hardened.
pub const HARDENED: u32 = 0x8000_0000;

/// A BIP44 chain `m/44'/coin'/account'/change'/index'`.
///
/// Ed25519 only supports hardened derivation, so every segment is hardened
/// when the chain is turned into a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bip44 {
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
    pub address_index: u32,
}

impl Bip44 {
    pub const PURPOSE: u32 = 44;

    pub fn new(coin_type: CoinType) -> Self {
        Self {
            coin_type: coin_type.as_u32(),
            account: 0,
            change: 0,
            address_index: 0,
        }
    }

    pub fn with_account(mut self, account: u32) -> Self {
        self.account = account;
        self
    }

    pub fn with_change(mut self, change: u32) -> Self {
        self.change = change;
        self
    }

    pub fn with_address_index(mut self, address_index: u32) -> Self {
        self.address_index = address_index;
        self
    }

    /// The five hardened path segments.
    pub fn segments(&self) -> [u32; 5] {
        [
            Self::PURPOSE | HARDENED,
            self.coin_type | HARDENED,
            self.account | HARDENED,
            self.change | HARDENED,
            self.address_index | HARDENED,
        ]
    }
}

impl fmt::Display for Bip44 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/44'/{}'/{}'/{}'/{}'",
            self.coin_type, self.account, self.change, self.address_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_hardened() {
        let chain = Bip44::new(CoinType::Shimmer).with_account(2).with_address_index(5);
        let segments = chain.segments();
        assert!(segments.iter().all(|s| s & HARDENED != 0));
        assert_eq!(segments[1] & !HARDENED, 4219);
        assert_eq!(segments[2] & !HARDENED, 2);
        assert_eq!(segments[4] & !HARDENED, 5);
    }

    #[test]
    fn display_path() {
        let chain = Bip44::new(CoinType::Iota).with_change(1);
        assert_eq!(chain.to_string(), "m/44'/4218'/0'/1'/0'");
    }
}
