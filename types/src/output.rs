//! Outputs owned by an account, as reported by a ledger node.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::bip44::Bip44;
use crate::ids::{AliasId, NftId, OutputId, TokenId};

/// What an output carries besides its base coin amount.
///
/// Externally tagged so the binary essence encoding can decode it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Plain base coin.
    Basic,
    /// A non-fungible token.
    Nft { nft_id: NftId },
    /// A balance of one native token class.
    NativeToken {
        token_id: TokenId,
        #[serde(with = "u128_string")]
        amount: u128,
    },
    /// An alias chain output.
    Alias { alias_id: AliasId },
}

impl OutputKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Nft { .. } => "nft",
            Self::NativeToken { .. } => "native_token",
            Self::Alias { .. } => "alias",
        }
    }
}

/// Serde adapter writing `u128` amounts as decimal strings.
///
/// Internally tagged enums buffer their content, and the buffer has no 128-bit
/// integer variant, so large amounts travel as text.
pub mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Optional metadata attached to an output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Feature {
    /// Address that created the output.
    Sender(Address),
    /// Address that issued the NFT or alias.
    Issuer(Address),
    /// Arbitrary binary metadata, hex encoded on the wire.
    Metadata(String),
    /// Indexation tag.
    Tag(String),
}

/// One output owned by an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedOutput {
    pub output_id: OutputId,
    pub kind: OutputKind,
    /// Base coin amount held by the output.
    pub amount: u64,
    /// Address that can unlock the output.
    pub address: Address,
    /// Derivation chain for `address`, filled in by the wallet when it knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Bip44>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
}

impl OwnedOutput {
    pub fn basic(output_id: OutputId, amount: u64, address: Address) -> Self {
        Self {
            output_id,
            kind: OutputKind::Basic,
            amount,
            address,
            chain: None,
            features: Vec::new(),
        }
    }

    pub fn nft(output_id: OutputId, nft_id: NftId, amount: u64, address: Address) -> Self {
        Self {
            kind: OutputKind::Nft { nft_id },
            ..Self::basic(output_id, amount, address)
        }
    }

    pub fn alias(output_id: OutputId, alias_id: AliasId, amount: u64, address: Address) -> Self {
        Self {
            kind: OutputKind::Alias { alias_id },
            ..Self::basic(output_id, amount, address)
        }
    }

    pub fn token(
        output_id: OutputId,
        token_id: TokenId,
        token_amount: u128,
        amount: u64,
        address: Address,
    ) -> Self {
        Self {
            kind: OutputKind::NativeToken {
                token_id,
                amount: token_amount,
            },
            ..Self::basic(output_id, amount, address)
        }
    }

    pub fn with_chain(mut self, chain: Bip44) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn nft_id(&self) -> Option<NftId> {
        match self.kind {
            OutputKind::Nft { nft_id } => Some(nft_id),
            _ => None,
        }
    }

    pub fn alias_id(&self) -> Option<AliasId> {
        match self.kind {
            OutputKind::Alias { alias_id } => Some(alias_id),
            _ => None,
        }
    }

    /// Token class and amount, for native token outputs.
    pub fn native_token(&self) -> Option<(TokenId, u128)> {
        match self.kind {
            OutputKind::NativeToken { token_id, amount } => Some((token_id, amount)),
            _ => None,
        }
    }

    pub fn is_basic(&self) -> bool {
        matches!(self.kind, OutputKind::Basic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::new("smr_owner").unwrap()
    }

    #[test]
    fn accessors_match_kind() {
        let nft = OwnedOutput::nft(OutputId::new([1; 32]), NftId::new([2; 32]), 10, addr());
        assert_eq!(nft.nft_id(), Some(NftId::new([2; 32])));
        assert_eq!(nft.alias_id(), None);
        assert!(!nft.is_basic());

        let token = OwnedOutput::token(
            OutputId::new([3; 32]),
            TokenId::new([4; 32]),
            500,
            10,
            addr(),
        );
        assert_eq!(token.native_token(), Some((TokenId::new([4; 32]), 500)));
    }

    #[test]
    fn json_shape() {
        let out = OwnedOutput::nft(OutputId::new([1; 32]), NftId::new([2; 32]), 10, addr());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["kind"]["nft"]["nft_id"], NftId::new([2; 32]).to_string());
        assert!(json.get("chain").is_none());
        let back: OwnedOutput = serde_json::from_value(json).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn token_amount_survives_json() {
        let out = OwnedOutput::token(
            OutputId::new([5; 32]),
            TokenId::new([6; 32]),
            u128::MAX,
            1,
            addr(),
        );
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains(&u128::MAX.to_string()));
        let back: OwnedOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.native_token(), Some((TokenId::new([6; 32]), u128::MAX)));
    }
}
