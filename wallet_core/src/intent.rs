//! What a caller wants a transaction to achieve.
//!
//! Intents are a closed set; the builder matches on them exhaustively. The
//! string constructors are the entry point for bindings and the CLI, so they
//! validate every identifier and address before anything touches account state.

use serde::{Deserialize, Serialize};
use std::fmt;

use tangle_types::output::u128_string;
use tangle_types::{Address, AliasId, NftId, TokenId};

use crate::error::WalletError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    BurnNft {
        nft_id: NftId,
    },
    BurnAlias {
        alias_id: AliasId,
    },
    BurnNativeToken {
        token_id: TokenId,
        #[serde(with = "u128_string")]
        amount: u128,
    },
    SendAmount {
        address: Address,
        amount: u64,
    },
    SendNft {
        address: Address,
        nft_id: NftId,
    },
    SendToken {
        address: Address,
        token_id: TokenId,
        #[serde(with = "u128_string")]
        amount: u128,
    },
}

impl Intent {
    pub fn burn_nft(nft_id: &str) -> Result<Self, WalletError> {
        Ok(Self::BurnNft {
            nft_id: nft_id.parse()?,
        })
    }

    pub fn burn_alias(alias_id: &str) -> Result<Self, WalletError> {
        Ok(Self::BurnAlias {
            alias_id: alias_id.parse()?,
        })
    }

    pub fn burn_native_token(token_id: &str, amount: u128) -> Result<Self, WalletError> {
        Self::BurnNativeToken {
            token_id: token_id.parse()?,
            amount,
        }
        .validated()
    }

    pub fn send_amount(address: &str, amount: u64) -> Result<Self, WalletError> {
        Self::SendAmount {
            address: parse_address(address)?,
            amount,
        }
        .validated()
    }

    pub fn send_nft(address: &str, nft_id: &str) -> Result<Self, WalletError> {
        Ok(Self::SendNft {
            address: parse_address(address)?,
            nft_id: nft_id.parse()?,
        })
    }

    pub fn send_token(address: &str, token_id: &str, amount: u128) -> Result<Self, WalletError> {
        Self::SendToken {
            address: parse_address(address)?,
            token_id: token_id.parse()?,
            amount,
        }
        .validated()
    }

    /// Decode an intent from its tagged JSON form, e.g.
    /// `{"type":"burn_nft","nft_id":"0x…"}`.
    pub fn from_json(json: &str) -> Result<Self, WalletError> {
        let intent: Self = serde_json::from_str(json)
            .map_err(|e| WalletError::InvalidIdentifier(e.to_string()))?;
        intent.validated()
    }

    /// Short machine-friendly name, used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BurnNft { .. } => "burn_nft",
            Self::BurnAlias { .. } => "burn_alias",
            Self::BurnNativeToken { .. } => "burn_native_token",
            Self::SendAmount { .. } => "send_amount",
            Self::SendNft { .. } => "send_nft",
            Self::SendToken { .. } => "send_token",
        }
    }

    /// Reject intents that can never produce a transaction.
    pub fn validated(self) -> Result<Self, WalletError> {
        let zero = match &self {
            Self::BurnNativeToken { amount, .. } | Self::SendToken { amount, .. } => *amount == 0,
            Self::SendAmount { amount, .. } => *amount == 0,
            Self::BurnNft { .. } | Self::BurnAlias { .. } | Self::SendNft { .. } => false,
        };
        if zero {
            return Err(WalletError::InvalidIntent(format!(
                "{} with a zero amount",
                self.name()
            )));
        }
        if let Self::SendAmount { address, .. }
        | Self::SendNft { address, .. }
        | Self::SendToken { address, .. } = &self
        {
            if !tangle_crypto::validate_address(address.as_str()) {
                return Err(WalletError::InvalidIdentifier(format!(
                    "address checksum mismatch: {address}"
                )));
            }
        }
        Ok(self)
    }
}

fn parse_address(raw: &str) -> Result<Address, WalletError> {
    let address = Address::new(raw)?;
    if !tangle_crypto::validate_address(address.as_str()) {
        return Err(WalletError::InvalidIdentifier(format!(
            "address checksum mismatch: {raw}"
        )));
    }
    Ok(address)
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BurnNft { nft_id } => write!(f, "burn NFT {nft_id}"),
            Self::BurnAlias { alias_id } => write!(f, "burn alias {alias_id}"),
            Self::BurnNativeToken { token_id, amount } => {
                write!(f, "burn {amount} of token {token_id}")
            }
            Self::SendAmount { address, amount } => write!(f, "send {amount} to {address}"),
            Self::SendNft { address, nft_id } => write!(f, "send NFT {nft_id} to {address}"),
            Self::SendToken {
                address,
                token_id,
                amount,
            } => write!(f, "send {amount} of token {token_id} to {address}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_types::PublicKey;

    const NFT: &str = "0xf95f4d5344217a2ba19a6c19a47f97d267edf8c4d76a7b8c08072ad35acbebbe";

    fn address() -> String {
        tangle_crypto::derive_address(&PublicKey([3u8; 32]), "rms")
            .unwrap()
            .to_string()
    }

    #[test]
    fn burn_nft_parses_identifier() {
        let intent = Intent::burn_nft(NFT).unwrap();
        assert_eq!(
            intent,
            Intent::BurnNft {
                nft_id: NFT.parse().unwrap()
            }
        );
        assert_eq!(intent.to_string(), format!("burn NFT {NFT}"));
    }

    #[test]
    fn malformed_identifiers_rejected() {
        for bad in [
            "",
            "0x",
            "0x1234",
            &NFT[2..],
            "0xZZ5f4d5344217a2ba19a6c19a47f97d267edf8c4d76a7b8c08072ad35acbebbe",
        ] {
            let err = Intent::burn_nft(bad).unwrap_err();
            assert!(matches!(err, WalletError::InvalidIdentifier(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn bad_address_rejected() {
        assert!(matches!(
            Intent::send_amount("not-an-address", 10),
            Err(WalletError::InvalidIdentifier(_))
        ));

        let mut tampered = address();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '1' { '3' } else { '1' });
        assert!(matches!(
            Intent::send_nft(&tampered, NFT),
            Err(WalletError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn zero_amounts_rejected() {
        assert!(matches!(
            Intent::send_amount(&address(), 0),
            Err(WalletError::InvalidIntent(_))
        ));
        assert!(matches!(
            Intent::burn_native_token(NFT, 0),
            Err(WalletError::InvalidIntent(_))
        ));
    }

    #[test]
    fn tagged_json_decodes() {
        let json = format!(r#"{{"type":"burn_nft","nft_id":"{NFT}"}}"#);
        assert_eq!(Intent::from_json(&json).unwrap(), Intent::burn_nft(NFT).unwrap());

        let token = format!(r#"{{"type":"burn_native_token","token_id":"{NFT}","amount":"25"}}"#);
        assert!(matches!(
            Intent::from_json(&token).unwrap(),
            Intent::BurnNativeToken { amount: 25, .. }
        ));

        assert!(Intent::from_json(r#"{"type":"burn_nft","nft_id":"0x00"}"#).is_err());
        assert!(Intent::from_json(r#"{"type":"mint_nft"}"#).is_err());
    }

    #[test]
    fn json_roundtrip_keeps_tag() {
        let intent = Intent::send_token(&address(), NFT, 7).unwrap();
        let json = serde_json::to_string(&intent).unwrap();
        assert!(json.contains(r#""type":"send_token""#));
        assert_eq!(Intent::from_json(&json).unwrap(), intent);
    }
}
