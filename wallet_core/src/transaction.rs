//! Transactions as the wallet tracks them, from unsigned essence to history entry.

use serde::{Deserialize, Serialize};
use std::fmt;

use tangle_types::output::u128_string;
use tangle_types::{
    Address, AliasId, Bip44, Ed25519Signature, NetworkId, NftId, OutputId, OutputKind,
    OwnedOutput, Timestamp, TokenId, TransactionId,
};

use crate::error::WalletError;
use crate::intent::Intent;

/// Lifecycle of a transaction issued by this wallet.
///
/// `Built → Signed → Submitted → {Confirmed | Rejected}`. A transaction can
/// also jump to `Rejected` from `Built` or `Signed` when it is abandoned or the
/// node refuses it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Built,
    Signed,
    Submitted,
    Confirmed,
    Rejected,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Signed => "signed",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An output the transaction will create, before its id is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDraft {
    pub kind: OutputKind,
    pub amount: u64,
    pub address: Address,
}

/// Assets destroyed by a transaction.
///
/// Every field is always written: the essence id hashes a binary encoding
/// that carries no field names, so an omitted list would shift the rest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burn {
    #[serde(default)]
    pub nfts: Vec<NftId>,
    #[serde(default)]
    pub aliases: Vec<AliasId>,
    #[serde(default)]
    pub native_tokens: Vec<BurnedToken>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnedToken {
    pub token_id: TokenId,
    #[serde(with = "u128_string")]
    pub amount: u128,
}

/// The signed-over part of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEssence {
    pub network: NetworkId,
    pub inputs: Vec<OutputId>,
    pub outputs: Vec<OutputDraft>,
    #[serde(default)]
    pub burn: Burn,
    pub timestamp: Timestamp,
}

impl TransactionEssence {
    /// Blake2b-256 of the bincode encoding. This is both the transaction id
    /// and the payload every input signs.
    pub fn id(&self) -> Result<TransactionId, WalletError> {
        let bytes = bincode::serialize(self)
            .map_err(|e| WalletError::Serialization(format!("essence encoding failed: {e}")))?;
        Ok(tangle_crypto::hash_essence(&bytes))
    }
}

/// What the secret manager needs to unlock one input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSigningData {
    pub output_id: OutputId,
    pub address: Address,
    pub chain: Bip44,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Unlock {
    /// A fresh signature for the input at this position.
    Signature { signature: Ed25519Signature },
    /// Reuse the signature unlock at `index`; the inputs share a chain.
    Reference { index: u16 },
}

/// What gets sent to a ledger node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction_id: TransactionId,
    pub essence: TransactionEssence,
    pub unlocks: Vec<Unlock>,
}

/// Acknowledgement from the node that accepted a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub transaction_id: TransactionId,
    /// Node that accepted the transaction.
    pub node: String,
    pub submitted_at: Timestamp,
}

/// A transaction that has not reached a terminal status yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: TransactionId,
    pub intent: Intent,
    pub essence: TransactionEssence,
    pub inputs: Vec<InputSigningData>,
    /// Outputs the transaction creates, with their final ids. Those addressed
    /// to this account carry a derivation chain.
    pub created: Vec<OwnedOutput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlocks: Vec<Unlock>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub submit_attempts: u32,
    #[serde(default)]
    pub unconfirmed_syncs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<SubmissionReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
    /// Set while the secret manager or the ledger holds the transaction.
    /// Concurrent send, retry and abandon calls back off while it is set.
    #[serde(skip)]
    pub in_flight: bool,
}

impl PendingTransaction {
    pub fn consumed(&self) -> &[OutputId] {
        &self.essence.inputs
    }

    pub fn signed(&self) -> SignedTransaction {
        SignedTransaction {
            transaction_id: self.id,
            essence: self.essence.clone(),
            unlocks: self.unlocks.clone(),
        }
    }

    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            id: self.id,
            intent: self.intent.clone(),
            consumed: self.essence.inputs.clone(),
            created: self.created.iter().map(|o| o.output_id).collect(),
            status: self.status,
            timestamp: self.essence.timestamp,
            receipt: self.receipt.clone(),
            note: self.rejection.clone(),
        }
    }
}

/// Caller-facing view of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub intent: Intent,
    pub consumed: Vec<OutputId>,
    pub created: Vec<OutputId>,
    pub status: TransactionStatus,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<SubmissionReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transaction {}", self.id)?;
        writeln!(f, "  intent:    {}", self.intent)?;
        writeln!(f, "  status:    {}", self.status)?;
        writeln!(f, "  timestamp: {}", self.timestamp)?;
        for id in &self.consumed {
            writeln!(f, "  consumed:  {id}")?;
        }
        for id in &self.created {
            writeln!(f, "  created:   {id}")?;
        }
        if let Some(receipt) = &self.receipt {
            writeln!(f, "  node:      {}", receipt.node)?;
        }
        if let Some(note) = &self.note {
            writeln!(f, "  note:      {note}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn essence(timestamp: u64) -> TransactionEssence {
        TransactionEssence {
            network: NetworkId::Testnet,
            inputs: vec![OutputId::new([1; 32])],
            outputs: vec![OutputDraft {
                kind: OutputKind::NativeToken {
                    token_id: TokenId::new([2; 32]),
                    amount: 40,
                },
                amount: 100,
                address: Address::new("rms_owner").unwrap(),
            }],
            burn: Burn {
                native_tokens: vec![BurnedToken {
                    token_id: TokenId::new([2; 32]),
                    amount: 60,
                }],
                ..Burn::default()
            },
            timestamp: Timestamp::new(timestamp),
        }
    }

    #[test]
    fn essence_id_is_stable_and_content_bound() {
        let a = essence(10);
        assert_eq!(a.id().unwrap(), a.clone().id().unwrap());
        assert_ne!(a.id().unwrap(), essence(11).id().unwrap());
    }

    #[test]
    fn burn_kind_is_bound_into_the_id() {
        let bare = TransactionEssence {
            burn: Burn::default(),
            ..essence(10)
        };
        let nft = TransactionEssence {
            burn: Burn {
                nfts: vec![NftId::new([3; 32])],
                ..Burn::default()
            },
            ..bare.clone()
        };
        let alias = TransactionEssence {
            burn: Burn {
                aliases: vec![AliasId::new([3; 32])],
                ..Burn::default()
            },
            ..bare.clone()
        };
        assert_ne!(nft.id().unwrap(), alias.id().unwrap());
        assert_ne!(nft.id().unwrap(), bare.id().unwrap());
        assert_ne!(alias.id().unwrap(), bare.id().unwrap());
    }

    #[test]
    fn essence_survives_binary_encoding() {
        let mut e = essence(10);
        e.burn.nfts.push(NftId::new([3; 32]));
        e.outputs.push(OutputDraft {
            kind: OutputKind::Basic,
            amount: 7,
            address: Address::new("rms_owner").unwrap(),
        });
        let bytes = bincode::serialize(&e).unwrap();
        let back: TransactionEssence = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, e);
        assert_eq!(back.id().unwrap(), e.id().unwrap());
    }

    #[test]
    fn essence_json_without_burn_still_loads() {
        let mut json = serde_json::to_value(essence(10)).unwrap();
        json.as_object_mut().unwrap().remove("burn");
        let back: TransactionEssence = serde_json::from_value(json).unwrap();
        assert_eq!(back.burn, Burn::default());
    }

    #[test]
    fn status_terminality() {
        assert!(!TransactionStatus::Built.is_terminal());
        assert!(!TransactionStatus::Submitted.is_terminal());
        assert!(TransactionStatus::Confirmed.is_terminal());
        assert!(TransactionStatus::Rejected.is_terminal());
        assert_eq!(TransactionStatus::Signed.to_string(), "signed");
    }

    #[test]
    fn unlock_json_is_tagged() {
        let json = serde_json::to_string(&Unlock::Reference { index: 0 }).unwrap();
        assert_eq!(json, r#"{"type":"reference","index":0}"#);
    }

    #[test]
    fn display_lists_consumed_outputs() {
        let tx = Transaction {
            id: TransactionId::new([9; 32]),
            intent: Intent::BurnNft {
                nft_id: NftId::new([4; 32]),
            },
            consumed: vec![OutputId::new([1; 32])],
            created: Vec::new(),
            status: TransactionStatus::Submitted,
            timestamp: Timestamp::new(5),
            receipt: None,
            note: None,
        };
        let text = tx.to_string();
        assert!(text.contains("burn NFT 0x0404"));
        assert!(text.contains("status:    submitted"));
        assert!(text.contains(&OutputId::new([1; 32]).to_string()));
    }
}
