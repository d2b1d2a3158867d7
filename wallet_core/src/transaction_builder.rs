//! Turning an [`Intent`] into an unsigned transaction.
//!
//! Building is pure: it reads a snapshot of the account state and returns the
//! pending transaction plus the outputs it must reserve. The caller reserves
//! them under the same lock acquisition it built under.

use std::cmp::Reverse;

use tangle_types::{
    Address, Bip44, NetworkId, OutputId, OutputKind, OwnedOutput, Timestamp, TokenId,
};

use crate::account::AccountAddress;
use crate::account_state::AccountState;
use crate::error::WalletError;
use crate::intent::Intent;
use crate::transaction::{
    Burn, BurnedToken, InputSigningData, OutputDraft, PendingTransaction, TransactionEssence,
    TransactionStatus,
};

/// Everything the builder needs besides the intent and the state.
#[derive(Clone, Copy, Debug)]
pub struct BuildContext<'a> {
    pub network: NetworkId,
    /// The account's addresses; the first one receives remainders.
    pub addresses: &'a [AccountAddress],
    pub timestamp: Timestamp,
}

impl BuildContext<'_> {
    fn chain_of(&self, address: &Address) -> Option<Bip44> {
        self.addresses
            .iter()
            .find(|a| &a.address == address)
            .map(|a| a.chain)
    }

    fn remainder(&self) -> Result<&Address, WalletError> {
        self.addresses
            .first()
            .map(|a| &a.address)
            .ok_or_else(|| WalletError::Config("account has no addresses".into()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub transaction: PendingTransaction,
    /// Outputs that must be reserved for the transaction.
    pub reservation: Vec<OutputId>,
}

/// Build the transaction realising `intent` against `state`.
pub fn build(
    intent: &Intent,
    state: &AccountState,
    ctx: &BuildContext<'_>,
) -> Result<BuiltTransaction, WalletError> {
    let mut burn = Burn::default();
    let (inputs, outputs) = match intent {
        Intent::BurnNft { nft_id } => {
            let nft = unreserved(state, state.find_nft(nft_id), || format!("NFT {nft_id}"))?;
            burn.nfts.push(*nft_id);
            (vec![nft], Vec::new())
        }
        Intent::BurnAlias { alias_id } => {
            let alias = unreserved(state, state.find_alias(alias_id), || {
                format!("alias {alias_id}")
            })?;
            burn.aliases.push(*alias_id);
            (vec![alias], Vec::new())
        }
        Intent::SendNft { address, nft_id } => {
            let nft = unreserved(state, state.find_nft(nft_id), || format!("NFT {nft_id}"))?;
            let output = OutputDraft {
                kind: OutputKind::Nft { nft_id: *nft_id },
                amount: nft.amount,
                address: address.clone(),
            };
            (vec![nft], vec![output])
        }
        Intent::BurnNativeToken { token_id, amount } => {
            let (inputs, selected) = select_tokens(state, token_id, *amount)?;
            burn.native_tokens.push(BurnedToken {
                token_id: *token_id,
                amount: *amount,
            });
            let base: u64 = inputs.iter().map(|o| o.amount).sum();
            let outputs = token_remainder(ctx.remainder()?, token_id, selected - amount, base)
                .into_iter()
                .collect();
            (inputs, outputs)
        }
        Intent::SendToken {
            address,
            token_id,
            amount,
        } => {
            let (inputs, selected) = select_tokens(state, token_id, *amount)?;
            // The recipient output carries the base coin of the largest input.
            let carried = inputs.first().map(|o| o.amount).unwrap_or_default();
            let base: u64 = inputs.iter().map(|o| o.amount).sum();
            let mut outputs = vec![OutputDraft {
                kind: OutputKind::NativeToken {
                    token_id: *token_id,
                    amount: *amount,
                },
                amount: carried,
                address: address.clone(),
            }];
            outputs.extend(token_remainder(
                ctx.remainder()?,
                token_id,
                selected - amount,
                base - carried,
            ));
            (inputs, outputs)
        }
        Intent::SendAmount { address, amount } => {
            let (inputs, selected) = select_basic(state, *amount)?;
            let mut outputs = vec![OutputDraft {
                kind: OutputKind::Basic,
                amount: *amount,
                address: address.clone(),
            }];
            if selected > *amount {
                outputs.push(OutputDraft {
                    kind: OutputKind::Basic,
                    amount: selected - amount,
                    address: ctx.remainder()?.clone(),
                });
            }
            (inputs, outputs)
        }
    };

    let signing = inputs
        .iter()
        .map(|o| {
            let chain = o
                .chain
                .or_else(|| ctx.chain_of(&o.address))
                .ok_or_else(|| {
                    WalletError::InvalidIntent(format!(
                        "output {} is not held by a known address",
                        o.output_id
                    ))
                })?;
            Ok(InputSigningData {
                output_id: o.output_id,
                address: o.address.clone(),
                chain,
            })
        })
        .collect::<Result<Vec<_>, WalletError>>()?;

    let essence = TransactionEssence {
        network: ctx.network,
        inputs: inputs.iter().map(|o| o.output_id).collect(),
        outputs,
        burn,
        timestamp: ctx.timestamp,
    };
    let id = essence.id()?;

    let created = essence
        .outputs
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let index = u16::try_from(index)
                .map_err(|_| WalletError::InvalidIntent("too many outputs".into()))?;
            Ok(OwnedOutput {
                output_id: OutputId::from_transaction(&id, index),
                kind: draft.kind.clone(),
                amount: draft.amount,
                address: draft.address.clone(),
                chain: ctx.chain_of(&draft.address),
                features: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>, WalletError>>()?;

    let reservation = essence.inputs.clone();
    Ok(BuiltTransaction {
        transaction: PendingTransaction {
            id,
            intent: intent.clone(),
            essence,
            inputs: signing,
            created,
            unlocks: Vec::new(),
            status: TransactionStatus::Built,
            submit_attempts: 0,
            unconfirmed_syncs: 0,
            receipt: None,
            rejection: None,
            in_flight: false,
        },
        reservation,
    })
}

/// Resolve a looked-up chain output: unknown → `OutputNotFound`, held by
/// another transaction → `AlreadyReserved`.
fn unreserved<'s>(
    state: &AccountState,
    found: Option<&'s OwnedOutput>,
    describe: impl FnOnce() -> String,
) -> Result<&'s OwnedOutput, WalletError> {
    let output = found.ok_or_else(|| WalletError::OutputNotFound(describe()))?;
    if state.is_reserved(&output.output_id) {
        return Err(WalletError::AlreadyReserved(output.output_id));
    }
    Ok(output)
}

/// Unreserved outputs of `token_id`, largest first, until `amount` is covered.
fn select_tokens<'s>(
    state: &'s AccountState,
    token_id: &TokenId,
    amount: u128,
) -> Result<(Vec<&'s OwnedOutput>, u128), WalletError> {
    let holding = |o: &&OwnedOutput| o.native_token().map(|(t, _)| t) == Some(*token_id);
    let known: Vec<&OwnedOutput> = state.outputs().filter(holding).collect();
    let Some(first) = known.first() else {
        return Err(WalletError::OutputNotFound(format!("native token {token_id}")));
    };

    let mut candidates: Vec<(&OwnedOutput, u128)> = known
        .iter()
        .filter(|o| !state.is_reserved(&o.output_id))
        .filter_map(|o| o.native_token().map(|(_, held)| (*o, held)))
        .collect();
    if candidates.is_empty() {
        return Err(WalletError::AlreadyReserved(first.output_id));
    }
    candidates.sort_by_key(|(o, held)| (Reverse(*held), o.output_id));

    let mut selected = Vec::new();
    let mut total: u128 = 0;
    for (output, held) in candidates {
        if total >= amount {
            break;
        }
        total = total.saturating_add(held);
        selected.push(output);
    }
    if total < amount {
        return Err(WalletError::InsufficientFunds {
            needed: amount,
            available: total,
        });
    }
    Ok((selected, total))
}

/// Unreserved basic outputs, largest first (ties by id), until `amount` is covered.
fn select_basic(
    state: &AccountState,
    amount: u64,
) -> Result<(Vec<&OwnedOutput>, u64), WalletError> {
    let mut candidates: Vec<&OwnedOutput> =
        state.available_outputs().filter(|o| o.is_basic()).collect();
    candidates.sort_by_key(|o| (Reverse(o.amount), o.output_id));

    let mut selected = Vec::new();
    let mut total: u64 = 0;
    for output in candidates {
        if total >= amount {
            break;
        }
        total = total.saturating_add(output.amount);
        selected.push(output);
    }
    if total < amount {
        return Err(WalletError::InsufficientFunds {
            needed: u128::from(amount),
            available: u128::from(total),
        });
    }
    Ok((selected, total))
}

/// Whatever is left of the inputs after a token operation, sent back to the
/// account. Nothing when both the token and base coin remainder are zero.
fn token_remainder(
    address: &Address,
    token_id: &TokenId,
    tokens: u128,
    base: u64,
) -> Option<OutputDraft> {
    let kind = if tokens > 0 {
        OutputKind::NativeToken {
            token_id: *token_id,
            amount: tokens,
        }
    } else if base > 0 {
        OutputKind::Basic
    } else {
        return None;
    };
    Some(OutputDraft {
        kind,
        amount: base,
        address: address.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_types::{AliasId, CoinType, NftId};

    fn account() -> Vec<AccountAddress> {
        vec![AccountAddress {
            address: Address::new("rms_owner").unwrap(),
            chain: Bip44::new(CoinType::Shimmer),
        }]
    }

    fn recipient() -> Address {
        Address::new("rms_recipient").unwrap()
    }

    fn oid(b: u8) -> OutputId {
        OutputId::new([b; 32])
    }

    fn owner() -> Address {
        Address::new("rms_owner").unwrap()
    }

    fn state() -> AccountState {
        AccountState::from_outputs([
            OwnedOutput::basic(oid(1), 100, owner()),
            OwnedOutput::basic(oid(2), 300, owner()),
            OwnedOutput::basic(oid(3), 300, owner()),
            OwnedOutput::nft(oid(4), NftId::new([4; 32]), 50, owner()),
            OwnedOutput::alias(oid(5), AliasId::new([5; 32]), 60, owner()),
            OwnedOutput::token(oid(6), TokenId::new([6; 32]), 70, 10, owner()),
            OwnedOutput::token(oid(7), TokenId::new([6; 32]), 40, 15, owner()),
        ])
    }

    fn run(intent: Intent, state: &AccountState) -> Result<BuiltTransaction, WalletError> {
        let addresses = account();
        let ctx = BuildContext {
            network: NetworkId::Testnet,
            addresses: &addresses,
            timestamp: Timestamp::new(1_700_000_000),
        };
        build(&intent, state, &ctx)
    }

    #[test]
    fn burn_nft_consumes_only_the_nft() {
        let built = run(Intent::BurnNft { nft_id: NftId::new([4; 32]) }, &state()).unwrap();
        let tx = &built.transaction;
        assert_eq!(built.reservation, vec![oid(4)]);
        assert!(tx.created.is_empty());
        assert_eq!(tx.essence.burn.nfts, vec![NftId::new([4; 32])]);
        assert_eq!(tx.status, TransactionStatus::Built);
        assert_eq!(tx.inputs[0].chain, Bip44::new(CoinType::Shimmer));
        assert_eq!(tx.id, tx.essence.id().unwrap());
    }

    #[test]
    fn burn_alias_consumes_only_the_alias() {
        let built = run(
            Intent::BurnAlias {
                alias_id: AliasId::new([5; 32]),
            },
            &state(),
        )
        .unwrap();
        assert_eq!(built.reservation, vec![oid(5)]);
        assert!(built.transaction.created.is_empty());
    }

    #[test]
    fn unknown_nft_is_not_found() {
        let err = run(Intent::BurnNft { nft_id: NftId::new([9; 32]) }, &state()).unwrap_err();
        assert!(matches!(err, WalletError::OutputNotFound(_)));
    }

    #[test]
    fn reserved_nft_is_already_reserved() {
        let mut s = state();
        s.reserve(&[oid(4)], tangle_types::TransactionId::ZERO).unwrap();
        let err = run(Intent::BurnNft { nft_id: NftId::new([4; 32]) }, &s).unwrap_err();
        assert!(matches!(err, WalletError::AlreadyReserved(id) if id == oid(4)));
    }

    #[test]
    fn send_amount_selects_largest_first_with_remainder() {
        let built = run(
            Intent::SendAmount {
                address: recipient(),
                amount: 350,
            },
            &state(),
        )
        .unwrap();
        // Two outputs of 300; the lower id wins the tie.
        assert_eq!(built.reservation, vec![oid(2), oid(3)]);
        let created = &built.transaction.created;
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].amount, 350);
        assert_eq!(created[0].address, recipient());
        assert_eq!(created[0].chain, None);
        assert_eq!(created[1].amount, 250);
        assert_eq!(created[1].chain, Some(Bip44::new(CoinType::Shimmer)));
    }

    #[test]
    fn send_amount_exact_has_no_remainder() {
        let built = run(
            Intent::SendAmount {
                address: recipient(),
                amount: 300,
            },
            &state(),
        )
        .unwrap();
        assert_eq!(built.reservation, vec![oid(2)]);
        assert_eq!(built.transaction.created.len(), 1);
    }

    #[test]
    fn send_amount_skips_reserved_and_reports_shortfall() {
        let mut s = state();
        s.reserve(&[oid(2), oid(3)], tangle_types::TransactionId::ZERO)
            .unwrap();
        let err = run(
            Intent::SendAmount {
                address: recipient(),
                amount: 350,
            },
            &s,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds {
                needed: 350,
                available: 100
            }
        ));
    }

    #[test]
    fn send_nft_recreates_under_recipient() {
        let built = run(
            Intent::SendNft {
                address: recipient(),
                nft_id: NftId::new([4; 32]),
            },
            &state(),
        )
        .unwrap();
        let created = &built.transaction.created;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].nft_id(), Some(NftId::new([4; 32])));
        assert_eq!(created[0].amount, 50);
        assert_eq!(
            created[0].output_id,
            OutputId::from_transaction(&built.transaction.id, 0)
        );
    }

    #[test]
    fn burn_native_token_returns_remainder() {
        let built = run(
            Intent::BurnNativeToken {
                token_id: TokenId::new([6; 32]),
                amount: 90,
            },
            &state(),
        )
        .unwrap();
        assert_eq!(built.reservation, vec![oid(6), oid(7)]);
        let created = &built.transaction.created;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].native_token(), Some((TokenId::new([6; 32]), 20)));
        assert_eq!(created[0].amount, 25);
        assert_eq!(built.transaction.essence.burn.native_tokens[0].amount, 90);
    }

    #[test]
    fn send_token_splits_between_recipient_and_remainder() {
        let built = run(
            Intent::SendToken {
                address: recipient(),
                token_id: TokenId::new([6; 32]),
                amount: 50,
            },
            &state(),
        )
        .unwrap();
        assert_eq!(built.reservation, vec![oid(6)]);
        let created = &built.transaction.created;
        assert_eq!(created[0].native_token(), Some((TokenId::new([6; 32]), 50)));
        assert_eq!(created[0].amount, 10);
        assert_eq!(created[1].native_token(), Some((TokenId::new([6; 32]), 20)));
        assert_eq!(created[1].amount, 0);
    }

    #[test]
    fn token_shortfall_and_unknown() {
        let err = run(
            Intent::BurnNativeToken {
                token_id: TokenId::new([6; 32]),
                amount: 500,
            },
            &state(),
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { available: 110, .. }));

        let err = run(
            Intent::BurnNativeToken {
                token_id: TokenId::new([1; 32]),
                amount: 1,
            },
            &state(),
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::OutputNotFound(_)));
    }

    #[test]
    fn build_does_not_mutate_state() {
        let s = state();
        let before = s.clone();
        run(Intent::BurnNft { nft_id: NftId::new([4; 32]) }, &s).unwrap();
        assert_eq!(s, before);
    }
}
