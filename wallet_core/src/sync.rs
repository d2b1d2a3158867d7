//! Reconciling an account's local state with what the ledger reports.
//!
//! A sync runs in two halves. [`SyncEngine::fetch`] talks to the ledger
//! without holding the account lock; [`SyncEngine::reconcile`] is a pure
//! function computed and applied under the lock, so it always sees the
//! reservation table as it is at apply time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use tangle_types::{OutputId, OwnedOutput, TransactionId};

use crate::account::AccountAddress;
use crate::account_state::AccountState;
use crate::error::WalletError;
use crate::ledger_client::LedgerClient;
use crate::transaction::TransactionStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Syncs in which a submitted transaction's inputs are still unspent
    /// before the transaction is considered rejected.
    #[serde(default = "default_rejection_threshold")]
    pub rejection_threshold: u32,
}

fn default_rejection_threshold() -> u32 {
    2
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            rejection_threshold: default_rejection_threshold(),
        }
    }
}

/// Every output the ledger reported for an account's addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteView {
    outputs: BTreeMap<OutputId, OwnedOutput>,
}

impl RemoteView {
    pub fn new(outputs: impl IntoIterator<Item = OwnedOutput>) -> Self {
        Self {
            outputs: outputs.into_iter().map(|o| (o.output_id, o)).collect(),
        }
    }

    pub fn contains(&self, id: &OutputId) -> bool {
        self.outputs.contains_key(id)
    }
}

/// Changes a sync wants to make to an [`AccountState`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncDelta {
    pub added: Vec<OwnedOutput>,
    pub updated: Vec<OwnedOutput>,
    pub removed: Vec<OutputId>,
    /// Submitted transactions whose inputs are all gone.
    pub confirmed: Vec<TransactionId>,
    /// Submitted transactions still waiting.
    pub unconfirmed: Vec<TransactionId>,
    /// Submitted transactions that waited too long.
    pub rejected: Vec<TransactionId>,
}

impl SyncDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.confirmed.is_empty()
            && self.unconfirmed.is_empty()
            && self.rejected.is_empty()
    }
}

/// What a sync actually changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub new_outputs: Vec<OwnedOutput>,
    pub spent_outputs: Vec<OwnedOutput>,
    pub updated: usize,
    pub confirmed: Vec<TransactionId>,
    pub rejected: Vec<TransactionId>,
}

#[derive(Clone, Debug, Default)]
pub struct SyncEngine {
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(options: SyncOptions) -> Self {
        Self { options }
    }

    /// Fetch the outputs of every address. Any failed fetch fails the whole
    /// sync; partial views are never returned.
    pub async fn fetch(
        &self,
        ledger: &dyn LedgerClient,
        addresses: &[AccountAddress],
    ) -> Result<RemoteView, WalletError> {
        let mut outputs = Vec::new();
        for entry in addresses {
            let fetched = ledger.fetch_outputs(&entry.address).await.map_err(|e| {
                WalletError::SyncUnavailable(format!("fetching {}: {e}", entry.address))
            })?;
            tracing::debug!(address = %entry.address, count = fetched.len(), "fetched outputs");
            outputs.extend(fetched.into_iter().map(|o| o.with_chain(entry.chain)));
        }
        Ok(RemoteView::new(outputs))
    }

    /// Compute the merge of `remote` into `state`. Pure.
    pub fn reconcile(&self, state: &AccountState, remote: &RemoteView) -> SyncDelta {
        let mut delta = SyncDelta::default();

        for (id, remote_output) in &remote.outputs {
            match state.output(id) {
                None => delta.added.push(remote_output.clone()),
                Some(local) if local != remote_output && !state.is_reserved(id) => {
                    delta.updated.push(remote_output.clone())
                }
                Some(_) => {}
            }
        }

        for local in state.outputs() {
            let id = &local.output_id;
            // A reserved output the node no longer lists is most likely spent
            // by our own transaction; the transaction decides its fate.
            if !remote.contains(id) && !state.is_reserved(id) {
                delta.removed.push(*id);
            }
        }

        let threshold = self.options.rejection_threshold.max(1);
        for tx in state.pending_transactions() {
            if tx.status != TransactionStatus::Submitted {
                continue;
            }
            if tx.consumed().iter().all(|id| !remote.contains(id)) {
                delta.confirmed.push(tx.id);
            } else if tx.unconfirmed_syncs + 1 >= threshold {
                delta.rejected.push(tx.id);
            } else {
                delta.unconfirmed.push(tx.id);
            }
        }

        delta
    }

    /// Fetch, then merge under the account lock.
    pub async fn sync(
        &self,
        state: &Mutex<AccountState>,
        ledger: &dyn LedgerClient,
        addresses: &[AccountAddress],
    ) -> Result<SyncReport, WalletError> {
        let remote = self.fetch(ledger, addresses).await?;

        let mut state = state.lock().await;
        let delta = self.reconcile(&state, &remote);
        if delta.is_empty() {
            return Ok(SyncReport::default());
        }
        Ok(state.apply_sync(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;
    use crate::transaction::{Burn, PendingTransaction, TransactionEssence};
    use tangle_types::{Address, NetworkId, NftId, Timestamp};

    fn addr() -> Address {
        Address::new("rms_owner").unwrap()
    }

    fn oid(b: u8) -> OutputId {
        OutputId::new([b; 32])
    }

    fn basic(b: u8, amount: u64) -> OwnedOutput {
        OwnedOutput::basic(oid(b), amount, addr())
    }

    fn submitted(inputs: Vec<OutputId>, unconfirmed_syncs: u32) -> PendingTransaction {
        PendingTransaction {
            id: TransactionId::new([0xaa; 32]),
            intent: Intent::BurnNft {
                nft_id: NftId::new([1; 32]),
            },
            essence: TransactionEssence {
                network: NetworkId::Testnet,
                inputs,
                outputs: Vec::new(),
                burn: Burn::default(),
                timestamp: Timestamp::new(1),
            },
            inputs: Vec::new(),
            created: Vec::new(),
            unlocks: Vec::new(),
            status: TransactionStatus::Submitted,
            submit_attempts: 0,
            unconfirmed_syncs,
            receipt: None,
            rejection: None,
            in_flight: false,
        }
    }

    #[test]
    fn classifies_added_updated_removed() {
        let state = AccountState::from_outputs([basic(1, 10), basic(2, 20)]);
        let remote = RemoteView::new([basic(2, 25), basic(3, 30)]);
        let delta = SyncEngine::default().reconcile(&state, &remote);

        assert_eq!(delta.added, vec![basic(3, 30)]);
        assert_eq!(delta.updated, vec![basic(2, 25)]);
        assert_eq!(delta.removed, vec![oid(1)]);
    }

    #[test]
    fn reserved_outputs_win_over_stale_remote() {
        let mut state = AccountState::from_outputs([basic(1, 10), basic(2, 20)]);
        state.reserve(&[oid(1), oid(2)], TransactionId::ZERO).unwrap();
        let remote = RemoteView::new([basic(2, 99)]);
        let delta = SyncEngine::default().reconcile(&state, &remote);

        assert!(delta.removed.is_empty());
        assert!(delta.updated.is_empty());
    }

    #[test]
    fn identical_view_is_empty_delta() {
        let state = AccountState::from_outputs([basic(1, 10)]);
        let remote = RemoteView::new([basic(1, 10)]);
        assert!(SyncEngine::default().reconcile(&state, &remote).is_empty());
    }

    #[test]
    fn submitted_transaction_confirms_when_inputs_vanish() {
        let mut state = AccountState::from_outputs([basic(1, 10)]);
        state.insert_pending(submitted(vec![oid(1)], 0)).unwrap();
        let delta = SyncEngine::default().reconcile(&state, &RemoteView::default());
        assert_eq!(delta.confirmed, vec![TransactionId::new([0xaa; 32])]);
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn submitted_transaction_rejected_at_threshold() {
        let engine = SyncEngine::new(SyncOptions {
            rejection_threshold: 2,
        });
        let remote = RemoteView::new([basic(1, 10)]);

        let mut state = AccountState::from_outputs([basic(1, 10)]);
        state.insert_pending(submitted(vec![oid(1)], 0)).unwrap();
        let delta = engine.reconcile(&state, &remote);
        assert_eq!(delta.unconfirmed.len(), 1);
        assert!(delta.rejected.is_empty());

        let mut state = AccountState::from_outputs([basic(1, 10)]);
        state.insert_pending(submitted(vec![oid(1)], 1)).unwrap();
        let delta = engine.reconcile(&state, &remote);
        assert_eq!(delta.rejected.len(), 1);
    }
}
