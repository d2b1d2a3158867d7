//! Local view of one account: owned outputs, reservations, in-flight and
//! finished transactions.
//!
//! Only the sync engine and the submitter mutate this; both do so while
//! holding the account's lock. All maps are ordered so that the serialized
//! form is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tangle_types::{AliasId, NftId, OutputId, OwnedOutput, TokenId, TransactionId};

use crate::error::WalletError;
use crate::sync::{SyncDelta, SyncReport};
use crate::transaction::{PendingTransaction, Transaction, TransactionStatus};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    #[serde(default)]
    outputs: BTreeMap<OutputId, OwnedOutput>,
    /// Output → transaction holding it.
    #[serde(default)]
    reservations: BTreeMap<OutputId, TransactionId>,
    #[serde(default)]
    pending: BTreeMap<TransactionId, PendingTransaction>,
    #[serde(default)]
    history: BTreeMap<TransactionId, Transaction>,
}

/// Base coin held by an account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCoinBalance {
    pub total: u64,
    /// Excludes outputs reserved by an in-flight transaction.
    pub available: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTokenBalance {
    pub total: u128,
    pub available: u128,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub base_coin: BaseCoinBalance,
    pub native_tokens: BTreeMap<TokenId, NativeTokenBalance>,
    pub nfts: Vec<NftId>,
    pub aliases: Vec<AliasId>,
}

impl AccountState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outputs(outputs: impl IntoIterator<Item = OwnedOutput>) -> Self {
        let mut state = Self::new();
        for output in outputs {
            state.insert_output(output);
        }
        state
    }

    /// Insert or replace an output. Returns `true` if the id was new.
    pub fn insert_output(&mut self, output: OwnedOutput) -> bool {
        self.outputs.insert(output.output_id, output).is_none()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn output(&self, id: &OutputId) -> Option<&OwnedOutput> {
        self.outputs.get(id)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &OwnedOutput> {
        self.outputs.values()
    }

    /// Outputs not held by any in-flight transaction.
    pub fn available_outputs(&self) -> impl Iterator<Item = &OwnedOutput> {
        self.outputs
            .values()
            .filter(|o| !self.reservations.contains_key(&o.output_id))
    }

    pub fn is_reserved(&self, id: &OutputId) -> bool {
        self.reservations.contains_key(id)
    }

    pub fn reservation_holder(&self, id: &OutputId) -> Option<TransactionId> {
        self.reservations.get(id).copied()
    }

    pub fn reserved_outputs(&self) -> impl Iterator<Item = (&OutputId, &TransactionId)> {
        self.reservations.iter()
    }

    pub fn find_nft(&self, nft_id: &NftId) -> Option<&OwnedOutput> {
        self.outputs.values().find(|o| o.nft_id() == Some(*nft_id))
    }

    pub fn find_alias(&self, alias_id: &AliasId) -> Option<&OwnedOutput> {
        self.outputs.values().find(|o| o.alias_id() == Some(*alias_id))
    }

    pub fn pending(&self, id: &TransactionId) -> Option<&PendingTransaction> {
        self.pending.get(id)
    }

    pub(crate) fn pending_mut(&mut self, id: &TransactionId) -> Option<&mut PendingTransaction> {
        self.pending.get_mut(id)
    }

    pub fn pending_transactions(&self) -> impl Iterator<Item = &PendingTransaction> {
        self.pending.values()
    }

    pub fn history(&self) -> impl Iterator<Item = &Transaction> {
        self.history.values()
    }

    /// Current view of a transaction, pending or finished.
    pub fn transaction(&self, id: &TransactionId) -> Option<Transaction> {
        self.pending
            .get(id)
            .map(PendingTransaction::to_transaction)
            .or_else(|| self.history.get(id).cloned())
    }

    pub fn balance(&self) -> Balance {
        let mut balance = Balance::default();
        for output in self.outputs.values() {
            let available = !self.is_reserved(&output.output_id);
            balance.base_coin.total = balance.base_coin.total.saturating_add(output.amount);
            if available {
                balance.base_coin.available =
                    balance.base_coin.available.saturating_add(output.amount);
            }
            if let Some((token_id, amount)) = output.native_token() {
                let entry = balance.native_tokens.entry(token_id).or_default();
                entry.total = entry.total.saturating_add(amount);
                if available {
                    entry.available = entry.available.saturating_add(amount);
                }
            }
            if let Some(nft_id) = output.nft_id() {
                balance.nfts.push(nft_id);
            }
            if let Some(alias_id) = output.alias_id() {
                balance.aliases.push(alias_id);
            }
        }
        balance
    }

    // ── Reservations ────────────────────────────────────────────────────

    /// Reserve `ids` for `holder`. All-or-nothing: fails without reserving
    /// anything if one id is unknown or already held.
    pub fn reserve(&mut self, ids: &[OutputId], holder: TransactionId) -> Result<(), WalletError> {
        for id in ids {
            if !self.outputs.contains_key(id) || self.reservations.contains_key(id) {
                return Err(WalletError::AlreadyReserved(*id));
            }
        }
        for id in ids {
            self.reservations.insert(*id, holder);
        }
        Ok(())
    }

    /// Drop the reservations on `ids`. Returns how many were held.
    pub fn release(&mut self, ids: &[OutputId]) -> usize {
        ids.iter()
            .filter(|id| self.reservations.remove(id).is_some())
            .count()
    }

    // ── Transaction bookkeeping ─────────────────────────────────────────

    /// Track a freshly built transaction and reserve its inputs.
    pub fn insert_pending(&mut self, tx: PendingTransaction) -> Result<(), WalletError> {
        self.reserve(tx.consumed(), tx.id)?;
        self.pending.insert(tx.id, tx);
        Ok(())
    }

    /// Forget a transaction that never left the wallet.
    pub fn discard(&mut self, id: &TransactionId) -> Option<PendingTransaction> {
        let tx = self.pending.remove(id)?;
        self.release(tx.consumed());
        Some(tx)
    }

    /// Settle a transaction as confirmed. Returns the outputs it installed.
    pub fn confirm(&mut self, id: &TransactionId) -> Result<Vec<OwnedOutput>, WalletError> {
        let mut tx = self
            .pending
            .remove(id)
            .ok_or(WalletError::UnknownTransaction(*id))?;

        for input in tx.consumed() {
            self.reservations.remove(input);
            self.outputs.remove(input);
        }
        let installed: Vec<OwnedOutput> = tx
            .created
            .iter()
            .filter(|o| o.chain.is_some())
            .cloned()
            .collect();
        for output in &installed {
            self.outputs.insert(output.output_id, output.clone());
        }

        tx.status = TransactionStatus::Confirmed;
        self.history.insert(tx.id, tx.to_transaction());
        Ok(installed)
    }

    /// Settle a transaction as rejected and give its inputs back.
    pub fn reject(
        &mut self,
        id: &TransactionId,
        reason: impl Into<String>,
    ) -> Result<Transaction, WalletError> {
        let mut tx = self
            .pending
            .remove(id)
            .ok_or(WalletError::UnknownTransaction(*id))?;
        self.release(tx.consumed());
        tx.status = TransactionStatus::Rejected;
        tx.rejection = Some(reason.into());
        let record = tx.to_transaction();
        self.history.insert(tx.id, record.clone());
        Ok(record)
    }

    // ── Sync ────────────────────────────────────────────────────────────

    /// Apply a merge computed by the sync engine.
    ///
    /// Reservations are checked again here, against the table as it is now:
    /// an output reserved after the delta was computed is neither updated nor
    /// removed.
    pub fn apply_sync(&mut self, delta: SyncDelta) -> SyncReport {
        let mut report = SyncReport::default();

        for id in delta.confirmed {
            match self.confirm(&id) {
                Ok(installed) => {
                    report.new_outputs.extend(installed);
                    report.confirmed.push(id);
                }
                Err(_) => continue,
            }
        }

        for output in delta.added {
            if self.insert_output(output.clone()) {
                report.new_outputs.push(output);
            }
        }

        for output in delta.updated {
            if !self.is_reserved(&output.output_id) {
                self.outputs.insert(output.output_id, output);
                report.updated += 1;
            }
        }

        for id in delta.removed {
            if self.is_reserved(&id) {
                continue;
            }
            if let Some(output) = self.outputs.remove(&id) {
                report.spent_outputs.push(output);
            }
        }

        for id in delta.unconfirmed {
            if let Some(tx) = self.pending.get_mut(&id) {
                if tx.status == TransactionStatus::Submitted {
                    tx.unconfirmed_syncs += 1;
                }
            }
        }

        for id in delta.rejected {
            let submitted = self
                .pending
                .get(&id)
                .is_some_and(|tx| tx.status == TransactionStatus::Submitted);
            if submitted
                && self
                    .reject(&id, "inputs still unspent after repeated syncs")
                    .is_ok()
            {
                report.rejected.push(id);
            }
        }

        report
    }
}
