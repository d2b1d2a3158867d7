//! Nullable ledger: an in-memory output set with scriptable failures.
//!
//! Accepted submissions are not applied until [`NullLedger::settle`] is called,
//! which lets tests observe the window where the wallet has submitted but the
//! ledger view has not caught up.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tangle_types::{Address, OutputId, OwnedOutput, Timestamp};
use tangle_wallet_core::ledger_client::{LedgerClient, LedgerError};
use tangle_wallet_core::transaction::{SignedTransaction, SubmissionReceipt};

/// What the next submission should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accept,
    Reject(String),
    Unavailable(String),
}

#[derive(Default)]
struct Inner {
    outputs: BTreeMap<OutputId, OwnedOutput>,
    /// Number of upcoming fetches that fail.
    failing_fetches: usize,
    /// Addresses whose fetches fail until cleared.
    unreachable: HashSet<Address>,
    fetch_count: usize,
    submit_script: VecDeque<SubmitOutcome>,
    submissions: Vec<SignedTransaction>,
    unsettled: Vec<SignedTransaction>,
    /// Time every submission takes before it is recorded and answered.
    submit_delay: Duration,
}

/// A test ledger holding outputs in memory.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullLedger {
    inner: Mutex<Inner>,
}

impl NullLedger {
    pub const NODE: &'static str = "null://ledger";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outputs(outputs: impl IntoIterator<Item = OwnedOutput>) -> Self {
        let ledger = Self::new();
        for output in outputs {
            ledger.add_output(output);
        }
        ledger
    }

    pub fn add_output(&self, output: OwnedOutput) {
        let mut output = output;
        // The ledger knows nothing about derivation chains.
        output.chain = None;
        self.inner
            .lock()
            .unwrap()
            .outputs
            .insert(output.output_id, output);
    }

    /// Spend an output outside the wallet's knowledge.
    pub fn remove_output(&self, id: &OutputId) -> Option<OwnedOutput> {
        self.inner.lock().unwrap().outputs.remove(id)
    }

    pub fn contains(&self, id: &OutputId) -> bool {
        self.inner.lock().unwrap().outputs.contains_key(id)
    }

    pub fn outputs_of(&self, address: &Address) -> Vec<OwnedOutput> {
        self.inner
            .lock()
            .unwrap()
            .outputs
            .values()
            .filter(|o| &o.address == address)
            .cloned()
            .collect()
    }

    /// Make the next `count` fetches fail as unavailable.
    pub fn fail_next_fetches(&self, count: usize) {
        self.inner.lock().unwrap().failing_fetches = count;
    }

    /// Make every fetch for `address` fail until [`NullLedger::restore`] is called.
    pub fn make_unreachable(&self, address: &Address) {
        self.inner.lock().unwrap().unreachable.insert(address.clone());
    }

    pub fn restore(&self, address: &Address) {
        self.inner.lock().unwrap().unreachable.remove(address);
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetch_count
    }

    /// Queue outcomes for upcoming submissions. Once the queue is empty every
    /// submission is accepted.
    pub fn script_submissions(&self, outcomes: impl IntoIterator<Item = SubmitOutcome>) {
        self.inner.lock().unwrap().submit_script.extend(outcomes);
    }

    /// Make every submission take `delay` before it reaches the ledger.
    pub fn delay_submissions(&self, delay: Duration) {
        self.inner.lock().unwrap().submit_delay = delay;
    }

    /// Every submission attempt, including failed ones.
    pub fn submissions(&self) -> Vec<SignedTransaction> {
        self.inner.lock().unwrap().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.inner.lock().unwrap().submissions.len()
    }

    /// Apply every accepted submission: spend its inputs and create its
    /// outputs. Returns how many transactions were applied.
    pub fn settle(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let pending = std::mem::take(&mut inner.unsettled);
        for tx in &pending {
            for input in &tx.essence.inputs {
                inner.outputs.remove(input);
            }
            for (index, draft) in tx.essence.outputs.iter().enumerate() {
                let output_id = OutputId::from_transaction(&tx.transaction_id, index as u16);
                inner.outputs.insert(
                    output_id,
                    OwnedOutput {
                        output_id,
                        kind: draft.kind.clone(),
                        amount: draft.amount,
                        address: draft.address.clone(),
                        chain: None,
                        features: Vec::new(),
                    },
                );
            }
        }
        pending.len()
    }
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn fetch_outputs(&self, address: &Address) -> Result<Vec<OwnedOutput>, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_count += 1;
        if inner.failing_fetches > 0 {
            inner.failing_fetches -= 1;
            return Err(LedgerError::Unavailable("scripted fetch failure".into()));
        }
        if inner.unreachable.contains(address) {
            return Err(LedgerError::Unavailable(format!("{address} unreachable")));
        }
        Ok(inner
            .outputs
            .values()
            .filter(|o| &o.address == address)
            .cloned()
            .collect())
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmissionReceipt, LedgerError> {
        let delay = self.inner.lock().unwrap().submit_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.submissions.push(tx.clone());
        match inner.submit_script.pop_front().unwrap_or(SubmitOutcome::Accept) {
            SubmitOutcome::Accept => {
                inner.unsettled.push(tx.clone());
                Ok(SubmissionReceipt {
                    transaction_id: tx.transaction_id,
                    node: Self::NODE.to_string(),
                    submitted_at: Timestamp::now(),
                })
            }
            SubmitOutcome::Reject(reason) => Err(LedgerError::Rejected(reason)),
            SubmitOutcome::Unavailable(reason) => Err(LedgerError::Unavailable(reason)),
        }
    }
}
