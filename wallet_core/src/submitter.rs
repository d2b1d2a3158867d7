//! Signing and submission of built transactions.
//!
//! `Built → Signed → Submitted`; the sync engine takes it from there. Every
//! network or secret-manager call runs without the account lock. The
//! reservation taken at build time keeps the inputs from being spent twice in
//! the meantime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use tangle_crypto::{derive_address, verify_ed25519_signature};
use tangle_types::{Bip44, TransactionId};

use crate::account_state::AccountState;
use crate::error::WalletError;
use crate::ledger_client::{LedgerClient, LedgerError};
use crate::secret_manager::SecretManager;
use crate::transaction::{
    InputSigningData, PendingTransaction, Transaction, TransactionStatus, Unlock,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Unavailable-node failures tolerated before a transaction is given up.
    #[serde(default = "default_max_submit_attempts")]
    pub max_submit_attempts: u32,
}

fn default_max_submit_attempts() -> u32 {
    3
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            max_submit_attempts: default_max_submit_attempts(),
        }
    }
}

pub struct TransactionSubmitter {
    options: SubmitOptions,
    secret_manager: Arc<dyn SecretManager>,
    ledger: Arc<dyn LedgerClient>,
}

impl TransactionSubmitter {
    pub fn new(
        options: SubmitOptions,
        secret_manager: Arc<dyn SecretManager>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            options,
            secret_manager,
            ledger,
        }
    }

    /// `Built → Signed`. On failure the transaction is discarded and its
    /// reservation released.
    ///
    /// The transaction is marked in flight while the secret manager works, so
    /// a second caller is refused instead of signing or discarding it too.
    pub async fn sign(
        &self,
        state: &Mutex<AccountState>,
        id: &TransactionId,
    ) -> Result<(), WalletError> {
        let inputs = {
            let mut state = state.lock().await;
            let tx = state
                .pending_mut(id)
                .ok_or(WalletError::UnknownTransaction(*id))?;
            if tx.status != TransactionStatus::Built || tx.in_flight {
                return Err(WalletError::InvalidTransactionState {
                    id: *id,
                    status: tx.status,
                });
            }
            tx.in_flight = true;
            tx.inputs.clone()
        };

        let signed = self.unlocks(id, &inputs).await;

        let mut state = state.lock().await;
        let tx = state
            .pending_mut(id)
            .ok_or(WalletError::UnknownTransaction(*id))?;
        tx.in_flight = false;
        match signed {
            Ok(unlocks) => {
                tx.unlocks = unlocks;
                tx.status = TransactionStatus::Signed;
                tracing::debug!(tx_id = %id, inputs = inputs.len(), "transaction signed");
                Ok(())
            }
            Err(e) => {
                if tx.status == TransactionStatus::Built {
                    state.discard(id);
                }
                tracing::warn!(tx_id = %id, error = %e, "signing failed, transaction discarded");
                Err(e)
            }
        }
    }

    /// One signature per distinct chain; later inputs on the same chain
    /// reference the first unlock. Every signature must verify over the
    /// transaction id and derive the address of the input it unlocks.
    async fn unlocks(
        &self,
        id: &TransactionId,
        inputs: &[InputSigningData],
    ) -> Result<Vec<Unlock>, WalletError> {
        let payload = id.as_bytes();
        let mut signed_at: HashMap<Bip44, u16> = HashMap::new();
        let mut unlocks = Vec::with_capacity(inputs.len());

        for (position, input) in inputs.iter().enumerate() {
            if let Some(index) = signed_at.get(&input.chain) {
                unlocks.push(Unlock::Reference { index: *index });
                continue;
            }

            let signature = self.secret_manager.sign(&input.chain, payload).await?;
            if !verify_ed25519_signature(payload, &signature) {
                return Err(WalletError::SigningFailed(format!(
                    "signature for {} does not verify",
                    input.output_id
                )));
            }
            let derived = derive_address(&signature.public_key, input.address.hrp())?;
            if derived != input.address {
                return Err(WalletError::SigningFailed(format!(
                    "key at {} does not control {}",
                    input.chain, input.address
                )));
            }

            let index = u16::try_from(position)
                .map_err(|_| WalletError::SigningFailed("too many inputs".into()))?;
            signed_at.insert(input.chain, index);
            unlocks.push(Unlock::Signature { signature });
        }
        Ok(unlocks)
    }

    /// `Signed → Submitted`.
    ///
    /// A refusal rejects the transaction. An unreachable ledger keeps it
    /// `Signed` with its reservation; once `max_submit_attempts` such failures
    /// have accumulated the transaction is rejected instead.
    pub async fn submit(
        &self,
        state: &Mutex<AccountState>,
        id: &TransactionId,
    ) -> Result<Transaction, WalletError> {
        let signed = {
            let mut state = state.lock().await;
            let tx = state
                .pending_mut(id)
                .ok_or(WalletError::UnknownTransaction(*id))?;
            if tx.status != TransactionStatus::Signed || tx.in_flight {
                return Err(WalletError::InvalidTransactionState {
                    id: *id,
                    status: tx.status,
                });
            }
            tx.in_flight = true;
            tx.signed()
        };

        let outcome = self.ledger.submit(&signed).await;

        let mut state = state.lock().await;
        if let Some(tx) = state.pending_mut(id) {
            tx.in_flight = false;
        }
        match outcome {
            Ok(receipt) => {
                let tx = state
                    .pending_mut(id)
                    .ok_or(WalletError::UnknownTransaction(*id))?;
                tx.status = TransactionStatus::Submitted;
                tx.submit_attempts += 1;
                tracing::info!(tx_id = %id, node = %receipt.node, "transaction submitted");
                tx.receipt = Some(receipt);
                Ok(tx.to_transaction())
            }
            Err(LedgerError::Rejected(reason)) => {
                state.reject(id, reason.clone())?;
                tracing::warn!(tx_id = %id, reason = %reason, "submission rejected");
                Err(WalletError::SubmissionRejected(reason))
            }
            Err(LedgerError::Unavailable(reason)) => {
                let tx = state
                    .pending_mut(id)
                    .ok_or(WalletError::UnknownTransaction(*id))?;
                tx.submit_attempts += 1;
                let attempts = tx.submit_attempts;
                if attempts >= self.options.max_submit_attempts {
                    let note =
                        format!("gave up after {attempts} unavailable submissions: {reason}");
                    state.reject(id, note.clone())?;
                    tracing::warn!(tx_id = %id, attempts, "submission budget exhausted");
                    return Err(WalletError::SubmissionRejected(note));
                }
                tracing::warn!(
                    tx_id = %id,
                    attempts,
                    reason = %reason,
                    "ledger unavailable, reservation kept"
                );
                Err(WalletError::SubmissionUnavailable(reason))
            }
        }
    }

    /// Submit a `Signed` transaction again. A transaction that is already
    /// submitted, finished, or mid-submission is not sent; its current status
    /// is returned.
    pub async fn retry(
        &self,
        state: &Mutex<AccountState>,
        id: &TransactionId,
    ) -> Result<TransactionStatus, WalletError> {
        {
            let state = state.lock().await;
            match state.pending(id) {
                Some(PendingTransaction {
                    status: TransactionStatus::Signed,
                    in_flight: false,
                    ..
                }) => {}
                Some(tx) if tx.status == TransactionStatus::Built => {
                    return Err(WalletError::InvalidTransactionState {
                        id: *id,
                        status: tx.status,
                    })
                }
                Some(tx) => return Ok(tx.status),
                None => {
                    return state
                        .transaction(id)
                        .map(|t| t.status)
                        .ok_or(WalletError::UnknownTransaction(*id))
                }
            }
        }
        tracing::debug!(tx_id = %id, "retrying submission");
        match self.submit(state, id).await {
            Ok(tx) => Ok(tx.status),
            // Another caller got there first.
            Err(WalletError::InvalidTransactionState { status, .. }) => Ok(status),
            Err(e) => Err(e),
        }
    }

    /// Give up on a transaction that has not been submitted yet.
    pub async fn abandon(
        &self,
        state: &Mutex<AccountState>,
        id: &TransactionId,
    ) -> Result<Transaction, WalletError> {
        let mut state = state.lock().await;
        let tx = state.pending(id).ok_or(WalletError::UnknownTransaction(*id))?;
        if tx.status == TransactionStatus::Submitted || tx.in_flight {
            return Err(WalletError::InvalidTransactionState {
                id: *id,
                status: tx.status,
            });
        }
        tracing::info!(tx_id = %id, "transaction abandoned");
        state.reject(id, "abandoned")
    }
}
