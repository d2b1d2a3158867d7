//! One account: its addresses, its state behind a lock, and the operations a
//! caller can run against it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use tangle_types::{Address, Bip44, CoinType, NetworkId, OwnedOutput, Timestamp, TransactionId};

use crate::account_state::{AccountState, Balance};
use crate::error::WalletError;
use crate::events::{EventEmitter, TransactionProgress, WalletEvent};
use crate::intent::Intent;
use crate::ledger_client::LedgerClient;
use crate::submitter::TransactionSubmitter;
use crate::sync::{SyncEngine, SyncReport};
use crate::transaction::{Transaction, TransactionStatus};
use crate::transaction_builder::{self, BuildContext};

/// An address of the account and the chain of the key that controls it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAddress {
    pub address: Address,
    pub chain: Bip44,
}

/// Persisted form of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub alias: String,
    pub index: u32,
    pub coin_type: CoinType,
    pub addresses: Vec<AccountAddress>,
    #[serde(default)]
    pub state: AccountState,
}

impl AccountDetails {
    pub fn new(
        alias: impl Into<String>,
        index: u32,
        coin_type: CoinType,
        addresses: Vec<AccountAddress>,
    ) -> Self {
        Self {
            alias: alias.into(),
            index,
            coin_type,
            addresses,
            state: AccountState::default(),
        }
    }
}

pub fn load_account_details(path: &Path) -> Result<Vec<AccountDetails>, WalletError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| WalletError::Config(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&json)
        .map_err(|e| WalletError::Serialization(format!("invalid accounts file: {e}")))
}

pub fn save_account_details(path: &Path, accounts: &[AccountDetails]) -> Result<(), WalletError> {
    let json = serde_json::to_string_pretty(accounts)
        .map_err(|e| WalletError::Serialization(format!("accounts encoding failed: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| WalletError::Config(format!("failed to write {}: {e}", path.display())))
}

/// Shared collaborators every account of a wallet uses.
#[derive(Clone)]
pub(crate) struct AccountServices {
    pub network: NetworkId,
    pub ledger: Arc<dyn LedgerClient>,
    pub sync_engine: SyncEngine,
    pub submitter: Arc<TransactionSubmitter>,
    pub events: EventEmitter,
}

pub struct Account {
    alias: String,
    index: u32,
    coin_type: CoinType,
    addresses: Vec<AccountAddress>,
    state: Mutex<AccountState>,
    services: AccountServices,
}

impl Account {
    pub(crate) fn new(
        details: AccountDetails,
        services: AccountServices,
    ) -> Result<Self, WalletError> {
        if details.addresses.is_empty() {
            return Err(WalletError::Config(format!(
                "account {} has no addresses",
                details.alias
            )));
        }
        Ok(Self {
            alias: details.alias,
            index: details.index,
            coin_type: details.coin_type,
            addresses: details.addresses,
            state: Mutex::new(details.state),
            services,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn coin_type(&self) -> CoinType {
        self.coin_type
    }

    pub fn addresses(&self) -> &[AccountAddress] {
        &self.addresses
    }

    pub async fn details(&self) -> AccountDetails {
        AccountDetails {
            alias: self.alias.clone(),
            index: self.index,
            coin_type: self.coin_type,
            addresses: self.addresses.clone(),
            state: self.state.lock().await.clone(),
        }
    }

    // ── Sync ────────────────────────────────────────────────────────────

    pub async fn sync(&self) -> Result<SyncReport, WalletError> {
        let report = self
            .services
            .sync_engine
            .sync(&self.state, self.services.ledger.as_ref(), &self.addresses)
            .await
            .inspect_err(|e| tracing::warn!(alias = %self.alias, error = %e, "sync failed"))?;

        tracing::info!(
            alias = %self.alias,
            new = report.new_outputs.len(),
            spent = report.spent_outputs.len(),
            updated = report.updated,
            confirmed = report.confirmed.len(),
            rejected = report.rejected.len(),
            "account synced"
        );
        for output in &report.new_outputs {
            self.emit(WalletEvent::NewOutput {
                output: output.clone(),
            });
        }
        for output in &report.spent_outputs {
            self.emit(WalletEvent::SpentOutput {
                output: output.clone(),
            });
        }
        for id in &report.confirmed {
            self.emit_inclusion(*id, TransactionStatus::Confirmed);
        }
        for id in &report.rejected {
            self.emit_inclusion(*id, TransactionStatus::Rejected);
        }
        Ok(report)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub async fn balance(&self) -> Balance {
        self.state.lock().await.balance()
    }

    pub async fn outputs(&self) -> Vec<OwnedOutput> {
        self.state.lock().await.outputs().cloned().collect()
    }

    pub async fn transaction(&self, id: &TransactionId) -> Option<Transaction> {
        self.state.lock().await.transaction(id)
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.state
            .lock()
            .await
            .pending_transactions()
            .map(|tx| tx.to_transaction())
            .collect()
    }

    pub async fn history(&self) -> Vec<Transaction> {
        self.state.lock().await.history().cloned().collect()
    }

    // ── Transactions ────────────────────────────────────────────────────

    /// Build a transaction for `intent` and reserve its inputs. Nothing is
    /// signed or sent.
    pub async fn prepare(&self, intent: Intent) -> Result<Transaction, WalletError> {
        self.emit(WalletEvent::TransactionProgress {
            progress: TransactionProgress::SelectingInputs,
        });

        let tx = {
            let mut state = self.state.lock().await;
            let ctx = BuildContext {
                network: self.services.network,
                addresses: &self.addresses,
                timestamp: Timestamp::now(),
            };
            let built = transaction_builder::build(&intent, &state, &ctx)?;
            let tx = built.transaction.to_transaction();
            state.insert_pending(built.transaction)?;
            tx
        };

        tracing::info!(
            alias = %self.alias,
            tx_id = %tx.id,
            intent = intent.name(),
            inputs = tx.consumed.len(),
            outputs = tx.created.len(),
            "transaction prepared"
        );
        self.emit(WalletEvent::TransactionProgress {
            progress: TransactionProgress::PreparedTransaction {
                transaction_id: tx.id,
            },
        });
        Ok(tx)
    }

    /// Sign and submit a prepared transaction.
    pub async fn send(&self, id: &TransactionId) -> Result<Transaction, WalletError> {
        self.emit(WalletEvent::TransactionProgress {
            progress: TransactionProgress::SigningTransaction,
        });
        self.services.submitter.sign(&self.state, id).await?;

        self.emit(WalletEvent::TransactionProgress {
            progress: TransactionProgress::Broadcasting,
        });
        let result = self.services.submitter.submit(&self.state, id).await;
        self.after_submission(id, result.as_ref().err()).await;
        result
    }

    /// Prepare and send in one go.
    pub async fn execute(&self, intent: Intent) -> Result<Transaction, WalletError> {
        let prepared = self.prepare(intent).await?;
        self.send(&prepared.id).await
    }

    pub async fn burn_nft(&self, nft_id: &str) -> Result<Transaction, WalletError> {
        self.execute(Intent::burn_nft(nft_id)?).await
    }

    pub async fn burn_alias(&self, alias_id: &str) -> Result<Transaction, WalletError> {
        self.execute(Intent::burn_alias(alias_id)?).await
    }

    pub async fn burn_native_token(
        &self,
        token_id: &str,
        amount: u128,
    ) -> Result<Transaction, WalletError> {
        self.execute(Intent::burn_native_token(token_id, amount)?).await
    }

    pub async fn send_amount(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<Transaction, WalletError> {
        self.execute(Intent::send_amount(address, amount)?).await
    }

    pub async fn send_nft(&self, address: &str, nft_id: &str) -> Result<Transaction, WalletError> {
        self.execute(Intent::send_nft(address, nft_id)?).await
    }

    pub async fn send_token(
        &self,
        address: &str,
        token_id: &str,
        amount: u128,
    ) -> Result<Transaction, WalletError> {
        self.execute(Intent::send_token(address, token_id, amount)?).await
    }

    /// Resubmit a transaction left `Signed` by an unreachable ledger.
    pub async fn retry_submission(
        &self,
        id: &TransactionId,
    ) -> Result<TransactionStatus, WalletError> {
        let result = self.services.submitter.retry(&self.state, id).await;
        self.after_submission(id, result.as_ref().err()).await;
        result
    }

    /// Drop a transaction that has not been submitted and free its inputs.
    pub async fn abandon(&self, id: &TransactionId) -> Result<Transaction, WalletError> {
        let tx = self.services.submitter.abandon(&self.state, id).await?;
        self.emit_inclusion(tx.id, tx.status);
        Ok(tx)
    }

    async fn after_submission(&self, id: &TransactionId, error: Option<&WalletError>) {
        if matches!(error, Some(WalletError::SubmissionUnavailable(_))) {
            return;
        }
        let status = self.state.lock().await.transaction(id).map(|tx| tx.status);
        if let Some(status @ (TransactionStatus::Submitted | TransactionStatus::Rejected)) =
            status
        {
            self.emit_inclusion(*id, status);
        }
    }

    fn emit(&self, event: WalletEvent) {
        self.services.events.emit(self.index, event);
    }

    fn emit_inclusion(&self, transaction_id: TransactionId, status: TransactionStatus) {
        self.emit(WalletEvent::TransactionInclusion {
            transaction_id,
            status,
        });
    }
}
