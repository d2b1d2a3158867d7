//! Wallet core library for the Tangle ledger.
//!
//! Provides the engine a wallet binding drives:
//! - Account state reconciled against possibly stale ledger views
//! - Transaction building from typed intents (burn / send NFTs, aliases, tokens, base coin)
//! - Signing through a pluggable secret manager and submission to ledger nodes
//! - Lifecycle tracking until a transaction is confirmed or rejected

pub mod account;
pub mod account_state;
pub mod config;
pub mod error;
pub mod events;
pub mod intent;
pub mod keystore;
pub mod ledger_client;
pub mod secret_manager;
pub mod submitter;
pub mod sync;
pub mod transaction;
pub mod transaction_builder;
pub mod wallet;

pub use account::{Account, AccountAddress, AccountDetails};
pub use account_state::{AccountState, Balance};
pub use config::WalletConfig;
pub use error::WalletError;
pub use events::{Event, TransactionProgress, WalletEvent};
pub use intent::Intent;
pub use ledger_client::{LedgerClient, LedgerError, NodeClient};
pub use secret_manager::{KeystoreSecretManager, MnemonicSecretManager, SecretManager};
pub use submitter::{SubmitOptions, TransactionSubmitter};
pub use sync::{SyncEngine, SyncOptions, SyncReport};
pub use transaction::{
    PendingTransaction, SignedTransaction, SubmissionReceipt, Transaction, TransactionStatus,
};
pub use wallet::Wallet;
