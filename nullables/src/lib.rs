//! Nullable infrastructure for deterministic testing.
//!
//! The wallet core reaches the outside world through two capabilities, the
//! ledger and the secret manager. This crate provides test-friendly
//! implementations of both that:
//! - Return deterministic values
//! - Can be scripted to fail on demand
//! - Never touch the filesystem or network
//!
//! Usage: hand them to `Wallet::new` in place of `NodeClient` and
//! `KeystoreSecretManager`.

pub mod fixtures;
pub mod ledger;
pub mod secret_manager;

pub use fixtures::{account_details, TestWallet};
pub use ledger::{NullLedger, SubmitOutcome};
pub use secret_manager::NullSecretManager;
