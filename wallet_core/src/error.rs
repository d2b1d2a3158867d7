use tangle_types::{OutputId, TransactionId, TypesError};
use thiserror::Error;

use crate::transaction::TransactionStatus;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("output not found: {0}")]
    OutputNotFound(String),

    #[error("output {0} is already reserved")]
    AlreadyReserved(OutputId),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u128, available: u128 },

    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("sync unavailable: {0}")]
    SyncUnavailable(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("submission unavailable: {0}")]
    SubmissionUnavailable(String),

    #[error("unknown transaction: {0}")]
    UnknownTransaction(TransactionId),

    #[error("transaction {id} is {status}")]
    InvalidTransactionState {
        id: TransactionId,
        status: TransactionStatus,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("keystore error: {0}")]
    Keystore(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl WalletError {
    /// Whether the same operation may succeed if retried unchanged.
    ///
    /// Only a submission that never reached a node qualifies; the caller
    /// retries it with `Account::retry_submission`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SubmissionUnavailable(_))
    }
}

impl From<TypesError> for WalletError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::UnknownCoinType(_) => Self::Config(err.to_string()),
            other => Self::InvalidIdentifier(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_submission_is_retryable() {
        assert!(WalletError::SubmissionUnavailable("timeout".into()).is_retryable());
        assert!(!WalletError::SubmissionRejected("conflict".into()).is_retryable());
        assert!(!WalletError::SyncUnavailable("down".into()).is_retryable());
        assert!(!WalletError::AlreadyReserved(OutputId::ZERO).is_retryable());
    }

    #[test]
    fn types_errors_convert() {
        let err: WalletError = "0x12".parse::<tangle_types::NftId>().unwrap_err().into();
        assert!(matches!(err, WalletError::InvalidIdentifier(_)));

        let err: WalletError = TypesError::UnknownCoinType(1).into();
        assert!(matches!(err, WalletError::Config(_)));
    }
}
