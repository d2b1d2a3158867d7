//! Wallet events, broadcast to any number of subscribers.

use serde::Serialize;
use tokio::sync::broadcast;

use tangle_types::{OwnedOutput, TransactionId};

use crate::transaction::TransactionStatus;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    NewOutput {
        output: OwnedOutput,
    },
    SpentOutput {
        output: OwnedOutput,
    },
    TransactionInclusion {
        transaction_id: TransactionId,
        status: TransactionStatus,
    },
    TransactionProgress {
        progress: TransactionProgress,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TransactionProgress {
    SelectingInputs,
    PreparedTransaction { transaction_id: TransactionId },
    SigningTransaction,
    Broadcasting,
}

/// An event together with the account it concerns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Event {
    pub account_index: u32,
    pub event: WalletEvent,
}

#[derive(Clone, Debug)]
pub struct EventEmitter {
    sender: broadcast::Sender<Event>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl EventEmitter {
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Send an event. Having no subscribers is not an error.
    pub fn emit(&self, account_index: u32, event: WalletEvent) {
        let _ = self.sender.send(Event {
            account_index,
            event,
        });
    }
}
