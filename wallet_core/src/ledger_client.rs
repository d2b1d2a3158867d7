//! Access to ledger nodes.
//!
//! The core only sees the [`LedgerClient`] trait. [`NodeClient`] implements it
//! over JSON-RPC on HTTP and fails over across the configured nodes. A
//! submission only moves to the next node when no node can have received it.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use tangle_types::{Address, OwnedOutput, Timestamp};

use crate::config::ClientConfig;
use crate::error::WalletError;
use crate::transaction::{SignedTransaction, SubmissionReceipt};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No node could be reached, or none answered in time.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A node answered and refused the request.
    #[error("ledger rejected request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Unspent outputs currently owned by `address`.
    async fn fetch_outputs(&self, address: &Address) -> Result<Vec<OwnedOutput>, LedgerError>;

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmissionReceipt, LedgerError>;
}

// ── NodeClient ──────────────────────────────────────────────────────────

/// HTTP client for ledger nodes speaking JSON-RPC.
///
/// Requests go to the first node. Reads move on to the next node after any
/// transport failure; submissions only when the connection was never made.
/// An error answered by a node is final and is not retried elsewhere.
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    nodes: Vec<String>,
}

#[derive(Debug)]
enum RpcFailure {
    /// No connection was made; the node never saw the request.
    Unsent(String),
    /// The request may have reached the node but no usable answer came back.
    Transport(String),
    /// The node answered with an error.
    Node(String),
}

impl fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsent(e) | Self::Transport(e) | Self::Node(e) => f.write_str(e),
        }
    }
}

/// Which failures let a request move on to the next node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Failover {
    /// Idempotent reads.
    AnyTransport,
    /// Writes: a timed out or half-answered request may already be applied.
    ConnectOnly,
}

impl Failover {
    fn allows(self, failure: &RpcFailure) -> bool {
        match failure {
            RpcFailure::Unsent(_) => true,
            RpcFailure::Transport(_) => self == Self::AnyTransport,
            RpcFailure::Node(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OutputsResult {
    #[serde(default)]
    outputs: Vec<OwnedOutput>,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    accepted: bool,
    #[serde(default)]
    detail: Option<String>,
}

impl NodeClient {
    pub fn new(nodes: Vec<String>, request_timeout: Duration) -> Result<Self, WalletError> {
        if nodes.is_empty() {
            return Err(WalletError::Config("no ledger nodes configured".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10).min(request_timeout))
            .build()
            .map_err(|e| WalletError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, nodes })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, WalletError> {
        Self::new(
            config.nodes.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Send a JSON-RPC request and return the `result` field together with
    /// the node that answered.
    async fn rpc_call(
        &self,
        action: &str,
        params: serde_json::Value,
        failover: Failover,
    ) -> Result<(serde_json::Value, &str), RpcFailure> {
        let mut body = params;
        body.as_object_mut()
            .ok_or_else(|| RpcFailure::Node("params must be a JSON object".into()))?
            .insert("action".to_string(), serde_json::json!(action));

        let mut last_error = String::from("no nodes tried");
        for node in &self.nodes {
            match self.call_node(node, &body).await {
                Ok(value) => return Ok((value, node.as_str())),
                Err(failure) if failover.allows(&failure) => {
                    tracing::warn!(node = %node, action, error = %failure, "trying next node");
                    last_error = format!("{node}: {failure}");
                }
                Err(failure) => return Err(failure),
            }
        }
        Err(RpcFailure::Unsent(last_error))
    }

    async fn call_node(
        &self,
        node: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, RpcFailure> {
        let response = self
            .http
            .post(node)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RpcFailure::Unsent(format!("connection failed: {e}"))
                } else {
                    RpcFailure::Transport(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(RpcFailure::Transport(format!("node returned HTTP {status}")));
        }
        if !status.is_success() {
            return Err(RpcFailure::Node(format!("node returned HTTP {status}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(format!("invalid JSON response: {e}")))?;

        if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
            return Err(RpcFailure::Node(err.to_string()));
        }

        Ok(json.get("result").cloned().unwrap_or(json))
    }
}

#[async_trait]
impl LedgerClient for NodeClient {
    async fn fetch_outputs(&self, address: &Address) -> Result<Vec<OwnedOutput>, LedgerError> {
        let (result, _) = self
            .rpc_call(
                "outputs",
                serde_json::json!({ "address": address }),
                Failover::AnyTransport,
            )
            .await
            .map_err(|e| match e {
                RpcFailure::Unsent(e) | RpcFailure::Transport(e) | RpcFailure::Node(e) => {
                    LedgerError::Unavailable(e)
                }
            })?;

        let resp: OutputsResult = serde_json::from_value(result)
            .map_err(|e| LedgerError::Unavailable(format!("invalid outputs response: {e}")))?;
        Ok(resp.outputs)
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmissionReceipt, LedgerError> {
        let (result, node) = self
            .rpc_call(
                "submit_transaction",
                serde_json::json!({ "transaction": tx }),
                Failover::ConnectOnly,
            )
            .await
            .map_err(|e| match e {
                RpcFailure::Unsent(e) | RpcFailure::Transport(e) => LedgerError::Unavailable(e),
                RpcFailure::Node(e) => LedgerError::Rejected(e),
            })?;

        let resp: SubmitResult = serde_json::from_value(result)
            .map_err(|e| LedgerError::Unavailable(format!("invalid submit response: {e}")))?;
        if !resp.accepted {
            return Err(LedgerError::Rejected(
                resp.detail.unwrap_or_else(|| "not accepted".to_string()),
            ));
        }

        Ok(SubmissionReceipt {
            transaction_id: tx.transaction_id,
            node: node.to_string(),
            submitted_at: Timestamp::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tangle_types::{NetworkId, TransactionId};
    use tokio::net::TcpListener;

    use crate::transaction::{Burn, TransactionEssence};

    /// A node that accepts connections and never answers. Returns its URL and
    /// the number of connections it has accepted.
    async fn silent_node() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(stream);
            }
        });
        (url, accepted)
    }

    /// A URL nothing listens on.
    async fn closed_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    fn transaction() -> SignedTransaction {
        SignedTransaction {
            transaction_id: TransactionId::new([1; 32]),
            essence: TransactionEssence {
                network: NetworkId::Testnet,
                inputs: Vec::new(),
                outputs: Vec::new(),
                burn: Burn::default(),
                timestamp: Timestamp::new(1),
            },
            unlocks: Vec::new(),
        }
    }

    #[test]
    fn only_reads_fail_over_after_the_request_left() {
        let unsent = RpcFailure::Unsent("refused".into());
        let timed_out = RpcFailure::Transport("timeout".into());
        let refused = RpcFailure::Node("bad input".into());

        assert!(Failover::AnyTransport.allows(&unsent));
        assert!(Failover::AnyTransport.allows(&timed_out));
        assert!(!Failover::AnyTransport.allows(&refused));

        assert!(Failover::ConnectOnly.allows(&unsent));
        assert!(!Failover::ConnectOnly.allows(&timed_out));
        assert!(!Failover::ConnectOnly.allows(&refused));
    }

    #[tokio::test]
    async fn timed_out_submission_is_not_sent_to_the_next_node() {
        let (first, _) = silent_node().await;
        let (second, second_seen) = silent_node().await;
        let client = NodeClient::new(vec![first, second], Duration::from_millis(200)).unwrap();

        let err = client.submit(&transaction()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
        assert_eq!(second_seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refused_connection_moves_submission_on() {
        let (second, second_seen) = silent_node().await;
        let client = NodeClient::new(
            vec![closed_node().await, second],
            Duration::from_millis(200),
        )
        .unwrap();

        let err = client.submit(&transaction()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
        assert_eq!(second_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timed_out_read_moves_on() {
        let (first, _) = silent_node().await;
        let (second, second_seen) = silent_node().await;
        let client = NodeClient::new(vec![first, second], Duration::from_millis(200)).unwrap();

        let address = Address::new("rms_owner").unwrap();
        let err = client.fetch_outputs(&address).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
        assert_eq!(second_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn needs_at_least_one_node() {
        assert!(matches!(
            NodeClient::new(Vec::new(), Duration::from_secs(1)),
            Err(WalletError::Config(_))
        ));
    }

    #[test]
    fn from_config_keeps_node_order() {
        let config = ClientConfig {
            nodes: vec!["http://a:14265".into(), "http://b:14265".into()],
            ..ClientConfig::default()
        };
        let client = NodeClient::from_config(&config).unwrap();
        assert_eq!(client.nodes(), config.nodes.as_slice());
    }

    #[tokio::test]
    async fn unreachable_nodes_are_unavailable() {
        let client = NodeClient::new(
            vec!["http://127.0.0.1:1".into(), "http://127.0.0.1:2".into()],
            Duration::from_secs(2),
        )
        .unwrap();
        let address = Address::new("rms_owner").unwrap();
        let err = client.fetch_outputs(&address).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
    }
}
