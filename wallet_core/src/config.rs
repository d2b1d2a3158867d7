//! Wallet configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tangle_types::{CoinType, NetworkId};

use crate::error::WalletError;
use crate::submitter::SubmitOptions;
use crate::sync::SyncOptions;

/// Configuration for a wallet.
///
/// Can be loaded from a TOML file via [`WalletConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Coin whose BIP44 chains and address prefix the wallet uses.
    #[serde(default = "default_coin_type")]
    pub coin_type: CoinType,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON file holding persisted account details.
    #[serde(default = "default_accounts_path")]
    pub accounts_path: PathBuf,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub secret_manager: SecretManagerConfig,

    #[serde(default)]
    pub sync: SyncOptions,

    #[serde(default)]
    pub submit: SubmitOptions,
}

/// Ledger node connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Node URLs, tried in order.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    #[serde(default = "default_network")]
    pub network: NetworkId,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretManagerConfig {
    /// Encrypted seed file.
    #[serde(default = "default_keystore_path")]
    pub keystore_path: PathBuf,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_coin_type() -> CoinType {
    CoinType::Shimmer
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_accounts_path() -> PathBuf {
    PathBuf::from("./accounts.json")
}

fn default_nodes() -> Vec<String> {
    vec!["http://127.0.0.1:14265".to_string()]
}

fn default_network() -> NetworkId {
    NetworkId::Testnet
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_keystore_path() -> PathBuf {
    PathBuf::from("./wallet.keystore.json")
}

// ── Impl ───────────────────────────────────────────────────────────────

impl WalletConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, WalletError> {
        toml::from_str(s).map_err(|e| WalletError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, WalletError> {
        toml::to_string_pretty(self).map_err(|e| WalletError::Config(e.to_string()))
    }

    /// Address prefix for the configured coin and network.
    pub fn hrp(&self) -> &'static str {
        self.coin_type.hrp(self.client.network)
    }

    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        self.client.nodes = nodes;
        self
    }

    pub fn with_network(mut self, network: NetworkId) -> Self {
        self.client.network = network;
        self
    }

    pub fn with_coin_type(mut self, coin_type: CoinType) -> Self {
        self.coin_type = coin_type;
        self
    }

    pub fn with_keystore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.secret_manager.keystore_path = path.into();
        self
    }

    pub fn with_accounts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.accounts_path = path.into();
        self
    }

    pub fn with_rejection_threshold(mut self, syncs: u32) -> Self {
        self.sync.rejection_threshold = syncs;
        self
    }

    pub fn with_max_submit_attempts(mut self, attempts: u32) -> Self {
        self.submit.max_submit_attempts = attempts;
        self
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            coin_type: default_coin_type(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            accounts_path: default_accounts_path(),
            client: ClientConfig::default(),
            secret_manager: SecretManagerConfig::default(),
            sync: SyncOptions::default(),
            submit: SubmitOptions::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            network: default_network(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SecretManagerConfig {
    fn default() -> Self {
        Self {
            keystore_path: default_keystore_path(),
        }
    }
}
