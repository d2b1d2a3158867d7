//! The wallet: configuration, capabilities, and the accounts it routes to.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use tangle_types::Address;

use crate::account::{
    load_account_details, save_account_details, Account, AccountAddress, AccountDetails,
    AccountServices,
};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::events::{Event, EventEmitter};
use crate::ledger_client::{LedgerClient, NodeClient};
use crate::secret_manager::{KeystoreSecretManager, SecretManager};
use crate::submitter::TransactionSubmitter;
use crate::sync::{SyncEngine, SyncReport};

pub struct Wallet {
    config: WalletConfig,
    services: AccountServices,
    accounts: RwLock<BTreeMap<String, Arc<Account>>>,
}

impl Wallet {
    pub fn new(
        config: WalletConfig,
        ledger: Arc<dyn LedgerClient>,
        secret_manager: Arc<dyn SecretManager>,
    ) -> Self {
        let submitter = TransactionSubmitter::new(
            config.submit.clone(),
            secret_manager,
            Arc::clone(&ledger),
        );
        let services = AccountServices {
            network: config.client.network,
            ledger,
            sync_engine: SyncEngine::new(config.sync.clone()),
            submitter: Arc::new(submitter),
            events: EventEmitter::default(),
        };
        Self {
            config,
            services,
            accounts: RwLock::new(BTreeMap::new()),
        }
    }

    /// A wallet talking to the configured nodes and signing with the
    /// configured keystore.
    pub fn from_config(
        config: WalletConfig,
        passphrase: impl Into<String>,
    ) -> Result<Self, WalletError> {
        let ledger = NodeClient::from_config(&config.client)?;
        let secret_manager =
            KeystoreSecretManager::new(config.secret_manager.keystore_path.clone(), passphrase);
        tracing::info!(
            network = config.client.network.as_str(),
            nodes = config.client.nodes.len(),
            "wallet created"
        );
        Ok(Self::new(config, Arc::new(ledger), Arc::new(secret_manager)))
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Register a persisted account.
    pub async fn load_account(&self, details: AccountDetails) -> Result<Arc<Account>, WalletError> {
        if details.coin_type != self.config.coin_type {
            return Err(WalletError::Config(format!(
                "account {} uses coin type {:?}, wallet uses {:?}",
                details.alias, details.coin_type, self.config.coin_type
            )));
        }
        let hrp = self.config.hrp();
        if let Some(foreign) = details.addresses.iter().find(|a| a.address.hrp() != hrp) {
            return Err(WalletError::Config(format!(
                "address {} is not a {hrp} address",
                foreign.address
            )));
        }

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&details.alias) {
            return Err(WalletError::AccountAlreadyExists(details.alias));
        }
        let alias = details.alias.clone();
        let account = Arc::new(Account::new(details, self.services.clone())?);
        accounts.insert(alias.clone(), Arc::clone(&account));
        tracing::debug!(alias = %alias, index = account.index(), "account loaded");
        Ok(account)
    }

    /// Create an empty account at the next free index.
    pub async fn create_account(
        &self,
        alias: impl Into<String>,
        addresses: Vec<AccountAddress>,
    ) -> Result<Arc<Account>, WalletError> {
        let index = self.next_account_index().await;
        let details = AccountDetails::new(alias, index, self.config.coin_type, addresses);
        self.load_account(details).await
    }

    pub async fn next_account_index(&self) -> u32 {
        self.accounts
            .read()
            .await
            .values()
            .map(|a| a.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Load every account in a details file. Returns how many were loaded.
    pub async fn load_accounts_file(&self, path: &Path) -> Result<usize, WalletError> {
        let all = load_account_details(path)?;
        let count = all.len();
        for details in all {
            self.load_account(details).await?;
        }
        Ok(count)
    }

    pub async fn save_accounts_file(&self, path: &Path) -> Result<(), WalletError> {
        let mut all = Vec::new();
        for account in self.accounts().await {
            all.push(account.details().await);
        }
        save_account_details(path, &all)
    }

    pub async fn get_account(&self, alias: &str) -> Result<Arc<Account>, WalletError> {
        self.accounts
            .read()
            .await
            .get(alias)
            .cloned()
            .ok_or_else(|| WalletError::UnknownAccount(alias.to_string()))
    }

    /// Find the account owning `address`.
    pub async fn account_for_address(&self, address: &Address) -> Option<Arc<Account>> {
        self.accounts
            .read()
            .await
            .values()
            .find(|account| account.addresses().iter().any(|a| &a.address == address))
            .cloned()
    }

    pub async fn accounts(&self) -> Vec<Arc<Account>> {
        self.accounts.read().await.values().cloned().collect()
    }

    pub async fn account_aliases(&self) -> Vec<String> {
        self.accounts.read().await.keys().cloned().collect()
    }

    /// Sync every account concurrently. One account failing does not stop
    /// the others.
    pub async fn sync_all(&self) -> BTreeMap<String, Result<SyncReport, WalletError>> {
        let handles: Vec<_> = self
            .accounts()
            .await
            .into_iter()
            .map(|account| {
                let alias = account.alias().to_string();
                (alias, tokio::spawn(async move { account.sync().await }))
            })
            .collect();

        let mut results = BTreeMap::new();
        for (alias, handle) in handles {
            let result = handle
                .await
                .unwrap_or_else(|e| Err(WalletError::Other(format!("sync task failed: {e}"))));
            results.insert(alias, result);
        }
        results
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.services.events.subscribe()
    }

    /// Unregister every account and hand back their details for persistence.
    pub async fn close(&self) -> Vec<AccountDetails> {
        let drained = std::mem::take(&mut *self.accounts.write().await);
        let mut details = Vec::with_capacity(drained.len());
        for account in drained.into_values() {
            details.push(account.details().await);
        }
        tracing::info!(accounts = details.len(), "wallet closed");
        details
    }
}
