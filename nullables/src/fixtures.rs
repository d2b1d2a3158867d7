//! Ready-made wallets wired to the nullables.

use std::sync::Arc;

use tangle_types::{Bip44, CoinType};
use tangle_wallet_core::{Account, AccountAddress, AccountDetails, Wallet, WalletConfig};

use crate::{NullLedger, NullSecretManager};

/// Details for an account with `address_count` addresses on the change-0
/// chain of account `index`.
pub fn account_details(
    secret: &NullSecretManager,
    config: &WalletConfig,
    alias: &str,
    index: u32,
    address_count: u32,
) -> AccountDetails {
    let addresses = (0..address_count)
        .map(|i| {
            let chain = Bip44::new(config.coin_type)
                .with_account(index)
                .with_address_index(i);
            AccountAddress {
                address: secret.address(&chain, config.hrp()),
                chain,
            }
        })
        .collect();
    AccountDetails::new(alias, index, config.coin_type, addresses)
}

/// A wallet on a [`NullLedger`] and a [`NullSecretManager`], with handles to
/// both for scripting.
pub struct TestWallet {
    pub wallet: Wallet,
    pub ledger: Arc<NullLedger>,
    pub secret: Arc<NullSecretManager>,
}

impl TestWallet {
    pub fn new() -> Self {
        Self::with_config(WalletConfig::default().with_coin_type(CoinType::Shimmer))
    }

    pub fn with_config(config: WalletConfig) -> Self {
        let ledger = Arc::new(NullLedger::new());
        let secret = Arc::new(NullSecretManager::new(7));
        let wallet = Wallet::new(config, ledger.clone(), secret.clone());
        Self {
            wallet,
            ledger,
            secret,
        }
    }

    pub fn details(&self, alias: &str, index: u32, address_count: u32) -> AccountDetails {
        account_details(
            &self.secret,
            self.wallet.config(),
            alias,
            index,
            address_count,
        )
    }

    /// Load an empty account with `address_count` addresses.
    pub async fn add_account(&self, alias: &str, index: u32, address_count: u32) -> Arc<Account> {
        self.wallet
            .load_account(self.details(alias, index, address_count))
            .await
            .unwrap()
    }
}

impl Default for TestWallet {
    fn default() -> Self {
        Self::new()
    }
}
