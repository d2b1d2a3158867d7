//! Tangle wallet command line.
//!
//! Every command loads the wallet from its config file and accounts file,
//! runs, and writes the accounts file back so reservations and pending
//! transactions survive between invocations.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use zeroize::Zeroizing;

use tangle_types::{Bip44, NetworkId, TransactionId};
use tangle_utils::{init_logging, LogFormat};
use tangle_wallet_core::account::save_account_details;
use tangle_wallet_core::{
    AccountAddress, AccountDetails, KeystoreSecretManager, TransactionStatus, Wallet,
    WalletConfig, WalletError,
};

#[derive(Parser)]
#[command(name = "tangle-wallet", about = "Tangle wallet: sync accounts and burn NFTs")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override it.
    #[arg(long, env = "TANGLE_CONFIG")]
    config: Option<PathBuf>,

    /// Node URLs (comma-separated), tried in order.
    #[arg(long, env = "TANGLE_NODES", value_delimiter = ',')]
    nodes: Vec<String>,

    /// Network: "mainnet" or "testnet".
    #[arg(long, env = "TANGLE_NETWORK")]
    network: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TANGLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TANGLE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Keystore passphrase.
    #[arg(long, env = "TANGLE_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create the keystore and a first account.
    Init {
        /// BIP39 mnemonic to import. A new one is generated when absent.
        #[arg(long, env = "TANGLE_MNEMONIC", hide_env_values = true)]
        mnemonic: Option<String>,

        #[arg(long, default_value = "main")]
        alias: String,

        /// Number of addresses to derive for the account.
        #[arg(long, default_value_t = 1)]
        addresses: u32,
    },
    /// Add another account to an initialised wallet.
    NewAccount {
        alias: String,

        #[arg(long, default_value_t = 1)]
        addresses: u32,
    },
    /// Sync one account, or all of them.
    Sync { alias: Option<String> },
    /// Show an account's balance.
    Balance { alias: String },
    /// Burn an NFT held by the account.
    BurnNft { alias: String, nft_id: String },
    /// Send base coin to an address.
    Send {
        alias: String,
        address: String,
        amount: u64,
    },
    /// Resubmit a transaction left signed by an unreachable node.
    Retry { alias: String, transaction_id: String },
    /// List pending and settled transactions.
    Transactions { alias: String },
}

fn parse_network(s: &str) -> anyhow::Result<NetworkId> {
    match s.to_lowercase().as_str() {
        "mainnet" => Ok(NetworkId::Mainnet),
        "testnet" => Ok(NetworkId::Testnet),
        other => bail!("unknown network {other:?}"),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<WalletConfig> {
    let mut config = match &cli.config {
        Some(path) => WalletConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WalletConfig::default(),
    };
    if !cli.nodes.is_empty() {
        config = config.with_nodes(cli.nodes.clone());
    }
    if let Some(network) = &cli.network {
        config = config.with_network(parse_network(network)?);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

async fn derive_addresses(
    secret: &KeystoreSecretManager,
    config: &WalletConfig,
    index: u32,
    count: u32,
) -> anyhow::Result<Vec<AccountAddress>> {
    let mut addresses = Vec::new();
    for i in 0..count.max(1) {
        let chain = Bip44::new(config.coin_type)
            .with_account(index)
            .with_address_index(i);
        let address = secret.address(&chain, config.hrp()).await?;
        addresses.push(AccountAddress { address, chain });
    }
    Ok(addresses)
}

async fn open_wallet(config: &WalletConfig, passphrase: &str) -> anyhow::Result<Wallet> {
    let wallet = Wallet::from_config(config.clone(), passphrase)?;
    let loaded = wallet
        .load_accounts_file(&config.accounts_path)
        .await
        .with_context(|| {
            format!(
                "no accounts at {}; run `tangle-wallet init` first",
                config.accounts_path.display()
            )
        })?;
    tracing::debug!(accounts = loaded, "accounts loaded");
    Ok(wallet)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format.parse::<LogFormat>()?, &config.log_level)?;

    let passphrase = Zeroizing::new(cli.passphrase.clone());

    match cli.command {
        Command::Init {
            mnemonic,
            alias,
            addresses,
        } => init(&config, &passphrase, mnemonic, &alias, addresses).await,
        command => {
            let wallet = open_wallet(&config, &passphrase).await?;
            let outcome = run(&wallet, &config, &passphrase, command).await;
            wallet.save_accounts_file(&config.accounts_path).await?;
            outcome
        }
    }
}

async fn init(
    config: &WalletConfig,
    passphrase: &str,
    mnemonic: Option<String>,
    alias: &str,
    addresses: u32,
) -> anyhow::Result<()> {
    if config.secret_manager.keystore_path.exists() {
        bail!(
            "keystore {} already exists",
            config.secret_manager.keystore_path.display()
        );
    }
    let mnemonic = match mnemonic {
        Some(m) => Zeroizing::new(m),
        None => {
            let generated = tangle_crypto::generate_mnemonic()?;
            println!(
                "Write down your mnemonic, it will not be shown again:\n\n{}\n",
                generated.as_str()
            );
            generated
        }
    };
    let secret = KeystoreSecretManager::create(
        config.secret_manager.keystore_path.clone(),
        passphrase,
        mnemonic.as_str(),
    )?;
    let addresses = derive_addresses(&secret, config, 0, addresses).await?;
    let details = AccountDetails::new(alias, 0, config.coin_type, addresses);
    save_account_details(&config.accounts_path, std::slice::from_ref(&details))?;
    println!("Account {alias} created");
    for a in &details.addresses {
        println!("  {}", a.address);
    }
    Ok(())
}

async fn run(
    wallet: &Wallet,
    config: &WalletConfig,
    passphrase: &str,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Init { .. } => bail!("wallet already initialised"),
        Command::NewAccount { alias, addresses } => {
            let index = wallet.next_account_index().await;
            let secret = KeystoreSecretManager::new(
                config.secret_manager.keystore_path.clone(),
                passphrase,
            );
            let addresses = derive_addresses(&secret, config, index, addresses).await?;
            let account = wallet.create_account(&alias, addresses).await?;
            println!("Account {} (index {}) created", account.alias(), account.index());
            for a in account.addresses() {
                println!("  {}", a.address);
            }
        }
        Command::Sync { alias: Some(alias) } => {
            let report = wallet.get_account(&alias).await?.sync().await?;
            println!(
                "{alias}: {} new, {} spent, {} confirmed, {} rejected",
                report.new_outputs.len(),
                report.spent_outputs.len(),
                report.confirmed.len(),
                report.rejected.len()
            );
        }
        Command::Sync { alias: None } => {
            for (alias, result) in wallet.sync_all().await {
                match result {
                    Ok(report) => println!(
                        "{alias}: {} new, {} spent, {} confirmed, {} rejected",
                        report.new_outputs.len(),
                        report.spent_outputs.len(),
                        report.confirmed.len(),
                        report.rejected.len()
                    ),
                    Err(e) => println!("{alias}: sync failed: {e}"),
                }
            }
        }
        Command::Balance { alias } => {
            let account = wallet.get_account(&alias).await?;
            let balance = account.balance().await;
            println!(
                "base coin: {} ({} available)",
                balance.base_coin.total, balance.base_coin.available
            );
            for (token, amount) in &balance.native_tokens {
                println!("token {token}: {} ({} available)", amount.total, amount.available);
            }
            for nft in &balance.nfts {
                println!("nft {nft}");
            }
            for alias_id in &balance.aliases {
                println!("alias {alias_id}");
            }
        }
        Command::BurnNft { alias, nft_id } => {
            let account = wallet.get_account(&alias).await?;
            account.sync().await?;
            match account.burn_nft(&nft_id).await {
                Ok(tx) => print!("{tx}"),
                Err(e) if e.is_retryable() => {
                    let pending = account.pending_transactions().await;
                    if let Some(tx) = pending
                        .iter()
                        .find(|tx| tx.status == TransactionStatus::Signed)
                    {
                        println!(
                            "node unreachable; retry with `tangle-wallet retry {alias} {}`",
                            tx.id
                        );
                    }
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Send {
            alias,
            address,
            amount,
        } => {
            let account = wallet.get_account(&alias).await?;
            account.sync().await?;
            let tx = account.send_amount(&address, amount).await?;
            print!("{tx}");
        }
        Command::Retry {
            alias,
            transaction_id,
        } => {
            let id: TransactionId = transaction_id
                .parse()
                .map_err(|e| WalletError::InvalidIdentifier(format!("{e}")))?;
            let status = wallet
                .get_account(&alias)
                .await?
                .retry_submission(&id)
                .await?;
            println!("{id}: {status}");
        }
        Command::Transactions { alias } => {
            let account = wallet.get_account(&alias).await?;
            for tx in account.pending_transactions().await {
                print!("{tx}");
            }
            for tx in account.history().await {
                print!("{tx}");
            }
        }
    }
    Ok(())
}
