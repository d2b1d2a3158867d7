//! Nullable secret manager: deterministic keys with scriptable failures.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tangle_types::{Address, Bip44, Ed25519Signature};
use tangle_wallet_core::secret_manager::{MnemonicSecretManager, SecretManager};
use tangle_wallet_core::WalletError;

#[derive(Default)]
struct Script {
    delays: VecDeque<Duration>,
    failures: VecDeque<String>,
    locked: bool,
    wrong_key_next: bool,
    signed: Vec<Bip44>,
}

/// Signs with keys derived from a fixed seed.
pub struct NullSecretManager {
    keys: MnemonicSecretManager,
    script: Mutex<Script>,
}

impl NullSecretManager {
    /// Keys derived from a seed filled with `seed_byte`. Different bytes give
    /// unrelated wallets.
    pub fn new(seed_byte: u8) -> Self {
        Self {
            keys: MnemonicSecretManager::from_seed([seed_byte; 64]),
            script: Mutex::new(Script::default()),
        }
    }

    pub fn address(&self, chain: &Bip44, hrp: &str) -> Address {
        self.keys.address(chain, hrp).unwrap()
    }

    /// The next signature request fails with `reason`.
    pub fn fail_next_sign(&self, reason: impl Into<String>) {
        self.script.lock().unwrap().failures.push_back(reason.into());
    }

    /// The next signature request waits `delay` before it is answered.
    pub fn delay_next_sign(&self, delay: Duration) {
        self.script.lock().unwrap().delays.push_back(delay);
    }

    /// Refuse every signature until [`NullSecretManager::unlock`].
    pub fn lock(&self) {
        self.script.lock().unwrap().locked = true;
    }

    pub fn unlock(&self) {
        self.script.lock().unwrap().locked = false;
    }

    /// The next signature is valid but made with a key from another chain.
    pub fn sign_with_wrong_key_next(&self) {
        self.script.lock().unwrap().wrong_key_next = true;
    }

    /// Chains of every signature produced so far.
    pub fn signed_chains(&self) -> Vec<Bip44> {
        self.script.lock().unwrap().signed.clone()
    }

    pub fn sign_count(&self) -> usize {
        self.script.lock().unwrap().signed.len()
    }
}

#[async_trait]
impl SecretManager for NullSecretManager {
    async fn sign(&self, chain: &Bip44, payload: &[u8]) -> Result<Ed25519Signature, WalletError> {
        let delay = self.script.lock().unwrap().delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let chain = {
            let mut script = self.script.lock().unwrap();
            if script.locked {
                return Err(WalletError::SigningFailed("secret manager is locked".into()));
            }
            if let Some(reason) = script.failures.pop_front() {
                return Err(WalletError::SigningFailed(reason));
            }
            script.signed.push(*chain);
            if std::mem::take(&mut script.wrong_key_next) {
                chain.with_address_index(chain.address_index.wrapping_add(1_000))
            } else {
                *chain
            }
        };
        self.keys.sign(&chain, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_types::CoinType;

    #[tokio::test]
    async fn failures_are_consumed_in_order() {
        let manager = NullSecretManager::new(1);
        let chain = Bip44::new(CoinType::Shimmer);
        manager.fail_next_sign("first");
        assert!(manager.sign(&chain, b"x").await.is_err());
        assert!(manager.sign(&chain, b"x").await.is_ok());
        assert_eq!(manager.sign_count(), 1);
    }

    #[tokio::test]
    async fn lock_refuses_until_unlocked() {
        let manager = NullSecretManager::new(1);
        let chain = Bip44::new(CoinType::Shimmer);
        manager.lock();
        assert!(matches!(
            manager.sign(&chain, b"x").await,
            Err(WalletError::SigningFailed(_))
        ));
        manager.unlock();
        assert!(manager.sign(&chain, b"x").await.is_ok());
    }
}
