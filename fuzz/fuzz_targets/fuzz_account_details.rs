#![no_main]

use libfuzzer_sys::fuzz_target;

use tangle_wallet_core::{AccountDetails, WalletConfig};

fuzz_target!(|data: &[u8]| {
    // Persisted state and config come from disk; decoding must never panic.
    let _ = serde_json::from_slice::<Vec<AccountDetails>>(data);
    let _ = bincode::deserialize::<tangle_wallet_core::transaction::TransactionEssence>(data);

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = WalletConfig::from_toml_str(text);
    }
});
