#![no_main]

use libfuzzer_sys::fuzz_target;

use tangle_wallet_core::Intent;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Accepted intents are valid and survive a JSON round trip.
    if let Ok(intent) = Intent::from_json(text) {
        let json = serde_json::to_string(&intent).unwrap();
        let again = Intent::from_json(&json).unwrap();
        assert_eq!(again, intent);
    }
});
