#![no_main]

use libfuzzer_sys::fuzz_target;

use tangle_types::{Address, AliasId, NftId, OutputId, TokenId, TransactionId};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that parses must print back to the canonical lowercase form.
    if let Ok(id) = text.parse::<NftId>() {
        assert_eq!(id.to_string(), text.to_lowercase());
    }
    let _ = text.parse::<OutputId>();
    let _ = text.parse::<AliasId>();
    let _ = text.parse::<TokenId>();
    let _ = text.parse::<TransactionId>();

    let _ = Address::new(text);
    let _ = tangle_crypto::validate_address(text);
    let _ = tangle_crypto::decode_address(text);
});
