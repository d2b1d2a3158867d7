use proptest::prelude::*;

use tangle_types::{Bip44, CoinType, NftId, OutputId, Timestamp, TransactionId};

proptest! {
    /// Any 32 bytes survive Display -> FromStr.
    #[test]
    fn nft_id_text_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = NftId::new(bytes);
        let parsed: NftId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Hex strings of the wrong length never parse.
    #[test]
    fn wrong_length_never_parses(digits in "[0-9a-f]{0,130}") {
        prop_assume!(digits.len() != 64);
        let candidate = format!("0x{digits}");
        prop_assert!(candidate.parse::<NftId>().is_err());
    }

    /// Distinct output indices of one transaction never collide.
    #[test]
    fn created_output_ids_distinct(
        tx in prop::array::uniform32(0u8..),
        a in 0u16..512,
        b in 0u16..512,
    ) {
        prop_assume!(a != b);
        let tx = TransactionId::new(tx);
        prop_assert_ne!(OutputId::from_transaction(&tx, a), OutputId::from_transaction(&tx, b));
    }

    /// Output ids keep their byte order when used as map keys.
    #[test]
    fn output_id_ordering(a in prop::array::uniform32(0u8..), b in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(OutputId::new(a) < OutputId::new(b), a < b);
    }

    /// Every BIP44 segment is hardened and keeps its value.
    #[test]
    fn bip44_segments(account in 0u32..0x8000_0000, index in 0u32..0x8000_0000) {
        let chain = Bip44::new(CoinType::Shimmer).with_account(account).with_address_index(index);
        let segments = chain.segments();
        prop_assert_eq!(segments[2] & 0x7FFF_FFFF, account);
        prop_assert_eq!(segments[4] & 0x7FFF_FFFF, index);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Timestamp::new(a) <= Timestamp::new(b), a <= b);
    }

    /// Identifiers serialize through bincode as their text form.
    #[test]
    fn transaction_id_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = TransactionId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: TransactionId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }
}
