//! Round-trip properties, plus a differential check of the wire bytes
//! against rmp-serde's named-struct MessagePack encoding.
use {
    msgpact::{SchemaRead, SchemaWrite},
    proptest::prelude::*,
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

// Fields are declared in the canonical sorted order so the reference
// encoder, which writes declaration order, produces identical maps.
#[derive(
    SchemaWrite,
    SchemaRead,
    Serialize,
    Deserialize,
    proptest_derive::Arbitrary,
    Debug,
    PartialEq,
    Clone,
)]
struct Inventory {
    count: u32,
    label: String,
    sizes: Vec<i64>,
    tag: Option<u8>,
}

#[derive(
    SchemaWrite,
    SchemaRead,
    Serialize,
    Deserialize,
    proptest_derive::Arbitrary,
    Debug,
    PartialEq,
    Clone,
)]
struct Warehouse {
    inventories: Vec<Inventory>,
    open: bool,
    stock: BTreeMap<String, i64>,
}

#[derive(SchemaWrite, SchemaRead, proptest_derive::Arbitrary, Debug, PartialEq, Clone)]
enum Payload {
    Number(i32),
    Text(String),
    Flags(Vec<bool>),
}

#[derive(SchemaWrite, SchemaRead, proptest_derive::Arbitrary, Debug, PartialEq, Clone)]
enum Mode {
    Fast,
    Safe,
}

#[derive(SchemaWrite, SchemaRead, proptest_derive::Arbitrary, Debug, PartialEq, Clone)]
struct Envelope {
    id: u64,
    kind: Mode,
    payload: Payload,
}

proptest! {
    #[test]
    fn inventories_roundtrip(value: Inventory) {
        let bytes = msgpact::serialize(&value).unwrap();
        let back: Inventory = msgpact::deserialize(&bytes).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn nested_records_roundtrip(value: Warehouse) {
        let bytes = msgpact::serialize(&value).unwrap();
        let back: Warehouse = msgpact::deserialize(&bytes).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn enums_and_unions_roundtrip(value: Envelope) {
        let bytes = msgpact::serialize(&value).unwrap();
        let back: Envelope = msgpact::deserialize(&bytes).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn record_bytes_match_reference_encoder(value: Inventory) {
        let ours = msgpact::serialize(&value).unwrap();
        let reference = rmp_serde::to_vec_named(&value).unwrap();
        prop_assert_eq!(ours, reference);
    }

    #[test]
    fn nested_bytes_match_reference_encoder(value: Warehouse) {
        let ours = msgpact::serialize(&value).unwrap();
        let reference = rmp_serde::to_vec_named(&value).unwrap();
        prop_assert_eq!(ours, reference);
    }

    #[test]
    fn reference_decoder_reads_our_bytes(value: Inventory) {
        let bytes = msgpact::serialize(&value).unwrap();
        let back: Inventory = rmp_serde::from_slice(&bytes).unwrap();
        prop_assert_eq!(back, value);
    }
}
