//! Wire encoding tests, including property-based round trips

use core_types::{wire, CanonicalObject, CanonicalValue, ObjectEntry, ValueType};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = CanonicalValue> {
    prop_oneof![
        Just(CanonicalValue::undefined()),
        Just(CanonicalValue::null()),
        any::<bool>().prop_map(CanonicalValue::boolean),
        any::<f64>()
            .prop_filter("NaN never compares equal", |n| !n.is_nan())
            .prop_map(CanonicalValue::number),
        ".{0,12}".prop_map(CanonicalValue::string),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(CanonicalValue::buffer),
    ]
}

fn value() -> impl Strategy<Value = CanonicalValue> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|items| CanonicalValue::object(CanonicalObject::array(items))),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|pairs| {
                let entries = pairs
                    .into_iter()
                    .map(|(key, value)| ObjectEntry { key, value })
                    .collect();
                CanonicalValue::object(CanonicalObject::new(entries))
            }),
        ]
    })
}

proptest! {
    #[test]
    fn encoded_values_decode_to_themselves(v in value()) {
        let bytes = wire::encode(&v).unwrap();
        prop_assert_eq!(wire::decode(&bytes).unwrap(), v);
    }
}

#[test]
fn test_kind_payload_mismatch_is_rejected() {
    // A Number tag followed by a bool payload: encode a boolean and patch the tag.
    let mut bytes = wire::encode(&CanonicalValue::boolean(true)).unwrap();
    let tag = ValueType::Boolean as u8;
    let position = bytes.iter().position(|b| *b == tag).unwrap();
    bytes[position] = ValueType::Number as u8;
    assert!(wire::decode(&bytes).is_err());
}
