//! Unit tests for runtime/canonical cloning

use core_types::{CanonicalObject, CanonicalValue, ErrorDetails, ObjectEntry, ValueType};
use js_engine::{JsObject, JsValue, ObjectClass, Realm, RealmOptions};

fn realm() -> Realm {
    Realm::new(RealmOptions::default())
}

#[test]
fn objects_keep_property_order() {
    let realm = realm();
    let config = realm.new_object();
    config.set("streaming", JsValue::Object(realm.new_object()));
    config.set("abr", JsValue::Boolean(false));
    let cloned = realm.to_canonical(&JsValue::Object(config)).unwrap();
    let keys: Vec<_> = cloned
        .as_object()
        .unwrap()
        .entries()
        .iter()
        .map(|e| e.key.as_str())
        .collect();
    assert_eq!(keys, vec!["streaming", "abr"]);
}

#[test]
fn sparse_arrays_keep_length() {
    let realm = realm();
    let array = realm.new_array(Vec::new());
    array.set("3", JsValue::Number(1.0));
    let cloned = realm.to_canonical(&JsValue::Object(array)).unwrap();
    let object = cloned.as_object().unwrap();
    assert_eq!(object.array_length(), Some(4));
    let elements = object.elements().unwrap().unwrap();
    assert_eq!(elements[0].kind(), ValueType::Undefined);
    assert_eq!(elements[3].as_number(), Some(1.0));
}

#[test]
fn max_u32_key_is_an_ordinary_property() {
    let realm = realm();
    let array = realm.new_array(vec![JsValue::Boolean(true)]);
    array.set("4294967295", JsValue::Number(1.0));
    let cloned = realm.to_canonical(&JsValue::Object(array)).unwrap();
    let object = cloned.as_object().unwrap();
    assert_eq!(object.array_length(), Some(1));
    assert_eq!(object.get("4294967295").and_then(CanonicalValue::as_number), Some(1.0));
    assert_eq!(object.elements().unwrap().unwrap().len(), 1);
}

#[test]
fn far_sparse_arrays_clone_without_expanding() {
    let realm = realm();
    let array = realm.new_array(Vec::new());
    array.set("4000000000", JsValue::Number(1.0));
    let cloned = realm.to_canonical(&JsValue::Object(array)).unwrap();
    let object = cloned.as_object().unwrap();
    assert_eq!(object.array_length(), Some(4_000_000_001));
    assert!(object.elements().is_err());
}

#[test]
fn binary_values_keep_their_kind() {
    let realm = realm();
    let bytes = JsObject::binary(ValueType::Uint8Array, vec![1, 2, 3]);
    let cloned = realm.to_canonical(&JsValue::Object(bytes)).unwrap();
    assert_eq!(cloned.kind(), ValueType::Uint8Array);
    assert_eq!(cloned.as_bytes(), Some(&[1u8, 2, 3][..]));

    let back = realm.from_canonical(&cloned);
    assert_eq!(back.value_type(), ValueType::Uint8Array);
}

#[test]
fn boxed_primitives_round_trip() {
    let realm = realm();
    let boxed = JsObject::with_class(ObjectClass::Boxed(JsValue::string("en")));
    let cloned = realm.to_canonical(&JsValue::Object(boxed)).unwrap();
    assert_eq!(cloned.kind(), ValueType::StringObject);
    assert_eq!(cloned.as_str(), Some("en"));
    assert_eq!(realm.from_canonical(&cloned).value_type(), ValueType::StringObject);
}

#[test]
fn promises_clone_to_tagged_objects() {
    let realm = realm();
    let promise = JsValue::Object(realm.new_promise());
    let cloned = realm.to_canonical(&promise).unwrap();
    assert_eq!(cloned.kind(), ValueType::Promise);
    assert!(cloned.is_well_formed());
}

#[test]
fn canonical_objects_become_runtime_objects() {
    let realm = realm();
    let value = CanonicalValue::object(CanonicalObject::new(vec![ObjectEntry {
        key: "uri".into(),
        value: CanonicalValue::string("https://example.com/a.mpd"),
    }]));
    let object = realm.from_canonical(&value);
    assert_eq!(
        realm.get_member(&object, "uri").as_str(),
        Some("https://example.com/a.mpd")
    );
}

#[test]
fn error_objects_keep_details() {
    let realm = realm();
    let thrown = realm.new_error("HTTP_ERROR");
    if let Some(object) = thrown.as_object() {
        object.set("category", JsValue::Number(1.0));
        object.set("code", JsValue::Number(1002.0));
        object.set("severity", JsValue::Number(2.0));
    }
    let err = realm.to_error(&thrown);
    assert_eq!(err.message, "HTTP_ERROR");
    assert_eq!(
        err.details,
        Some(ErrorDetails {
            category: 1,
            code: 1002,
            severity: 2,
        })
    );
}

#[test]
fn primitive_throws_use_their_text() {
    let realm = realm();
    assert_eq!(realm.to_error(&JsValue::string("plain")).message, "plain");
    assert!(realm.to_error(&JsValue::string("plain")).details.is_none());
}
