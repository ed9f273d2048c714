//! Unit tests for request/response conversion

use core_types::{CanonicalValue, ErrorKind, FromCanonical, ToCanonical, ValueType};
use web_platform::{Request, Response};

#[test]
fn request_converts_to_script_shape() {
    let mut request = Request::get("https://example.com/license");
    request.method = "POST".into();
    request.headers.insert("X-Token".into(), "abc".into());
    request.body = Some(vec![1, 2]);
    let value = request.to_canonical();
    let object = value.as_object().unwrap();

    assert_eq!(object.get("method").unwrap().as_str(), Some("POST"));
    assert_eq!(object.get("body").unwrap().kind(), ValueType::ArrayBuffer);
    assert_eq!(
        object.get("headers").unwrap().as_object().unwrap().get("X-Token").unwrap().as_str(),
        Some("abc")
    );
    assert_eq!(Request::from_canonical(&value).unwrap(), request);
}

#[test]
fn response_keeps_optional_fields() {
    let response = Response {
        uri: "https://cdn/seg1.mp4".into(),
        original_uri: "https://origin/seg1.mp4".into(),
        data: vec![0; 8],
        time_ms: Some(12.5),
        from_cache: true,
        ..Default::default()
    };
    let back = Response::from_canonical(&response.to_canonical()).unwrap();
    assert_eq!(back, response);
}

#[test]
fn response_original_uri_defaults_to_uri() {
    let value = core_types::object_from_pairs([("uri", "https://cdn/a")]);
    let response = Response::from_canonical(&value).unwrap();
    assert_eq!(response.original_uri, "https://cdn/a");
    assert!(response.time_ms.is_none());
}

#[test]
fn bad_header_value_names_the_header() {
    let headers = core_types::object_from_pairs([("Range", 5.0)]);
    let value = core_types::object_from_pairs([
        ("uris", CanonicalValue::object(core_types::CanonicalObject::array(vec![]))),
        ("headers", headers),
    ]);
    let err = Request::from_canonical(&value).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conversion);
    assert!(err.message.contains("request.headers.Range"));
}

#[test]
fn non_object_request_is_rejected() {
    let err = Request::from_canonical(&CanonicalValue::string("nope")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conversion);
}
