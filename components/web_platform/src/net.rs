//! Network request and response contexts handed to filters.

use core_types::{
    convert, ByteBuffer, CanonicalObject, CanonicalValue, Error, FromCanonical, ObjectEntry,
    Result, ToCanonical,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a network request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestType {
    /// Manifest (DASH MPD, HLS playlist)
    Manifest = 0,
    /// Media segment
    Segment = 1,
    /// DRM license
    License = 2,
    /// Application-defined
    App = 3,
    /// Clock synchronization
    Timing = 4,
    /// DRM server certificate
    ServerCertificate = 5,
}

impl RequestType {
    /// Maps the numeric type used by the player script.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => RequestType::Manifest,
            1 => RequestType::Segment,
            2 => RequestType::License,
            3 => RequestType::App,
            4 => RequestType::Timing,
            5 => RequestType::ServerCertificate,
            _ => return None,
        })
    }

    /// The numeric type used by the player script.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl FromCanonical for RequestType {
    const TYPE_NAME: &'static str = "request type";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        let code = i32::from_canonical(value)?;
        Self::from_code(code).ok_or_else(|| Error::conversion(format!("unknown request type {}", code)))
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    /// Candidate URIs, tried in order
    pub uris: Vec<String>,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Send credentials on cross-site requests
    pub allow_cross_site_credentials: bool,
}

impl Request {
    /// A GET request for `uri`.
    pub fn get(uri: impl Into<String>) -> Self {
        Self {
            uris: vec![uri.into()],
            method: "GET".to_string(),
            ..Default::default()
        }
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    /// Final URI after redirects
    pub uri: String,
    /// URI originally requested
    pub original_uri: String,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub data: Vec<u8>,
    /// Time the request took, if measured
    pub time_ms: Option<f64>,
    /// Served from a cache
    pub from_cache: bool,
}

fn entry(key: &str, value: CanonicalValue) -> ObjectEntry {
    ObjectEntry {
        key: key.to_string(),
        value,
    }
}

fn headers_to_canonical(headers: &HashMap<String, String>) -> CanonicalValue {
    let mut names: Vec<&String> = headers.keys().collect();
    names.sort();
    let entries = names
        .into_iter()
        .map(|name| entry(name, CanonicalValue::string(headers[name].as_str())))
        .collect();
    CanonicalValue::object(CanonicalObject::new(entries))
}

fn headers_from_canonical(context: &str, value: Option<&CanonicalValue>) -> Result<HashMap<String, String>> {
    let Some(value) = value.filter(|v| !v.is_nullish()) else {
        return Ok(HashMap::new());
    };
    let object = value
        .as_object()
        .ok_or_else(|| Error::conversion(format!("'{}' is not an object", context)))?;
    object
        .entries()
        .iter()
        .map(|e| Ok((e.key.clone(), convert::<String>(&format!("{}.{}", context, e.key), &e.value)?)))
        .collect()
}

fn field<T: FromCanonical>(object: &CanonicalObject, owner: &str, key: &str) -> Result<T> {
    let value = object.get(key).cloned().unwrap_or_default();
    convert(&format!("{}.{}", owner, key), &value)
}

fn as_object<'a>(owner: &str, value: &'a CanonicalValue) -> Result<&'a CanonicalObject> {
    value
        .as_object()
        .ok_or_else(|| Error::conversion(format!("{} must be an object, got {}", owner, value.kind())))
}

impl ToCanonical for Request {
    fn to_canonical(&self) -> CanonicalValue {
        let body = match &self.body {
            Some(bytes) => CanonicalValue::buffer(bytes.clone()),
            None => CanonicalValue::null(),
        };
        CanonicalValue::object(CanonicalObject::new(vec![
            entry("uris", self.uris.to_canonical()),
            entry("method", CanonicalValue::string(self.method.as_str())),
            entry("headers", headers_to_canonical(&self.headers)),
            entry("body", body),
            entry(
                "allowCrossSiteCredentials",
                CanonicalValue::boolean(self.allow_cross_site_credentials),
            ),
        ]))
    }
}

impl FromCanonical for Request {
    const TYPE_NAME: &'static str = "request";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        let object = as_object("request", value)?;
        let method: Option<String> = field(object, "request", "method")?;
        let body: Option<ByteBuffer> = field(object, "request", "body")?;
        let credentials: Option<bool> = field(object, "request", "allowCrossSiteCredentials")?;
        Ok(Self {
            uris: field(object, "request", "uris")?,
            method: method.unwrap_or_else(|| "GET".to_string()),
            headers: headers_from_canonical("request.headers", object.get("headers"))?,
            body: body.map(|b| b.0),
            allow_cross_site_credentials: credentials.unwrap_or(false),
        })
    }
}

impl ToCanonical for Response {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::object(CanonicalObject::new(vec![
            entry("uri", CanonicalValue::string(self.uri.as_str())),
            entry("originalUri", CanonicalValue::string(self.original_uri.as_str())),
            entry("headers", headers_to_canonical(&self.headers)),
            entry("data", CanonicalValue::buffer(self.data.clone())),
            entry("timeMs", self.time_ms.to_canonical()),
            entry("fromCache", CanonicalValue::boolean(self.from_cache)),
        ]))
    }
}

impl FromCanonical for Response {
    const TYPE_NAME: &'static str = "response";

    fn from_canonical(value: &CanonicalValue) -> Result<Self> {
        let object = as_object("response", value)?;
        let original_uri: Option<String> = field(object, "response", "originalUri")?;
        let data: Option<ByteBuffer> = field(object, "response", "data")?;
        let from_cache: Option<bool> = field(object, "response", "fromCache")?;
        let uri: String = field(object, "response", "uri")?;
        Ok(Self {
            original_uri: original_uri.unwrap_or_else(|| uri.clone()),
            uri,
            headers: headers_from_canonical("response.headers", object.get("headers"))?,
            data: data.map(|b| b.0).unwrap_or_default(),
            time_ms: field(object, "response", "timeMs")?,
            from_cache: from_cache.unwrap_or(false),
        })
    }
}
