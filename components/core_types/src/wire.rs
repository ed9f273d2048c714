//! Binary encoding of canonical values.
//!
//! Values are encoded with `bincode`; decoding validates the kind/payload
//! invariant so a malformed capture never produces an inconsistent value.

use crate::error::{Error, Result};
use crate::value::CanonicalValue;

/// Encodes a value for transport or capture.
pub fn encode(value: &CanonicalValue) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|err| Error::conversion(format!("encode failed: {}", err)))
}

/// Decodes and validates a value.
pub fn decode(bytes: &[u8]) -> Result<CanonicalValue> {
    let value: CanonicalValue = bincode::deserialize(bytes)
        .map_err(|err| Error::conversion(format!("decode failed: {}", err)))?;
    if !value.is_well_formed() {
        return Err(Error::conversion(format!(
            "payload does not match kind {}",
            value.kind()
        )));
    }
    Ok(value)
}
