//! Explicit value codecs for typed storage.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("failed to encode value: {0}")]
    Encode(String),

    #[error("failed to decode value: {0}")]
    Decode(String),
}

/// Converts a typed value to and from its stored string form.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<String, CodecError>;

    fn decode(&self, raw: &str) -> Result<T, CodecError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, raw: &str) -> Result<T, CodecError> {
        serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
