//! Codec trait and implementations for turning envelopes into frames.
//!
//! The correlation layer doesn't care HOW requests and responses are
//! serialized; it only needs something that implements [`Codec`]. Swapping
//! the encoding (for example for a schema-generated binary format) means
//! providing another implementation, nothing else changes.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared between
/// every caller of an RPC client and its background receive loop.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`), carried in binary frames.
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use enginelink_protocol::{Codec, JsonCodec, Request, RequestPayload, RequestPing};
///
/// let codec = JsonCodec;
/// let request = Request {
///     id: Some(1),
///     request: RequestPayload::Ping(RequestPing {}),
/// };
///
/// let bytes = codec.encode(&request).unwrap();
/// let decoded: Request = codec.decode(&bytes).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
