//! Codec Module
//!
//! Opaque encoding boundary between caller values and stored payloads.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::BoxError;

// == Codec ==
/// Encodes caller values into byte payloads and back.
///
/// Any `Serialize` value can be stored, including nested structs, maps and
/// enums. A payload is only ever decoded by the codec that produced it.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a value into a byte payload.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, BoxError>;

    /// Decodes a payload into the requested type.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError>;
}

// == JSON Codec ==
/// Default codec, backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{ser::Error as _, Deserialize, Serializer};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
        scores: HashMap<String, u32>,
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_json_codec_structured_value() {
        let profile = Profile {
            name: "ada".to_string(),
            tags: vec!["admin".to_string()],
            scores: HashMap::from([("chess".to_string(), 3)]),
        };

        let bytes = JsonCodec.encode(&profile).unwrap();
        let decoded: Profile = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, profile);
    }

    #[test]
    fn test_json_codec_unsized_str() {
        let bytes = JsonCodec.encode("plain").unwrap();
        let decoded: String = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, "plain");
    }

    #[test]
    fn test_json_codec_encode_error() {
        assert!(JsonCodec.encode(&Unencodable).is_err());
    }

    #[test]
    fn test_json_codec_type_mismatch() {
        let bytes = JsonCodec.encode("not a number").unwrap();
        assert!(JsonCodec.decode::<u64>(&bytes).is_err());
    }
}
