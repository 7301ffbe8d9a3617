//! Serialization strategies used by persistent contexts
//!
//! A [`Codec`] turns erased values into bytes and back. Decoding needs the
//! target type, which the caller takes from the declared input type of the
//! stage that will receive the value.

use crate::Result;
use crate::error::CodecError;
use crate::types::{Datum, TypeInfo, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::collections::HashMap;

/// Encoding and decoding of erased values
pub trait Codec: Send + Sync {
    /// File extension of encoded values, without the dot
    fn extension(&self) -> &str;

    /// Encode `value`
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    /// Decode `bytes` into a value of type `target`
    fn decode(&self, bytes: &[u8], target: TypeInfo) -> Result<Value>;
}

type EncodeFn = fn(&Value, bool) -> Result<Vec<u8>>;
type DecodeFn = fn(&[u8]) -> Result<Value>;

#[derive(Clone, Copy)]
struct JsonRoutines {
    encode: EncodeFn,
    decode: DecodeFn,
}

fn encode_json<T: Datum + Serialize>(value: &Value, pretty: bool) -> Result<Vec<u8>> {
    let type_name = TypeInfo::of::<T>().name();
    let typed = value.downcast_ref::<T>().ok_or_else(|| {
        CodecError::encode(type_name, format!("value holds {}", value.type_info()))
    })?;

    let encoded = if pretty {
        serde_json::to_vec_pretty(typed)
    } else {
        serde_json::to_vec(typed)
    };
    encoded.map_err(|e| CodecError::encode(type_name, e.to_string()).into())
}

fn decode_json<T: Datum + DeserializeOwned>(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice::<T>(bytes)
        .map(Value::new)
        .map_err(|e| CodecError::decode(TypeInfo::of::<T>().name(), e.to_string()).into())
}

/// JSON codec backed by `serde_json`
///
/// Types are registered up front; values of a type that was never registered
/// are rejected with [`CodecError::UnregisteredType`]. Unit, booleans,
/// integers, floats and strings are registered by default.
#[derive(Clone)]
pub struct JsonCodec {
    routines: HashMap<TypeId, JsonRoutines>,
    pretty: bool,
}

impl std::fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCodec")
            .field("registered", &self.routines.len())
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonCodec {
    /// A codec with the default registrations
    pub fn new() -> Self {
        Self::empty()
            .register::<()>()
            .register::<bool>()
            .register::<i8>()
            .register::<i16>()
            .register::<i32>()
            .register::<i64>()
            .register::<isize>()
            .register::<u8>()
            .register::<u16>()
            .register::<u32>()
            .register::<u64>()
            .register::<usize>()
            .register::<f32>()
            .register::<f64>()
            .register::<String>()
    }

    /// A codec with no registrations
    pub fn empty() -> Self {
        Self {
            routines: HashMap::new(),
            pretty: false,
        }
    }

    /// Register `T`, replacing any earlier registration
    pub fn register<T>(mut self) -> Self
    where
        T: Datum + Serialize + DeserializeOwned,
    {
        self.routines.insert(
            TypeId::of::<T>(),
            JsonRoutines {
                encode: encode_json::<T>,
                decode: decode_json::<T>,
            },
        );
        self
    }

    /// Emit indented JSON
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Whether `T` can be encoded and decoded
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.routines.contains_key(&TypeId::of::<T>())
    }

    fn routines(&self, info: TypeInfo) -> Result<JsonRoutines> {
        self.routines
            .get(&info.id())
            .copied()
            .ok_or_else(|| CodecError::unregistered(info.name()).into())
    }
}

impl Codec for JsonCodec {
    fn extension(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let routines = self.routines(value.type_info())?;
        (routines.encode)(value, self.pretty)
    }

    fn decode(&self, bytes: &[u8], target: TypeInfo) -> Result<Value> {
        let routines = self.routines(target)?;
        (routines.decode)(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: u32,
        value: String,
    }

    #[test]
    fn test_registered_record_roundtrip() {
        let codec = JsonCodec::new().register::<Record>();
        let record = Record {
            id: 4,
            value: "four".to_string(),
        };

        let bytes = codec.encode(&Value::new(record.clone())).unwrap();
        assert_eq!(bytes, br#"{"id":4,"value":"four"}"#);

        let decoded = codec.decode(&bytes, TypeInfo::of::<Record>()).unwrap();
        assert_eq!(decoded.downcast::<Record>().unwrap(), record);
    }

    #[test]
    fn test_defaults_cover_primitives() {
        let codec = JsonCodec::new();
        assert!(codec.is_registered::<i64>());
        assert!(codec.is_registered::<String>());
        assert!(codec.is_registered::<()>());
        assert!(!codec.is_registered::<Record>());
        assert!(!JsonCodec::empty().is_registered::<i64>());

        assert_eq!(codec.encode(&Value::new(42i32)).unwrap(), b"42");
        let decoded = codec.decode(b"\"hi\"", TypeInfo::of::<String>()).unwrap();
        assert_eq!(decoded.downcast::<String>().unwrap(), "hi");
    }

    #[test]
    fn test_unregistered_type_is_rejected() {
        let codec = JsonCodec::new();
        let error = codec
            .encode(&Value::new(Record {
                id: 1,
                value: String::new(),
            }))
            .unwrap_err();
        assert!(matches!(error, Error::Codec(CodecError::UnregisteredType { .. })));

        let error = codec.decode(b"{}", TypeInfo::of::<Record>()).unwrap_err();
        assert!(error.to_string().contains("Record"));
    }

    #[test]
    fn test_malformed_content_is_a_decode_error() {
        let codec = JsonCodec::new();
        let error = codec.decode(b"not json", TypeInfo::of::<i64>()).unwrap_err();
        assert!(matches!(error, Error::Codec(CodecError::Decode { path: None, .. })));
    }

    #[test]
    fn test_pretty_output() {
        let codec = JsonCodec::new().register::<Record>().pretty(true);
        let bytes = codec
            .encode(&Value::new(Record {
                id: 1,
                value: "x".to_string(),
            }))
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains('\n'));
        assert!(text.contains("  \"id\": 1"));
    }
}
