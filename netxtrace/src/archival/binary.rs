//! Binary-safe values.
//!
//! Valid UTF-8 is written as a plain JSON string. Anything else is written
//! as `{"format":"base64","data":"<base64>"}`. Decoding accepts both.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const FORMAT_KEY: &str = "format";
const DATA_KEY: &str = "data";
const BASE64_FORMAT: &str = "base64";

#[derive(Debug, thiserror::Error)]
pub enum BinaryValueError {
    #[error("missing or invalid format field")]
    InvalidFormat,
    #[error("missing data field")]
    MissingData,
    #[error("the data field is not a string")]
    DataNotString,
    #[error("invalid base64 data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("unexpected pair length")]
    PairLength,
    #[error("the key is not a string")]
    KeyNotString,
}

/// A byte string that may or may not be valid UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaybeBinaryValue(pub Bytes);

impl MaybeBinaryValue {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for MaybeBinaryValue {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

impl From<&str> for MaybeBinaryValue {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl Serialize for MaybeBinaryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(&self.0) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => Base64Object {
                format: BASE64_FORMAT,
                data: STANDARD.encode(&self.0),
            }
            .serialize(serializer),
        }
    }
}

#[derive(Serialize)]
struct Base64Object {
    format: &'static str,
    data: String,
}

impl<'de> Deserialize<'de> for MaybeBinaryValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MaybeBinaryVisitor)
    }
}

struct MaybeBinaryVisitor;

impl<'de> Visitor<'de> for MaybeBinaryVisitor {
    type Value = MaybeBinaryValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or a base64 object")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(MaybeBinaryValue::from(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(MaybeBinaryValue(Bytes::from(value)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut format = None;
        let mut data = None;
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            match key.as_str() {
                FORMAT_KEY => format = Some(value),
                DATA_KEY => data = Some(value),
                _ => {}
            }
        }
        decode_base64_object(format, data)
            .map(MaybeBinaryValue)
            .map_err(de::Error::custom)
    }
}

fn decode_base64_object(
    format: Option<Value>,
    data: Option<Value>,
) -> Result<Bytes, BinaryValueError> {
    if format.as_ref().and_then(Value::as_str) != Some(BASE64_FORMAT) {
        return Err(BinaryValueError::InvalidFormat);
    }
    let data = data.ok_or(BinaryValueError::MissingData)?;
    let data = data.as_str().ok_or(BinaryValueError::DataNotString)?;
    Ok(Bytes::from(STANDARD.decode(data)?))
}

/// One header as a `[key, value]` pair; the value is binary-safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader {
    pub key: String,
    pub value: MaybeBinaryValue,
}

impl Serialize for HttpHeader {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.key)?;
        pair.serialize_element(&self.value)?;
        pair.end()
    }
}

impl<'de> Deserialize<'de> for HttpHeader {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(HttpHeaderVisitor)
    }
}

struct HttpHeaderVisitor;

impl<'de> Visitor<'de> for HttpHeaderVisitor {
    type Value = HttpHeader;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a [key, value] pair")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let key = seq
            .next_element::<Value>()?
            .ok_or_else(|| de::Error::custom(BinaryValueError::PairLength))?;
        let Value::String(key) = key else {
            return Err(de::Error::custom(BinaryValueError::KeyNotString));
        };
        let value = seq
            .next_element::<MaybeBinaryValue>()?
            .ok_or_else(|| de::Error::custom(BinaryValueError::PairLength))?;
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::custom(BinaryValueError::PairLength));
        }
        Ok(HttpHeader { key, value })
    }
}
