//! CBOR (RFC 8949) ⇄ JSON conversion.
//!
//! Decoding goes through [`ciborium::Value`] and then into
//! [`serde_json::Value`], rejecting anything JSON cannot represent. Encoding
//! walks a JSON value and emits definite-length CBOR.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use ciborium::value::{Integer, Value as Cbor};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as Json};
use thiserror::Error;

/// CBOR tag 1: epoch-based date/time.
const TAG_EPOCH: u64 = 1;

/// Same nesting ceiling ciborium applies while decoding.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum CborError {
    #[error("{0}")]
    Decode(String),

    #[error("trailing data after CBOR item ({0} bytes)")]
    TrailingData(usize),

    #[error("{0} has no JSON representation")]
    NotJson(&'static str),

    #[error("unsupported map key type: {0}")]
    MapKey(&'static str),

    #[error("CBOR encoding failed: {0}")]
    Encode(String),
}

/// Decodes one CBOR item and converts it to JSON.
pub fn decode_to_json(bytes: &[u8]) -> Result<Json, CborError> {
    // ciborium folds `undefined` into null, so look for it up front.
    scan_simple_values(bytes)?;
    let mut rest = bytes;
    let value: Cbor =
        ciborium::de::from_reader(&mut rest).map_err(|e| CborError::Decode(e.to_string()))?;
    if !rest.is_empty() {
        return Err(CborError::TrailingData(rest.len()));
    }
    cbor_to_json(value)
}

/// Converts a decoded CBOR value into JSON.
pub fn cbor_to_json(value: Cbor) -> Result<Json, CborError> {
    Ok(match value {
        Cbor::Null => Json::Null,
        Cbor::Bool(b) => Json::Bool(b),
        Cbor::Text(s) => Json::String(s),
        Cbor::Integer(i) => integer_to_json(i)?,
        Cbor::Float(f) => Number::from_f64(f).map(Json::Number).ok_or(CborError::NotJson("non-finite float"))?,
        Cbor::Array(items) => Json::Array(items.into_iter().map(cbor_to_json).collect::<Result<_, _>>()?),
        Cbor::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(map_key(k)?, cbor_to_json(v)?);
            }
            Json::Object(map)
        }
        Cbor::Bytes(_) => return Err(CborError::NotJson("byte string")),
        Cbor::Tag(_, _) => return Err(CborError::NotJson("tagged value")),
        _ => return Err(CborError::NotJson("value")),
    })
}

fn integer_to_json(i: Integer) -> Result<Json, CborError> {
    let wide = i128::from(i);
    if let Ok(n) = i64::try_from(wide) {
        Ok(Json::from(n))
    } else if let Ok(n) = u64::try_from(wide) {
        Ok(Json::from(n))
    } else {
        Err(CborError::NotJson("integer outside 64-bit range"))
    }
}

/// JSON object keys must be strings. Scalar keys are stringified the way a
/// JSON encoder would write them; container and byte keys are refused.
fn map_key(key: Cbor) -> Result<String, CborError> {
    match key {
        Cbor::Text(s) => Ok(s),
        Cbor::Integer(i) => Ok(i128::from(i).to_string()),
        Cbor::Float(f) if f.is_finite() => Ok(Number::from_f64(f).map(|n| n.to_string()).unwrap_or_default()),
        Cbor::Bool(b) => Ok(b.to_string()),
        Cbor::Null => Ok("null".to_owned()),
        Cbor::Bytes(_) => Err(CborError::MapKey("byte string")),
        Cbor::Array(_) => Err(CborError::MapKey("array")),
        Cbor::Map(_) => Err(CborError::MapKey("map")),
        Cbor::Tag(_, _) => Err(CborError::MapKey("tagged value")),
        _ => Err(CborError::MapKey("value")),
    }
}

/// Converts JSON into CBOR, preferring integers where the number allows it.
pub fn json_to_cbor(value: &Json) -> Cbor {
    match value {
        Json::Null => Cbor::Null,
        Json::Bool(b) => Cbor::Bool(*b),
        Json::String(s) => Cbor::Text(s.clone()),
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                Cbor::Integer(Integer::from(u))
            } else if let Some(i) = n.as_i64() {
                Cbor::Integer(Integer::from(i))
            } else {
                Cbor::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::Array(items) => Cbor::Array(items.iter().map(json_to_cbor).collect()),
        Json::Object(map) => Cbor::Map(
            map.iter()
                .map(|(k, v)| (Cbor::Text(k.clone()), json_to_cbor(v)))
                .collect(),
        ),
    }
}

/// Encodes a JSON value as CBOR bytes.
pub fn encode_json(value: &Json) -> Result<Vec<u8>, CborError> {
    to_vec(&json_to_cbor(value))
}

/// Serializes any `T` straight to CBOR.
///
/// Fields of type [`UtcTimestamp`] come out as tag-1 epoch timestamps.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CborError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| CborError::Encode(e.to_string()))?;
    Ok(out)
}

// ── Simple-value scan ─────────────────────────────────────────────────────────

/// Walks the first CBOR item looking for simple values other than
/// `false`/`true`/`null`.
///
/// Structural errors are left to the decoder: running off the end of the
/// input simply stops the scan.
fn scan_simple_values(bytes: &[u8]) -> Result<(), CborError> {
    let mut pos = 0;
    scan_item(bytes, &mut pos, 0)
}

fn scan_item(bytes: &[u8], pos: &mut usize, depth: usize) -> Result<(), CborError> {
    if depth > MAX_DEPTH {
        return Err(CborError::Decode("nesting too deep".to_owned()));
    }
    let Some(&initial) = bytes.get(*pos) else { return Ok(()) };
    *pos += 1;
    let major = initial >> 5;
    let info = initial & 0x1f;

    if major == 7 {
        return match info {
            20..=22 => Ok(()),
            23 => Err(CborError::NotJson("undefined")),
            25 => skip(pos, 2),
            26 => skip(pos, 4),
            27 => skip(pos, 8),
            31 => Err(CborError::NotJson("break marker")),
            _ => Err(CborError::NotJson("simple value")),
        };
    }

    let indefinite = info == 31;
    let arg = if indefinite { 0 } else { argument(bytes, pos, info) };

    match major {
        0 | 1 => Ok(()),
        2 | 3 => {
            if indefinite {
                while bytes.get(*pos).is_some_and(|&b| b != 0xff) {
                    scan_item(bytes, pos, depth + 1)?;
                }
                skip(pos, 1)
            } else {
                skip(pos, usize::try_from(arg).unwrap_or(usize::MAX))
            }
        }
        4 | 5 => {
            let per_entry = if major == 5 { 2 } else { 1 };
            if indefinite {
                while bytes.get(*pos).is_some_and(|&b| b != 0xff) {
                    for _ in 0..per_entry {
                        scan_item(bytes, pos, depth + 1)?;
                    }
                }
                skip(pos, 1)
            } else {
                for _ in 0..arg.saturating_mul(per_entry) {
                    if *pos >= bytes.len() {
                        break;
                    }
                    scan_item(bytes, pos, depth + 1)?;
                }
                Ok(())
            }
        }
        _ => scan_item(bytes, pos, depth + 1),
    }
}

fn argument(bytes: &[u8], pos: &mut usize, info: u8) -> u64 {
    let width = match info {
        0..=23 => return u64::from(info),
        24 => 1,
        25 => 2,
        26 => 4,
        _ => 8,
    };
    let start = *pos;
    *pos = pos.saturating_add(width);
    bytes
        .get(start..start.saturating_add(width))
        .map(|raw| raw.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
        .unwrap_or(0)
}

fn skip(pos: &mut usize, n: usize) -> Result<(), CborError> {
    *pos = pos.saturating_add(n);
    Ok(())
}

// ── UtcTimestamp ──────────────────────────────────────────────────────────────

/// A UTC instant that serializes per format.
///
/// Human-readable formats (JSON) get RFC 3339 with millisecond precision and
/// a `Z` suffix, e.g. `2024-01-15T10:30:00.000Z`. Binary formats (CBOR) get a
/// tag-1 epoch timestamp: an integer when there is no sub-second part, a
/// float otherwise.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct UtcTimestamp(pub DateTime<Utc>);

impl From<DateTime<Utc>> for UtcTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for UtcTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return serializer.collect_str(self);
        }
        if self.0.nanosecond() == 0 {
            ciborium::tag::Required::<i64, TAG_EPOCH>(self.0.timestamp()).serialize(serializer)
        } else {
            let secs = self.0.timestamp_micros() as f64 / 1_000_000.0;
            ciborium::tag::Required::<f64, TAG_EPOCH>(secs).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for UtcTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = UtcTimestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an RFC 3339 timestamp or epoch seconds")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                DateTime::parse_from_rfc3339(v)
                    .map(|dt| UtcTimestamp(dt.with_timezone(&Utc)))
                    .map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                DateTime::from_timestamp(v, 0)
                    .map(UtcTimestamp)
                    .ok_or_else(|| E::custom("timestamp out of range"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                let v = i64::try_from(v).map_err(E::custom)?;
                self.visit_i64(v)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                DateTime::from_timestamp_micros((v * 1_000_000.0).round() as i64)
                    .map(UtcTimestamp)
                    .ok_or_else(|| E::custom("timestamp out of range"))
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}
