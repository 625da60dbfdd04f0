//! Lenient decoding of stored scalar fields.
//!
//! Records written by older builds carry numbers, booleans and timestamps as
//! strings. These helpers accept either form and turn anything unreadable
//! into `None` (or a decode error for required fields), so a single bad
//! record degrades to "absent" instead of a partially trusted value.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

fn scalar_to_i64(value: Scalar) -> Option<i64> {
    match value {
        Scalar::Int(n) => Some(n),
        Scalar::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Scalar::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn scalar_to_bool(value: Scalar) -> Option<bool> {
    match value {
        Scalar::Bool(b) => Some(b),
        Scalar::Int(0) => Some(false),
        Scalar::Int(1) => Some(true),
        Scalar::Str(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn scalar_to_ts(value: Scalar) -> Option<DateTime<Utc>> {
    match value {
        Scalar::Str(s) if s.trim().is_empty() => None,
        Scalar::Str(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Scalar::Int(ms) => Utc.timestamp_millis_opt(ms).single(),
        _ => None,
    }
}

/// Optional integer, native or string-encoded.
pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.and_then(scalar_to_i64))
}

/// Optional boolean, native or string-encoded.
pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.and_then(scalar_to_bool))
}

/// Optional boolean that rejects unreadable values instead of dropping them.
pub fn opt_bool_checked<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    match Option::<Scalar>::deserialize(d)? {
        None => Ok(None),
        Some(value) => scalar_to_bool(value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a boolean")),
    }
}

/// Optional timestamp: RFC 3339 text or epoch milliseconds. Empty text is `None`.
pub fn opt_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.and_then(scalar_to_ts))
}

/// Required non-negative integer.
pub fn u64_required<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = Scalar::deserialize(d)?;
    scalar_to_i64(value)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| D::Error::custom("expected a non-negative integer"))
}

/// Boolean that falls back to `false` when missing or unreadable.
pub fn bool_or_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(opt_bool(d)?.unwrap_or(false))
}
