//! Opaque pagination cursor.
//!
//! A cursor encodes "everything strictly before this point" in feed
//! ordering, where the ordering key is a creation timestamp in unix
//! milliseconds. The encoding is base64 of the decimal millis string:
//! reversible and stable for a given timestamp.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed cursor")]
pub struct MalformedCursor;

/// Feed ordering key for a timestamp.
pub fn unix_millis(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_unix_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000).ok()
}

pub fn encode(millis: i64) -> String {
    STANDARD.encode(millis.to_string())
}

pub fn decode(cursor: &str) -> Result<i64, MalformedCursor> {
    let bytes = STANDARD.decode(cursor.as_bytes()).map_err(|_| MalformedCursor)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| MalformedCursor)?;
    text.parse::<i64>().map_err(|_| MalformedCursor)
}
