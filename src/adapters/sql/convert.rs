//! Column text to domain value conversions.

use crate::ports::{PersistenceError, PersistenceResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a stored instant.
///
/// Accepts RFC 3339, PostgreSQL's `timestamptz` text form, and naive
/// date-times written by older stores, which are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> PersistenceResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(trimmed, format).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .map(|naive| naive.and_utc())
        })
        .ok_or_else(|| PersistenceError::InvalidData(format!("unreadable timestamp '{raw}'")))
}

pub(crate) fn parse_optional_timestamp(raw: Option<String>) -> PersistenceResult<Option<DateTime<Utc>>> {
    raw.filter(|text| !text.trim().is_empty())
        .map(|text| parse_timestamp(&text))
        .transpose()
}

/// Missing creation stamps on legacy rows read as the Unix epoch.
pub(crate) fn timestamp_or_epoch(raw: Option<String>) -> PersistenceResult<DateTime<Utc>> {
    Ok(parse_optional_timestamp(raw)?.unwrap_or(DateTime::UNIX_EPOCH))
}

pub(crate) fn encode_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(Value::from(tags.to_vec()).to_string())
    }
}

/// Reads tags stored as a JSON array or as comma-separated text.
pub(crate) fn decode_tags(raw: Option<String>) -> Vec<String> {
    let Some(text) = raw.filter(|value| !value.trim().is_empty()) else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<String>>(&text).map_or_else(
        |_| crate::domain::normalize_tags(text.split(',')),
        crate::domain::normalize_tags,
    )
}

pub(crate) fn encode_list(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

pub(crate) fn decode_list(raw: Option<String>) -> Vec<String> {
    raw.map(|text| crate::domain::normalize_tags(text.split(',')))
        .unwrap_or_default()
}

/// Reads a metadata column; anything but a JSON object reads as empty.
pub(crate) fn decode_metadata(raw: Option<String>) -> Map<String, Value> {
    match raw.as_deref().map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => map,
        _ => Map::new(),
    }
}

pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub(crate) fn opt_count(value: Option<i64>) -> Option<u64> {
    value.and_then(|number| u64::try_from(number).ok())
}

pub(crate) fn to_column(value: u64) -> PersistenceResult<i64> {
    i64::try_from(value).map_err(|_| PersistenceError::InvalidData(format!("value {value} exceeds the column range")))
}

pub(crate) fn opt_column(value: Option<u64>) -> PersistenceResult<Option<i64>> {
    value.map(to_column).transpose()
}

/// Maps a domain parse failure on a stored value to [`PersistenceError::InvalidData`].
pub(crate) fn invalid(err: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::InvalidData(err.to_string())
}
