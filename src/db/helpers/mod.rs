use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;

use crate::models::{Case, Provenance, Side, TIMESTAMP_FORMAT};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} value {value} out of range"))
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str, field: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_side(value: &str) -> Result<Side> {
    Side::parse(value).ok_or_else(|| anyhow!("unknown trade side {value}"))
}

pub fn parse_case(value: &str) -> Result<Case> {
    Case::parse(value).ok_or_else(|| anyhow!("unknown trade case {value}"))
}

pub fn parse_provenance(value: &str) -> Result<Provenance> {
    Provenance::parse(value).ok_or_else(|| anyhow!("unknown provenance {value}"))
}

/// Wrap a decoding failure so it can surface from a rusqlite row mapper.
pub fn conversion_error(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        )),
    )
}
