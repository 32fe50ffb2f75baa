//! The normalization boundary.
//!
//! Backend collections disagree on how records are keyed: some use `id`,
//! others the document-store `_id` (sometimes as extended JSON
//! `{"$oid": "..."}`). Everything past this module sees a single canonical
//! `id` string.

use std::fmt;

use bson::oid::ObjectId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ControllerError;
use crate::resource::Resource;

/// Canonical identity of a manageable record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Build an identity, rejecting blank values.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("record has no usable `id` or `_id`")]
    MissingIdentity,

    #[error("invalid ObjectId `{0}`")]
    InvalidObjectId(String),
}

impl From<NormalizeError> for ControllerError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MissingIdentity | NormalizeError::InvalidObjectId(_) => {
                ControllerError::MissingIdentity(err.to_string())
            }
            NormalizeError::NotAnObject(_) => ControllerError::Decode(err.to_string()),
        }
    }
}

/// Normalize a raw record for resource `R` and decode it.
pub fn decode_record<R: Resource>(raw: Value) -> Result<R, ControllerError> {
    let fields = normalize_record::<R>(raw)?;
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ControllerError::Decode(format!("{} record: {e}", R::NAME)))
}

/// Normalize a raw record: canonical identity, derived active flag, flattened
/// extended-JSON dates, then the resource's own defaults.
///
/// Idempotent: normalizing an already-normalized record returns it unchanged.
pub fn normalize_record<R: Resource>(raw: Value) -> Result<Map<String, Value>, NormalizeError> {
    let mut fields = normalize_fields(raw)?;
    R::apply_defaults(&mut fields);
    Ok(fields)
}

/// The resource-independent part of [`normalize_record`].
pub fn normalize_fields(raw: Value) -> Result<Map<String, Value>, NormalizeError> {
    let mut fields = match raw {
        Value::Object(map) => map,
        other => return Err(NormalizeError::NotAnObject(json_kind(&other))),
    };

    let id = resolve_identity(&fields)?;
    fields.remove("_id");
    strip_nulls(&mut fields);
    fields.insert("id".to_string(), Value::String(id.0));

    if let Some(flag) = fields.remove("is_active") {
        fields.entry("isActive").or_insert(flag);
    }
    if !fields.contains_key("isActive") {
        if let Some(status) = fields.get("status").and_then(Value::as_str) {
            let active = status.eq_ignore_ascii_case("active");
            fields.insert("isActive".to_string(), Value::Bool(active));
        }
    }

    for value in fields.values_mut() {
        if let Some(flat) = flatten_extended_date(value) {
            *value = Value::String(flat);
        }
    }

    Ok(fields)
}

/// Prefer `id`, fall back to `_id`.
fn resolve_identity(fields: &Map<String, Value>) -> Result<RecordId, NormalizeError> {
    if let Some(id) = fields.get("id").map(scalar_identity).transpose()?.flatten() {
        return Ok(id);
    }
    fields
        .get("_id")
        .map(scalar_identity)
        .transpose()?
        .flatten()
        .ok_or(NormalizeError::MissingIdentity)
}

fn scalar_identity(value: &Value) -> Result<Option<RecordId>, NormalizeError> {
    match value {
        Value::String(s) => Ok(RecordId::parse(s)),
        Value::Number(n) => Ok(RecordId::parse(&n.to_string())),
        Value::Object(map) => match map.get("$oid").and_then(Value::as_str) {
            Some(hex) => ObjectId::parse_str(hex)
                .map(|oid| Some(RecordId(oid.to_hex())))
                .map_err(|_| NormalizeError::InvalidObjectId(hex.to_string())),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

/// Drop `null` members so they read as absent and pick up field defaults.
/// Nested objects are cleaned too.
fn strip_nulls(fields: &mut Map<String, Value>) {
    fields.retain(|_, value| !value.is_null());
    for value in fields.values_mut() {
        match value {
            Value::Object(nested) => strip_nulls(nested),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(nested) = item {
                        strip_nulls(nested);
                    }
                }
            }
            _ => {}
        }
    }
}

/// `{"$date": "..."}`, `{"$date": 1700000000000}` or
/// `{"$date": {"$numberLong": "..."}}` to an RFC 3339 string.
fn flatten_extended_date(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    match map.get("$date")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => millis_to_rfc3339(n.as_i64()?),
        Value::Object(inner) => {
            let millis = inner.get("$numberLong")?.as_str()?.parse().ok()?;
            millis_to_rfc3339(millis)
        }
        _ => None,
    }
}

fn millis_to_rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
