use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FieldErrors;
use crate::identity::RecordId;

/// Where a resource exposes its active-flag toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRoute {
    /// `PATCH /api/<resource>/toggle/:id`
    Prefix,
    /// `PATCH /api/<resource>/:id/toggle`
    Suffix,
}

/// A comparable projection of one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    /// Compared case-insensitively.
    Text(String),
    Number(f64),
    /// `None` (missing or unparseable) sorts as the earliest instant.
    Date(Option<DateTime<Utc>>),
    Flag(bool),
}

/// A manageable record type backed by one REST collection.
///
/// Implementors describe their field quirks here; the generic controller and
/// query code never look at raw field names.
pub trait Resource:
    Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Collection segment under `/api/`.
    const NAME: &'static str;

    const TOGGLE_ROUTE: ToggleRoute = ToggleRoute::Prefix;

    /// The create/update form payload.
    type Draft: Serialize + Debug + Send + Sync;

    fn id(&self) -> &RecordId;

    /// Required-field checks run before any network call.
    fn validate(draft: &Self::Draft) -> Result<(), FieldErrors>;

    /// Fill absent optional fields. Must only touch missing or blank values so
    /// that normalization stays idempotent.
    fn apply_defaults(_fields: &mut Map<String, Value>) {}

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn set_updated_at(&mut self, at: Option<DateTime<Utc>>);

    /// Fields matched by free-text search.
    fn search_text(&self) -> Vec<&str>;

    /// Value matched by the category selector.
    fn category(&self) -> Option<&str> {
        None
    }

    /// Value matched by the date-range selector.
    fn primary_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Projection used by `sort`. `None` for unknown keys.
    fn sort_value(&self, key: &str) -> Option<SortValue>;

    /// Title used in confirmation prompts and share payloads.
    fn display_name(&self) -> &str;

    /// Canned raw records shown when the API is unreachable, if the resource
    /// has any.
    fn offline_fallback() -> Option<Vec<Value>> {
        None
    }
}

/// Put `value` into `fields[key]` when the key is absent, null or blank.
pub fn default_field(fields: &mut Map<String, Value>, key: &str, value: &str) {
    let blank = match fields.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if blank {
        fields.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Sort projections shared by every resource.
pub fn common_sort_value<R: Resource>(record: &R, key: &str) -> Option<SortValue> {
    match key {
        "id" => Some(SortValue::Text(record.id().to_string())),
        "isActive" | "active" => Some(SortValue::Flag(record.is_active())),
        "updatedAt" => Some(SortValue::Date(record.updated_at())),
        "name" | "title" => Some(SortValue::Text(record.display_name().to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_field_only_fills_blanks() {
        let mut fields = json!({"a": "", "b": null, "c": "kept", "d": 3})
            .as_object()
            .cloned()
            .unwrap();
        for key in ["a", "b", "c", "d", "e"] {
            default_field(&mut fields, key, "placeholder");
        }
        assert_eq!(fields["a"], "placeholder");
        assert_eq!(fields["b"], "placeholder");
        assert_eq!(fields["c"], "kept");
        assert_eq!(fields["d"], 3);
        assert_eq!(fields["e"], "placeholder");
    }
}
