//! Resource adapters for the site's managed collections.

pub mod contact_info;
pub mod event;
pub mod gallery;
pub mod social_link;
pub mod study_material;
pub mod trust_partner;
pub mod volunteer_role;

pub use contact_info::{ContactInfo, ContactInfoDraft};
pub use event::{Event, EventDraft};
pub use gallery::{GalleryItem, GalleryItemDraft};
pub use social_link::{SocialLink, SocialLinkDraft};
pub use study_material::{StudyMaterial, StudyMaterialDraft};
pub use trust_partner::{TrustPartner, TrustPartnerDraft};
pub use volunteer_role::{VolunteerRole, VolunteerRoleDraft};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FieldErrors;

/// Shown when a record has no image of its own.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.svg";

/// A nested postal address, as stored on events and contact entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// Parse the date formats the admin forms and the backend produce.
///
/// Accepts RFC 3339, `datetime-local` input values (`2024-06-01T18:30`) and
/// bare dates (`2024-06-01`, midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Deserialize a timestamp leniently: unparseable values become `None`
/// instead of failing the whole record.
pub(crate) fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_datetime(&s),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

/// Require an absolute `http`/`https` URL.
pub(crate) fn require_http_url(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.require(field, value);
        return;
    }
    check_http_url(errors, field, value);
}

/// Validate an optional URL only when one was entered.
pub(crate) fn check_http_url(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        return;
    }
    match url::Url::parse(value.trim()) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => errors.add(field, format!("{field} must be an http(s) URL")),
    }
}

/// Validate an optional date only when one was entered.
pub(crate) fn check_date(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
    if let Some(raw) = value.filter(|s| !s.trim().is_empty()) {
        if parse_datetime(raw).is_none() {
            errors.add(field, format!("{field} is not a valid date"));
        }
    }
}
