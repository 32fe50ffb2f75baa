use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_date, check_http_url, lenient_datetime, PLACEHOLDER_IMAGE};
use crate::error::FieldErrors;
use crate::identity::RecordId;
use crate::resource::{common_sort_value, default_field, Resource, SortValue};

/// A funder or partner organization shown on the "trusted by" strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustPartner {
    pub id: RecordId,
    pub name: String,
    /// Sponsorship tier, e.g. `gold`.
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub description: String,
    /// Start of the partnership.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustPartnerDraft {
    pub name: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub website: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl Resource for TrustPartner {
    const NAME: &'static str = "trust-partners";

    type Draft = TrustPartnerDraft;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(draft: &TrustPartnerDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", &draft.name);
        check_http_url(&mut errors, "website", &draft.website);
        check_date(&mut errors, "since", draft.since.as_deref());
        errors.into_result()
    }

    fn apply_defaults(fields: &mut Map<String, Value>) {
        default_field(fields, "logoUrl", PLACEHOLDER_IMAGE);
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: Option<DateTime<Utc>>) {
        self.updated_at = at;
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str(), self.website.as_str()]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.tier)
    }

    fn primary_date(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "tier" => Some(SortValue::Text(self.tier.clone())),
            "since" | "date" => Some(SortValue::Date(self.since)),
            "createdAt" => Some(SortValue::Date(self.created_at)),
            _ => common_sort_value(self, key),
        }
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::decode_record;
    use serde_json::json;

    #[test]
    fn test_blank_logo_gets_placeholder() {
        let partner: TrustPartner =
            decode_record(json!({"_id": "p1", "name": "Northern Trust Fund", "logoUrl": " "}))
                .unwrap();
        assert_eq!(partner.logo_url, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_name_required() {
        let errors = TrustPartner::validate(&TrustPartnerDraft::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("name"));
    }
}
