use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{lenient_datetime, Address};
use crate::error::FieldErrors;
use crate::identity::RecordId;
use crate::resource::{common_sort_value, Resource, SortValue};

const KINDS: &[&str] = &["phone", "email", "address", "hours", "other"];

/// One entry on the contact page (a phone line, a mailbox, office hours...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub id: RecordId,
    /// One of `phone`, `email`, `address`, `hours`, `other`.
    pub kind: String,
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfoDraft {
    pub kind: String,
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_active: bool,
}

impl Resource for ContactInfo {
    const NAME: &'static str = "contact-info";

    type Draft = ContactInfoDraft;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(draft: &ContactInfoDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("kind", &draft.kind);
        errors.require("label", &draft.label);
        errors.require("value", &draft.value);

        let kind = draft.kind.trim().to_lowercase();
        if !kind.is_empty() && !KINDS.contains(&kind.as_str()) {
            errors.add("kind", format!("kind must be one of {}", KINDS.join(", ")));
        }
        if kind == "email" && !draft.value.trim().is_empty() && !draft.value.contains('@') {
            errors.add("value", "value must be an email address");
        }
        errors.into_result()
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
        let mut fields = vec![self.label.as_str(), self.value.as_str()];
        if let Some(address) = &self.address {
            fields.push(&address.street);
            fields.push(&address.city);
        }
        fields
    }

    fn category(&self) -> Option<&str> {
        Some(&self.kind)
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "kind" => Some(SortValue::Text(self.kind.clone())),
            "label" => Some(SortValue::Text(self.label.clone())),
            "displayOrder" | "order" => Some(SortValue::Number(self.display_order as f64)),
            _ => common_sort_value(self, key),
        }
    }

    fn display_name(&self) -> &str {
        &self.label
    }
}
