use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient_datetime, require_http_url};
use crate::error::FieldErrors;
use crate::identity::RecordId;
use crate::resource::{common_sort_value, Resource, SortValue};

/// A link to one of the organization's social profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub id: RecordId,
    /// Platform name, e.g. `Instagram`.
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub handle: String,
    /// Position in the footer, lowest first.
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
pub struct SocialLinkDraft {
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_active: bool,
}

impl Resource for SocialLink {
    const NAME: &'static str = "social-links";

    type Draft = SocialLinkDraft;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(draft: &SocialLinkDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("platform", &draft.platform);
        require_http_url(&mut errors, "url", &draft.url);
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
        vec![self.platform.as_str(), self.handle.as_str(), self.url.as_str()]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.platform)
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "platform" => Some(SortValue::Text(self.platform.clone())),
            "displayOrder" | "order" => Some(SortValue::Number(self.display_order as f64)),
            _ => common_sort_value(self, key),
        }
    }

    fn display_name(&self) -> &str {
        &self.platform
    }

    fn offline_fallback() -> Option<Vec<Value>> {
        Some(crate::offline::social_links())
    }
}
