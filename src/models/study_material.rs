use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_date, check_http_url, lenient_datetime, PLACEHOLDER_IMAGE};
use crate::error::FieldErrors;
use crate::identity::RecordId;
use crate::resource::{common_sort_value, default_field, Resource, SortValue, ToggleRoute};

/// A downloadable study resource (worksheet, guide, recording).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterial {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterialDraft {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    pub file_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl Resource for StudyMaterial {
    const NAME: &'static str = "study-materials";
    const TOGGLE_ROUTE: ToggleRoute = ToggleRoute::Suffix;

    type Draft = StudyMaterialDraft;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(draft: &StudyMaterialDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", &draft.title);
        errors.require("category", &draft.category);
        errors.require("fileUrl", &draft.file_url);
        // Uploads come back as site-relative paths, so only absolute URLs are checked.
        if draft.file_url.contains("://") {
            check_http_url(&mut errors, "fileUrl", &draft.file_url);
        }
        check_date(&mut errors, "publishedAt", draft.published_at.as_deref());
        errors.into_result()
    }

    fn apply_defaults(fields: &mut Map<String, Value>) {
        default_field(fields, "thumbnailUrl", PLACEHOLDER_IMAGE);
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
        vec![self.title.as_str(), self.description.as_str(), self.author.as_str()]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn primary_date(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "category" => Some(SortValue::Text(self.category.clone())),
            "author" => Some(SortValue::Text(self.author.clone())),
            "downloads" => Some(SortValue::Number(self.downloads as f64)),
            "publishedAt" | "date" => Some(SortValue::Date(self.published_at)),
            "createdAt" => Some(SortValue::Date(self.created_at)),
            _ => common_sort_value(self, key),
        }
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}
