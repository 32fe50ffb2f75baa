use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_date, lenient_datetime};
use crate::error::FieldErrors;
use crate::identity::RecordId;
use crate::resource::{common_sort_value, Resource, SortValue, ToggleRoute};

/// A photo in the public gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: RecordId,
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItemDraft {
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl Resource for GalleryItem {
    const NAME: &'static str = "gallery";
    const TOGGLE_ROUTE: ToggleRoute = ToggleRoute::Suffix;

    type Draft = GalleryItemDraft;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(draft: &GalleryItemDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", &draft.title);
        errors.require("imageUrl", &draft.image_url);
        check_date(&mut errors, "takenAt", draft.taken_at.as_deref());
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
        vec![self.title.as_str(), self.caption.as_str(), self.album.as_str()]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.album)
    }

    fn primary_date(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "album" => Some(SortValue::Text(self.album.clone())),
            "takenAt" | "date" => Some(SortValue::Date(self.taken_at)),
            "createdAt" => Some(SortValue::Date(self.created_at)),
            _ => common_sort_value(self, key),
        }
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}
