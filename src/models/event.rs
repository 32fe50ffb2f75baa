use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_date, lenient_datetime, Address, PLACEHOLDER_IMAGE};
use crate::error::FieldErrors;
use crate::identity::RecordId;
use crate::resource::{common_sort_value, default_field, Resource, SortValue, ToggleRoute};

/// A public event (fundraiser, workshop, drive) with optional registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// When the event starts.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<Address>,
    #[serde(default)]
    pub image_url: String,
    /// Maximum number of registrations, if limited.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Registrations received so far.
    #[serde(default)]
    pub attendees: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    /// As entered in the form (`2024-06-01` or `2024-06-01T18:30`).
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Address>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub is_active: bool,
}

impl Event {
    /// Seats left, when capacity is limited.
    pub fn remaining_seats(&self) -> Option<u32> {
        self.capacity.map(|cap| cap.saturating_sub(self.attendees))
    }
}

impl Resource for Event {
    const NAME: &'static str = "events";
    const TOGGLE_ROUTE: ToggleRoute = ToggleRoute::Suffix;

    type Draft = EventDraft;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(draft: &EventDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", &draft.title);
        errors.require("category", &draft.category);
        errors.require("date", &draft.date);
        check_date(&mut errors, "date", Some(&draft.date));
        if draft.capacity == Some(0) {
            errors.add("capacity", "capacity must be at least 1");
        }
        errors.into_result()
    }

    fn apply_defaults(fields: &mut Map<String, Value>) {
        default_field(fields, "imageUrl", PLACEHOLDER_IMAGE);
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
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        if let Some(location) = &self.location {
            fields.push(&location.venue);
            fields.push(&location.city);
        }
        fields
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn primary_date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "date" => Some(SortValue::Date(self.date)),
            "category" => Some(SortValue::Text(self.category.clone())),
            "attendees" => Some(SortValue::Number(self.attendees as f64)),
            "capacity" => Some(SortValue::Number(self.capacity.unwrap_or(0) as f64)),
            "createdAt" => Some(SortValue::Date(self.created_at)),
            "city" => Some(SortValue::Text(
                self.location.as_ref().map(|l| l.city.clone()).unwrap_or_default(),
            )),
            _ => common_sort_value(self, key),
        }
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::decode_record;
    use serde_json::json;

    #[test]
    fn test_decode_with_mongo_identity_and_placeholder() {
        let event: Event = decode_record(json!({
            "_id": {"$oid": "65a1b2c3d4e5f60718293a4b"},
            "title": "Winter Coat Drive",
            "category": "Drive",
            "date": "2024-12-01",
            "status": "active",
            "location": {"venue": "Community Hall", "city": "Leeds"},
            "createdAt": {"$date": "2024-10-01T09:00:00Z"}
        }))
        .unwrap();

        assert_eq!(event.id.as_str(), "65a1b2c3d4e5f60718293a4b");
        assert!(event.is_active);
        assert_eq!(event.image_url, PLACEHOLDER_IMAGE);
        assert_eq!(event.date, "2024-12-01T00:00:00Z".parse().ok());
        assert_eq!(event.location.unwrap().city, "Leeds");
        assert!(event.created_at.is_some());
    }

    #[test]
    fn test_invalid_date_decodes_as_missing() {
        let event: Event = decode_record(json!({
            "id": "e1",
            "title": "TBD",
            "date": "sometime in spring"
        }))
        .unwrap();
        assert_eq!(event.date, None);
        assert_eq!(event.sort_value("date"), Some(SortValue::Date(None)));
    }

    #[test]
    fn test_validate_required_fields() {
        let errors = Event::validate(&EventDraft::default()).unwrap_err();
        assert!(errors.contains("title"));
        assert!(errors.contains("category"));
        assert!(errors.contains("date"));

        let draft = EventDraft {
            title: "Book Fair".into(),
            category: "Fundraiser".into(),
            date: "2024-13-45".into(),
            ..Default::default()
        };
        let errors = Event::validate(&draft).unwrap_err();
        assert_eq!(errors.get("date"), Some("date is not a valid date"));
    }

    #[test]
    fn test_draft_serializes_camel_case() {
        let draft = EventDraft {
            title: "Book Fair".into(),
            category: "Fundraiser".into(),
            date: "2024-05-04".into(),
            image_url: "https://cdn.example.org/fair.jpg".into(),
            is_active: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["imageUrl"], "https://cdn.example.org/fair.jpg");
        assert_eq!(value["isActive"], true);
        assert!(value.get("capacity").is_none());
    }

    #[test]
    fn test_remaining_seats() {
        let mut event: Event =
            decode_record(json!({"id": "e1", "title": "Gala", "capacity": 10, "attendees": 12}))
                .unwrap();
        assert_eq!(event.remaining_seats(), Some(0));
        event.capacity = None;
        assert_eq!(event.remaining_seats(), None);
    }
}
