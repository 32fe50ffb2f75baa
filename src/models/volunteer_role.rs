use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_date, lenient_datetime};
use crate::error::FieldErrors;
use crate::identity::RecordId;
use crate::resource::{common_sort_value, Resource, SortValue};

/// An open volunteering position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerRole {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commitment: String,
    #[serde(default)]
    pub slots_available: u32,
    /// Applications close at this instant.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerRoleDraft {
    pub title: String,
    pub department: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commitment: String,
    #[serde(default)]
    pub slots_available: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl Resource for VolunteerRole {
    const NAME: &'static str = "volunteer-roles";

    type Draft = VolunteerRoleDraft;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate(draft: &VolunteerRoleDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", &draft.title);
        errors.require("department", &draft.department);
        check_date(&mut errors, "deadline", draft.deadline.as_deref());
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
        vec![self.title.as_str(), self.department.as_str(), self.description.as_str()]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.department)
    }

    fn primary_date(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "department" => Some(SortValue::Text(self.department.clone())),
            "slotsAvailable" | "slots" => Some(SortValue::Number(self.slots_available as f64)),
            "deadline" | "date" => Some(SortValue::Date(self.deadline)),
            "createdAt" => Some(SortValue::Date(self.created_at)),
            _ => common_sort_value(self, key),
        }
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}
