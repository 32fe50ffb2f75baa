//! Derived list views: search, selectors, date range and stable sort.
//!
//! Everything here is synchronous and works on borrowed records; the
//! controller's cache is never touched.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::{Resource, SortValue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

/// Inclusive bounds over a resource's primary date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn is_active(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    fn contains(&self, date: Option<DateTime<Utc>>) -> bool {
        let Some(date) = date else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// The predicate set a list view is filtered with.
///
/// Blank search text, a blank or `"all"` category, `StatusFilter::All` and an
/// open date range are all inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: StatusFilter,
    pub date_range: DateRange,
    pub sort: Option<SortSpec>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.date_range = DateRange { from, to };
        self
    }

    pub fn sort_by(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec {
            key: key.into(),
            direction,
        });
        self
    }

    /// `true` when no filtering predicate is active (sort is not a predicate).
    pub fn has_no_predicates(&self) -> bool {
        self.search_needle().is_none()
            && self.category_selector().is_none()
            && self.status == StatusFilter::All
            && !self.date_range.is_active()
    }

    fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn category_selector(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
            .map(str::to_lowercase)
    }

    fn matches<R: Resource>(&self, record: &R, needle: Option<&str>, category: Option<&str>) -> bool {
        if let Some(needle) = needle {
            let hit = record
                .search_text()
                .iter()
                .any(|field| field.to_lowercase().contains(needle));
            if !hit {
                return false;
            }
        }

        if let Some(category) = category {
            match record.category() {
                Some(c) if c.trim().to_lowercase() == category => {}
                _ => return false,
            }
        }

        match self.status {
            StatusFilter::All => {}
            StatusFilter::Active if !record.is_active() => return false,
            StatusFilter::Inactive if record.is_active() => return false,
            _ => {}
        }

        if self.date_range.is_active() && !self.date_range.contains(record.primary_date()) {
            return false;
        }

        true
    }
}

/// Records matching every active predicate, in cache order.
pub fn filter<'a, R: Resource>(records: &'a [R], query: &ListQuery) -> Vec<&'a R> {
    let needle = query.search_needle();
    let category = query.category_selector();
    records
        .iter()
        .filter(|record| query.matches(*record, needle.as_deref(), category.as_deref()))
        .collect()
}

/// Stable sort of a view by one key.
pub fn sort<R: Resource>(view: &mut [&R], key: &str, direction: SortDirection) {
    view.sort_by(|a, b| {
        let ordering = compare(a.sort_value(key).as_ref(), b.sort_value(key).as_ref());
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// `filter` followed by the query's sort, if any.
pub fn apply<'a, R: Resource>(records: &'a [R], query: &ListQuery) -> Vec<&'a R> {
    let mut view = filter(records, query);
    if let Some(spec) = &query.sort {
        sort(&mut view, &spec.key, spec.direction);
    }
    view
}

/// Mismatched or missing projections compare equal so that the stable sort
/// keeps their order.
pub fn compare(a: Option<&SortValue>, b: Option<&SortValue>) -> Ordering {
    match (a, b) {
        (Some(SortValue::Text(a)), Some(SortValue::Text(b))) => {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
        (Some(SortValue::Number(a)), Some(SortValue::Number(b))) => a.total_cmp(b),
        (Some(SortValue::Date(a)), Some(SortValue::Date(b))) => a.cmp(b),
        (Some(SortValue::Flag(a)), Some(SortValue::Flag(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::decode_record;
    use crate::models::event::Event;
    use serde_json::json;

    fn event(id: &str, title: &str, date: Option<&str>, category: &str, active: bool) -> Event {
        decode_record::<Event>(json!({
            "_id": id,
            "title": title,
            "category": category,
            "date": date,
            "isActive": active,
            "attendees": 0
        }))
        .unwrap()
    }

    fn ids(view: &[&Event]) -> Vec<String> {
        view.iter().map(|e| e.id.to_string()).collect()
    }

    fn sample() -> Vec<Event> {
        vec![
            event("1", "Alpha Event", Some("2024-01-01T00:00:00Z"), "Fundraiser", true),
            event("2", "Beta Event", None, "Workshop", false),
            event("3", "Alphabet Soup", Some("2024-06-01T00:00:00Z"), "fundraiser", true),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let records = sample();
        let view = filter(&records, &ListQuery::new().search("alpha"));
        assert_eq!(ids(&view), vec!["1", "3"]);
    }

    #[test]
    fn test_no_predicates_returns_everything_in_order() {
        let records = sample();
        let query = ListQuery::new().search("   ").category("all");
        assert!(query.has_no_predicates());
        assert_eq!(ids(&filter(&records, &query)), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_collection() {
        let records: Vec<Event> = vec![];
        let query = ListQuery::new().search("alpha").status(StatusFilter::Active);
        assert!(filter(&records, &query).is_empty());
        assert!(filter(&records, &ListQuery::new()).is_empty());
    }

    #[test]
    fn test_predicates_are_anded() {
        let records = sample();
        let query = ListQuery::new()
            .search("event")
            .category("FUNDRAISER")
            .status(StatusFilter::Active);
        assert_eq!(ids(&filter(&records, &query)), vec!["1"]);

        let inactive = ListQuery::new().status(StatusFilter::Inactive);
        assert_eq!(ids(&filter(&records, &inactive)), vec!["2"]);
    }

    #[test]
    fn test_date_range_is_inclusive_and_excludes_undated() {
        let records = sample();
        let from = "2024-01-01T00:00:00Z".parse().ok();
        let to = "2024-03-01T00:00:00Z".parse().ok();
        let view = filter(&records, &ListQuery::new().between(from, to));
        assert_eq!(ids(&view), vec!["1"]);

        let open_ended = filter(&records, &ListQuery::new().between(from, None));
        assert_eq!(ids(&open_ended), vec!["1", "3"]);
    }

    #[test]
    fn test_filter_does_not_touch_input() {
        let records = sample();
        let before = format!("{records:?}");
        let _ = filter(&records, &ListQuery::new().search("beta"));
        assert_eq!(format!("{records:?}"), before);
    }

    #[test]
    fn test_date_descending_puts_missing_last() {
        let records = vec![
            event("a", "A", Some("2024-01-01T00:00:00Z"), "x", true),
            event("b", "B", None, "x", true),
            event("c", "C", Some("2024-06-01T00:00:00Z"), "x", true),
        ];
        let query = ListQuery::new().sort_by("date", SortDirection::Descending);
        assert_eq!(ids(&apply(&records, &query)), vec!["c", "a", "b"]);

        let query = ListQuery::new().sort_by("date", SortDirection::Ascending);
        assert_eq!(ids(&apply(&records, &query)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let records = vec![
            event("1", "same", None, "a", true),
            event("2", "Other", None, "b", true),
            event("3", "SAME", None, "c", true),
            event("4", "Same", None, "d", true),
        ];
        let mut view = filter(&records, &ListQuery::new());
        sort(&mut view, "title", SortDirection::Ascending);
        assert_eq!(ids(&view), vec!["2", "1", "3", "4"]);

        let mut view = filter(&records, &ListQuery::new());
        sort(&mut view, "title", SortDirection::Descending);
        assert_eq!(ids(&view), vec!["1", "3", "4", "2"]);
    }

    #[test]
    fn test_unknown_key_preserves_order() {
        let records = sample();
        let query = ListQuery::new().sort_by("no-such-field", SortDirection::Descending);
        assert_eq!(ids(&apply(&records, &query)), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_numeric_compare() {
        let a = SortValue::Number(10.0);
        let b = SortValue::Number(9.5);
        assert_eq!(compare(Some(&a), Some(&b)), Ordering::Greater);
        assert_eq!(compare(Some(&a), None), Ordering::Equal);
        assert_eq!(
            compare(Some(&SortValue::Text("b".into())), Some(&SortValue::Text("A".into()))),
            Ordering::Greater
        );
    }
}
