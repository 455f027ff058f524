//! Immutable description of the wanted subset of a collection.
//!
//! A `QueryState` is a value: every change constructs a new one, and any
//! change other than page navigation resets the page index so the first
//! page of the new subset is fetched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction, serialized as the `order` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Pagination style of a list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMode {
    /// Bounded table with page controls; each page replaces the last.
    #[default]
    Paged,
    /// Infinite scroll; pages accumulate into one buffer.
    Infinite,
}

/// What subset of the collection is currently wanted.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    search: String,
    filters: BTreeMap<String, String>,
    sort_field: String,
    sort_direction: SortDirection,
    page_index: u32,
    page_size: u32,
}

impl QueryState {
    pub fn new(sort_field: impl Into<String>, page_size: u32) -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            sort_field: sort_field.into(),
            sort_direction: SortDirection::default(),
            page_index: 0,
            page_size,
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filter(&self, field: &str) -> Option<&str> {
        self.filters.get(field).map(String::as_str)
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn sort_field(&self) -> &str {
        &self.sort_field
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Offset of the first row this query addresses.
    pub fn offset(&self) -> usize {
        self.page_index as usize * self.page_size as usize
    }

    pub fn with_search(self, term: impl Into<String>) -> Self {
        Self {
            search: term.into(),
            page_index: 0,
            ..self
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self.page_index = 0;
        self
    }

    pub fn without_filter(mut self, field: &str) -> Self {
        self.filters.remove(field);
        self.page_index = 0;
        self
    }

    pub fn with_sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            sort_field: field.into(),
            sort_direction: direction,
            page_index: 0,
            ..self
        }
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        Self {
            page_size,
            page_index: 0,
            ..self
        }
    }

    /// Page navigation is the one change that does not reset the page.
    pub fn with_page(self, page_index: u32) -> Self {
        Self { page_index, ..self }
    }

    pub fn next_page(self) -> Self {
        let page_index = self.page_index + 1;
        Self { page_index, ..self }
    }

    /// Query parameters in the collection endpoint's wire form.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page_index.to_string()),
            ("limit".to_string(), self.page_size.to_string()),
            ("orderBy".to_string(), self.sort_field.clone()),
            ("order".to_string(), self.sort_direction.to_string()),
        ];
        if !self.search.is_empty() {
            pairs.push(("search".to_string(), self.search.clone()));
        }
        for (field, value) in &self.filters {
            pairs.push((field.clone(), value.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> QueryState {
        QueryState::new("createdAt", 25)
    }

    #[test]
    fn test_search_resets_page() {
        let query = base().with_page(4).with_search("10.0");
        assert_eq!(query.page_index(), 0);
        assert_eq!(query.search(), "10.0");
    }

    #[test]
    fn test_filter_resets_page() {
        let query = base().with_page(2).with_filter("status", "denied");
        assert_eq!(query.page_index(), 0);
        assert_eq!(query.filter("status"), Some("denied"));
    }

    #[test]
    fn test_filter_removal_resets_page() {
        let query = base()
            .with_filter("status", "denied")
            .with_page(3)
            .without_filter("status");
        assert_eq!(query.page_index(), 0);
        assert!(query.filter("status").is_none());
    }

    #[test]
    fn test_sort_resets_page() {
        let query = base().with_page(2).with_sort("value", SortDirection::Desc);
        assert_eq!(query.page_index(), 0);
        assert_eq!(query.sort_field(), "value");
        assert_eq!(query.sort_direction(), SortDirection::Desc);
    }

    #[test]
    fn test_page_navigation_preserves_rest() {
        let query = base().with_search("abc").with_page(5);
        assert_eq!(query.page_index(), 5);
        assert_eq!(query.search(), "abc");
        assert_eq!(query.offset(), 125);
    }

    #[test]
    fn test_query_pairs_wire_form() {
        let query = base()
            .with_filter("status", "denied")
            .with_sort("value", SortDirection::Desc)
            .with_search("10.");
        let pairs = query.query_pairs();
        assert!(pairs.contains(&("page".to_string(), "0".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "25".to_string())));
        assert!(pairs.contains(&("orderBy".to_string(), "value".to_string())));
        assert!(pairs.contains(&("order".to_string(), "desc".to_string())));
        assert!(pairs.contains(&("search".to_string(), "10.".to_string())));
        assert!(pairs.contains(&("status".to_string(), "denied".to_string())));
    }

    #[test]
    fn test_empty_search_omitted_from_pairs() {
        let pairs = base().query_pairs();
        assert!(!pairs.iter().any(|(k, _)| k == "search"));
    }

    #[test]
    fn test_sort_direction_toggle() {
        assert_eq!(SortDirection::Asc.toggle(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.toggle(), SortDirection::Asc);
    }
}
