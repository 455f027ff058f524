//! Per-screen descriptors.
//!
//! Every rule-list screen (IP, email, user-agent, country, ASN, ...)
//! instantiates the same controller stack, configured by one of these
//! instead of carrying its own copy of the logic.

use crate::error::{Result, RuleboardError};
use crate::query::{PageMode, QueryState};

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Endpoint and field configuration for one list type.
#[derive(Debug, Clone)]
pub struct ListDescriptor {
    /// Collection path segment, e.g. `ip-rules`.
    collection: String,
    /// Singular path segment used by mutations, e.g. `ip-rule`.
    singular: String,
    filter_fields: Vec<String>,
    sort_fields: Vec<String>,
    default_sort: String,
    page_size: u32,
    page_mode: PageMode,
}

impl ListDescriptor {
    pub fn new(collection: impl Into<String>, singular: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            singular: singular.into(),
            filter_fields: vec!["status".to_string()],
            sort_fields: vec![DEFAULT_SORT_FIELD.to_string(), "value".to_string()],
            default_sort: DEFAULT_SORT_FIELD.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_mode: PageMode::default(),
        }
    }

    pub fn with_filter_fields(mut self, fields: &[&str]) -> Self {
        self.filter_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_sort_fields(mut self, fields: &[&str]) -> Self {
        self.sort_fields = fields.iter().map(|f| f.to_string()).collect();
        if let Some(first) = self.sort_fields.first() {
            self.default_sort = first.clone();
        }
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Switch the screen to infinite-scroll accumulation.
    pub fn infinite(mut self) -> Self {
        self.page_mode = PageMode::Infinite;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn singular(&self) -> &str {
        &self.singular
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_mode(&self) -> PageMode {
        self.page_mode
    }

    pub fn check_filter(&self, field: &str) -> Result<()> {
        if self.filter_fields.iter().any(|f| f == field) {
            Ok(())
        } else {
            Err(RuleboardError::UnknownFilter(field.to_string()))
        }
    }

    pub fn check_sort(&self, field: &str) -> Result<()> {
        if self.sort_fields.iter().any(|f| f == field) {
            Ok(())
        } else {
            Err(RuleboardError::UnknownSort(field.to_string()))
        }
    }

    /// Query a freshly opened screen starts from.
    pub fn initial_query(&self) -> QueryState {
        QueryState::new(self.default_sort.clone(), self.page_size)
    }
}
