//! Client-side view of one collection for the current query.
//!
//! Holds either a single replaceable page or, for infinite scroll, a
//! growing de-duplicated buffer. Commit methods assume the caller has
//! already established that the response is current (generation and, for
//! appends, offset checks live in the controller).

use std::collections::HashSet;

use crate::types::{ListPage, RuleRecord};

/// What the presentation layer renders.
#[derive(Debug, Clone, Default)]
pub struct ListSnapshot {
    pub items: Vec<RuleRecord>,
    pub total: u64,
    pub has_more: bool,
    /// A replace fetch is in flight.
    pub loading: bool,
    /// An append fetch is in flight.
    pub appending: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct ListStore {
    items: Vec<RuleRecord>,
    seen: HashSet<u64>,
    total: u64,
    has_more: bool,
    loading: bool,
    appending: bool,
    error: Option<String>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn appending(&self) -> bool {
        self.appending
    }

    pub fn begin_replace(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn begin_append(&mut self) {
        self.appending = true;
        self.error = None;
    }

    /// The append network call settled; free the in-flight guard.
    ///
    /// Called for committed, failed, and discarded appends alike.
    pub fn settle_append(&mut self) {
        self.appending = false;
    }

    /// Install a page, dropping whatever was buffered.
    pub fn commit_replace(&mut self, page: ListPage, page_size: u32) {
        self.has_more = page_size > 0 && page.items.len() as u64 == u64::from(page_size);
        self.items.clear();
        self.seen.clear();
        for record in page.items {
            if self.seen.insert(record.id) {
                self.items.push(record);
            }
        }
        self.total = page.total;
        self.loading = false;
        self.error = None;
    }

    /// Concatenate a page onto the buffer, skipping already-buffered ids.
    ///
    /// `has_more` is recomputed from the raw received page length, before
    /// de-duplication, since a short page is the server's exhaustion signal.
    pub fn commit_append(&mut self, page: ListPage, page_size: u32) {
        self.has_more = page_size > 0 && page.items.len() as u64 == u64::from(page_size);
        for record in page.items {
            if self.seen.insert(record.id) {
                self.items.push(record);
            }
        }
        self.total = page.total;
        self.error = None;
    }

    /// A current-generation replace failed; keep the previous items visible.
    pub fn fail_replace(&mut self, error: String) {
        self.loading = false;
        self.error = Some(error);
    }

    /// A current-generation append failed; the buffer stays as it was.
    pub fn fail_append(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            items: self.items.clone(),
            total: self.total,
            has_more: self.has_more,
            loading: self.loading,
            appending: self.appending,
            error: self.error.clone(),
        }
    }
}
