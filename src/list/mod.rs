//! List synchronization controller.
//!
//! One `ListController` keeps the client-visible collection consistent
//! with the server-side dataset while the operator types, sorts, toggles
//! filters, and scrolls. Fetches are fire-and-forget tasks; consistency
//! comes entirely from commit-time checks:
//!
//! - every fetch carries a generation from [`FetchSequencer`]; a response
//!   whose generation is no longer the newest is dropped on arrival, so a
//!   slow response to an old query can never overwrite a fast response to
//!   a new one;
//! - an append additionally records the buffer length it was issued
//!   against and is dropped if the buffer was reset in the meantime.

pub mod sequencer;
pub mod store;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::descriptor::ListDescriptor;
use crate::error::{Result, RuleboardError};
use crate::query::{PageMode, QueryState, SortDirection};
use crate::service::RuleService;

pub use sequencer::FetchSequencer;
pub use store::{ListSnapshot, ListStore};

struct ListInner {
    query: QueryState,
    store: ListStore,
}

/// Remote list synchronization controller for one screen instance.
pub struct ListController {
    descriptor: ListDescriptor,
    service: Arc<dyn RuleService>,
    sequencer: FetchSequencer,
    inner: Mutex<ListInner>,
    version: watch::Sender<u64>,
}

impl ListController {
    pub fn new(service: Arc<dyn RuleService>, descriptor: ListDescriptor) -> Arc<Self> {
        let query = descriptor.initial_query();
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            descriptor,
            service,
            sequencer: FetchSequencer::new(),
            inner: Mutex::new(ListInner {
                query,
                store: ListStore::new(),
            }),
            version,
        })
    }

    pub fn descriptor(&self) -> &ListDescriptor {
        &self.descriptor
    }

    pub fn query(&self) -> QueryState {
        self.inner.lock().query.clone()
    }

    pub fn snapshot(&self) -> ListSnapshot {
        self.inner.lock().store.snapshot()
    }

    /// Version channel; the receiver side sees a bump after every state
    /// change worth re-rendering.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Re-fetch the current query (post-mutation invalidation or a manual
    /// retry after a failed read). Infinite screens restart their buffer
    /// from the first page.
    pub fn refresh(self: &Arc<Self>) {
        let query = {
            let mut inner = self.inner.lock();
            if self.descriptor.page_mode() == PageMode::Infinite {
                inner.query = inner.query.clone().with_page(0);
            }
            inner.query.clone()
        };
        self.spawn_replace(query);
    }

    /// Install a stabilized search term (normally fed by the debouncer).
    pub fn set_search(self: &Arc<Self>, term: impl Into<String>) {
        let term = term.into();
        self.apply(|query| query.with_search(term));
    }

    pub fn set_filter(
        self: &Arc<Self>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let field = field.into();
        self.descriptor.check_filter(&field)?;
        let value = value.into();
        self.apply(|query| query.with_filter(field, value));
        Ok(())
    }

    pub fn clear_filter(self: &Arc<Self>, field: &str) -> Result<()> {
        self.descriptor.check_filter(field)?;
        self.apply(|query| query.without_filter(field));
        Ok(())
    }

    pub fn set_sort(
        self: &Arc<Self>,
        field: impl Into<String>,
        direction: SortDirection,
    ) -> Result<()> {
        let field = field.into();
        self.descriptor.check_sort(&field)?;
        self.apply(|query| query.with_sort(field, direction));
        Ok(())
    }

    /// Column-header behavior: clicking the active sort flips direction,
    /// a new column starts ascending.
    pub fn toggle_sort(self: &Arc<Self>, field: impl Into<String>) -> Result<()> {
        let field = field.into();
        self.descriptor.check_sort(&field)?;
        self.apply(|query| {
            let direction = if query.sort_field() == field {
                query.sort_direction().toggle()
            } else {
                SortDirection::Asc
            };
            query.with_sort(field, direction)
        });
        Ok(())
    }

    /// Page controls for bounded tables.
    pub fn set_page(self: &Arc<Self>, page_index: u32) -> Result<()> {
        if self.descriptor.page_mode() == PageMode::Infinite {
            return Err(RuleboardError::Other(
                "page controls are not available on an infinite-scroll list".to_string(),
            ));
        }
        self.apply(|query| query.with_page(page_index));
        Ok(())
    }

    /// Infinite-scroll load trigger.
    ///
    /// No-op unless the screen is in infinite mode, more rows exist, and
    /// no other fetch is in flight; at most one append is outstanding at a
    /// time.
    pub fn load_more(self: &Arc<Self>) {
        if self.descriptor.page_mode() != PageMode::Infinite {
            return;
        }
        let (query, generation, requested_offset) = {
            let mut inner = self.inner.lock();
            if !inner.store.has_more() || inner.store.loading() || inner.store.appending() {
                return;
            }
            let query = inner.query.clone().next_page();
            let requested_offset = inner.store.len();
            inner.store.begin_append();
            (query, self.sequencer.next(), requested_offset)
        };
        self.bump();
        debug!(
            generation,
            offset = requested_offset,
            collection = self.descriptor.collection(),
            "issuing append fetch"
        );

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.service.list(&this.descriptor, &query).await;

            let mut inner = this.inner.lock();
            inner.store.settle_append();
            if !this.sequencer.is_current(generation) {
                trace!(generation, "discarding superseded append response");
            } else if inner.store.len() != requested_offset {
                trace!(generation, "buffer was reset after append was issued; discarding");
            } else {
                match result {
                    Ok(page) => {
                        inner.store.commit_append(page, query.page_size());
                        inner.query = query;
                    }
                    Err(e) => {
                        warn!(generation, error = %e, "append fetch failed");
                        inner.store.fail_append(e.to_string());
                    }
                }
            }
            drop(inner);
            this.bump();
        });
    }

    fn apply(self: &Arc<Self>, change: impl FnOnce(QueryState) -> QueryState) {
        let query = {
            let mut inner = self.inner.lock();
            inner.query = change(inner.query.clone());
            inner.query.clone()
        };
        self.spawn_replace(query);
    }

    fn spawn_replace(self: &Arc<Self>, query: QueryState) {
        // Generation allocation and the loading flag move together under
        // the lock, so the newest generation always matches the newest
        // query.
        let generation = {
            let mut inner = self.inner.lock();
            inner.store.begin_replace();
            self.sequencer.next()
        };
        self.bump();
        debug!(
            generation,
            collection = self.descriptor.collection(),
            "issuing replace fetch"
        );

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.service.list(&this.descriptor, &query).await;

            let mut inner = this.inner.lock();
            if !this.sequencer.is_current(generation) {
                // A newer query superseded this fetch while it was in
                // flight; its loading flag is owned by that newer fetch.
                trace!(generation, "discarding superseded replace response");
                return;
            }
            match result {
                Ok(page) => inner.store.commit_replace(page, query.page_size()),
                Err(e) => {
                    warn!(generation, error = %e, "replace fetch failed");
                    inner.store.fail_replace(e.to_string());
                }
            }
            drop(inner);
            this.bump();
        });
    }
}
