//! One rule-list screen, assembled.
//!
//! Every list type (IP, email, username, user-agent, country, ASN,
//! charset) is the same stack configured by a [`ListDescriptor`]: a list
//! controller, a mutation coordinator, the counter cache, and a debounced
//! search input feeding the controller.

use std::sync::Arc;

use crate::config::Config;
use crate::counters::CounterCache;
use crate::debounce::SearchDebouncer;
use crate::descriptor::ListDescriptor;
use crate::list::ListController;
use crate::mutation::MutationCoordinator;
use crate::service::RuleService;

pub struct RuleScreen {
    list: Arc<ListController>,
    mutations: Arc<MutationCoordinator>,
    counters: Arc<CounterCache>,
    search: SearchDebouncer,
}

impl RuleScreen {
    pub fn new(
        service: Arc<dyn RuleService>,
        descriptor: ListDescriptor,
        config: &Config,
    ) -> Arc<Self> {
        let list = ListController::new(Arc::clone(&service), descriptor.clone());
        let counters = CounterCache::new(Arc::clone(&service), descriptor.clone());
        let mutations = MutationCoordinator::new(
            service,
            descriptor,
            Arc::clone(&list),
            Arc::clone(&counters),
            config.resolve_scan_limit,
        );

        let search_target = Arc::clone(&list);
        let search = SearchDebouncer::new(config.debounce(), move |term| {
            search_target.set_search(term);
        });

        Arc::new(Self {
            list,
            mutations,
            counters,
            search,
        })
    }

    /// Kick off the initial list and counter fetches.
    pub fn open(self: &Arc<Self>) {
        self.list.refresh();
        self.counters.refresh();
    }

    pub fn list(&self) -> &Arc<ListController> {
        &self.list
    }

    pub fn mutations(&self) -> &Arc<MutationCoordinator> {
        &self.mutations
    }

    pub fn counters(&self) -> &Arc<CounterCache> {
        &self.counters
    }

    /// Raw keystroke from the search box; debounced into the query.
    pub fn search_input(&self, text: impl Into<String>) {
        self.search.input(text);
    }

    /// Explicit search submit; bypasses the quiet window.
    pub fn search_commit(&self, text: impl Into<String>) {
        self.search.commit(text);
    }
}
