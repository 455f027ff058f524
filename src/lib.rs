pub mod config;
pub mod counters;
pub mod debounce;
pub mod descriptor;
pub mod error;
pub mod list;
pub mod mutation;
pub mod query;
pub mod resolver;
pub mod screen;
pub mod service;
pub mod types;

pub use config::{Config, ServiceAuth};
pub use counters::CounterCache;
pub use debounce::SearchDebouncer;
pub use descriptor::{DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD, ListDescriptor};
pub use error::{Result, RuleboardError};
pub use list::{FetchSequencer, ListController, ListSnapshot, ListStore};
pub use mutation::{
    MutationCoordinator, MutationPhase, MutationSnapshot, PendingOperation, SubmitOutcome,
};
pub use query::{PageMode, QueryState, SortDirection};
pub use resolver::{ConflictSummary, classify};
pub use screen::RuleScreen;
pub use service::{HttpRuleService, RuleService};
pub use types::{
    Conflict, ConflictKind, ConflictResponse, ConflictSeverity, ListPage, RuleCounters, RuleDraft,
    RuleRecord, RuleStatus, VALID_STATUSES,
};
