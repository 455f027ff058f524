//! Seam to the rule-collection service.
//!
//! The core consumes the service through this trait so the controller
//! stack can be exercised against an in-memory double; the production
//! implementation in [`http`] speaks the service's REST surface.

pub mod http;

use async_trait::async_trait;

use crate::descriptor::ListDescriptor;
use crate::error::Result;
use crate::query::QueryState;
use crate::types::{ListPage, RuleCounters, RuleDraft};

pub use http::HttpRuleService;

/// Remote rule collection, one per service deployment.
///
/// Writes that overlap existing address rules fail with
/// [`RuleboardError::MutationConflict`](crate::RuleboardError::MutationConflict)
/// carrying the evaluation service's verdicts.
#[async_trait]
pub trait RuleService: Send + Sync {
    /// One page of the collection matching `query`.
    async fn list(&self, descriptor: &ListDescriptor, query: &QueryState) -> Result<ListPage>;

    /// Collection-wide summary counts, independent of any query.
    async fn stats(&self, descriptor: &ListDescriptor) -> Result<RuleCounters>;

    /// Create a rule.
    async fn create(&self, descriptor: &ListDescriptor, draft: &RuleDraft) -> Result<()>;

    /// Update an existing rule.
    async fn update(&self, descriptor: &ListDescriptor, id: u64, draft: &RuleDraft) -> Result<()>;

    /// Delete a rule by id.
    async fn delete(&self, descriptor: &ListDescriptor, id: u64) -> Result<()>;

    /// Dispatch a draft with its own create/update semantics.
    async fn submit(&self, descriptor: &ListDescriptor, draft: &RuleDraft) -> Result<()> {
        match draft.edit_id {
            Some(id) => self.update(descriptor, id, draft).await,
            None => self.create(descriptor, draft).await,
        }
    }
}
