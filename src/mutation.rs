//! Conflict-aware mutation protocol.
//!
//! One coordinator per screen drives create/update/delete against the
//! collection. A write that overlaps existing address rules comes back as
//! a structured conflict batch; blocking conflicts park the submission as
//! a `PendingOperation` until the operator either edits the form (which
//! discards it) or confirms bulk resolution, which deletes the blocking
//! rows and replays the original write exactly once. Retries are never
//! automatic beyond that single replay.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::counters::CounterCache;
use crate::descriptor::ListDescriptor;
use crate::error::{Result, RuleboardError};
use crate::list::ListController;
use crate::resolver::{ConflictSummary, classify};
use crate::service::RuleService;
use crate::types::{Conflict, RuleDraft};

/// Concurrent deletes during bulk conflict resolution.
const DELETE_CONCURRENCY: usize = 5;

/// Lifecycle of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPhase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    /// Blocking conflicts were reported; waiting on the operator.
    ConflictPending,
    Failed,
}

/// Snapshot of the write that produced blocking conflicts, kept so it can
/// be replayed after resolution with its original create/update semantics.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub draft: RuleDraft,
    pub is_cidr: bool,
}

impl PendingOperation {
    fn capture(draft: RuleDraft) -> Self {
        let is_cidr = draft.is_cidr();
        Self { draft, is_cidr }
    }
}

/// What the form and conflict dialog render.
#[derive(Debug, Clone, Default)]
pub struct MutationSnapshot {
    pub phase: MutationPhase,
    /// Blocking conflicts awaiting resolution.
    pub conflicts: Vec<Conflict>,
    /// Informational overlaps; the write took effect despite them.
    pub warnings: Vec<Conflict>,
    pub error: Option<String>,
    pub resolving: bool,
}

/// How a submission (or a replay) ended, for callers that await it.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    AcceptedWithWarnings(Vec<Conflict>),
    /// Blocking conflicts; the coordinator is now `ConflictPending`.
    Blocked(Vec<Conflict>),
}

#[derive(Default)]
struct MutationInner {
    phase: MutationPhase,
    pending: Option<PendingOperation>,
    conflicts: Vec<Conflict>,
    warnings: Vec<Conflict>,
    error: Option<String>,
    resolving: bool,
}

enum ResolutionOutcome {
    Accepted(Vec<Conflict>),
    NewConflicts(ConflictSummary),
}

pub struct MutationCoordinator {
    descriptor: ListDescriptor,
    service: Arc<dyn RuleService>,
    list: Arc<ListController>,
    counters: Arc<CounterCache>,
    resolve_scan_limit: u32,
    inner: Mutex<MutationInner>,
    version: watch::Sender<u64>,
}

impl MutationCoordinator {
    pub fn new(
        service: Arc<dyn RuleService>,
        descriptor: ListDescriptor,
        list: Arc<ListController>,
        counters: Arc<CounterCache>,
        resolve_scan_limit: u32,
    ) -> Arc<Self> {
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            descriptor,
            service,
            list,
            counters,
            resolve_scan_limit: resolve_scan_limit.max(1),
            inner: Mutex::new(MutationInner::default()),
            version,
        })
    }

    pub fn snapshot(&self) -> MutationSnapshot {
        let inner = self.inner.lock();
        MutationSnapshot {
            phase: inner.phase,
            conflicts: inner.conflicts.clone(),
            warnings: inner.warnings.clone(),
            error: inner.error.clone(),
            resolving: inner.resolving,
        }
    }

    pub fn pending(&self) -> Option<PendingOperation> {
        self.inner.lock().pending.clone()
    }

    pub fn is_resolving(&self) -> bool {
        self.inner.lock().resolving
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Submit a form draft; create or update per `draft.edit_id`.
    ///
    /// A fresh submit while conflicts are pending abandons them (the
    /// operator chose to edit instead of resolving).
    pub async fn submit(&self, draft: RuleDraft) -> Result<SubmitOutcome> {
        {
            let mut inner = self.inner.lock();
            if inner.phase == MutationPhase::Submitting {
                return Err(RuleboardError::Other(
                    "a submission is already in flight".to_string(),
                ));
            }
            if inner.resolving {
                return Err(RuleboardError::Other(
                    "conflict resolution is in progress".to_string(),
                ));
            }
            inner.pending = None;
            inner.conflicts.clear();
            inner.warnings.clear();
            inner.error = None;
            inner.phase = MutationPhase::Submitting;
        }
        self.bump();
        debug!(value = %draft.value, edit = draft.is_edit(), "submitting rule");

        let result = self.service.submit(&self.descriptor, &draft).await;

        match result {
            Ok(()) => {
                self.inner.lock().phase = MutationPhase::Succeeded;
                self.bump();
                self.invalidate_reads();
                Ok(SubmitOutcome::Accepted)
            }
            Err(RuleboardError::MutationConflict { conflicts }) => {
                let summary = classify(&conflicts);
                if summary.is_blocking() {
                    {
                        let mut inner = self.inner.lock();
                        inner.phase = MutationPhase::ConflictPending;
                        inner.pending = Some(PendingOperation::capture(draft));
                        inner.conflicts = summary.blocking.clone();
                        inner.warnings = summary.warnings;
                    }
                    self.bump();
                    Ok(SubmitOutcome::Blocked(summary.blocking))
                } else {
                    // Warning-only batch: the write already took effect.
                    {
                        let mut inner = self.inner.lock();
                        inner.phase = MutationPhase::Succeeded;
                        inner.warnings = summary.warnings.clone();
                    }
                    self.bump();
                    self.invalidate_reads();
                    Ok(SubmitOutcome::AcceptedWithWarnings(summary.warnings))
                }
            }
            Err(e) => {
                {
                    let mut inner = self.inner.lock();
                    inner.phase = MutationPhase::Failed;
                    inner.error = Some(e.to_string());
                    inner.pending = None;
                }
                self.bump();
                Err(e)
            }
        }
    }

    /// Abandon any pending conflicts and return the form to idle.
    pub fn cancel(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.resolving {
                return;
            }
            inner.phase = MutationPhase::Idle;
            inner.pending = None;
            inner.conflicts.clear();
            inner.warnings.clear();
            inner.error = None;
        }
        self.bump();
    }

    /// Row deletion from the table; independent of the form's state
    /// machine but shares its read invalidation.
    pub async fn delete_rule(&self, id: u64) -> Result<()> {
        self.service.delete(&self.descriptor, id).await?;
        self.invalidate_reads();
        Ok(())
    }

    /// Delete every row blocking the pending write, then replay it once.
    ///
    /// Requires `ConflictPending` with at least one blocking conflict.
    /// Addresses that no longer resolve to a row are skipped; a failed
    /// delete stops the sequence before the replay. The pending operation
    /// survives every failure path so resolution can be retried manually,
    /// and a replay that conflicts again waits for a fresh confirmation
    /// instead of looping.
    pub async fn resolve_and_retry(&self) -> Result<SubmitOutcome> {
        let (pending, addresses) = {
            let mut inner = self.inner.lock();
            if inner.resolving {
                return Err(RuleboardError::Other(
                    "conflict resolution is already running".to_string(),
                ));
            }
            if inner.phase != MutationPhase::ConflictPending {
                return Err(RuleboardError::Other(
                    "no blocked write to resolve".to_string(),
                ));
            }
            let summary = ConflictSummary {
                blocking: inner.conflicts.clone(),
                warnings: inner.warnings.clone(),
            };
            let addresses = summary.blocking_addresses();
            if addresses.is_empty() {
                return Err(RuleboardError::Other(
                    "pending conflicts are informational only".to_string(),
                ));
            }
            let pending = inner.pending.clone().ok_or_else(|| {
                RuleboardError::Other("blocked write was already discarded".to_string())
            })?;
            inner.resolving = true;
            inner.error = None;
            (pending, addresses)
        };
        self.bump();
        debug!(count = addresses.len(), "resolving blocking conflicts");

        let outcome = self.run_resolution(&pending, &addresses).await;

        match outcome {
            Ok(ResolutionOutcome::Accepted(warnings)) => {
                {
                    let mut inner = self.inner.lock();
                    inner.resolving = false;
                    inner.phase = MutationPhase::Succeeded;
                    inner.pending = None;
                    inner.conflicts.clear();
                    inner.warnings = warnings.clone();
                }
                self.bump();
                self.invalidate_reads();
                if warnings.is_empty() {
                    Ok(SubmitOutcome::Accepted)
                } else {
                    Ok(SubmitOutcome::AcceptedWithWarnings(warnings))
                }
            }
            Ok(ResolutionOutcome::NewConflicts(summary)) => {
                // The collection moved underneath the resolution; surface
                // the fresh verdicts and wait for another confirmation.
                {
                    let mut inner = self.inner.lock();
                    inner.resolving = false;
                    inner.conflicts = summary.blocking.clone();
                    inner.warnings = summary.warnings;
                }
                self.bump();
                Ok(SubmitOutcome::Blocked(summary.blocking))
            }
            Err(e) => {
                {
                    let mut inner = self.inner.lock();
                    inner.resolving = false;
                    inner.error = Some(e.to_string());
                }
                self.bump();
                Err(e)
            }
        }
    }

    async fn run_resolution(
        &self,
        pending: &PendingOperation,
        addresses: &[String],
    ) -> Result<ResolutionOutcome> {
        // Resolve addresses to row ids with one bounded listing. The
        // collection offers no address-keyed lookup, only pages.
        let lookup = self
            .descriptor
            .initial_query()
            .with_page_size(self.resolve_scan_limit);
        let page = self
            .service
            .list(&self.descriptor, &lookup)
            .await
            .map_err(|e| {
                RuleboardError::ResolutionPartialFailure(format!(
                    "could not list rules for cleanup: {e}"
                ))
            })?;

        let mut ids = Vec::new();
        for address in addresses {
            match page.items.iter().find(|row| row.value == *address) {
                Some(row) => ids.push(row.id),
                None => {
                    // Another actor may have deleted it already; partial
                    // cleanup beats a stuck conflict state.
                    warn!(address = %address, "conflicting rule not found, skipping");
                }
            }
        }

        let results: Vec<(u64, Result<()>)> = stream::iter(ids.iter().copied())
            .map(|id| async move { (id, self.service.delete(&self.descriptor, id).await) })
            .buffer_unordered(DELETE_CONCURRENCY)
            .collect()
            .await;

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        if failed > 0 {
            return Err(RuleboardError::ResolutionPartialFailure(format!(
                "{failed} of {} conflicting rules could not be removed",
                ids.len()
            )));
        }

        // The one replay of the original write.
        match self.service.submit(&self.descriptor, &pending.draft).await {
            Ok(()) => Ok(ResolutionOutcome::Accepted(Vec::new())),
            Err(RuleboardError::MutationConflict { conflicts }) => {
                let summary = classify(&conflicts);
                if summary.is_blocking() {
                    Ok(ResolutionOutcome::NewConflicts(summary))
                } else {
                    Ok(ResolutionOutcome::Accepted(summary.warnings))
                }
            }
            Err(e) => Err(RuleboardError::ResolutionPartialFailure(format!(
                "conflicting rules removed but the retried write failed: {e}"
            ))),
        }
    }

    /// A write landed; the list and the filter-chip counters are stale.
    fn invalidate_reads(&self) {
        self.list.refresh();
        self.counters.invalidate();
        self.counters.refresh();
    }
}
