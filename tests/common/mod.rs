//! Shared test harness: an in-memory rule service with scriptable
//! latencies, conflict batches, and failures, plus a call log for
//! asserting what the controllers actually sent.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use ruleboard::{
    Conflict, ConflictKind, ConflictSeverity, ListDescriptor, ListPage, QueryState, Result,
    RuleCounters, RuleDraft, RuleRecord, RuleService, RuleStatus, RuleboardError, SortDirection,
};

/// One entry in the call log.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List {
        page: u32,
        limit: u32,
        search: String,
        status_filter: Option<String>,
    },
    Stats,
    Create(String),
    Update(u64, String),
    Delete(u64),
}

struct ListBehavior {
    delay: Duration,
    fail: bool,
}

enum SubmitBehavior {
    Conflicts(Vec<Conflict>),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    rows: Vec<RuleRecord>,
    list_script: VecDeque<ListBehavior>,
    submit_script: VecDeque<SubmitBehavior>,
    delete_failures: HashSet<u64>,
    calls: Vec<Call>,
}

pub struct MockRuleService {
    state: Mutex<MockState>,
    next_id: AtomicU64,
}

impl MockRuleService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn seed(&self, rows: &[(&str, RuleStatus)]) -> Vec<u64> {
        let mut ids = Vec::new();
        let mut state = self.state.lock();
        for (value, status) in rows {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            state.rows.push(RuleRecord {
                id,
                value: value.to_string(),
                status: *status,
                note: None,
                created_at: None,
                updated_at: None,
            });
            ids.push(id);
        }
        ids
    }

    /// Queue behavior for the next list calls, in call order.
    pub fn delay_next_list(&self, ms: u64) {
        self.state.lock().list_script.push_back(ListBehavior {
            delay: Duration::from_millis(ms),
            fail: false,
        });
    }

    pub fn fail_next_list(&self) {
        self.fail_next_list_after(0);
    }

    pub fn fail_next_list_after(&self, ms: u64) {
        self.state.lock().list_script.push_back(ListBehavior {
            delay: Duration::from_millis(ms),
            fail: true,
        });
    }

    /// Queue a conflict batch for the next create/update.
    pub fn script_conflicts(&self, batch: Vec<Conflict>) {
        self.state
            .lock()
            .submit_script
            .push_back(SubmitBehavior::Conflicts(batch));
    }

    pub fn script_submit_failure(&self, message: &str) {
        self.state
            .lock()
            .submit_script
            .push_back(SubmitBehavior::Fail(message.to_string()));
    }

    pub fn fail_delete(&self, id: u64) {
        self.state.lock().delete_failures.insert(id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count()
    }

    pub fn deleted_ids(&self) -> Vec<u64> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn row_values(&self) -> Vec<String> {
        self.state
            .lock()
            .rows
            .iter()
            .map(|r| r.value.clone())
            .collect()
    }

    pub fn rows(&self) -> Vec<RuleRecord> {
        self.state.lock().rows.clone()
    }

    pub fn id_of(&self, value: &str) -> Option<u64> {
        self.state
            .lock()
            .rows
            .iter()
            .find(|r| r.value == value)
            .map(|r| r.id)
    }

    fn insert(&self, draft: &RuleDraft) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.lock().rows.push(RuleRecord {
            id,
            value: draft.value.clone(),
            status: draft.status,
            note: draft.note.clone(),
            created_at: None,
            updated_at: None,
        });
    }

    fn apply_update(&self, id: u64, draft: &RuleDraft) -> Result<()> {
        let mut state = self.state.lock();
        match state.rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.value = draft.value.clone();
                row.status = draft.status;
                row.note = draft.note.clone();
                Ok(())
            }
            None => Err(RuleboardError::MutationRejected(format!(
                "no rule with id {id}"
            ))),
        }
    }
}

#[async_trait]
impl RuleService for MockRuleService {
    async fn list(&self, _descriptor: &ListDescriptor, query: &QueryState) -> Result<ListPage> {
        let behavior = {
            let mut state = self.state.lock();
            state.calls.push(Call::List {
                page: query.page_index(),
                limit: query.page_size(),
                search: query.search().to_string(),
                status_filter: query.filter("status").map(str::to_string),
            });
            state.list_script.pop_front()
        };

        let fail = match behavior {
            Some(behavior) => {
                if !behavior.delay.is_zero() {
                    tokio::time::sleep(behavior.delay).await;
                }
                behavior.fail
            }
            None => false,
        };
        if fail {
            return Err(RuleboardError::TransientFetch(
                "scripted list failure".to_string(),
            ));
        }

        let state = self.state.lock();
        let mut matching: Vec<RuleRecord> = state
            .rows
            .iter()
            .filter(|row| {
                let search_ok = query.search().is_empty() || row.value.contains(query.search());
                let status_ok = match query.filter("status") {
                    Some(wanted) => row.status.to_string() == wanted,
                    None => true,
                };
                search_ok && status_ok
            })
            .cloned()
            .collect();

        match query.sort_field() {
            "value" => matching.sort_by(|a, b| a.value.cmp(&b.value)),
            _ => matching.sort_by_key(|r| r.id),
        }
        if query.sort_direction() == SortDirection::Desc {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let offset = query.offset().min(matching.len());
        let end = (offset + query.page_size() as usize).min(matching.len());
        Ok(ListPage {
            items: matching[offset..end].to_vec(),
            total,
        })
    }

    async fn stats(&self, _descriptor: &ListDescriptor) -> Result<RuleCounters> {
        let mut state = self.state.lock();
        state.calls.push(Call::Stats);
        let mut counters = RuleCounters {
            total: state.rows.len() as u64,
            ..RuleCounters::default()
        };
        for row in &state.rows {
            match row.status {
                RuleStatus::Allowed => counters.allowed += 1,
                RuleStatus::Denied => counters.denied += 1,
                RuleStatus::Whitelisted => counters.whitelisted += 1,
            }
            let kind = if row.value.contains('/') { "cidr" } else { "single" };
            *counters.by_type.entry(kind.to_string()).or_insert(0) += 1;
        }
        Ok(counters)
    }

    async fn create(&self, _descriptor: &ListDescriptor, draft: &RuleDraft) -> Result<()> {
        let scripted = {
            let mut state = self.state.lock();
            state.calls.push(Call::Create(draft.value.clone()));
            state.submit_script.pop_front()
        };

        match scripted {
            Some(SubmitBehavior::Conflicts(batch)) => {
                // Warning-only batches mean the write landed anyway.
                if batch.iter().all(|c| !c.is_blocking()) {
                    self.insert(draft);
                }
                Err(RuleboardError::MutationConflict { conflicts: batch })
            }
            Some(SubmitBehavior::Fail(message)) => Err(RuleboardError::MutationRejected(message)),
            None => {
                self.insert(draft);
                Ok(())
            }
        }
    }

    async fn update(&self, _descriptor: &ListDescriptor, id: u64, draft: &RuleDraft) -> Result<()> {
        let scripted = {
            let mut state = self.state.lock();
            state.calls.push(Call::Update(id, draft.value.clone()));
            state.submit_script.pop_front()
        };

        match scripted {
            Some(SubmitBehavior::Conflicts(batch)) => {
                if batch.iter().all(|c| !c.is_blocking()) {
                    self.apply_update(id, draft)?;
                }
                Err(RuleboardError::MutationConflict { conflicts: batch })
            }
            Some(SubmitBehavior::Fail(message)) => Err(RuleboardError::MutationRejected(message)),
            None => self.apply_update(id, draft),
        }
    }

    async fn delete(&self, _descriptor: &ListDescriptor, id: u64) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Delete(id));
        if state.delete_failures.contains(&id) {
            return Err(RuleboardError::MutationRejected(
                "scripted delete failure".to_string(),
            ));
        }
        state.rows.retain(|r| r.id != id);
        Ok(())
    }
}

pub fn descriptor() -> ListDescriptor {
    ListDescriptor::new("ip-rules", "ip-rule")
}

pub fn conflict(kind: ConflictKind, severity: ConflictSeverity, addresses: &[&str]) -> Conflict {
    Conflict {
        kind,
        severity,
        conflicting: addresses.iter().map(|a| a.to_string()).collect(),
        status: "allowed".to_string(),
        message: "overlap detected".to_string(),
    }
}

/// Drive paused time far enough for every spawned fetch to settle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1000)).await;
}
