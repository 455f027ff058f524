//! Collection-wide summary counts.
//!
//! Filter chips show counts for the whole collection, so these are
//! fetched from the stats endpoint and never derived from the (filtered)
//! list buffer. The cache is read-through: a successful mutation marks it
//! dirty and the next read refetches.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::warn;

use crate::descriptor::ListDescriptor;
use crate::error::Result;
use crate::service::RuleService;
use crate::types::RuleCounters;

#[derive(Default)]
struct CounterInner {
    cached: Option<RuleCounters>,
    dirty: bool,
    /// Bumped on every invalidation; a fetch that started before an
    /// invalidation must not mark the cache clean again.
    epoch: u64,
}

pub struct CounterCache {
    descriptor: ListDescriptor,
    service: Arc<dyn RuleService>,
    inner: Mutex<CounterInner>,
    version: watch::Sender<u64>,
}

impl CounterCache {
    pub fn new(service: Arc<dyn RuleService>, descriptor: ListDescriptor) -> Arc<Self> {
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            descriptor,
            service,
            inner: Mutex::new(CounterInner::default()),
            version,
        })
    }

    /// Current counters, fetching only when the cache is cold or dirty.
    pub async fn get(&self) -> Result<RuleCounters> {
        let epoch = {
            let inner = self.inner.lock();
            if !inner.dirty
                && let Some(cached) = &inner.cached
            {
                return Ok(cached.clone());
            }
            inner.epoch
        };

        let fresh = self.service.stats(&self.descriptor).await?;
        {
            let mut inner = self.inner.lock();
            inner.cached = Some(fresh.clone());
            if inner.epoch == epoch {
                inner.dirty = false;
            }
        }
        self.version.send_modify(|v| *v += 1);
        Ok(fresh)
    }

    /// Last fetched counters without touching the network.
    pub fn peek(&self) -> Option<RuleCounters> {
        self.inner.lock().cached.clone()
    }

    /// Mark the cache stale; the next `get` refetches.
    pub fn invalidate(&self) {
        {
            let mut inner = self.inner.lock();
            inner.dirty = true;
            inner.epoch += 1;
        }
        self.version.send_modify(|v| *v += 1);
    }

    /// Fire-and-forget refetch, used after successful mutations.
    pub fn refresh(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.get().await {
                warn!(collection = this.descriptor.collection(), error = %e, "counter refresh failed");
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
