//! Trailing-edge debounce for search input.
//!
//! Raw keystrokes arrive far faster than the service should be queried.
//! Each keystroke restarts the quiet window; only the value standing when
//! a full window elapses with no further input is emitted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::trace;

type Sink = Arc<dyn Fn(String) + Send + Sync>;

/// Debounced funnel from keystrokes to a stabilized search term.
pub struct SearchDebouncer {
    delay: Duration,
    epoch: Arc<AtomicU64>,
    sink: Sink,
}

impl SearchDebouncer {
    pub fn new(delay: Duration, sink: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            epoch: Arc::new(AtomicU64::new(0)),
            sink: Arc::new(sink),
        }
    }

    /// Feed one keystroke's worth of input.
    ///
    /// Restarts the quiet window. The text is emitted to the sink only if
    /// no further input arrives for the full window; superseded inputs are
    /// dropped, not queued.
    pub fn input(&self, text: impl Into<String>) {
        let text = text.into();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let epochs = Arc::clone(&self.epoch);
        let sink = Arc::clone(&self.sink);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if epochs.load(Ordering::SeqCst) == epoch {
                sink(text);
            } else {
                trace!(epoch, "debounced input superseded");
            }
        });
    }

    /// Emit immediately, bypassing the quiet window (explicit submit).
    ///
    /// Also cancels any pending emission so the committed value is not
    /// followed by a stale one.
    pub fn commit(&self, text: impl Into<String>) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        (self.sink)(text.into());
    }
}
