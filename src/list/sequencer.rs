//! Generation tagging for list fetches.
//!
//! Every fetch gets a strictly increasing generation number; a response is
//! committed only if its generation is still the newest one handed out.
//! Stale responses are discarded on arrival, so no network-level
//! cancellation is needed.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct FetchSequencer {
    generation: AtomicU64,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the generation for a fetch about to be issued.
    pub fn next(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a response tagged `generation` may still commit.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}
