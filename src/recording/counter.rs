use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Numbering source for output video files.
///
/// Clones share one sequence, so sessions built from clones of the same
/// counter never hand out the same number twice. Querying with
/// [`current`](Self::current) never advances it.
#[derive(Debug, Clone, Default)]
pub struct OutputCounter(Arc<AtomicU32>);

impl OutputCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(value: u32) -> Self {
        Self(Arc::new(AtomicU32::new(value)))
    }

    pub fn current(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    /// Pre-increment: bumps the counter and returns the new value, or `None`
    /// once it has reached `u32::MAX`. An exhausted counter never wraps.
    pub fn advance(&self) -> Option<u32> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .ok()
            .map(|n| n + 1)
    }
}
