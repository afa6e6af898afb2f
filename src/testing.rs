//! Hit and miss bookkeeping for tests.

use std::cell::Cell;

thread_local! {
    /// Whether the last `memoize` call on this thread returned a cached payload.
    static LAST_WAS_HIT: Cell<bool> = const { Cell::new(false) };
    /// How many producers ran on this thread.
    static PRODUCED: Cell<usize> = const { Cell::new(0) };
}

/// Whether the last `memoize` call on this thread was a hit.
pub fn last_was_hit() -> bool {
    LAST_WAS_HIT.with(Cell::get)
}

/// How many producers were invoked on this thread so far.
pub fn produced() -> usize {
    PRODUCED.with(Cell::get)
}

/// Marks the last call as a hit.
pub(crate) fn register_hit() {
    LAST_WAS_HIT.with(|cell| cell.set(true));
}

/// Marks the last call as a miss and counts the producer invocation.
pub(crate) fn register_miss() {
    LAST_WAS_HIT.with(|cell| cell.set(false));
    PRODUCED.with(|cell| cell.set(cell.get() + 1));
}
