use crate::SequenceName;
use core::future::Future;

/// Outcome of a conditional write against a [`CounterStore`].
///
/// A lost race is a signal, not an error: the caller re-reads and decides
/// whether it still has anything to do. It never crosses the subsystem
/// boundary as a failure by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write committed; the stored value now equals the proposed one.
    Committed,
    /// Another writer advanced the counter first; nothing was written.
    LostRace,
}

impl CasOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Durable, conditionally-updatable storage for `{sequence name -> value}`.
///
/// This is the persistence leaf of the subsystem and its sole
/// concurrency-safety mechanism: every higher-level operation is a
/// read-compute-conditional-write loop over these two primitives. The
/// counter row is shared mutable state between independent service
/// instances, so implementations must back it with the real store, never an
/// in-process singleton ([`MemoryCounterStore`](crate::MemoryCounterStore)
/// exists for tests and single-process callers).
///
/// # Contract
///
/// - [`read`](Self::read) returns `0` for an absent row. Absence is a valid
///   initial state, not an error.
/// - [`compare_and_swap`](Self::compare_and_swap) commits if and only if
///   the stored value still equals `expected` at write time. When the row
///   is absent, only `expected == 0` may commit, and the commit creates the
///   row. A failed comparison must have no side effects and report
///   [`CasOutcome::LostRace`].
/// - The comparison and the write must be atomic with respect to other
///   writers: partial increments must be impossible by construction, even
///   when a call times out on the client side.
///
/// A document store typically maps `compare_and_swap` to a conditional put
/// expression; a SQL store to `UPDATE counters SET value = :next WHERE name
/// = :name AND value = :expected` (checking the affected-row count).
///
/// # Lost acknowledgements
///
/// If the backend can commit a write and then lose the response to the
/// client, the implementation must resolve that ambiguity itself (for
/// example with a write token) before reporting [`CasOutcome::LostRace`].
/// Misreporting a committed write as lost is safe for uniqueness (the next
/// attempt allocates past it) but permanently skips the ids of the lost
/// range.
pub trait CounterStore {
    type Error;

    /// The last value handed out for `name`, or `0` if no row exists.
    fn read(&self, name: &SequenceName) -> impl Future<Output = Result<u64, Self::Error>>;

    /// Conditionally replaces `expected` with `next` for `name`.
    fn compare_and_swap(
        &self,
        name: &SequenceName,
        expected: u64,
        next: u64,
    ) -> impl Future<Output = Result<CasOutcome, Self::Error>>;
}
