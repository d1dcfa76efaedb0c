use crate::{CasOutcome, CounterStore, SequenceName};
use core::convert::Infallible;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// An in-process [`CounterStore`] over a mutex-guarded map.
///
/// The reference implementation of the store contract: the mutex makes the
/// read-compare-write of [`CounterStore::compare_and_swap`] atomic, exactly
/// as a conditional put is on a remote document store. Cloning is cheap and
/// every clone shares the same counters, mirroring multiple service
/// invocations against one backend.
///
/// Suitable for tests and for single-process callers; it provides no
/// durability, so production deployments implement [`CounterStore`] against
/// their real backend instead.
#[derive(Debug, Default, Clone)]
pub struct MemoryCounterStore {
    counters: Arc<Mutex<HashMap<SequenceName, u64>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value` unconditionally, as if `value` ids had
    /// already been handed out. Seeding below a table's maximum models a
    /// counter gone stale against imported rows.
    pub fn seed(&self, name: &SequenceName, value: u64) {
        self.counters.lock().insert(name.clone(), value);
    }
}

impl CounterStore for MemoryCounterStore {
    type Error = Infallible;

    async fn read(&self, name: &SequenceName) -> Result<u64, Self::Error> {
        Ok(self.counters.lock().get(name).copied().unwrap_or(0))
    }

    async fn compare_and_swap(
        &self,
        name: &SequenceName,
        expected: u64,
        next: u64,
    ) -> Result<CasOutcome, Self::Error> {
        let mut counters = self.counters.lock();
        let current = counters.get(name).copied().unwrap_or(0);
        if current != expected {
            return Ok(CasOutcome::LostRace);
        }
        counters.insert(name.clone(), next);
        Ok(CasOutcome::Committed)
    }
}
