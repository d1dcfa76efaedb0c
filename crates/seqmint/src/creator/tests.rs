use crate::{
    CasOutcome, CounterStore, EntityTable, Error, IdCreator, Insertion, MemoryCounterStore,
    RetryPolicy, SequenceAllocator, SequenceName,
};
use core::convert::Infallible;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Entity rows over a sorted id set.
///
/// `phantom_conflicts` makes the next N inserts behave as if a concurrent
/// creator won the row a moment earlier: the insert reports a conflict and
/// the winner's row appears in the table.
#[derive(Default)]
struct Table {
    rows: Mutex<BTreeSet<u64>>,
    phantom_conflicts: AtomicU32,
    candidates: Mutex<Vec<u64>>,
}

impl Table {
    fn with_rows(rows: impl IntoIterator<Item = u64>) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().collect()),
            ..Self::default()
        }
    }

    fn rows(&self) -> Vec<u64> {
        self.rows.lock().iter().copied().collect()
    }

    /// Every candidate id the protocol probed, in order.
    fn candidates(&self) -> Vec<u64> {
        self.candidates.lock().clone()
    }
}

impl EntityTable for Table {
    type Entity = u64;
    type Error = Infallible;

    async fn contains(&self, id: u64) -> Result<bool, Self::Error> {
        self.candidates.lock().push(id);
        Ok(self.rows.lock().contains(&id))
    }

    async fn insert(&self, id: u64) -> Result<Insertion<u64>, Self::Error> {
        if self
            .phantom_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            self.rows.lock().insert(id);
            return Ok(Insertion::Conflict);
        }
        Ok(if self.rows.lock().insert(id) {
            Insertion::Created(id)
        } else {
            Insertion::Conflict
        })
    }

    async fn max_id(&self) -> Result<u64, Self::Error> {
        Ok(self.rows.lock().last().copied().unwrap_or(0))
    }
}

/// Every candidate is reported occupied; creation can never succeed.
struct SaturatedTable;

impl EntityTable for SaturatedTable {
    type Entity = u64;
    type Error = Infallible;

    async fn contains(&self, _id: u64) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn insert(&self, _id: u64) -> Result<Insertion<u64>, Self::Error> {
        unreachable!("insert is never reached when every id is occupied")
    }

    async fn max_id(&self) -> Result<u64, Self::Error> {
        Ok(1_000)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("backend offline")]
struct Offline;

/// A healthy store that speaks the fallible backend error type.
struct ReliableStore(MemoryCounterStore);

impl CounterStore for ReliableStore {
    type Error = Offline;

    async fn read(&self, name: &SequenceName) -> Result<u64, Self::Error> {
        self.0.read(name).await.map_err(|never| match never {})
    }

    async fn compare_and_swap(
        &self,
        name: &SequenceName,
        expected: u64,
        next: u64,
    ) -> Result<CasOutcome, Self::Error> {
        self.0
            .compare_and_swap(name, expected, next)
            .await
            .map_err(|never| match never {})
    }
}

/// Fails the next N calls of the configured operation, then recovers.
#[derive(Default)]
struct FlakyTable {
    rows: Mutex<BTreeSet<u64>>,
    contains_failures: AtomicU32,
    insert_failures: AtomicU32,
    insert_calls: AtomicU32,
}

impl FlakyTable {
    fn take(failures: &AtomicU32) -> bool {
        failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl EntityTable for FlakyTable {
    type Entity = u64;
    type Error = Offline;

    async fn contains(&self, id: u64) -> Result<bool, Self::Error> {
        if Self::take(&self.contains_failures) {
            return Err(Offline);
        }
        Ok(self.rows.lock().contains(&id))
    }

    async fn insert(&self, id: u64) -> Result<Insertion<u64>, Self::Error> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.insert_failures) {
            return Err(Offline);
        }
        Ok(if self.rows.lock().insert(id) {
            Insertion::Created(id)
        } else {
            Insertion::Conflict
        })
    }

    async fn max_id(&self) -> Result<u64, Self::Error> {
        Ok(self.rows.lock().last().copied().unwrap_or(0))
    }
}

/// Every conditional write loses, forever.
struct AlwaysLosingStore;

impl CounterStore for AlwaysLosingStore {
    type Error = Infallible;

    async fn read(&self, _name: &SequenceName) -> Result<u64, Self::Error> {
        Ok(0)
    }

    async fn compare_and_swap(
        &self,
        _name: &SequenceName,
        _expected: u64,
        _next: u64,
    ) -> Result<CasOutcome, Self::Error> {
        Ok(CasOutcome::LostRace)
    }
}

fn creator() -> IdCreator<MemoryCounterStore> {
    IdCreator::new(SequenceAllocator::new(MemoryCounterStore::new()))
}

#[tokio::test]
async fn creates_the_first_row_of_a_fresh_entity_kind() {
    let creator = creator();
    let table = Table::default();
    let name = SequenceName::for_entity("client");

    let id = creator.create_with_fresh_id(&name, &table).await.unwrap();
    assert_eq!(id, 1);
    assert_eq!(table.rows(), vec![1]);
    assert_eq!(creator.allocator().read(&name).await.unwrap(), 1);
}

#[tokio::test]
async fn successive_creates_walk_the_sequence() {
    let creator = creator();
    let table = Table::default();
    let name = SequenceName::for_entity("customer");

    for expected in 1..=3 {
        let id = creator.create_with_fresh_id(&name, &table).await.unwrap();
        assert_eq!(id, expected);
    }
    assert_eq!(table.rows(), vec![1, 2, 3]);
}

#[tokio::test]
async fn heals_a_counter_behind_legacy_imports() {
    // A legacy import put row 5 in place while the counter sat at 2.
    let store = MemoryCounterStore::new();
    let name = SequenceName::for_entity("product");
    store.seed(&name, 2);

    let creator = IdCreator::new(SequenceAllocator::new(store));
    let table = Table::with_rows([5]);

    // 3 and 4 are still free and go through untouched.
    assert_eq!(creator.create_with_fresh_id(&name, &table).await.unwrap(), 3);
    assert_eq!(creator.create_with_fresh_id(&name, &table).await.unwrap(), 4);

    // The next candidate is 5, which collides with the import; the
    // protocol reconciles past it and lands on 6.
    assert_eq!(creator.create_with_fresh_id(&name, &table).await.unwrap(), 6);

    assert_eq!(table.rows(), vec![3, 4, 5, 6]);
    assert_eq!(creator.allocator().read(&name).await.unwrap(), 6);

    // A rejected candidate is never offered twice.
    let candidates = table.candidates();
    let mut deduped = candidates.clone();
    deduped.dedup();
    assert_eq!(candidates, deduped);
    assert_eq!(candidates, vec![3, 4, 5, 6]);
}

#[tokio::test]
async fn recovers_from_a_last_moment_insert_conflict() {
    // Both creators pass the existence check for the same id; the other
    // one's insert lands first.
    let creator = creator();
    let table = Table::default();
    table.phantom_conflicts.store(1, Ordering::SeqCst);
    let name = SequenceName::for_entity("warehouse");

    let id = creator.create_with_fresh_id(&name, &table).await.unwrap();
    assert_eq!(id, 2);
    // Exactly one row per logical create: the winner's and ours.
    assert_eq!(table.rows(), vec![1, 2]);
}

#[tokio::test]
async fn exhausting_the_attempt_cap_reports_no_free_id() {
    let policy = RetryPolicy {
        create_attempts: 5,
        ..RetryPolicy::default()
    };
    let creator = IdCreator::new(SequenceAllocator::with_policy(
        MemoryCounterStore::new(),
        policy,
    ));
    let name = SequenceName::for_entity("documentType");

    let err = creator
        .create_with_fresh_id(&name, &SaturatedTable)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoFreeId { attempts: 5, .. }));
}

#[tokio::test]
async fn counter_contention_is_not_reported_as_no_free_id() {
    let policy = RetryPolicy {
        cas_attempts: 2,
        ..RetryPolicy::default()
    };
    let creator = IdCreator::new(SequenceAllocator::with_policy(AlwaysLosingStore, policy));
    let name = SequenceName::for_entity("company");

    let err = creator
        .create_with_fresh_id(&name, &Table::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Contention { attempts: 2, .. }));
}

#[tokio::test]
async fn fatal_insert_errors_surface_immediately() {
    let creator = IdCreator::new(SequenceAllocator::new(ReliableStore(
        MemoryCounterStore::new(),
    )));
    let table = FlakyTable::default();
    table.insert_failures.store(1, Ordering::SeqCst);
    let name = SequenceName::for_entity("client");

    let err = creator.create_with_fresh_id(&name, &table).await.unwrap_err();
    assert!(matches!(err, Error::Backend(Offline)));
    // One attempt, no row, no retry of the failed candidate.
    assert_eq!(table.insert_calls.load(Ordering::SeqCst), 1);
    assert!(table.rows.lock().is_empty());
}

#[tokio::test]
async fn fatal_existence_check_errors_surface_immediately() {
    let creator = IdCreator::new(SequenceAllocator::new(ReliableStore(
        MemoryCounterStore::new(),
    )));
    let table = FlakyTable::default();
    table.contains_failures.store(1, Ordering::SeqCst);
    let name = SequenceName::for_entity("client");

    let err = creator.create_with_fresh_id(&name, &table).await.unwrap_err();
    assert!(matches!(err, Error::Backend(Offline)));
    assert_eq!(table.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_creators_mint_distinct_rows() {
    let creator = Arc::new(creator());
    let table = Arc::new(Table::default());
    let name = SequenceName::for_entity("payment");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let creator = Arc::clone(&creator);
        let table = Arc::clone(&table);
        let name = name.clone();
        handles.push(tokio::spawn(async move {
            creator.create_with_fresh_id(&name, &*table).await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(table.rows(), vec![1, 2, 3, 4]);
}
