use crate::{CounterStore, EntityTable, Error, Insertion, Result, SequenceAllocator, SequenceName};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Mints exactly one new entity row with a fresh, unoccupied id, tolerating
/// counters that lag behind reality.
///
/// Counters go stale when rows are imported out-of-band or a prior partial
/// failure left gaps; the creation protocol self-heals by treating an
/// occupied candidate as a signal to raise the counter past the table's
/// observed maximum and draw again. Each attempt is one cycle of the state
/// machine
///
/// ```text
/// allocate --(id)--> check --(free)--> insert --(created)--> done
///                      |                  |
///                  (occupied)         (conflict)
///                      |                  |
///                      v                  |
///                  reconcile(max scan) <--'
///                      |
///                      retry with a fresh candidate
/// ```
///
/// bounded by [`RetryPolicy::create_attempts`]. A rejected candidate is
/// never reused: reconciliation raises the counter past the observed
/// maximum before the next allocation, so every retry draws a strictly
/// higher id.
///
/// The counter store and the entity table must agree on one backend error
/// type; in the deployments this models, both are tables of the same
/// managed store.
///
/// # Example
///
/// ```
/// use seqmint::{IdCreator, MemoryCounterStore, SequenceAllocator, SequenceName};
/// # use seqmint::{EntityTable, Insertion};
/// # use core::convert::Infallible;
/// # use std::collections::BTreeSet;
/// # use std::sync::Mutex;
/// # #[derive(Default)]
/// # struct Clients {
/// #     rows: Mutex<BTreeSet<u64>>,
/// # }
/// # impl EntityTable for Clients {
/// #     type Entity = u64;
/// #     type Error = Infallible;
/// #     async fn contains(&self, id: u64) -> Result<bool, Self::Error> {
/// #         Ok(self.rows.lock().unwrap().contains(&id))
/// #     }
/// #     async fn insert(&self, id: u64) -> Result<Insertion<u64>, Self::Error> {
/// #         Ok(if self.rows.lock().unwrap().insert(id) {
/// #             Insertion::Created(id)
/// #         } else {
/// #             Insertion::Conflict
/// #         })
/// #     }
/// #     async fn max_id(&self) -> Result<u64, Self::Error> {
/// #         Ok(self.rows.lock().unwrap().last().copied().unwrap_or(0))
/// #     }
/// # }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let creator = IdCreator::new(SequenceAllocator::new(MemoryCounterStore::new()));
/// let clients = Clients::default();
/// let name = SequenceName::for_entity("client");
///
/// let id = creator.create_with_fresh_id(&name, &clients).await.unwrap();
/// assert_eq!(id, 1);
/// # }
/// ```
///
/// [`RetryPolicy::create_attempts`]: crate::RetryPolicy::create_attempts
pub struct IdCreator<S> {
    allocator: SequenceAllocator<S>,
}

impl<S, E> IdCreator<S>
where
    S: CounterStore<Error = E>,
{
    pub fn new(allocator: SequenceAllocator<S>) -> Self {
        Self { allocator }
    }

    pub fn allocator(&self) -> &SequenceAllocator<S> {
        &self.allocator
    }

    /// Allocates a fresh id from `name` and durably creates one row for it
    /// in `table`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoFreeId`] when the attempt cap is exhausted under
    ///   sustained collisions. Surface it to the user; retrying walks the
    ///   same path again.
    /// - [`Error::Contention`] when the underlying counter loop exceeded
    ///   its own bound. That is a transient failure, and the whole call may
    ///   be retried.
    /// - [`Error::Backend`] for any non-conflict store or table failure,
    ///   immediately and without retry.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, table)))]
    pub async fn create_with_fresh_id<T>(
        &self,
        name: &SequenceName,
        table: &T,
    ) -> Result<T::Entity, E>
    where
        T: EntityTable<Error = E>,
    {
        let cap = self.allocator.policy().create_attempts;
        for _ in 0..cap {
            let id = self.allocator.allocate_one(name).await?;

            if table.contains(id).await? {
                // The counter is behind rows created out-of-band.
                #[cfg(feature = "tracing")]
                tracing::debug!(sequence = %name, id, "candidate id occupied; reconciling");
                self.reconcile(name, table).await?;
                continue;
            }

            match table.insert(id).await? {
                Insertion::Created(entity) => return Ok(entity),
                Insertion::Conflict => {
                    // Lost a last-moment race to a concurrent creator that
                    // also slipped past the existence check.
                    #[cfg(feature = "tracing")]
                    tracing::warn!(sequence = %name, id, "insert conflict; reconciling");
                    self.reconcile(name, table).await?;
                }
            }
        }

        Err(Error::NoFreeId {
            sequence: name.clone(),
            attempts: cap,
        })
    }

    async fn reconcile<T>(&self, name: &SequenceName, table: &T) -> Result<(), E>
    where
        T: EntityTable<Error = E>,
    {
        let floor = table.max_id().await?;
        self.allocator.ensure_at_least(name, floor).await
    }
}
