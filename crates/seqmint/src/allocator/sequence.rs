use crate::{CasOutcome, CounterStore, Error, IdRange, Result, RetryPolicy, SequenceName};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Atomically reserves blocks of fresh integers from named sequences, and
/// raises stale counters up to an observed floor.
///
/// Every operation is a read-compute-conditional-write loop over the
/// [`CounterStore`], bounded by [`RetryPolicy::cas_attempts`]. The store
/// handle should be cheap to clone (a client handle, or
/// [`MemoryCounterStore`]); independent allocators over the same store
/// coordinate purely through the conditional writes.
///
/// ## Guarantees
///
/// - Ids returned for a sequence are strictly greater than any previously
///   returned for it, and ranges from concurrent calls are disjoint.
/// - The stored counter value is non-decreasing across any interleaving of
///   allocations and reconciliations.
///
/// Allocation order is **not** guaranteed to match request arrival order
/// under contention: a slower loser of a CAS race retries and may end up
/// with a higher id than a request that started later.
///
/// # Example
///
/// ```
/// use seqmint::{MemoryCounterStore, SequenceAllocator, SequenceName};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let allocator = SequenceAllocator::new(MemoryCounterStore::new());
/// let name = SequenceName::for_entity("client");
///
/// let range = allocator.allocate_range(&name, 3).await.unwrap();
/// assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
///
/// allocator.ensure_at_least(&name, 10).await.unwrap();
/// assert_eq!(allocator.allocate_one(&name).await.unwrap(), 11);
/// # }
/// ```
///
/// [`MemoryCounterStore`]: crate::MemoryCounterStore
#[derive(Debug, Clone)]
pub struct SequenceAllocator<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S> SequenceAllocator<S>
where
    S: CounterStore,
{
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// The last value handed out for `name`, without allocating.
    ///
    /// Callers use this to probe a sequence before deciding whether it
    /// needs [`Self::ensure_at_least`]. Absent sequences read as `0`.
    pub async fn read(&self, name: &SequenceName) -> Result<u64, S::Error> {
        Ok(self.store.read(name).await?)
    }

    /// Reserves the next `count` ids of `name` as one contiguous range.
    ///
    /// The returned range is `[prior + 1 ..= prior + count]` for whichever
    /// `prior` the winning conditional write observed. The first successful
    /// allocation against an absent sequence both creates and initializes
    /// its row.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyRange`] if `count` is zero.
    /// - [`Error::Overflow`] if the counter cannot advance by `count`
    ///   without wrapping. Nothing is written.
    /// - [`Error::Contention`] if every bounded attempt lost its race. The
    ///   sequence is untouched by this call and the whole operation may be
    ///   retried.
    /// - [`Error::Backend`] for any store failure, unchanged.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub async fn allocate_range(
        &self,
        name: &SequenceName,
        count: u64,
    ) -> Result<IdRange, S::Error> {
        if count == 0 {
            return Err(Error::EmptyRange);
        }

        for _ in 0..self.policy.cas_attempts {
            let prior = self.store.read(name).await?;
            let next = prior.checked_add(count).ok_or_else(|| Error::Overflow {
                sequence: name.clone(),
            })?;

            match self.store.compare_and_swap(name, prior, next).await? {
                CasOutcome::Committed => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(sequence = %name, first = prior + 1, last = next, "allocated range");
                    return Ok(IdRange::new(prior + 1, next));
                }
                CasOutcome::LostRace => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(sequence = %name, "conditional write lost a race");
                }
            }
        }

        Err(Error::Contention {
            sequence: name.clone(),
            attempts: self.policy.cas_attempts,
        })
    }

    /// Reserves a single fresh id. Shorthand for a one-element
    /// [`Self::allocate_range`].
    pub async fn allocate_one(&self, name: &SequenceName) -> Result<u64, S::Error> {
        Ok(self.allocate_range(name, 1).await?.first())
    }

    /// Raises `name` so that its stored value is at least `floor`.
    ///
    /// After return, `read(name) >= floor`. If that already held, nothing
    /// is written. A concurrent allocation racing ahead of the
    /// reconciliation is never clobbered backward: the conditional write
    /// loses, the loop re-reads, and observes it has nothing left to raise.
    ///
    /// Floors are the caller's responsibility and inherently approximate,
    /// typically `MAX(primaryKey)` from a paginated scan of an
    /// eventually-consistent table. The promise is "at least", never
    /// "exactly".
    ///
    /// # Errors
    ///
    /// [`Error::Contention`] if every bounded attempt lost its race while
    /// the value still needed raising; [`Error::Backend`] for store
    /// failures.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub async fn ensure_at_least(&self, name: &SequenceName, floor: u64) -> Result<(), S::Error> {
        for _ in 0..self.policy.cas_attempts {
            let current = self.store.read(name).await?;
            if current >= floor {
                return Ok(());
            }

            match self.store.compare_and_swap(name, current, floor).await? {
                CasOutcome::Committed => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(sequence = %name, from = current, to = floor, "reconciled counter");
                    return Ok(());
                }
                CasOutcome::LostRace => {}
            }
        }

        Err(Error::Contention {
            sequence: name.clone(),
            attempts: self.policy.cas_attempts,
        })
    }
}
