use crate::SequenceName;

/// A result type whose error is [`Error`], generic over the backend error.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// All failures the allocation subsystem can surface.
///
/// The generic parameter `E` is the error type of the backing
/// [`CounterStore`](crate::CounterStore) (and, for the creation protocol,
/// the [`EntityTable`](crate::EntityTable)). Backend failures cross this
/// boundary unchanged in [`Error::Backend`]; everything else is a verdict
/// reached by the subsystem itself.
///
/// Only two conditions are ever recovered internally: a lost
/// compare-and-swap race (retried up to the CAS bound) and an occupied
/// candidate id (reconciled and retried up to the creation cap). Once either
/// bound is exceeded, the corresponding variant here is returned and no
/// further retries happen. [`Error::NoFreeId`] in particular must reach the
/// end user as an explicit failure, not be silently retried by outer layers.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E> {
    /// The conditional-write loop lost every one of its bounded attempts.
    ///
    /// Contention on admin-creation sequences is expected to be rare, so
    /// this usually indicates an unusually hot sequence or a misbehaving
    /// backend. The whole operation may simply be retried.
    #[error("sequence `{sequence}`: conditional write lost {attempts} consecutive races")]
    Contention {
        sequence: SequenceName,
        attempts: u32,
    },

    /// The creation protocol could not find an unoccupied id within its
    /// attempt cap.
    ///
    /// Distinct from [`Error::Contention`]: retrying will walk the same
    /// collision path again, so this is a "tell the user" failure.
    #[error("sequence `{sequence}`: could not assign a free id within {attempts} attempts")]
    NoFreeId {
        sequence: SequenceName,
        attempts: u32,
    },

    /// Advancing the counter would wrap its integer space.
    #[error("sequence `{sequence}`: id space exhausted")]
    Overflow { sequence: SequenceName },

    /// `allocate_range` was asked for zero ids.
    #[error("allocation size must be at least 1")]
    EmptyRange,

    /// Any other backend failure (network, validation, authorization),
    /// propagated unchanged and never retried by this subsystem.
    #[error("backend error: {0}")]
    Backend(#[from] E),
}
