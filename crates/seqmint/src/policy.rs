/// Retry bounds for the subsystem's two optimistic loops.
///
/// There is intentionally no backoff: every retry is immediate. That is
/// acceptable for low-frequency administrative creates, where contention is
/// the exception, and keeps a timed-out backend call from ever leaving a
/// half-applied increment behind: the conditional write either committed
/// or it did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum consecutive conditional-write attempts inside
    /// [`SequenceAllocator::allocate_range`] and
    /// [`SequenceAllocator::ensure_at_least`] before giving up with
    /// [`Error::Contention`].
    ///
    /// [`SequenceAllocator::allocate_range`]: crate::SequenceAllocator::allocate_range
    /// [`SequenceAllocator::ensure_at_least`]: crate::SequenceAllocator::ensure_at_least
    /// [`Error::Contention`]: crate::Error::Contention
    pub cas_attempts: u32,

    /// Maximum full allocate → check → create cycles inside
    /// [`IdCreator::create_with_fresh_id`] before giving up with
    /// [`Error::NoFreeId`].
    ///
    /// [`IdCreator::create_with_fresh_id`]: crate::IdCreator::create_with_fresh_id
    /// [`Error::NoFreeId`]: crate::Error::NoFreeId
    pub create_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_CAS_ATTEMPTS: u32 = 16;
    pub const DEFAULT_CREATE_ATTEMPTS: u32 = 50;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            cas_attempts: Self::DEFAULT_CAS_ATTEMPTS,
            create_attempts: Self::DEFAULT_CREATE_ATTEMPTS,
        }
    }
}
