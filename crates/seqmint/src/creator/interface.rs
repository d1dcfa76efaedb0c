use core::future::Future;

/// Outcome of an [`EntityTable::insert`] attempt.
///
/// A last-moment duplicate (the row appeared between the existence check
/// and the insert) is data, not an error: the creation protocol recovers
/// from it by reconciling and retrying. Everything reported through `Err`
/// is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion<T> {
    /// The row was created under the candidate id.
    Created(T),
    /// A row under the candidate id already existed at write time.
    Conflict,
}

/// The per-entity seam supplied by each creation workflow.
///
/// One implementation per entity kind (clients, customers, taxes,
/// warehouses, payment types, document types, products, companies, …),
/// keyed by the integer id drawn from that entity's sequence. The allocator
/// guarantees the *slot*; row creation is a separate, fallible step that
/// [`IdCreator`](crate::IdCreator) coordinates through this trait.
pub trait EntityTable {
    /// Whatever the workflow wants back for a created row: the row
    /// itself, its id, or a lightweight reference.
    type Entity;
    type Error;

    /// Whether a row with this id already exists.
    fn contains(&self, id: u64) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Attempts to create a row under `id`.
    ///
    /// A duplicate/conflict verdict from the backend must surface as
    /// [`Insertion::Conflict`], not as an error; any other failure is
    /// fatal and must surface as `Err`.
    fn insert(&self, id: u64) -> impl Future<Output = Result<Insertion<Self::Entity>, Self::Error>>;

    /// The table's current maximum id, or `0` when empty.
    ///
    /// Used to derive reconciliation floors, typically from a full
    /// paginated scan. Against an eventually-consistent store this is a
    /// best-effort observation, which is all reconciliation requires.
    fn max_id(&self) -> impl Future<Output = Result<u64, Self::Error>>;
}
