use core::fmt;
use core::ops::RangeInclusive;

/// A contiguous block of freshly allocated ids, inclusive on both ends.
///
/// Ranges are ephemeral: they exist only as the return value of one
/// allocation call and are never persisted. A range always holds at least
/// one id, and two ranges allocated from the same sequence never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdRange {
    first: u64,
    last: u64,
}

impl IdRange {
    pub(crate) fn new(first: u64, last: u64) -> Self {
        debug_assert!(first >= 1);
        debug_assert!(first <= last);
        Self { first, last }
    }

    pub fn first(&self) -> u64 {
        self.first
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    pub fn contains(&self, id: u64) -> bool {
        self.first <= id && id <= self.last
    }

    pub fn iter(&self) -> RangeInclusive<u64> {
        self.first..=self.last
    }
}

impl IntoIterator for IdRange {
    type Item = u64;
    type IntoIter = RangeInclusive<u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.first..=self.last
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}
