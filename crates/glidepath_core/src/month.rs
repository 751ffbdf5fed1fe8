//! Calendar-month arithmetic for the forecast loop.
//!
//! The simulation ticks at monthly granularity, so the hot loop works with a
//! compact (year, month) pair instead of full `jiff` civil dates. Arithmetic
//! is O(1) over a flat month index; `jiff` conversions are provided at the
//! configuration boundary where callers hold real dates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A calendar month: year plus month 1..=12.
///
/// Ordering is calendar order (derived field order is year, then month).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Month {
    pub year: i16,
    pub month: i8,
}

impl Month {
    pub fn new(year: i16, month: i8) -> Self {
        debug_assert!((1..=12).contains(&month), "month out of range: {month}");
        Self { year, month }
    }

    /// Flat month index (year * 12 + zero-based month), used for arithmetic.
    #[inline]
    fn index(self) -> i32 {
        self.year as i32 * 12 + (self.month as i32 - 1)
    }

    #[inline]
    fn from_index(idx: i32) -> Self {
        Self {
            year: idx.div_euclid(12) as i16,
            month: (idx.rem_euclid(12) + 1) as i8,
        }
    }

    /// The month `n` calendar months after (or before, if negative) this one.
    #[inline]
    pub fn add_months(self, n: i32) -> Self {
        Self::from_index(self.index() + n)
    }

    /// The next calendar month.
    #[inline]
    pub fn succ(self) -> Self {
        self.add_months(1)
    }

    /// Whole months elapsed since `earlier` (negative if `earlier` is later).
    #[inline]
    pub fn months_since(self, earlier: Month) -> i32 {
        self.index() - earlier.index()
    }

    #[inline]
    pub fn is_december(self) -> bool {
        self.month == 12
    }

    /// Every month from `start` through `end`, inclusive. Empty when
    /// `end < start`.
    pub fn range_inclusive(start: Month, end: Month) -> Vec<Month> {
        (start.index()..=end.index()).map(Self::from_index).collect()
    }

    /// The first day of this month as a civil date.
    pub fn first_day(self) -> jiff::civil::Date {
        jiff::civil::date(self.year, self.month, 1)
    }
}

impl From<jiff::civil::Date> for Month {
    fn from(date: jiff::civil::Date) -> Self {
        Self::new(date.year(), date.month())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
