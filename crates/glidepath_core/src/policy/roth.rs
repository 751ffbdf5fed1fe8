//! Roth conversion phases and the year-end headroom search.
//!
//! Conversions are decided once a year, in December, by the engine: for the
//! phase whose age window covers the current year (and whose source bucket
//! still holds enough to bother), find the largest conversion that keeps
//! the year's effective tax rate at or under the phase's ceiling. The
//! effective-rate curve is close to monotone but not guaranteed to be, so
//! the search walks $1,000 candidates from the top down instead of
//! bisecting.

use serde::{Deserialize, Serialize};

/// Candidate spacing for the headroom search.
pub const HEADROOM_STEP: i64 = 1_000;

/// One age-banded conversion rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RothPhase {
    /// Inclusive age window for this phase.
    pub age_min: u8,
    pub age_max: u8,
    pub source: String,
    pub target: String,
    /// Source balance below which conversion is not worth the paperwork.
    pub source_threshold: i64,
    pub max_conversion: i64,
    /// Effective-rate ceiling the conversion must not breach.
    pub max_tax_rate: f64,
    pub allow_conversion: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RothConversionPolicy {
    pub phases: Vec<RothPhase>,
}

impl RothConversionPolicy {
    /// The first phase whose age window contains `age`.
    pub fn phase_for_age(&self, age: u8) -> Option<&RothPhase> {
        self.phases
            .iter()
            .find(|p| p.age_min <= age && age <= p.age_max)
    }
}

/// Largest conversion in `[0, max_conversion]` whose effective rate stays
/// at or under `max_rate`, probing $1,000 candidates from the top down.
/// Returns 0 when no candidate qualifies.
pub fn headroom_search(
    max_conversion: i64,
    max_rate: f64,
    rate_for: impl Fn(i64) -> f64,
) -> i64 {
    if max_conversion <= 0 || max_rate <= 0.0 {
        return 0;
    }
    let mut candidate = max_conversion;
    while candidate > 0 {
        if rate_for(candidate) <= max_rate {
            return candidate;
        }
        // Step down to the next $1,000 boundary
        let next = (candidate - 1) / HEADROOM_STEP * HEADROOM_STEP;
        candidate = next;
    }
    0
}
