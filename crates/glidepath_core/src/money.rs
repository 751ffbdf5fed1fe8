//! Whole-dollar monetary helpers.
//!
//! Bucket and ledger state is kept in integer dollars; intermediate tax and
//! growth math runs in `f64` and is rounded back on emission. Ties round to
//! even so repeated proportional splits carry no directional bias.

/// Round a dollar amount to the nearest whole dollar, ties to even.
#[inline]
pub fn round_dollars(amount: f64) -> i64 {
    amount.round_ties_even() as i64
}

/// Split `total` across `shares` proportionally, assigning the rounding
/// residual to the final share so the parts always sum to `total` exactly.
pub fn split_proportional(total: i64, shares: &[f64]) -> Vec<i64> {
    if shares.is_empty() {
        return Vec::new();
    }
    let mut parts: Vec<i64> = shares
        .iter()
        .map(|s| round_dollars(total as f64 * s))
        .collect();
    let assigned: i64 = parts.iter().sum();
    if let Some(last) = parts.last_mut() {
        *last += total - assigned;
    }
    parts
}
