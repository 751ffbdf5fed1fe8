//! Integration tests for the forecast engine.
//!
//! Tests are organized by topic:
//! - `pipeline` - tick ordering, determinism, ledger symmetry
//! - `refill_liquidation` - threshold refills and forced liquidations
//! - `sepp_roth` - SEPP windows and Roth conversion headroom
//! - `taxes` - accrual drip and year-end reconciliation
//! - `premiums` - marketplace and Medicare/IRMAA gating

mod helpers;
