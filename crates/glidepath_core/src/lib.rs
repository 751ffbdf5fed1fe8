//! Policy-driven Monte Carlo forecasting engine for long-horizon personal
//! finance scenarios.
//!
//! Each trial evolves an ordered set of named balance containers ("buckets")
//! across monthly ticks, applying a fixed pipeline: scheduled cash flows,
//! policy-driven income and withdrawals, stochastic market returns, threshold
//! refills, forced liquidations, and a tax accrual/settlement subsystem. Every
//! debit and credit lands in an append-only audit ledger. Trials are
//! independent, seeded by trial index, and run in parallel.
//!
//! The crate exposes typed configuration inputs and typed per-trial outputs;
//! parsing, persistence, and chart rendering belong to outer layers.

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod bucket;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod market;
pub mod money;
pub mod month;
pub mod policy;
pub mod scheduled;
pub mod simulation;
pub mod tax;
pub mod transaction;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use bucket::{Bucket, BucketKind, Buckets, Holding, CASH_BUCKET, TAX_COLLECTION_BUCKET};
pub use config::SimulationConfig;
pub use error::{SimulationWarning, TrialError, Warnings};
pub use ledger::{FlowKind, Ledger, LedgerEntry};
pub use month::Month;
pub use simulation::{TrialOutput, run_trial, run_trials};
