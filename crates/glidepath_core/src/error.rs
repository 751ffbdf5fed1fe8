//! Error and warning taxonomy for a single trial.
//!
//! Configuration problems are fatal for the trial that hits them and surface
//! as a `TrialError` keyed by trial index; other trials are unaffected.
//! Operational hiccups (a missing bucket name in a policy row, an overdrawn
//! non-negative bucket) are warnings: the operation is skipped, the warning
//! is collected on the trial output, and the trial continues.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::month::Month;

/// Unrecoverable errors that abort a single trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialError {
    /// A bucket required by configuration does not exist.
    MissingBucket(String),
    /// Holding weights within a bucket do not sum to ~1.
    InvalidWeights { bucket: String, sum: f64 },
    /// A policy references a source or target bucket that is not configured.
    UnknownPolicyBucket { policy: &'static str, bucket: String },
    /// IRMAA needs the MAGI for a look-back year that is neither in the
    /// profile nor in the already-simulated tax records.
    MissingMagi { year: i16 },
    /// The forecast range is empty (end month before start month).
    EmptyForecastRange { start: Month, end: Month },
}

impl fmt::Display for TrialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialError::MissingBucket(name) => write!(f, "bucket '{name}' not configured"),
            TrialError::InvalidWeights { bucket, sum } => {
                write!(f, "holding weights in '{bucket}' sum to {sum}, expected 1.0")
            }
            TrialError::UnknownPolicyBucket { policy, bucket } => {
                write!(f, "{policy} policy references unknown bucket '{bucket}'")
            }
            TrialError::MissingMagi { year } => {
                write!(f, "MAGI for {year} is required for IRMAA and is not available")
            }
            TrialError::EmptyForecastRange { start, end } => {
                write!(f, "forecast range {start}..={end} contains no months")
            }
        }
    }
}

impl std::error::Error for TrialError {}

pub type Result<T> = std::result::Result<T, TrialError>;

/// A non-fatal condition observed during a trial.
///
/// Warnings never change behavior beyond the documented skip; they exist so
/// callers can see what the trial silently declined to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationWarning {
    /// A transaction row referenced a bucket that does not exist.
    BucketNotFound { month: Month, bucket: String },
    /// A withdrawal was requested from a non-negative bucket with less than
    /// the requested amount; the operation moved nothing.
    InsufficientFunds {
        month: Month,
        bucket: String,
        requested: i64,
        available: i64,
    },
    /// A refill target fell below its threshold but has no per-pass amount.
    RefillAmountMissing { month: Month, target: String },
}

impl fmt::Display for SimulationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationWarning::BucketNotFound { month, bucket } => {
                write!(f, "{month} — bucket '{bucket}' not found, transaction skipped")
            }
            SimulationWarning::InsufficientFunds {
                month,
                bucket,
                requested,
                available,
            } => write!(
                f,
                "{month} — '{bucket}' has ${available} of ${requested} requested, withdrawal skipped"
            ),
            SimulationWarning::RefillAmountMissing { month, target } => {
                write!(f, "{month} — no refill amount configured for '{target}'")
            }
        }
    }
}

/// Collector for trial warnings. Each push also emits a `tracing` warning so
/// log-based observers see the same stream.
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    collected: Vec<SimulationWarning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: SimulationWarning) {
        tracing::warn!(target: "glidepath", "{warning}");
        self.collected.push(warning);
    }

    pub fn into_vec(self) -> Vec<SimulationWarning> {
        self.collected
    }

    pub fn as_slice(&self) -> &[SimulationWarning] {
        &self.collected
    }

    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }
}
