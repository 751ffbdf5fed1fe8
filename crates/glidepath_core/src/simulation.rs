//! Trial driver: one seeded trial, or a parallel batch of them.
//!
//! Trials are data-parallel and share nothing mutable; the configuration is
//! read-only behind a shared reference. Each trial's RNG is seeded from its
//! trial index, so any trial can be reproduced bit-for-bit in isolation.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::engine::{ForecastEngine, MonthlySnapshot};
use crate::error::{SimulationWarning, TrialError};
use crate::ledger::LedgerEntry;
use crate::market::MonthlyReturnRecord;
use crate::tax::log::TaxRecord;

/// Everything one trial produced, keyed by its trial index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutput {
    pub trial_index: u64,
    /// Strictly ascending by month.
    pub snapshots: Vec<MonthlySnapshot>,
    /// Ascending by year.
    pub tax_records: Vec<TaxRecord>,
    /// Tick order.
    pub monthly_returns: Vec<MonthlyReturnRecord>,
    /// Emission order.
    pub ledger: Vec<LedgerEntry>,
    pub warnings: Vec<SimulationWarning>,
}

/// Run a single trial to completion.
pub fn run_trial(config: &SimulationConfig, trial_index: u64) -> Result<TrialOutput, TrialError> {
    let engine = ForecastEngine::new(config, trial_index)?;
    let output = engine.run()?;
    Ok(TrialOutput {
        trial_index,
        snapshots: output.snapshots,
        tax_records: output.tax_records,
        monthly_returns: output.monthly_returns,
        ledger: output.ledger.into_entries(),
        warnings: output.warnings.into_vec(),
    })
}

/// Run `num_trials` independent trials in parallel. Results come back in
/// trial-index order; a failed trial carries its error without affecting
/// the others.
pub fn run_trials(
    config: &SimulationConfig,
    num_trials: u64,
) -> Vec<Result<TrialOutput, TrialError>> {
    (0..num_trials)
        .into_par_iter()
        .map(|trial_index| run_trial(config, trial_index))
        .collect()
}
