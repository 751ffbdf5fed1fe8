//! Scheduled cash flows: one-shot fixed rows and recurring monthly rows.
//!
//! Rows come from external tables (loaded by an outer layer) and carry a
//! flow type that selects an inflation category. Amounts are scaled by that
//! category's cumulative modifier from the simulation start year. Negative
//! amounts are withdrawals; withdrawals from tax-advantaged buckets before
//! the taxable-eligibility month are routed to Cash instead, because the
//! sheltered bucket cannot actually be tapped yet.

use serde::{Deserialize, Serialize};

use crate::bucket::{Buckets, CASH_BUCKET};
use crate::error::{SimulationWarning, Warnings};
use crate::ledger::{FlowKind, Ledger};
use crate::market::InflationSeries;
use crate::money::round_dollars;
use crate::month::Month;

/// A one-shot transaction keyed to a single month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRow {
    pub month: Month,
    pub bucket: String,
    pub amount: i64,
    pub flow_type: String,
    pub description: String,
}

/// A monthly transaction active between two months (no end = open-ended).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRow {
    pub start_month: Month,
    pub end_month: Option<Month>,
    pub bucket: String,
    pub amount: i64,
    pub flow_type: String,
    pub description: String,
}

impl RecurringRow {
    fn active(&self, month: Month) -> bool {
        self.start_month <= month && self.end_month.is_none_or(|end| month <= end)
    }
}

/// All fixed rows for a trial, applied by month match.
#[derive(Debug, Clone)]
pub struct FixedSchedule {
    rows: Vec<FixedRow>,
    taxable_eligibility: Option<Month>,
}

impl FixedSchedule {
    pub fn new(rows: Vec<FixedRow>, taxable_eligibility: Option<Month>) -> Self {
        Self {
            rows,
            taxable_eligibility,
        }
    }

    pub fn apply(
        &mut self,
        buckets: &mut Buckets,
        month: Month,
        inflation: &InflationSeries,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) {
        for row in self.rows.iter().filter(|r| r.month == month) {
            apply_row(
                buckets,
                month,
                &row.bucket,
                row.amount,
                &row.flow_type,
                &row.description,
                self.taxable_eligibility,
                inflation,
                ledger,
                warnings,
            );
        }
    }
}

/// All recurring rows for a trial, applied while their window is active.
#[derive(Debug, Clone)]
pub struct RecurringSchedule {
    rows: Vec<RecurringRow>,
    taxable_eligibility: Option<Month>,
}

impl RecurringSchedule {
    pub fn new(rows: Vec<RecurringRow>, taxable_eligibility: Option<Month>) -> Self {
        Self {
            rows,
            taxable_eligibility,
        }
    }

    pub fn apply(
        &mut self,
        buckets: &mut Buckets,
        month: Month,
        inflation: &InflationSeries,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) {
        for row in self.rows.iter().filter(|r| r.active(month)) {
            apply_row(
                buckets,
                month,
                &row.bucket,
                row.amount,
                &row.flow_type,
                &row.description,
                self.taxable_eligibility,
                inflation,
                ledger,
                warnings,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_row(
    buckets: &mut Buckets,
    month: Month,
    bucket_name: &str,
    base_amount: i64,
    flow_type: &str,
    description: &str,
    taxable_eligibility: Option<Month>,
    inflation: &InflationSeries,
    ledger: &mut Ledger,
    warnings: &mut Warnings,
) {
    let Some(bucket) = buckets.get(bucket_name) else {
        warnings.push(SimulationWarning::BucketNotFound {
            month,
            bucket: bucket_name.to_string(),
        });
        return;
    };

    let multiplier = inflation.category_modifier(flow_type, month.year);
    let amount = round_dollars(base_amount as f64 * multiplier);

    if amount >= 0 {
        buckets
            .get_mut(bucket_name)
            .unwrap()
            .deposit(amount, description, month, FlowKind::Deposit, ledger);
        return;
    }

    let needed = -amount;

    // Pre-eligibility gating: a sheltered bucket cannot be tapped yet, so
    // the outflow comes from liquidity instead.
    if bucket.kind.is_tax_advantaged()
        && let Some(eligibility) = taxable_eligibility
        && month < eligibility
    {
        if let Some(cash) = buckets.get_mut(CASH_BUCKET) {
            tracing::debug!(
                target: "glidepath",
                "{month} — routed ${needed} withdrawal from '{bucket_name}' to Cash (pre-eligibility)"
            );
            cash.withdraw(needed, description, month, ledger, warnings);
        }
        return;
    }

    if bucket.cash_fallback {
        buckets.withdraw_with_cash_fallback(
            bucket_name,
            needed,
            description,
            month,
            ledger,
            warnings,
        );
    } else if let Some(bucket) = buckets.get_mut(bucket_name) {
        bucket.withdraw(needed, description, month, ledger, warnings);
    }
}
