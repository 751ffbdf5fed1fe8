//! Social Security benefits with standard claim-age adjustment.
//!
//! The configured full benefit is what the profile holder would receive at
//! full retirement age. Claiming early reduces it by 5/9 of a percent per
//! month for the first 36 months and 5/12 of a percent beyond; claiming
//! late earns 2/3 of a percent per month in delayed credits up to age 70.
//! Benefits are indexed by cumulative inflation and scaled by the payout
//! percentage (a haircut for projected trust-fund shortfalls).

use crate::bucket::Buckets;
use crate::error::{SimulationWarning, Warnings};
use crate::ledger::{FlowKind, Ledger};
use crate::market::InflationSeries;
use crate::money::round_dollars;
use crate::month::Month;
use crate::transaction::TaxFlows;

const DELAYED_CREDIT_CAP_MONTHS: i32 = 70 * 12;

/// SSA reduction/credit factor for claiming `start_age_months` against a
/// full retirement age of `full_age_months`.
pub fn claim_adjustment(start_age_months: i32, full_age_months: i32) -> f64 {
    if start_age_months < full_age_months {
        let early = full_age_months - start_age_months;
        let first = early.min(36) as f64 * (5.0 / 9.0) / 100.0;
        let beyond = (early - 36).max(0) as f64 * (5.0 / 12.0) / 100.0;
        1.0 - first - beyond
    } else {
        let credited = start_age_months.min(DELAYED_CREDIT_CAP_MONTHS) - full_age_months;
        1.0 + credited.max(0) as f64 * (2.0 / 3.0) / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct SocialSecurityTransaction {
    birth_month: Month,
    /// Monthly benefit at full retirement age, in start-year dollars.
    full_benefit: i64,
    start_age_months: i32,
    full_age_months: i32,
    payout_pct: f64,
    target: String,
    last: TaxFlows,
}

impl SocialSecurityTransaction {
    pub fn new(
        birth_month: Month,
        full_benefit: i64,
        start_age_months: i32,
        full_age_months: i32,
        payout_pct: f64,
        target: impl Into<String>,
    ) -> Self {
        Self {
            birth_month,
            full_benefit,
            start_age_months,
            full_age_months,
            payout_pct,
            target: target.into(),
            last: TaxFlows::default(),
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
        self.last = TaxFlows::default();

        let age_months = month.months_since(self.birth_month);
        if age_months < self.start_age_months {
            return;
        }

        let adjustment = claim_adjustment(self.start_age_months, self.full_age_months);
        let monthly = round_dollars(
            self.full_benefit as f64
                * adjustment
                * inflation.modifier(month.year)
                * self.payout_pct,
        );
        if monthly <= 0 {
            return;
        }

        let Some(bucket) = buckets.get_mut(&self.target) else {
            warnings.push(SimulationWarning::BucketNotFound {
                month,
                bucket: self.target.clone(),
            });
            return;
        };
        bucket.deposit(monthly, "Social Security", month, FlowKind::Deposit, ledger);
        self.last.social_security = monthly;
    }

    pub fn tax_flows(&self) -> TaxFlows {
        self.last
    }
}
