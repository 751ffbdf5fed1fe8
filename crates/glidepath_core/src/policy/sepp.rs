//! Substantially Equal Periodic Payments (IRS 72(t)).
//!
//! At the window's start month the annual payment is fixed by the
//! amortization method — `principal × rate / (1 − (1+rate)^(−N))` where N
//! is the single-life expectancy at the starting age — and one twelfth of
//! it transfers from the tax-deferred source to the target every month of
//! the window. The payments are ordinary income but exempt from the early
//! withdrawal penalty; while the window is open the refill policy must not
//! touch the source (breaking a SEPP schedule retroactively triggers
//! penalties).

use crate::bucket::Buckets;
use crate::ledger::{FlowKind, Ledger};
use crate::money::round_dollars;
use crate::month::Month;
use crate::policy::rmd::LifeExpectancyTable;
use crate::transaction::TaxFlows;

/// Annual 72(t) amortization payment.
pub fn amortized_annual_payment(principal: i64, rate: f64, life_expectancy: f64) -> f64 {
    if principal <= 0 || life_expectancy <= 0.0 {
        return 0.0;
    }
    if rate == 0.0 {
        return principal as f64 / life_expectancy;
    }
    principal as f64 * rate / (1.0 - (1.0 + rate).powf(-life_expectancy))
}

#[derive(Debug, Clone)]
pub struct SeppTransaction {
    start: Month,
    end: Month,
    source: String,
    target: String,
    rate: f64,
    birth_month: Month,
    table: LifeExpectancyTable,
    /// Fixed at the start month for the whole window.
    monthly: Option<i64>,
    last: TaxFlows,
}

impl SeppTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: Month,
        end: Month,
        source: impl Into<String>,
        target: impl Into<String>,
        rate: f64,
        birth_month: Month,
        table: LifeExpectancyTable,
    ) -> Self {
        Self {
            start,
            end,
            source: source.into(),
            target: target.into(),
            rate,
            birth_month,
            table,
            monthly: None,
            last: TaxFlows::default(),
        }
    }

    pub fn window(&self) -> (Month, Month) {
        (self.start, self.end)
    }

    /// The cached monthly payment, once the window has started.
    pub fn monthly_payment(&self) -> Option<i64> {
        self.monthly
    }

    pub fn apply(&mut self, buckets: &mut Buckets, month: Month, ledger: &mut Ledger) {
        self.last = TaxFlows::default();
        if month < self.start || month > self.end {
            return;
        }

        let monthly = match self.monthly {
            Some(m) => m,
            None => {
                let principal = buckets.balance_of(&self.source);
                let age = (self.start.months_since(self.birth_month) / 12) as u8;
                let life_expectancy = self.table.divisor_for_age(age).unwrap_or(0.0);
                let annual = amortized_annual_payment(principal, self.rate, life_expectancy);
                let monthly = round_dollars(annual / 12.0);
                tracing::debug!(
                    target: "glidepath",
                    "{month} — SEPP started: principal ${principal}, annual ${:.0}, monthly ${monthly}",
                    annual
                );
                self.monthly = Some(monthly);
                monthly
            }
        };
        if monthly <= 0 {
            return;
        }

        let moved = buckets.transfer(
            &self.source,
            &self.target,
            monthly,
            month,
            FlowKind::Transfer,
            ledger,
        );
        // Ordinary income, penalty-exempt under 72(t)
        self.last.ordinary_withdrawal = moved;
    }

    pub fn tax_flows(&self) -> TaxFlows {
        self.last
    }
}
