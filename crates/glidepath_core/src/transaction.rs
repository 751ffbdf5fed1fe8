//! The common transaction contract.
//!
//! Every money movement the engine drives — scheduled rows, policy flows,
//! refills, liquidations — is one variant of `Transaction`. Each tick the
//! engine calls `apply` once and then reads `tax_flows`, which reports the
//! *last applied month's* contribution to every tax category. Variants fill
//! in only the categories they touch; everything else stays zero.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::bucket::Buckets;
use crate::error::Warnings;
use crate::ledger::Ledger;
use crate::market::InflationSeries;
use crate::month::Month;
use crate::policy::property::{PropertyTransaction, RentTransaction};
use crate::policy::refill::RefillTransaction;
use crate::policy::rmd::RmdTransaction;
use crate::policy::salary::SalaryTransaction;
use crate::policy::sepp::SeppTransaction;
use crate::policy::social_security::SocialSecurityTransaction;
use crate::policy::unemployment::UnemploymentTransaction;
use crate::scheduled::{FixedSchedule, RecurringSchedule};

/// One month's tax-relevant flow breakdown from a single transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxFlows {
    /// Taxable wage income (pre-tax retirement deferrals excluded).
    pub salary: i64,
    /// Unemployment benefits (ordinary income, no payroll tax).
    pub unemployment: i64,
    /// Gross Social Security benefits received.
    pub social_security: i64,
    /// Tax-deferred withdrawals taxed as ordinary income.
    pub ordinary_withdrawal: i64,
    /// Gross realized gains.
    pub realized_gain: i64,
    /// Taxable portion of realized gains.
    pub taxable_gain: i64,
    /// Withdrawals from tax-free buckets (reported, never taxed).
    pub tax_free_withdrawal: i64,
    /// Interest from Fixed-Income holdings in taxable buckets.
    pub fixed_income_interest: i64,
    /// Withdrawals drawn from fixed-income holdings.
    pub fixed_income_withdrawal: i64,
    /// Early tax-deferred withdrawals subject to the 10% penalty.
    pub penalty_eligible_withdrawal: i64,
}

impl AddAssign for TaxFlows {
    fn add_assign(&mut self, rhs: Self) {
        self.salary += rhs.salary;
        self.unemployment += rhs.unemployment;
        self.social_security += rhs.social_security;
        self.ordinary_withdrawal += rhs.ordinary_withdrawal;
        self.realized_gain += rhs.realized_gain;
        self.taxable_gain += rhs.taxable_gain;
        self.tax_free_withdrawal += rhs.tax_free_withdrawal;
        self.fixed_income_interest += rhs.fixed_income_interest;
        self.fixed_income_withdrawal += rhs.fixed_income_withdrawal;
        self.penalty_eligible_withdrawal += rhs.penalty_eligible_withdrawal;
    }
}

/// Sum type over every transaction the engine can drive.
#[derive(Debug, Clone)]
pub enum Transaction {
    Fixed(FixedSchedule),
    Recurring(RecurringSchedule),
    Salary(SalaryTransaction),
    SocialSecurity(SocialSecurityTransaction),
    Rmd(RmdTransaction),
    Sepp(SeppTransaction),
    Property(PropertyTransaction),
    Rent(RentTransaction),
    Unemployment(UnemploymentTransaction),
    Refill(RefillTransaction),
}

impl Transaction {
    /// Mutate bucket balances and the ledger for month `month`. Getters
    /// afterwards return this month's effect.
    pub fn apply(
        &mut self,
        buckets: &mut Buckets,
        month: Month,
        inflation: &InflationSeries,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) {
        match self {
            Transaction::Fixed(tx) => tx.apply(buckets, month, inflation, ledger, warnings),
            Transaction::Recurring(tx) => tx.apply(buckets, month, inflation, ledger, warnings),
            Transaction::Salary(tx) => tx.apply(buckets, month, ledger),
            Transaction::SocialSecurity(tx) => tx.apply(buckets, month, inflation, ledger, warnings),
            Transaction::Rmd(tx) => tx.apply(buckets, month, ledger),
            Transaction::Sepp(tx) => tx.apply(buckets, month, ledger),
            Transaction::Property(tx) => tx.apply(buckets, month, inflation, ledger, warnings),
            Transaction::Rent(tx) => tx.apply(buckets, month, inflation, ledger, warnings),
            Transaction::Unemployment(tx) => tx.apply(buckets, month, ledger, warnings),
            Transaction::Refill(tx) => tx.apply(buckets, month, ledger),
        }
    }

    /// The last applied month's tax-relevant flows.
    pub fn tax_flows(&self) -> TaxFlows {
        match self {
            // Scheduled rows are external spending/income with no tax
            // classification of their own
            Transaction::Fixed(_) | Transaction::Recurring(_) => TaxFlows::default(),
            Transaction::Salary(tx) => tx.tax_flows(),
            Transaction::SocialSecurity(tx) => tx.tax_flows(),
            Transaction::Rmd(tx) => tx.tax_flows(),
            Transaction::Sepp(tx) => tx.tax_flows(),
            Transaction::Property(_) | Transaction::Rent(_) => TaxFlows::default(),
            Transaction::Unemployment(tx) => tx.tax_flows(),
            Transaction::Refill(tx) => tx.tax_flows(),
        }
    }
}
