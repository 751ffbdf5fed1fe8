//! Unemployment benefits over a fixed window.
//!
//! Ordinary income for tax purposes, but not wages: no payroll tax applies.

use crate::bucket::Buckets;
use crate::error::{SimulationWarning, Warnings};
use crate::ledger::{FlowKind, Ledger};
use crate::month::Month;
use crate::transaction::TaxFlows;

#[derive(Debug, Clone)]
pub struct UnemploymentTransaction {
    start: Month,
    end: Month,
    monthly_amount: i64,
    target: String,
    last: TaxFlows,
}

impl UnemploymentTransaction {
    pub fn new(start: Month, end: Month, monthly_amount: i64, target: impl Into<String>) -> Self {
        Self {
            start,
            end,
            monthly_amount,
            target: target.into(),
            last: TaxFlows::default(),
        }
    }

    pub fn apply(
        &mut self,
        buckets: &mut Buckets,
        month: Month,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) {
        self.last = TaxFlows::default();
        if month < self.start || month > self.end || self.monthly_amount <= 0 {
            return;
        }
        let Some(bucket) = buckets.get_mut(&self.target) else {
            warnings.push(SimulationWarning::BucketNotFound {
                month,
                bucket: self.target.clone(),
            });
            return;
        };
        bucket.deposit(
            self.monthly_amount,
            "Unemployment",
            month,
            FlowKind::Deposit,
            ledger,
        );
        self.last.unemployment = self.monthly_amount;
    }

    pub fn tax_flows(&self) -> TaxFlows {
        self.last
    }
}
