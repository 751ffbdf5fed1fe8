//! Salary with merit raises, an annual bonus, and a retirement cutoff.
//!
//! The annual gross compounds by the merit rate once a year at the merit
//! month. Each month one twelfth of the current gross (integer division,
//! December absorbs the remainder so the year sums exactly) is distributed
//! across target buckets by share. Shares routed to tax-deferred buckets
//! are pre-tax: they reduce wages at the source and never enter the salary
//! column of the tax log.

use crate::bucket::Buckets;
use crate::ledger::{FlowKind, Ledger};
use crate::money::round_dollars;
use crate::month::Month;
use crate::transaction::TaxFlows;

#[derive(Debug, Clone)]
pub struct SalaryTransaction {
    annual_gross: i64,
    annual_bonus: i64,
    bonus_month: i8,
    merit_rate: f64,
    merit_month: i8,
    retirement_month: Month,
    /// (bucket name, share of each paycheck), shares sum to 1.
    targets: Vec<(String, f64)>,
    last: TaxFlows,
}

impl SalaryTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        annual_gross: i64,
        annual_bonus: i64,
        bonus_month: i8,
        merit_rate: f64,
        merit_month: i8,
        retirement_month: Month,
        targets: Vec<(String, f64)>,
    ) -> Self {
        Self {
            annual_gross,
            annual_bonus,
            bonus_month,
            merit_rate,
            merit_month,
            retirement_month,
            targets,
            last: TaxFlows::default(),
        }
    }

    /// Current compounded annual gross (grows at each merit month).
    pub fn current_annual_gross(&self) -> i64 {
        self.annual_gross
    }

    pub fn apply(&mut self, buckets: &mut Buckets, month: Month, ledger: &mut Ledger) {
        self.last = TaxFlows::default();
        if month > self.retirement_month {
            return;
        }

        // Merit raise takes effect from the merit month's paycheck onward
        if month.month == self.merit_month && self.merit_rate != 0.0 {
            self.annual_gross = round_dollars(self.annual_gross as f64 * (1.0 + self.merit_rate));
        }

        let monthly_base = self.annual_gross / 12;
        let remainder = self.annual_gross - monthly_base * 12;
        let mut total = monthly_base;
        if month.is_december() {
            total += remainder;
        }
        if month.month == self.bonus_month {
            total += self.annual_bonus;
        }
        if total <= 0 {
            return;
        }

        let mut taxable_salary = 0;
        let shares: Vec<f64> = self.targets.iter().map(|(_, s)| *s).collect();
        let parts = crate::money::split_proportional(total, &shares);
        for ((name, _), part) in self.targets.iter().zip(parts) {
            let Some(bucket) = buckets.get_mut(name) else {
                continue;
            };
            let label = if month.month == self.bonus_month {
                "Salary + Bonus"
            } else {
                "Salary"
            };
            let pre_tax = bucket.kind == crate::bucket::BucketKind::TaxDeferred;
            bucket.deposit(part, label, month, FlowKind::Deposit, ledger);
            if !pre_tax {
                taxable_salary += part;
            }
        }
        self.last.salary = taxable_salary;
    }

    pub fn tax_flows(&self) -> TaxFlows {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Bucket, BucketKind, Holding, CASH_BUCKET};

    fn simple_bucket(name: &str, kind: BucketKind) -> Bucket {
        Bucket::new(
            name,
            kind,
            vec![Holding {
                asset_class: "Cash".into(),
                weight: 1.0,
                amount: 0,
                cost_basis: None,
            }],
            0,
            false,
            false,
        )
        .unwrap()
    }

    fn salary_buckets() -> Buckets {
        Buckets::new(vec![
            simple_bucket(CASH_BUCKET, BucketKind::Cash),
            simple_bucket("401k", BucketKind::TaxDeferred),
        ])
    }

    fn salary(gross: i64, bonus: i64) -> SalaryTransaction {
        SalaryTransaction::new(
            gross,
            bonus,
            3,
            0.0,
            7,
            Month::new(2040, 12),
            vec![(CASH_BUCKET.into(), 0.9), ("401k".into(), 0.1)],
        )
    }

    #[test]
    fn test_year_of_paychecks_sums_to_gross() {
        let mut tx = salary(100_001, 0);
        let mut buckets = salary_buckets();
        let mut ledger = Ledger::new();
        for m in Month::range_inclusive(Month::new(2030, 1), Month::new(2030, 12)) {
            tx.apply(&mut buckets, m, &mut ledger);
        }
        // December remainder closes the integer-division gap
        assert_eq!(
            buckets.balance_of(CASH_BUCKET) + buckets.balance_of("401k"),
            100_001
        );
    }

    #[test]
    fn test_pre_tax_share_excluded_from_salary() {
        let mut tx = salary(120_000, 0);
        let mut buckets = salary_buckets();
        let mut ledger = Ledger::new();
        tx.apply(&mut buckets, Month::new(2030, 1), &mut ledger);
        // 10_000/month: 9_000 to Cash (taxable), 1_000 pre-tax to the 401k
        assert_eq!(buckets.balance_of(CASH_BUCKET), 9_000);
        assert_eq!(buckets.balance_of("401k"), 1_000);
        assert_eq!(tx.tax_flows().salary, 9_000);
    }

    #[test]
    fn test_bonus_month_distributes_by_share() {
        let mut tx = salary(120_000, 24_000);
        let mut buckets = salary_buckets();
        let mut ledger = Ledger::new();
        tx.apply(&mut buckets, Month::new(2030, 3), &mut ledger);
        assert_eq!(buckets.balance_of(CASH_BUCKET), (10_000 + 24_000) * 9 / 10);
        assert_eq!(buckets.balance_of("401k"), (10_000 + 24_000) / 10);
    }

    #[test]
    fn test_merit_compounds_each_year() {
        let mut tx = SalaryTransaction::new(
            120_000,
            0,
            1,
            0.10,
            7,
            Month::new(2040, 12),
            vec![(CASH_BUCKET.into(), 1.0)],
        );
        let mut buckets = salary_buckets();
        let mut ledger = Ledger::new();
        for m in Month::range_inclusive(Month::new(2030, 1), Month::new(2031, 12)) {
            tx.apply(&mut buckets, m, &mut ledger);
        }
        // Two merit months passed (2030-07 and 2031-07)
        assert_eq!(tx.current_annual_gross(), 145_200);
    }

    #[test]
    fn test_all_flows_stop_after_retirement() {
        let mut tx = SalaryTransaction::new(
            120_000,
            50_000,
            3,
            0.05,
            7,
            Month::new(2030, 6),
            vec![(CASH_BUCKET.into(), 1.0)],
        );
        let mut buckets = salary_buckets();
        let mut ledger = Ledger::new();

        tx.apply(&mut buckets, Month::new(2030, 6), &mut ledger);
        let at_retirement = buckets.balance_of(CASH_BUCKET);
        assert!(at_retirement > 0);

        tx.apply(&mut buckets, Month::new(2030, 7), &mut ledger);
        assert_eq!(buckets.balance_of(CASH_BUCKET), at_retirement);
        assert_eq!(tx.tax_flows(), TaxFlows::default());
    }
}
