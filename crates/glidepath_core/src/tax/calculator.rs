//! Annual tax computation over the yearly log.
//!
//! The sequence: AGI from ordinary income plus taxable gains plus the
//! taxable share of Social Security (provisional-income inclusion, capped
//! at 85%); standard deduction; ordinary tax summed across jurisdictions;
//! payroll tax on wages only; long-term gains stacked on top of ordinary
//! taxable income; the 10% early-withdrawal penalty. Every dollar threshold
//! is indexed by cumulative inflation from the base year.

use serde::{Deserialize, Serialize};

use crate::money::round_dollars;
use crate::tax::brackets::{RawTaxTables, bracket_progressive, indexed};
use crate::tax::log::YearlyTaxLog;

/// Full breakdown of one year's tax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub agi: i64,
    pub taxable_income: i64,
    pub taxable_social_security: i64,
    pub ordinary_tax: i64,
    pub payroll_tax: i64,
    pub capital_gains_tax: i64,
    pub penalty_tax: i64,
    pub total_tax: i64,
    pub effective_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculator {
    tables: RawTaxTables,
}

impl TaxCalculator {
    pub fn new(tables: RawTaxTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &RawTaxTables {
        &self.tables
    }

    /// Taxable share of Social Security benefits given the other ordinary
    /// income for the year. `factor` indexes the provisional thresholds.
    pub fn taxable_social_security(&self, ss_benefits: i64, other_income: i64, factor: f64) -> i64 {
        if ss_benefits <= 0 {
            return 0;
        }
        let provisional = other_income as f64 + 0.5 * ss_benefits as f64;
        let thresholds = indexed(&self.tables.ss_taxability, factor);
        let included = bracket_progressive(provisional, &thresholds);
        round_dollars(included.min(0.85 * ss_benefits as f64))
    }

    /// Compute the year's tax from the cumulative log. `factor` is the
    /// cumulative inflation modifier from the base year.
    pub fn compute(&self, log: &YearlyTaxLog, factor: f64) -> TaxBreakdown {
        // Ordinary income other than Social Security
        let other_income = log.salary
            + log.unemployment
            + log.ordinary_withdrawals
            + log.roth_conversions
            + log.fixed_income_interest
            + log.taxable_gains;

        let taxable_ss = self.taxable_social_security(log.social_security, other_income, factor);
        let agi = other_income + taxable_ss;

        let deduction = round_dollars(self.tables.standard_deduction as f64 * factor);
        let taxable_income = (agi - deduction).max(0);

        let ordinary_tax: f64 = self
            .tables
            .ordinary
            .values()
            .map(|brackets| {
                bracket_progressive(taxable_income as f64, &indexed(brackets, factor))
            })
            .sum();

        // Payroll taxes apply to active wages only
        let payroll_tax = bracket_progressive(
            log.salary as f64,
            &indexed(&self.tables.social_security_wage, factor),
        ) + bracket_progressive(log.salary as f64, &indexed(&self.tables.medicare, factor));

        // Long-term gains fill brackets starting at the ordinary floor.
        // The gains are already inside taxable_income; the floor is the
        // ordinary-only remainder.
        let ordinary_floor = (taxable_income - log.taxable_gains).max(0) as f64;
        let ltcg_brackets = indexed(&self.tables.long_term_gains, factor);
        let stacked_gains = (ordinary_floor + log.taxable_gains as f64)
            .min(taxable_income as f64)
            .max(ordinary_floor);
        let capital_gains_tax = bracket_progressive(stacked_gains, &ltcg_brackets)
            - bracket_progressive(ordinary_floor, &ltcg_brackets);

        let penalty_tax = log.penalty_withdrawals as f64 * self.tables.penalty_rate;

        let total = round_dollars(ordinary_tax + payroll_tax + capital_gains_tax + penalty_tax);
        let effective_rate = if agi > 0 {
            total as f64 / agi as f64
        } else {
            0.0
        };

        TaxBreakdown {
            agi,
            taxable_income,
            taxable_social_security: taxable_ss,
            ordinary_tax: round_dollars(ordinary_tax),
            payroll_tax: round_dollars(payroll_tax),
            capital_gains_tax: round_dollars(capital_gains_tax),
            penalty_tax: round_dollars(penalty_tax),
            total_tax: total,
            effective_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::brackets::Bracket;
    use std::collections::BTreeMap;

    fn no_deduction_tables() -> RawTaxTables {
        RawTaxTables {
            standard_deduction: 0,
            ordinary: BTreeMap::from([(
                "federal".to_string(),
                vec![
                    Bracket { min_income: 0, rate: 0.10 },
                    Bracket { min_income: 22_000, rate: 0.12 },
                    Bracket { min_income: 89_450, rate: 0.22 },
                ],
            )]),
            social_security_wage: vec![
                Bracket { min_income: 0, rate: 0.062 },
                Bracket { min_income: 168_600, rate: 0.0 },
            ],
            medicare: vec![Bracket { min_income: 0, rate: 0.0145 }],
            long_term_gains: vec![
                Bracket { min_income: 0, rate: 0.0 },
                Bracket { min_income: 94_050, rate: 0.15 },
            ],
            ss_taxability: vec![
                Bracket { min_income: 0, rate: 0.0 },
                Bracket { min_income: 32_000, rate: 0.5 },
                Bracket { min_income: 44_000, rate: 0.85 },
            ],
            penalty_rate: 0.10,
        }
    }

    #[test]
    fn test_single_jurisdiction_ordinary_tax() {
        let calc = TaxCalculator::new(no_deduction_tables());
        let log = YearlyTaxLog {
            year: 2030,
            ordinary_withdrawals: 100_000,
            ..YearlyTaxLog::new(2030)
        };
        let result = calc.compute(&log, 1.0);
        assert_eq!(result.taxable_income, 100_000);
        assert_eq!(result.ordinary_tax, 12_615);
        assert_eq!(result.payroll_tax, 0, "withdrawals carry no payroll tax");
    }

    #[test]
    fn test_social_security_inclusion_capped() {
        let calc = TaxCalculator::new(no_deduction_tables());
        // SS 30k, other income 50k: provisional 65k
        // 0.5*(44000-32000) + 0.85*(65000-44000) = 6000 + 17850 = 23850
        let taxable = calc.taxable_social_security(30_000, 50_000, 1.0);
        assert_eq!(taxable, 23_850);
        assert!(taxable <= (0.85f64 * 30_000.0) as i64);

        // Very high other income hits the 85% cap
        let capped = calc.taxable_social_security(30_000, 500_000, 1.0);
        assert_eq!(capped, 25_500);
    }

    #[test]
    fn test_payroll_tax_on_salary_only() {
        let calc = TaxCalculator::new(no_deduction_tables());
        let log = YearlyTaxLog {
            salary: 100_000,
            ..YearlyTaxLog::new(2030)
        };
        let result = calc.compute(&log, 1.0);
        let expected = 100_000.0 * 0.062 + 100_000.0 * 0.0145;
        assert_eq!(result.payroll_tax, round_dollars(expected));
    }

    #[test]
    fn test_ltcg_stacks_on_ordinary_floor() {
        let calc = TaxCalculator::new(no_deduction_tables());
        let log = YearlyTaxLog {
            ordinary_withdrawals: 90_000,
            taxable_gains: 20_000,
            ..YearlyTaxLog::new(2030)
        };
        let result = calc.compute(&log, 1.0);
        // Floor 90k; gains span 90k..110k; the 15% LTCG bracket starts at
        // 94,050, so 4,050 of gain rides free and 15,950 is taxed at 15%
        assert_eq!(result.capital_gains_tax, round_dollars(15_950.0 * 0.15));
    }

    #[test]
    fn test_penalty_is_flat_ten_percent() {
        let calc = TaxCalculator::new(no_deduction_tables());
        let log = YearlyTaxLog {
            penalty_withdrawals: 12_000,
            ordinary_withdrawals: 12_000,
            ..YearlyTaxLog::new(2030)
        };
        let result = calc.compute(&log, 1.0);
        assert_eq!(result.penalty_tax, 1_200);
    }

    #[test]
    fn test_effective_rate_zero_when_no_agi() {
        let calc = TaxCalculator::new(no_deduction_tables());
        let result = calc.compute(&YearlyTaxLog::new(2030), 1.0);
        assert_eq!(result.agi, 0);
        assert_eq!(result.effective_rate, 0.0);
        assert_eq!(result.total_tax, 0);
    }

    #[test]
    fn test_tax_bounds_invariants() {
        let calc = TaxCalculator::new(RawTaxTables::mfj_2025());
        let log = YearlyTaxLog {
            salary: 150_000,
            social_security: 20_000,
            ordinary_withdrawals: 30_000,
            taxable_gains: 10_000,
            penalty_withdrawals: 5_000,
            ..YearlyTaxLog::new(2030)
        };
        let result = calc.compute(&log, 1.0);
        assert!(result.taxable_income <= result.agi);
        assert!(result.total_tax <= result.agi);
        assert!(result.effective_rate > 0.0 && result.effective_rate < 1.0);
        assert!(result.taxable_social_security <= (0.85 * 20_000.0) as i64);
    }

    #[test]
    fn test_inflation_indexing_reduces_tax() {
        let calc = TaxCalculator::new(no_deduction_tables());
        let log = YearlyTaxLog {
            ordinary_withdrawals: 100_000,
            ..YearlyTaxLog::new(2030)
        };
        let now = calc.compute(&log, 1.0);
        // Wider brackets after inflation → less tax on the same nominal income
        let later = calc.compute(&log, 1.25);
        assert!(later.total_tax < now.total_tax);
    }

    #[test]
    fn test_roth_conversion_is_ordinary_income() {
        let calc = TaxCalculator::new(no_deduction_tables());
        let converted = YearlyTaxLog {
            roth_conversions: 50_000,
            ..YearlyTaxLog::new(2030)
        };
        let withdrawn = YearlyTaxLog {
            ordinary_withdrawals: 50_000,
            ..YearlyTaxLog::new(2030)
        };
        assert_eq!(
            calc.compute(&converted, 1.0).total_tax,
            calc.compute(&withdrawn, 1.0).total_tax
        );
    }
}
