//! Progressive bracket evaluation and inflation indexing.
//!
//! A bracket list is sorted by `min_income`; each bracket's upper bound is
//! the next bracket's minimum, and the top bracket extends to infinity.
//! Every dollar threshold in the raw tables (including the standard
//! deduction) is indexed each simulation year by the cumulative inflation
//! modifier from the base year.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::money::round_dollars;

/// One progressive bracket: the rate applied above `min_income`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub min_income: i64,
    pub rate: f64,
}

/// Piecewise-linear progressive tax over sorted brackets.
pub fn bracket_progressive(income: f64, brackets: &[Bracket]) -> f64 {
    if income <= 0.0 || brackets.is_empty() {
        return 0.0;
    }
    let mut tax = 0.0;
    for (i, bracket) in brackets.iter().enumerate() {
        let lower = bracket.min_income as f64;
        if income <= lower {
            break;
        }
        let upper = brackets
            .get(i + 1)
            .map(|b| b.min_income as f64)
            .unwrap_or(f64::INFINITY);
        tax += (income.min(upper) - lower) * bracket.rate;
    }
    tax
}

/// Scale a bracket list's dollar thresholds by an inflation factor.
pub fn indexed(brackets: &[Bracket], factor: f64) -> Vec<Bracket> {
    brackets
        .iter()
        .map(|b| Bracket {
            min_income: round_dollars(b.min_income as f64 * factor),
            rate: b.rate,
        })
        .collect()
}

/// The raw tax tables for the simulation base year. Shared read-only
/// across trials; per-year views are produced by indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTaxTables {
    pub standard_deduction: i64,
    /// Ordinary brackets grouped by jurisdiction (federal, state, local).
    pub ordinary: BTreeMap<String, Vec<Bracket>>,
    /// Social Security payroll tax: flat rate up to the wage base.
    pub social_security_wage: Vec<Bracket>,
    /// Medicare payroll tax, including the surtax threshold.
    pub medicare: Vec<Bracket>,
    /// Long-term capital gains brackets.
    pub long_term_gains: Vec<Bracket>,
    /// Provisional-income thresholds → Social Security inclusion rates.
    pub ss_taxability: Vec<Bracket>,
    /// Early-withdrawal penalty rate on penalty-eligible amounts.
    pub penalty_rate: f64,
}

impl RawTaxTables {
    /// 2025 married-filing-jointly tables, for tests and defaults.
    #[must_use]
    pub fn mfj_2025() -> Self {
        Self {
            standard_deduction: 30_000,
            ordinary: BTreeMap::from([(
                "federal".to_string(),
                vec![
                    Bracket { min_income: 0, rate: 0.10 },
                    Bracket { min_income: 23_850, rate: 0.12 },
                    Bracket { min_income: 96_950, rate: 0.22 },
                    Bracket { min_income: 206_700, rate: 0.24 },
                    Bracket { min_income: 394_600, rate: 0.32 },
                    Bracket { min_income: 501_050, rate: 0.35 },
                    Bracket { min_income: 751_600, rate: 0.37 },
                ],
            )]),
            social_security_wage: vec![
                Bracket { min_income: 0, rate: 0.062 },
                Bracket { min_income: 176_100, rate: 0.0 },
            ],
            medicare: vec![
                Bracket { min_income: 0, rate: 0.0145 },
                Bracket { min_income: 250_000, rate: 0.0235 },
            ],
            long_term_gains: vec![
                Bracket { min_income: 0, rate: 0.0 },
                Bracket { min_income: 96_700, rate: 0.15 },
                Bracket { min_income: 600_050, rate: 0.20 },
            ],
            ss_taxability: vec![
                Bracket { min_income: 0, rate: 0.0 },
                Bracket { min_income: 32_000, rate: 0.5 },
                Bracket { min_income: 44_000, rate: 0.85 },
            ],
            penalty_rate: 0.10,
        }
    }
}
