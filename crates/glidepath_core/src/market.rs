//! Inflation series and regime-gated market returns.
//!
//! Each trial draws one realized inflation rate per year from a Gaussian
//! profile, plus an independent series per spending category (property
//! taxes, rent, ...) used to scale scheduled flows. Market returns are
//! sampled monthly per asset class: the year's realized inflation selects a
//! Low/Average/High regime against per-class thresholds, and one Gaussian
//! draw per class is applied to every holding of that class.

use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::bucket::{BucketKind, Buckets};
use crate::ledger::{FlowKind, Ledger};
use crate::money::round_dollars;
use crate::month::Month;

/// Asset class whose gains in taxable buckets are ordinary interest income.
pub const FIXED_INCOME_CLASS: &str = "Fixed-Income";

/// Gaussian parameters for an annual inflation draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflationProfile {
    pub mean: f64,
    pub std_dev: f64,
}

impl InflationProfile {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        Normal::new(self.mean, self.std_dev).unwrap().sample(rng)
    }
}

/// One year's realized inflation and the cumulative modifier from the base
/// year (the product of `1 + rate` over every year up to and including it).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearRate {
    pub rate: f64,
    pub modifier: f64,
}

/// Per-trial inflation draws: a baseline series plus one series per
/// spending category that configures its own profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InflationSeries {
    base_year: i16,
    years: BTreeMap<i16, YearRate>,
    categories: BTreeMap<String, BTreeMap<i16, YearRate>>,
}

fn draw_series<R: Rng + ?Sized>(
    years: &[i16],
    profile: &InflationProfile,
    rng: &mut R,
) -> BTreeMap<i16, YearRate> {
    let mut out = BTreeMap::new();
    let mut modifier = 1.0;
    for &year in years {
        let rate = profile.sample(rng);
        modifier *= 1.0 + rate;
        out.insert(year, YearRate { rate, modifier });
    }
    out
}

impl InflationSeries {
    /// Draw the baseline series and every category series. Draw order is
    /// fixed (baseline first, then categories in name order) so a given seed
    /// always produces the same trial.
    pub fn generate<R: Rng + ?Sized>(
        years: &[i16],
        baseline: &InflationProfile,
        categories: &BTreeMap<String, InflationProfile>,
        rng: &mut R,
    ) -> Self {
        let base_year = years.first().copied().unwrap_or(0);
        let baseline_series = draw_series(years, baseline, rng);
        let category_series = categories
            .iter()
            .map(|(name, profile)| (name.clone(), draw_series(years, profile, rng)))
            .collect();
        Self {
            base_year,
            years: baseline_series,
            categories: category_series,
        }
    }

    pub fn base_year(&self) -> i16 {
        self.base_year
    }

    /// Realized baseline rate for a year (0 outside the simulated range).
    pub fn rate(&self, year: i16) -> f64 {
        self.years.get(&year).map(|y| y.rate).unwrap_or(0.0)
    }

    /// Cumulative baseline modifier from the base year through `year`.
    /// Years past the range hold at the final modifier; years before it
    /// are unscaled.
    pub fn modifier(&self, year: i16) -> f64 {
        Self::series_modifier(&self.years, year)
    }

    /// Cumulative modifier for a spending category, falling back to the
    /// baseline series for categories without their own profile.
    pub fn category_modifier(&self, category: &str, year: i16) -> f64 {
        match self.categories.get(category) {
            Some(series) => Self::series_modifier(series, year),
            None => self.modifier(year),
        }
    }

    fn series_modifier(series: &BTreeMap<i16, YearRate>, year: i16) -> f64 {
        if let Some(entry) = series.get(&year) {
            return entry.modifier;
        }
        // Hold at the boundary values outside the simulated range
        match series.range(..=year).next_back() {
            Some((_, entry)) => entry.modifier,
            None => 1.0,
        }
    }

    pub fn years(&self) -> impl Iterator<Item = (i16, &YearRate)> {
        self.years.iter().map(|(y, r)| (*y, r))
    }
}

/// Return regime selected by the year's realized inflation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Low,
    Average,
    High,
}

/// Gaussian parameters for one asset class in one regime (monthly return).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    pub mean: f64,
    pub std_dev: f64,
}

/// Monthly return distributions for one asset class across the regimes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeTable {
    pub low: RegimeParams,
    pub average: RegimeParams,
    pub high: RegimeParams,
}

impl RegimeTable {
    pub fn params(&self, regime: Regime) -> RegimeParams {
        match regime {
            Regime::Low => self.low,
            Regime::Average => self.average,
            Regime::High => self.high,
        }
    }
}

/// Inflation cut points gating an asset class between regimes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    pub low_cut: f64,
    pub high_cut: f64,
}

impl RegimeThresholds {
    pub fn classify(&self, inflation_rate: f64) -> Regime {
        if inflation_rate < self.low_cut {
            Regime::Low
        } else if inflation_rate > self.high_cut {
            Regime::High
        } else {
            Regime::Average
        }
    }
}

/// Sampled returns and metadata for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturnRecord {
    pub month: Month,
    pub inflation_rate: f64,
    /// One sampled monthly return per asset class, shared by every holding
    /// of that class this tick.
    pub returns: BTreeMap<String, f64>,
}

/// What a market pass produced besides balance mutations.
#[derive(Debug, Clone)]
pub struct MarketOutcome {
    pub record: MonthlyReturnRecord,
    /// Positive Fixed-Income deltas inside taxable buckets, reported as
    /// ordinary interest income for the year.
    pub fixed_income_interest: i64,
}

/// Per-asset-class regime tables and thresholds, shared read-only across
/// trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketModel {
    pub gain_table: BTreeMap<String, RegimeTable>,
    pub thresholds: BTreeMap<String, RegimeThresholds>,
}

impl MarketModel {
    pub fn regime(&self, asset_class: &str, inflation_rate: f64) -> Regime {
        self.thresholds
            .get(asset_class)
            .map(|t| t.classify(inflation_rate))
            .unwrap_or(Regime::Average)
    }

    /// Apply one month of market movement to every holding.
    ///
    /// Runs after scheduled and policy flows so returns operate on the
    /// post-transaction balances. Gains and losses are attributed per
    /// holding in the ledger.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        buckets: &mut Buckets,
        month: Month,
        inflation_rate: f64,
        rng: &mut R,
        ledger: &mut Ledger,
    ) -> MarketOutcome {
        let mut returns = BTreeMap::new();
        for (class, table) in &self.gain_table {
            let params = table.params(self.regime(class, inflation_rate));
            let sampled = Normal::new(params.mean, params.std_dev)
                .unwrap()
                .sample(rng);
            returns.insert(class.clone(), sampled);
        }

        let mut fixed_income_interest = 0;
        for bucket in buckets.iter_mut() {
            let bucket_name = bucket.name.clone();
            let taxable = bucket.kind == BucketKind::Taxable;
            for index in 0..bucket.holdings.len() {
                let holding = &bucket.holdings[index];
                let Some(rate) = returns.get(&holding.asset_class) else {
                    continue;
                };
                let delta = round_dollars(holding.amount as f64 * rate);
                if delta == 0 {
                    continue;
                }
                let class = holding.asset_class.clone();
                bucket.apply_holding_delta(index, delta);
                if delta > 0 {
                    let label = if taxable && class == FIXED_INCOME_CLASS {
                        fixed_income_interest += delta;
                        "Fixed Income Interest".to_string()
                    } else {
                        format!("Market Gains {class}")
                    };
                    ledger.record(month, label, bucket_name.clone(), delta, FlowKind::Gain);
                } else {
                    ledger.record(
                        month,
                        bucket_name.clone(),
                        format!("Market Losses {class}"),
                        -delta,
                        FlowKind::Loss,
                    );
                }
            }
        }

        MarketOutcome {
            record: MonthlyReturnRecord {
                month,
                inflation_rate,
                returns,
            },
            fixed_income_interest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Bucket, Holding};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn fixed_table(rate: f64) -> RegimeTable {
        let fixed = RegimeParams {
            mean: rate,
            std_dev: 0.0,
        };
        RegimeTable {
            low: fixed,
            average: fixed,
            high: fixed,
        }
    }

    fn one_holding_bucket(name: &str, kind: BucketKind, class: &str, balance: i64) -> Bucket {
        Bucket::new(
            name,
            kind,
            vec![Holding {
                asset_class: class.into(),
                weight: 1.0,
                amount: 0,
                cost_basis: None,
            }],
            balance,
            false,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_inflation_series_deterministic_per_seed() {
        let years: Vec<i16> = (2030..=2040).collect();
        let profile = InflationProfile {
            mean: 0.03,
            std_dev: 0.02,
        };
        let categories = BTreeMap::from([(
            "Rent".to_string(),
            InflationProfile {
                mean: 0.04,
                std_dev: 0.01,
            },
        )]);

        let a = InflationSeries::generate(&years, &profile, &categories, &mut SmallRng::seed_from_u64(7));
        let b = InflationSeries::generate(&years, &profile, &categories, &mut SmallRng::seed_from_u64(7));
        for year in 2030..=2040 {
            assert_eq!(a.rate(year), b.rate(year));
            assert_eq!(a.category_modifier("Rent", year), b.category_modifier("Rent", year));
        }
    }

    #[test]
    fn test_modifier_is_cumulative_product() {
        let years: Vec<i16> = (2030..=2032).collect();
        let profile = InflationProfile {
            mean: 0.10,
            std_dev: 0.0,
        };
        let series =
            InflationSeries::generate(&years, &profile, &BTreeMap::new(), &mut SmallRng::seed_from_u64(1));
        assert!((series.modifier(2030) - 1.10).abs() < 1e-12);
        assert!((series.modifier(2031) - 1.21).abs() < 1e-12);
        assert!((series.modifier(2032) - 1.331).abs() < 1e-12);
        // Holds at the boundary outside the range
        assert!((series.modifier(2040) - 1.331).abs() < 1e-12);
        assert!((series.modifier(2020) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_modifier_monotone_under_nonnegative_rates() {
        let years: Vec<i16> = (2030..=2060).collect();
        let profile = InflationProfile {
            mean: 0.05,
            std_dev: 0.0,
        };
        let series =
            InflationSeries::generate(&years, &profile, &BTreeMap::new(), &mut SmallRng::seed_from_u64(3));
        let mut prev = 0.0;
        for (_, rate) in series.years() {
            assert!(rate.modifier >= prev);
            prev = rate.modifier;
        }
    }

    #[test]
    fn test_regime_selection() {
        let thresholds = RegimeThresholds {
            low_cut: 0.01,
            high_cut: 0.05,
        };
        assert_eq!(thresholds.classify(0.005), Regime::Low);
        assert_eq!(thresholds.classify(0.01), Regime::Average);
        assert_eq!(thresholds.classify(0.03), Regime::Average);
        assert_eq!(thresholds.classify(0.051), Regime::High);
    }

    #[test]
    fn test_apply_attributes_gain_and_interest() {
        let model = MarketModel {
            gain_table: BTreeMap::from([
                ("Stocks".to_string(), fixed_table(0.02)),
                (FIXED_INCOME_CLASS.to_string(), fixed_table(0.01)),
            ]),
            thresholds: BTreeMap::new(),
        };
        let mut buckets = Buckets::new(vec![
            one_holding_bucket("Brokerage Bonds", BucketKind::Taxable, FIXED_INCOME_CLASS, 100_000),
            one_holding_bucket("IRA", BucketKind::TaxDeferred, "Stocks", 50_000),
        ]);
        let mut ledger = Ledger::new();
        let mut rng = SmallRng::seed_from_u64(0);

        let outcome = model.apply(&mut buckets, Month::new(2030, 1), 0.03, &mut rng, &mut ledger);

        // Fixed income inside a taxable bucket is interest income
        assert_eq!(outcome.fixed_income_interest, 1_000);
        assert_eq!(buckets.balance_of("Brokerage Bonds"), 101_000);
        assert_eq!(buckets.balance_of("IRA"), 51_000);
        assert_eq!(outcome.record.returns.len(), 2);

        let interest_entry = ledger
            .entries()
            .iter()
            .find(|e| e.source == "Fixed Income Interest")
            .unwrap();
        assert_eq!(interest_entry.amount, 1_000);
        assert_eq!(interest_entry.kind, FlowKind::Gain);
    }

    #[test]
    fn test_apply_records_losses() {
        let model = MarketModel {
            gain_table: BTreeMap::from([("Stocks".to_string(), fixed_table(-0.10))]),
            thresholds: BTreeMap::new(),
        };
        let mut buckets = Buckets::new(vec![one_holding_bucket(
            "Brokerage",
            BucketKind::Taxable,
            "Stocks",
            10_000,
        )]);
        let mut ledger = Ledger::new();
        let mut rng = SmallRng::seed_from_u64(0);

        model.apply(&mut buckets, Month::new(2030, 1), 0.03, &mut rng, &mut ledger);
        assert_eq!(buckets.balance_of("Brokerage"), 9_000);
        let loss = ledger.of_kind(FlowKind::Loss).next().unwrap();
        assert_eq!(loss.amount, 1_000);
        assert_eq!(loss.source, "Brokerage");
    }

    #[test]
    fn test_unknown_class_untouched() {
        let model = MarketModel {
            gain_table: BTreeMap::from([("Stocks".to_string(), fixed_table(0.5))]),
            thresholds: BTreeMap::new(),
        };
        let mut buckets = Buckets::new(vec![one_holding_bucket(
            "Garage",
            BucketKind::Other,
            "Vehicles",
            20_000,
        )]);
        let mut ledger = Ledger::new();
        let mut rng = SmallRng::seed_from_u64(0);
        model.apply(&mut buckets, Month::new(2030, 1), 0.0, &mut rng, &mut ledger);
        assert_eq!(buckets.balance_of("Garage"), 20_000);
        assert!(ledger.is_empty());
    }
}
