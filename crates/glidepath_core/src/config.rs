//! Typed simulation inputs.
//!
//! Everything a trial needs arrives through `SimulationConfig`: bucket
//! shapes and seed balances, scheduled-flow tables, policies, tax tables,
//! premium schedules, inflation profiles, and the market gain table. The
//! config is immutable and shared by reference across trial threads; every
//! type derives serde so the outer loader can bind CSV/JSON rows directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bucket::{Bucket, BucketKind, Buckets, CASH_BUCKET, TAX_COLLECTION_BUCKET};
use crate::error::TrialError;
use crate::market::{InflationProfile, MarketModel};
use crate::month::Month;
use crate::policy::roth::RothConversionPolicy;
use crate::scheduled::{FixedRow, RecurringRow};
use crate::tax::brackets::RawTaxTables;
use crate::tax::log::YtdBaseline;
use crate::tax::premiums::{IrmaaTier, MarketplacePremiums, MedicarePremiums};

/// Months after birth at which tax-advantaged buckets open up (59½).
pub const TAXABLE_ELIGIBILITY_AGE_MONTHS: i32 = 59 * 12 + 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingConfig {
    pub asset_class: String,
    pub weight: f64,
    #[serde(default)]
    pub cost_basis: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    pub bucket_type: BucketKind,
    pub holdings: Vec<HoldingConfig>,
    #[serde(default)]
    pub may_go_negative: bool,
    #[serde(default)]
    pub cash_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryConfig {
    pub annual_gross: i64,
    #[serde(default)]
    pub annual_bonus: i64,
    pub bonus_month: i8,
    #[serde(default)]
    pub merit_rate: f64,
    pub merit_month: i8,
    pub retirement_month: Month,
    /// Bucket name → share of each paycheck; shares sum to 1.
    pub targets: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialSecurityConfig {
    pub birth_month: Month,
    /// Monthly benefit at full retirement age, start-year dollars.
    pub full_benefit: i64,
    pub start_age_months: i32,
    #[serde(default = "default_full_age_months")]
    pub full_age_months: i32,
    #[serde(default = "default_payout_pct")]
    pub payout_pct: f64,
    #[serde(default = "default_cash_target")]
    pub target: String,
}

fn default_full_age_months() -> i32 {
    67 * 12
}

fn default_payout_pct() -> f64 {
    1.0
}

fn default_cash_target() -> String {
    CASH_BUCKET.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmdConfig {
    #[serde(default = "default_rmd_start_age")]
    pub start_age: u8,
    pub rmd_month: i8,
    /// Bucket name → share of the annual distribution.
    pub targets: BTreeMap<String, f64>,
}

fn default_rmd_start_age() -> u8 {
    75
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeppConfig {
    pub start_month: Month,
    pub end_month: Month,
    pub source: String,
    pub target: String,
    /// Amortization interest rate (annual).
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub remaining_principal: i64,
    pub apr: f64,
    pub monthly_payment: i64,
    pub monthly_taxes: i64,
    pub monthly_insurance: i64,
    pub annual_maintenance_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentConfig {
    pub monthly_rent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnemploymentConfig {
    pub start_month: Month,
    pub end_month: Month,
    pub monthly_amount: i64,
    #[serde(default = "default_cash_target")]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillConfig {
    pub thresholds: BTreeMap<String, i64>,
    pub amounts: BTreeMap<String, i64>,
    pub sources: BTreeMap<String, Vec<String>>,
    pub liquidation_threshold: i64,
    pub liquidation_sources: Vec<String>,
    pub liquidation_targets: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflationConfig {
    pub mean: f64,
    pub std_dev: f64,
    /// Per-category profiles; categories not listed use the baseline.
    #[serde(default)]
    pub categories: BTreeMap<String, InflationProfile>,
}

impl InflationConfig {
    pub fn baseline(&self) -> InflationProfile {
        InflationProfile {
            mean: self.mean,
            std_dev: self.std_dev,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicareConfig {
    pub base: MedicarePremiums,
    pub irmaa_tiers: Vec<IrmaaTier>,
}

/// The household being simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub birth_date: jiff::civil::Date,
    #[serde(default)]
    pub dependent_birth_date: Option<jiff::civil::Date>,
    pub end_month: Month,
    /// Historical MAGI by year, for IRMAA and marketplace look-backs.
    #[serde(default)]
    pub magi: BTreeMap<i16, i64>,
    #[serde(default)]
    pub ytd_baseline: YtdBaseline,
    #[serde(default)]
    pub married_filing_jointly: bool,
    /// When the marketplace-premium gate closes. Defaults to the salary
    /// policy's retirement month.
    #[serde(default)]
    pub retirement_month: Option<Month>,
}

impl Profile {
    pub fn birth_month(&self) -> Month {
        Month::from(self.birth_date)
    }

    pub fn dependent_birth_month(&self) -> Option<Month> {
        self.dependent_birth_date.map(Month::from)
    }

    /// Age in whole years during the given month.
    pub fn age_at(&self, month: Month) -> u8 {
        (month.months_since(self.birth_month()).max(0) / 12) as u8
    }

    /// First month tax-advantaged buckets may be tapped (59½).
    pub fn taxable_eligibility(&self) -> Month {
        self.birth_month().add_months(TAXABLE_ELIGIBILITY_AGE_MONTHS)
    }
}

/// Complete configuration for a forecast. Construct once, share by
/// reference into every trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub start_month: Month,
    pub profile: Profile,
    pub buckets: Vec<BucketConfig>,
    /// Starting balance per bucket (from the last history row).
    pub seed_balances: BTreeMap<String, i64>,
    #[serde(default)]
    pub fixed_rows: Vec<FixedRow>,
    #[serde(default)]
    pub recurring_rows: Vec<RecurringRow>,
    #[serde(default)]
    pub salary: Option<SalaryConfig>,
    #[serde(default)]
    pub social_security: Vec<SocialSecurityConfig>,
    #[serde(default)]
    pub rmd: Option<RmdConfig>,
    #[serde(default)]
    pub roth: Option<RothConversionPolicy>,
    #[serde(default)]
    pub sepp: Option<SeppConfig>,
    #[serde(default)]
    pub property: Option<PropertyConfig>,
    #[serde(default)]
    pub rent: Option<RentConfig>,
    #[serde(default)]
    pub unemployment: Option<UnemploymentConfig>,
    pub refill: RefillConfig,
    pub tax_tables: RawTaxTables,
    pub medicare: MedicareConfig,
    pub marketplace: MarketplacePremiums,
    pub inflation: InflationConfig,
    pub market: MarketModel,
}

impl SimulationConfig {
    /// Every tick of the forecast, in order.
    pub fn forecast_months(&self) -> Result<Vec<Month>, TrialError> {
        let months = Month::range_inclusive(self.start_month, self.profile.end_month);
        if months.is_empty() {
            return Err(TrialError::EmptyForecastRange {
                start: self.start_month,
                end: self.profile.end_month,
            });
        }
        Ok(months)
    }

    /// The marketplace gate: premiums run while the month is before this.
    pub fn retirement_month(&self) -> Option<Month> {
        self.profile
            .retirement_month
            .or(self.salary.as_ref().map(|s| s.retirement_month))
    }

    /// Build the per-trial bucket set from shapes and seed balances.
    pub fn build_buckets(&self) -> Result<Buckets, TrialError> {
        let mut buckets = Vec::with_capacity(self.buckets.len());
        for cfg in &self.buckets {
            let balance = self.seed_balances.get(&cfg.name).copied().unwrap_or(0);
            let holdings = cfg
                .holdings
                .iter()
                .map(|h| crate::bucket::Holding {
                    asset_class: h.asset_class.clone(),
                    weight: h.weight,
                    amount: 0,
                    cost_basis: h.cost_basis,
                })
                .collect();
            buckets.push(Bucket::new(
                cfg.name.clone(),
                cfg.bucket_type,
                holdings,
                balance,
                cfg.may_go_negative,
                cfg.cash_fallback,
            )?);
        }
        Ok(Buckets::new(buckets))
    }

    /// Fatal configuration checks, run before the first tick.
    pub fn validate(&self) -> Result<(), TrialError> {
        for required in [CASH_BUCKET, TAX_COLLECTION_BUCKET] {
            if !self.buckets.iter().any(|b| b.name == required) {
                return Err(TrialError::MissingBucket(required.to_string()));
            }
        }
        for cfg in &self.buckets {
            let sum: f64 = cfg.holdings.iter().map(|h| h.weight).sum();
            if cfg.holdings.is_empty() || (sum - 1.0).abs() > 1e-6 {
                return Err(TrialError::InvalidWeights {
                    bucket: cfg.name.clone(),
                    sum,
                });
            }
        }

        let known = |name: &String| self.buckets.iter().any(|b| &b.name == name);
        let check = |policy: &'static str, name: &String| {
            if known(name) {
                Ok(())
            } else {
                Err(TrialError::UnknownPolicyBucket {
                    policy,
                    bucket: name.clone(),
                })
            }
        };

        if let Some(salary) = &self.salary {
            for name in salary.targets.keys() {
                check("salary", name)?;
            }
        }
        for ss in &self.social_security {
            check("social security", &ss.target)?;
        }
        if let Some(rmd) = &self.rmd {
            for name in rmd.targets.keys() {
                check("rmd", name)?;
            }
        }
        if let Some(sepp) = &self.sepp {
            check("sepp", &sepp.source)?;
            check("sepp", &sepp.target)?;
        }
        if let Some(roth) = &self.roth {
            for phase in &roth.phases {
                check("roth conversion", &phase.source)?;
                check("roth conversion", &phase.target)?;
            }
        }
        if let Some(unemployment) = &self.unemployment {
            check("unemployment", &unemployment.target)?;
        }
        for (target, sources) in &self.refill.sources {
            check("refill", target)?;
            for source in sources {
                check("refill", source)?;
            }
        }
        for source in &self.refill.liquidation_sources {
            check("liquidation", source)?;
        }
        for target in self.refill.liquidation_targets.keys() {
            check("liquidation", target)?;
        }

        self.forecast_months()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> SimulationConfig {
        SimulationConfig {
            start_month: Month::new(2030, 1),
            profile: Profile {
                birth_date: jiff::civil::date(1975, 6, 15),
                dependent_birth_date: None,
                end_month: Month::new(2032, 12),
                magi: BTreeMap::new(),
                ytd_baseline: YtdBaseline::default(),
                married_filing_jointly: true,
                retirement_month: None,
            },
            buckets: vec![
                BucketConfig {
                    name: CASH_BUCKET.into(),
                    bucket_type: BucketKind::Cash,
                    holdings: vec![HoldingConfig {
                        asset_class: "Cash".into(),
                        weight: 1.0,
                        cost_basis: None,
                    }],
                    may_go_negative: true,
                    cash_fallback: false,
                },
                BucketConfig {
                    name: TAX_COLLECTION_BUCKET.into(),
                    bucket_type: BucketKind::Other,
                    holdings: vec![HoldingConfig {
                        asset_class: "Cash".into(),
                        weight: 1.0,
                        cost_basis: None,
                    }],
                    may_go_negative: false,
                    cash_fallback: false,
                },
            ],
            seed_balances: BTreeMap::from([(CASH_BUCKET.to_string(), 50_000)]),
            fixed_rows: Vec::new(),
            recurring_rows: Vec::new(),
            salary: None,
            social_security: Vec::new(),
            rmd: None,
            roth: None,
            sepp: None,
            property: None,
            rent: None,
            unemployment: None,
            refill: RefillConfig {
                thresholds: BTreeMap::new(),
                amounts: BTreeMap::new(),
                sources: BTreeMap::new(),
                liquidation_threshold: 0,
                liquidation_sources: Vec::new(),
                liquidation_targets: BTreeMap::new(),
            },
            tax_tables: RawTaxTables::mfj_2025(),
            medicare: MedicareConfig {
                base: MedicarePremiums {
                    part_b: 185,
                    part_d: 46,
                },
                irmaa_tiers: crate::tax::premiums::irmaa_tiers_mfj_2025(),
            },
            marketplace: MarketplacePremiums {
                family_monthly: 1_800,
                couple_monthly: 1_200,
            },
            inflation: InflationConfig {
                mean: 0.0,
                std_dev: 0.0,
                categories: BTreeMap::new(),
            },
            market: MarketModel {
                gain_table: BTreeMap::new(),
                thresholds: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn test_minimal_config_validates() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_missing_cash_bucket_is_fatal() {
        let mut config = minimal_config();
        config.buckets[0].name = "Checking".into();
        assert_eq!(
            config.validate().unwrap_err(),
            TrialError::MissingBucket(CASH_BUCKET.to_string())
        );
    }

    #[test]
    fn test_unknown_policy_bucket_is_fatal() {
        let mut config = minimal_config();
        config.refill.liquidation_sources = vec!["Ghost".into()];
        assert!(matches!(
            config.validate().unwrap_err(),
            TrialError::UnknownPolicyBucket { policy: "liquidation", .. }
        ));
    }

    #[test]
    fn test_bad_weights_are_fatal() {
        let mut config = minimal_config();
        config.buckets[0].holdings[0].weight = 0.9;
        assert!(matches!(
            config.validate().unwrap_err(),
            TrialError::InvalidWeights { .. }
        ));
    }

    #[test]
    fn test_empty_range_is_fatal() {
        let mut config = minimal_config();
        config.profile.end_month = Month::new(2029, 1);
        assert!(matches!(
            config.validate().unwrap_err(),
            TrialError::EmptyForecastRange { .. }
        ));
    }

    #[test]
    fn test_eligibility_month_is_59_and_a_half() {
        let config = minimal_config();
        // Born 1975-06 → 59½ at 2034-12
        assert_eq!(config.profile.taxable_eligibility(), Month::new(2034, 12));
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = minimal_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
