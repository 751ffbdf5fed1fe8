//! Shared scenario scaffolding for the integration tests.

use std::collections::BTreeMap;

use crate::bucket::{BucketKind, CASH_BUCKET, TAX_COLLECTION_BUCKET};
use crate::config::{
    BucketConfig, HoldingConfig, InflationConfig, MedicareConfig, Profile, RefillConfig,
    SimulationConfig,
};
use crate::market::MarketModel;
use crate::month::Month;
use crate::tax::brackets::RawTaxTables;
use crate::tax::premiums::{MarketplacePremiums, MedicarePremiums};
use crate::tax::log::YtdBaseline;

pub fn bucket_cfg(name: &str, kind: BucketKind, asset_class: &str) -> BucketConfig {
    BucketConfig {
        name: name.into(),
        bucket_type: kind,
        holdings: vec![HoldingConfig {
            asset_class: asset_class.into(),
            weight: 1.0,
            cost_basis: None,
        }],
        may_go_negative: kind == BucketKind::Cash,
        cash_fallback: false,
    }
}

/// A quiet baseline: Cash + Tax Collection, no flows, no inflation, no
/// market movement, no policies. Tests layer scenarios on top.
pub fn base_config(start: Month, end: Month) -> SimulationConfig {
    SimulationConfig {
        start_month: start,
        profile: Profile {
            birth_date: jiff::civil::date(1975, 6, 15),
            dependent_birth_date: None,
            end_month: end,
            magi: BTreeMap::new(),
            ytd_baseline: YtdBaseline::default(),
            married_filing_jointly: true,
            retirement_month: None,
        },
        buckets: vec![
            bucket_cfg(CASH_BUCKET, BucketKind::Cash, "Cash"),
            bucket_cfg(TAX_COLLECTION_BUCKET, BucketKind::Other, "Cash"),
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

/// Flat-rate single-jurisdiction tables with no deduction, for scenarios
/// that need round-number tax amounts.
pub fn flat_tax_tables(rate: f64) -> RawTaxTables {
    use crate::tax::brackets::Bracket;
    RawTaxTables {
        standard_deduction: 0,
        ordinary: BTreeMap::from([(
            "federal".to_string(),
            vec![Bracket {
                min_income: 0,
                rate,
            }],
        )]),
        social_security_wage: Vec::new(),
        medicare: Vec::new(),
        long_term_gains: vec![Bracket {
            min_income: 0,
            rate: 0.0,
        }],
        ss_taxability: vec![Bracket {
            min_income: 0,
            rate: 0.0,
        }],
        penalty_rate: 0.10,
    }
}

/// Balance of `bucket` in the final snapshot of a trial.
pub fn final_balance(output: &crate::simulation::TrialOutput, bucket: &str) -> i64 {
    output
        .snapshots
        .last()
        .and_then(|snap| {
            snap.balances
                .iter()
                .find(|(name, _)| name == bucket)
                .map(|(_, balance)| *balance)
        })
        .unwrap_or(0)
}
