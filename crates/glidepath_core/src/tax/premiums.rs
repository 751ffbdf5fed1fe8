//! Health-insurance premium schedules: ACA marketplace before Medicare,
//! IRMAA-adjusted Medicare premiums from 65 on.
//!
//! Marketplace coverage charges the lesser of the configured plan premium
//! and 8.5% of prior-year MAGI (the stricter of the two documented
//! policies). IRMAA looks MAGI up two years back and adds the tier's Part
//! B/D surcharges to the base premiums, doubled for a married couple.

use serde::{Deserialize, Serialize};

use crate::money::round_dollars;

/// Configured monthly marketplace plan premiums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplacePremiums {
    pub family_monthly: i64,
    pub couple_monthly: i64,
}

impl MarketplacePremiums {
    /// Monthly charge: the plan premium, capped at 8.5% of prior-year MAGI
    /// when that MAGI is known.
    pub fn monthly_charge(&self, family_plan: bool, prior_year_magi: Option<i64>) -> i64 {
        let plan = if family_plan {
            self.family_monthly
        } else {
            self.couple_monthly
        };
        match prior_year_magi {
            Some(magi) => plan.min(round_dollars(magi as f64 * 0.085 / 12.0)),
            None => plan,
        }
    }
}

/// Monthly Medicare base premiums before any surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicarePremiums {
    pub part_b: i64,
    pub part_d: i64,
}

/// One IRMAA tier: MAGI at or under `magi_cap` pays these surcharges.
/// Tiers are sorted ascending; the top tier's cap is `i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrmaaTier {
    pub magi_cap: i64,
    pub part_b_surcharge: i64,
    pub part_d_surcharge: i64,
}

/// 2025 MFJ IRMAA tiers, for tests and defaults.
#[must_use]
pub fn irmaa_tiers_mfj_2025() -> Vec<IrmaaTier> {
    vec![
        IrmaaTier { magi_cap: 212_000, part_b_surcharge: 0, part_d_surcharge: 0 },
        IrmaaTier { magi_cap: 266_000, part_b_surcharge: 74, part_d_surcharge: 14 },
        IrmaaTier { magi_cap: 334_000, part_b_surcharge: 185, part_d_surcharge: 35 },
        IrmaaTier { magi_cap: 400_000, part_b_surcharge: 296, part_d_surcharge: 57 },
        IrmaaTier { magi_cap: 750_000, part_b_surcharge: 406, part_d_surcharge: 79 },
        IrmaaTier { magi_cap: i64::MAX, part_b_surcharge: 443, part_d_surcharge: 86 },
    ]
}

/// Monthly Medicare premium for a MAGI under the given tiers, with the
/// dollar caps indexed by `factor`. Doubled when filing jointly (both
/// spouses pay premiums).
pub fn irmaa_monthly_premium(
    magi: i64,
    base: MedicarePremiums,
    tiers: &[IrmaaTier],
    factor: f64,
    married_filing_jointly: bool,
) -> i64 {
    let tier = tiers
        .iter()
        .find(|t| {
            let cap = if t.magi_cap == i64::MAX {
                i64::MAX
            } else {
                round_dollars(t.magi_cap as f64 * factor)
            };
            magi <= cap
        })
        .or(tiers.last());

    let (b_sur, d_sur) = tier
        .map(|t| (t.part_b_surcharge, t.part_d_surcharge))
        .unwrap_or((0, 0));
    let per_person = base.part_b + base.part_d + b_sur + d_sur;
    if married_filing_jointly {
        per_person * 2
    } else {
        per_person
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: MedicarePremiums = MedicarePremiums {
        part_b: 185,
        part_d: 46,
    };

    #[test]
    fn test_marketplace_cap_binds_at_low_magi() {
        let premiums = MarketplacePremiums {
            family_monthly: 1_800,
            couple_monthly: 1_200,
        };
        // 8.5% of 60k = 5100/year = 425/month, below the plan premium
        assert_eq!(premiums.monthly_charge(false, Some(60_000)), 425);
        // High MAGI: the plan premium is the binding value
        assert_eq!(premiums.monthly_charge(false, Some(1_000_000)), 1_200);
        assert_eq!(premiums.monthly_charge(true, Some(1_000_000)), 1_800);
        // Unknown MAGI: no cap to apply
        assert_eq!(premiums.monthly_charge(false, None), 1_200);
    }

    #[test]
    fn test_irmaa_base_tier() {
        let monthly = irmaa_monthly_premium(100_000, BASE, &irmaa_tiers_mfj_2025(), 1.0, false);
        assert_eq!(monthly, 185 + 46);
    }

    #[test]
    fn test_irmaa_surcharge_tier_doubled_for_mfj() {
        let monthly = irmaa_monthly_premium(300_000, BASE, &irmaa_tiers_mfj_2025(), 1.0, true);
        assert_eq!(monthly, (185 + 46 + 185 + 35) * 2);
    }

    #[test]
    fn test_irmaa_top_tier_is_unbounded() {
        let monthly = irmaa_monthly_premium(5_000_000, BASE, &irmaa_tiers_mfj_2025(), 1.0, false);
        assert_eq!(monthly, 185 + 46 + 443 + 86);
    }

    #[test]
    fn test_irmaa_caps_are_indexed() {
        // 220k breaches the 212k cap today, but not once indexed by 1.10
        let today = irmaa_monthly_premium(220_000, BASE, &irmaa_tiers_mfj_2025(), 1.0, false);
        let later = irmaa_monthly_premium(220_000, BASE, &irmaa_tiers_mfj_2025(), 1.10, false);
        assert!(today > later);
        assert_eq!(later, 185 + 46);
    }
}
