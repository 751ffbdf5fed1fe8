//! Home-ownership carrying costs and the rent that replaces them.
//!
//! While the Property bucket has value, each month Cash pays the fixed
//! principal-and-interest payment (split against the remaining mortgage
//! principal at APR/12), escrow (property taxes and insurance under their
//! own inflation categories), and maintenance proportional to the current
//! market value. Once the principal is gone the P&I stops but escrow and
//! maintenance continue; once the property itself is sold everything stops
//! and the rent transaction takes over.

use crate::bucket::{Buckets, CASH_BUCKET, PROPERTY_BUCKET};
use crate::error::{SimulationWarning, Warnings};
use crate::ledger::Ledger;
use crate::market::InflationSeries;
use crate::money::round_dollars;
use crate::month::Month;

/// Inflation categories for the escrow and upkeep components.
pub const PROPERTY_TAXES_CATEGORY: &str = "Property Taxes";
pub const PROPERTY_INSURANCE_CATEGORY: &str = "Property Insurance";
pub const PROPERTY_MAINTENANCE_CATEGORY: &str = "Property Maintenance";
pub const RENT_CATEGORY: &str = "Rent";

#[derive(Debug, Clone)]
pub struct PropertyTransaction {
    bucket: String,
    remaining_principal: i64,
    apr: f64,
    monthly_payment: i64,
    monthly_taxes: i64,
    monthly_insurance: i64,
    annual_maintenance_rate: f64,
}

impl PropertyTransaction {
    pub fn new(
        remaining_principal: i64,
        apr: f64,
        monthly_payment: i64,
        monthly_taxes: i64,
        monthly_insurance: i64,
        annual_maintenance_rate: f64,
    ) -> Self {
        Self {
            bucket: PROPERTY_BUCKET.to_string(),
            remaining_principal,
            apr,
            monthly_payment,
            monthly_taxes,
            monthly_insurance,
            annual_maintenance_rate,
        }
    }

    pub fn remaining_principal(&self) -> i64 {
        self.remaining_principal
    }

    pub fn apply(
        &mut self,
        buckets: &mut Buckets,
        month: Month,
        inflation: &InflationSeries,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) {
        let market_value = buckets.balance_of(&self.bucket);
        if market_value <= 0 {
            // Sold (or never owned): carrying costs are over
            return;
        }
        if !buckets.contains(CASH_BUCKET) {
            warnings.push(SimulationWarning::BucketNotFound {
                month,
                bucket: CASH_BUCKET.to_string(),
            });
            return;
        }
        let year = month.year;

        let maintenance = round_dollars(
            market_value as f64 * self.annual_maintenance_rate / 12.0
                * inflation.category_modifier(PROPERTY_MAINTENANCE_CATEGORY, year),
        );
        let taxes = round_dollars(
            self.monthly_taxes as f64 * inflation.category_modifier(PROPERTY_TAXES_CATEGORY, year),
        );
        let insurance = round_dollars(
            self.monthly_insurance as f64
                * inflation.category_modifier(PROPERTY_INSURANCE_CATEGORY, year),
        );

        let cash = buckets.get_mut(CASH_BUCKET).unwrap();
        if maintenance > 0 {
            cash.withdraw(maintenance, "Property Maintenance", month, ledger, warnings);
        }
        if taxes > 0 {
            cash.withdraw(taxes, "Property Taxes", month, ledger, warnings);
        }
        if insurance > 0 {
            cash.withdraw(insurance, "Property Insurance", month, ledger, warnings);
        }

        // P&I runs until the principal amortizes away; the payment itself
        // is fixed by the note, not indexed
        if self.remaining_principal > 0 && self.monthly_payment > 0 {
            let interest = round_dollars(self.remaining_principal as f64 * self.apr / 12.0);
            let principal_part = (self.monthly_payment - interest).max(0);
            let (payment, principal_paid) = if principal_part >= self.remaining_principal {
                // Final payment clears the note exactly
                (interest + self.remaining_principal, self.remaining_principal)
            } else {
                (self.monthly_payment, principal_part)
            };
            self.remaining_principal -= principal_paid;
            let cash = buckets.get_mut(CASH_BUCKET).unwrap();
            cash.withdraw(payment, "Mortgage", month, ledger, warnings);
            if self.remaining_principal == 0 {
                tracing::debug!(target: "glidepath", "{month} — mortgage paid off");
            }
        }
    }
}

/// Monthly rent from Cash, but only after the property is gone.
#[derive(Debug, Clone)]
pub struct RentTransaction {
    monthly_rent: i64,
    condition_bucket: String,
}

impl RentTransaction {
    pub fn new(monthly_rent: i64) -> Self {
        Self {
            monthly_rent,
            condition_bucket: PROPERTY_BUCKET.to_string(),
        }
    }

    pub fn apply(
        &mut self,
        buckets: &mut Buckets,
        month: Month,
        inflation: &InflationSeries,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) {
        match buckets.get(&self.condition_bucket) {
            Some(property) if property.balance() > 0 => return,
            None => return,
            _ => {}
        }
        let rent = round_dollars(
            self.monthly_rent as f64 * inflation.category_modifier(RENT_CATEGORY, month.year),
        );
        if rent <= 0 {
            return;
        }
        if let Some(cash) = buckets.get_mut(CASH_BUCKET) {
            cash.withdraw(rent, "Rent", month, ledger, warnings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Bucket, BucketKind, Holding};
    use crate::market::InflationProfile;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::BTreeMap;

    fn flat_inflation() -> InflationSeries {
        let years: Vec<i16> = (2030..=2045).collect();
        InflationSeries::generate(
            &years,
            &InflationProfile {
                mean: 0.0,
                std_dev: 0.0,
            },
            &BTreeMap::new(),
            &mut SmallRng::seed_from_u64(0),
        )
    }

    fn bucket(name: &str, kind: BucketKind, class: &str, balance: i64) -> Bucket {
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
            name == CASH_BUCKET,
            false,
        )
        .unwrap()
    }

    fn home_buckets(property_value: i64, cash: i64) -> Buckets {
        Buckets::new(vec![
            bucket(CASH_BUCKET, BucketKind::Cash, "Cash", cash),
            bucket(PROPERTY_BUCKET, BucketKind::Property, "Real-Estate", property_value),
        ])
    }

    #[test]
    fn test_monthly_costs_split_interest_and_principal() {
        // $300k at 6%: first month interest = $1,500
        let mut tx = PropertyTransaction::new(300_000, 0.06, 2_000, 400, 100, 0.012);
        let mut buckets = home_buckets(600_000, 100_000);
        let mut ledger = Ledger::new();
        let mut warnings = Warnings::new();
        let inflation = flat_inflation();

        tx.apply(&mut buckets, Month::new(2030, 1), &inflation, &mut ledger, &mut warnings);

        // Maintenance: 600000 * 0.012 / 12 = 600
        let expected = 600 + 400 + 100 + 2_000;
        assert_eq!(buckets.balance_of(CASH_BUCKET), 100_000 - expected);
        // Principal reduced by payment minus interest
        assert_eq!(tx.remaining_principal(), 300_000 - 500);
    }

    #[test]
    fn test_escrow_continues_after_payoff() {
        let mut tx = PropertyTransaction::new(0, 0.06, 2_000, 400, 100, 0.0);
        let mut buckets = home_buckets(600_000, 10_000);
        let mut ledger = Ledger::new();
        let mut warnings = Warnings::new();
        let inflation = flat_inflation();

        tx.apply(&mut buckets, Month::new(2030, 1), &inflation, &mut ledger, &mut warnings);
        // No P&I, escrow only
        assert_eq!(buckets.balance_of(CASH_BUCKET), 10_000 - 500);
    }

    #[test]
    fn test_final_payment_clears_note_exactly() {
        let mut tx = PropertyTransaction::new(900, 0.0, 2_000, 0, 0, 0.0);
        let mut buckets = home_buckets(600_000, 10_000);
        let mut ledger = Ledger::new();
        let mut warnings = Warnings::new();
        let inflation = flat_inflation();

        tx.apply(&mut buckets, Month::new(2030, 1), &inflation, &mut ledger, &mut warnings);
        assert_eq!(tx.remaining_principal(), 0);
        // Only the $900 left on the note is paid, not the full $2,000
        assert_eq!(buckets.balance_of(CASH_BUCKET), 10_000 - 900);
    }

    #[test]
    fn test_all_costs_stop_once_sold() {
        let mut tx = PropertyTransaction::new(300_000, 0.06, 2_000, 400, 100, 0.012);
        let mut buckets = home_buckets(0, 10_000);
        let mut ledger = Ledger::new();
        let mut warnings = Warnings::new();
        let inflation = flat_inflation();

        tx.apply(&mut buckets, Month::new(2030, 1), &inflation, &mut ledger, &mut warnings);
        assert_eq!(buckets.balance_of(CASH_BUCKET), 10_000);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_rent_only_after_sale() {
        let mut rent = RentTransaction::new(2_500);
        let mut ledger = Ledger::new();
        let mut warnings = Warnings::new();
        let inflation = flat_inflation();

        let mut owned = home_buckets(600_000, 10_000);
        rent.apply(&mut owned, Month::new(2030, 1), &inflation, &mut ledger, &mut warnings);
        assert_eq!(owned.balance_of(CASH_BUCKET), 10_000);

        let mut sold = home_buckets(0, 10_000);
        rent.apply(&mut sold, Month::new(2030, 1), &inflation, &mut ledger, &mut warnings);
        assert_eq!(sold.balance_of(CASH_BUCKET), 7_500);
    }
}
