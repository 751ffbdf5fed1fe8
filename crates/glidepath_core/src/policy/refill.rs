//! Threshold refills and forced liquidations.
//!
//! After market returns land, any target bucket sitting below its threshold
//! pulls one refill pass from its ordered source list. Sources are gated:
//! tax-advantaged buckets are untouchable before the taxable-eligibility
//! month, and tax-deferred buckets are frozen while a SEPP window is open.
//! If Cash still ends up below the liquidation floor, sources are sold off
//! in order — Property goes whole, split across the configured proceeds
//! targets — with a 10% penalty flag on early tax-deferred draws.

use std::collections::BTreeMap;

use crate::bucket::{BucketKind, Buckets, CASH_BUCKET, PROPERTY_BUCKET};
use crate::error::{SimulationWarning, Warnings};
use crate::ledger::{FlowKind, Ledger};
use crate::market::FIXED_INCOME_CLASS;
use crate::money::round_dollars;
use crate::month::Month;
use crate::transaction::TaxFlows;

/// A policy-generated transfer, classified for the tax log.
///
/// When no cost basis is available, withdrawals from taxable buckets are
/// estimated at 50% gain.
#[derive(Debug, Clone)]
pub struct RefillTransaction {
    pub source: String,
    pub target: String,
    pub amount: i64,
    is_tax_deferred: bool,
    is_taxable: bool,
    is_tax_free: bool,
    is_penalty_applicable: bool,
    applied: i64,
    taxable_gain: i64,
    fixed_income_withdrawal: i64,
}

impl RefillTransaction {
    fn for_source(
        source: &str,
        target: &str,
        amount: i64,
        source_kind: BucketKind,
        penalty: bool,
    ) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            amount,
            is_tax_deferred: source_kind == BucketKind::TaxDeferred,
            is_taxable: source_kind == BucketKind::Taxable,
            is_tax_free: source_kind == BucketKind::TaxFree,
            is_penalty_applicable: penalty,
            applied: 0,
            taxable_gain: 0,
            fixed_income_withdrawal: 0,
        }
    }

    pub fn apply(&mut self, buckets: &mut Buckets, month: Month, ledger: &mut Ledger) {
        self.applied = 0;
        self.taxable_gain = 0;
        self.fixed_income_withdrawal = 0;
        if self.amount <= 0 {
            return;
        }
        // Proportional withdrawals take their fixed-income share with them
        let fixed_income_fraction = buckets
            .get(&self.source)
            .map(|bucket| {
                let balance = bucket.balance();
                if balance <= 0 {
                    return 0.0;
                }
                let fixed: i64 = bucket
                    .holdings
                    .iter()
                    .filter(|h| h.asset_class == FIXED_INCOME_CLASS)
                    .map(|h| h.amount.max(0))
                    .sum();
                fixed as f64 / balance as f64
            })
            .unwrap_or(0.0);
        let applied = buckets.transfer(
            &self.source,
            &self.target,
            self.amount,
            month,
            FlowKind::Transfer,
            ledger,
        );
        self.applied = applied;
        if self.is_taxable && applied > 0 {
            self.taxable_gain = round_dollars(applied as f64 * 0.5);
        }
        if applied > 0 {
            self.fixed_income_withdrawal = round_dollars(applied as f64 * fixed_income_fraction);
        }
    }

    pub fn tax_flows(&self) -> TaxFlows {
        TaxFlows {
            ordinary_withdrawal: if self.is_tax_deferred { self.applied } else { 0 },
            realized_gain: if self.is_taxable { self.applied } else { 0 },
            taxable_gain: self.taxable_gain,
            tax_free_withdrawal: if self.is_tax_free { self.applied } else { 0 },
            fixed_income_withdrawal: self.fixed_income_withdrawal,
            penalty_eligible_withdrawal: if self.is_tax_deferred && self.is_penalty_applicable {
                self.applied
            } else {
                0
            },
            ..TaxFlows::default()
        }
    }
}

/// Refill thresholds, liquidation floor, and the gating state they share.
#[derive(Debug, Clone)]
pub struct RefillPolicy {
    /// Minimum balance per refill target.
    pub thresholds: BTreeMap<String, i64>,
    /// Per-pass refill amount per target.
    pub refill_amounts: BTreeMap<String, i64>,
    /// Ordered source list per target.
    pub sources: BTreeMap<String, Vec<String>>,
    /// Cash floor below which forced liquidation kicks in.
    pub liquidation_threshold: i64,
    /// Ordered liquidation candidates.
    pub liquidation_sources: Vec<String>,
    /// Proceeds split for whole-asset (Property) sales.
    pub liquidation_targets: BTreeMap<String, f64>,
    /// First month tax-advantaged buckets may be tapped (age 59½).
    pub taxable_eligibility: Month,
    /// While open, tax-deferred refill sources are frozen.
    pub sepp_window: Option<(Month, Month)>,
}

impl RefillPolicy {
    fn in_sepp_window(&self, month: Month) -> bool {
        self.sepp_window
            .is_some_and(|(start, end)| start <= month && month <= end)
    }

    /// Generate refill transfers for every target below its threshold.
    pub fn generate_refills(
        &self,
        buckets: &Buckets,
        month: Month,
        warnings: &mut Warnings,
    ) -> Vec<RefillTransaction> {
        let mut txns = Vec::new();

        for (target, &threshold) in &self.thresholds {
            let Some(target_bucket) = buckets.get(target) else {
                warnings.push(SimulationWarning::BucketNotFound {
                    month,
                    bucket: target.clone(),
                });
                continue;
            };
            if target_bucket.balance() >= threshold {
                continue;
            }

            let per_pass = self.refill_amounts.get(target).copied().unwrap_or(0);
            if per_pass <= 0 {
                warnings.push(SimulationWarning::RefillAmountMissing {
                    month,
                    target: target.clone(),
                });
                continue;
            }

            let mut need = per_pass;
            for source in self.sources.get(target).into_iter().flatten() {
                if need <= 0 {
                    break;
                }
                let Some(source_bucket) = buckets.get(source) else {
                    continue;
                };
                let available = source_bucket.balance();
                if available <= 0 {
                    continue;
                }
                if source_bucket.kind.is_tax_advantaged() && month < self.taxable_eligibility {
                    tracing::debug!(
                        target: "glidepath",
                        "{month} — refill source '{source}' age-gated"
                    );
                    continue;
                }
                if source_bucket.kind == BucketKind::TaxDeferred && self.in_sepp_window(month) {
                    tracing::debug!(
                        target: "glidepath",
                        "{month} — refill source '{source}' frozen by SEPP window"
                    );
                    continue;
                }

                let transfer = need.min(available);
                txns.push(RefillTransaction::for_source(
                    source,
                    target,
                    transfer,
                    source_bucket.kind,
                    false,
                ));
                need -= transfer;
            }
        }

        txns
    }

    /// Generate forced liquidations when Cash is below the floor.
    pub fn generate_liquidations(
        &self,
        buckets: &Buckets,
        month: Month,
        _warnings: &mut Warnings,
    ) -> Vec<RefillTransaction> {
        let mut txns = Vec::new();
        let Some(cash) = buckets.get(CASH_BUCKET) else {
            return txns;
        };
        let mut shortfall = self.liquidation_threshold - cash.balance();
        if shortfall <= 0 {
            return txns;
        }

        for source in &self.liquidation_sources {
            if shortfall <= 0 {
                break;
            }
            if source == CASH_BUCKET {
                continue;
            }
            let Some(source_bucket) = buckets.get(source) else {
                continue;
            };
            let balance = source_bucket.balance();
            if balance <= 0 {
                continue;
            }
            let penalty = source_bucket.kind == BucketKind::TaxDeferred
                && month < self.taxable_eligibility;

            if source == PROPERTY_BUCKET {
                // A property sells whole; proceeds split across the targets
                let mut assigned = 0;
                let targets: Vec<(&String, f64)> = self
                    .liquidation_targets
                    .iter()
                    .filter(|(name, share)| **share > 0.0 && buckets.contains(name))
                    .map(|(name, share)| (name, *share))
                    .collect();
                for (i, (target, share)) in targets.iter().enumerate() {
                    let amount = if i + 1 == targets.len() {
                        balance - assigned
                    } else {
                        round_dollars(balance as f64 * share)
                    };
                    if amount <= 0 {
                        continue;
                    }
                    assigned += amount;
                    txns.push(RefillTransaction::for_source(
                        source,
                        target,
                        amount,
                        source_bucket.kind,
                        penalty,
                    ));
                }
                shortfall -= balance;
            } else {
                let take = balance.min(shortfall);
                txns.push(RefillTransaction::for_source(
                    source,
                    CASH_BUCKET,
                    take,
                    source_bucket.kind,
                    penalty,
                ));
                shortfall -= take;
            }
        }

        txns
    }
}
