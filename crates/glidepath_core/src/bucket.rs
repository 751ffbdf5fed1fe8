//! Buckets: named balance containers holding weighted asset-class slices.
//!
//! Deposits allocate across holdings proportionally by configured weight;
//! withdrawals draw proportionally by current amount. Both assign the
//! rounding residual to the last holding so bucket totals move by exactly
//! the requested amount. Only buckets flagged `may_go_negative` (Cash, by
//! configuration) may overdraw; everything else refuses and moves nothing.

use serde::{Deserialize, Serialize};

use crate::error::{SimulationWarning, TrialError, Warnings};
use crate::ledger::{FlowKind, Ledger};
use crate::money::split_proportional;
use crate::month::Month;

/// The bucket every shortfall, premium, and tax settlement ultimately hits.
pub const CASH_BUCKET: &str = "Cash";
/// Dedicated bucket accumulating monthly tax withholdings.
pub const TAX_COLLECTION_BUCKET: &str = "Tax Collection";
/// The real-estate bucket with special liquidation semantics.
pub const PROPERTY_BUCKET: &str = "Property";

/// Tax classification of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    Cash,
    Taxable,
    TaxDeferred,
    TaxFree,
    Property,
    Other,
}

impl BucketKind {
    /// Tax-advantaged buckets are age-gated for ordinary access.
    pub fn is_tax_advantaged(self) -> bool {
        matches!(self, BucketKind::TaxDeferred | BucketKind::TaxFree)
    }
}

/// A weighted slice of a bucket tied to one asset class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub asset_class: String,
    pub weight: f64,
    pub amount: i64,
    pub cost_basis: Option<i64>,
}

/// A named balance container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub kind: BucketKind,
    pub holdings: Vec<Holding>,
    pub may_go_negative: bool,
    pub cash_fallback: bool,
}

impl Bucket {
    /// Build a bucket, validating that holding weights sum to ~1 and
    /// distributing `starting_balance` across holdings by weight (rounding
    /// drift goes to the last holding).
    pub fn new(
        name: impl Into<String>,
        kind: BucketKind,
        mut holdings: Vec<Holding>,
        starting_balance: i64,
        may_go_negative: bool,
        cash_fallback: bool,
    ) -> Result<Self, TrialError> {
        let name = name.into();
        let weight_sum: f64 = holdings.iter().map(|h| h.weight).sum();
        if holdings.is_empty() || (weight_sum - 1.0).abs() > 1e-6 {
            return Err(TrialError::InvalidWeights {
                bucket: name,
                sum: weight_sum,
            });
        }

        let weights: Vec<f64> = holdings.iter().map(|h| h.weight).collect();
        for (holding, amount) in holdings
            .iter_mut()
            .zip(split_proportional(starting_balance, &weights))
        {
            holding.amount = amount;
        }

        Ok(Self {
            name,
            kind,
            holdings,
            may_go_negative,
            cash_fallback,
        })
    }

    pub fn balance(&self) -> i64 {
        self.holdings.iter().map(|h| h.amount).sum()
    }

    /// Add `delta` (possibly negative) to holdings by configured weight.
    fn distribute_by_weight(&mut self, delta: i64) {
        let weights: Vec<f64> = self.holdings.iter().map(|h| h.weight).collect();
        for (holding, part) in self
            .holdings
            .iter_mut()
            .zip(split_proportional(delta, &weights))
        {
            holding.amount += part;
        }
    }

    /// Remove `amount` from holdings proportionally to their current
    /// balances. When the bucket is empty or overdrawn the whole delta lands
    /// on the first holding (single-holding Cash in practice).
    fn drain_by_amount(&mut self, amount: i64) {
        let balance = self.balance();
        if balance <= 0 {
            if let Some(first) = self.holdings.first_mut() {
                first.amount -= amount;
            }
            return;
        }
        let shares: Vec<f64> = self
            .holdings
            .iter()
            .map(|h| h.amount.max(0) as f64 / balance as f64)
            .collect();
        for (holding, part) in self
            .holdings
            .iter_mut()
            .zip(split_proportional(amount, &shares))
        {
            holding.amount -= part;
        }
    }

    /// Credit `amount` across holdings by weight and record a single ledger
    /// entry. Zero or negative amounts are ignored.
    pub fn deposit(
        &mut self,
        amount: i64,
        source: &str,
        month: Month,
        kind: FlowKind,
        ledger: &mut Ledger,
    ) {
        if amount <= 0 {
            return;
        }
        self.distribute_by_weight(amount);
        ledger.record(month, source, self.name.clone(), amount, kind);
    }

    /// Withdraw `amount`, drawing proportionally across holdings.
    ///
    /// Returns the amount actually moved: the full amount when funds
    /// suffice or the bucket may overdraw, otherwise 0 (with a warning).
    pub fn withdraw(
        &mut self,
        amount: i64,
        target: &str,
        month: Month,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let balance = self.balance();
        if balance < amount && !self.may_go_negative {
            warnings.push(SimulationWarning::InsufficientFunds {
                month,
                bucket: self.name.clone(),
                requested: amount,
                available: balance,
            });
            return 0;
        }
        self.drain_by_amount(amount);
        ledger.record(month, self.name.clone(), target, amount, FlowKind::Withdraw);
        amount
    }

    /// Withdraw up to `amount`, never overdrawing: moves
    /// `min(amount, balance)` and returns it.
    pub fn partial_withdraw(
        &mut self,
        amount: i64,
        target: &str,
        month: Month,
        ledger: &mut Ledger,
    ) -> i64 {
        let take = amount.min(self.balance()).max(0);
        if take == 0 {
            return 0;
        }
        self.drain_by_amount(take);
        ledger.record(month, self.name.clone(), target, take, FlowKind::Withdraw);
        take
    }

    /// Apply one holding's market delta directly (bypasses weight/amount
    /// distribution). Used by the market sampler, which attributes gains and
    /// losses per holding.
    pub(crate) fn apply_holding_delta(&mut self, index: usize, delta: i64) {
        self.holdings[index].amount += delta;
    }
}

/// The ordered set of buckets for one trial. Iteration order is
/// configuration order, which keeps ledger emission deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buckets {
    buckets: Vec<Bucket>,
}

impl Buckets {
    pub fn new(buckets: Vec<Bucket>) -> Self {
        Self { buckets }
    }

    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Bucket> {
        self.buckets.iter_mut().find(|b| b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn balance_of(&self, name: &str) -> i64 {
        self.get(name).map(|b| b.balance()).unwrap_or(0)
    }

    /// Sum of every bucket balance (net worth, Property included).
    pub fn total_balance(&self) -> i64 {
        self.buckets.iter().map(|b| b.balance()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bucket> {
        self.buckets.iter_mut()
    }

    /// Split-borrow two distinct buckets by name.
    fn pair_mut(&mut self, a: &str, b: &str) -> Option<(&mut Bucket, &mut Bucket)> {
        let ia = self.buckets.iter().position(|x| x.name == a)?;
        let ib = self.buckets.iter().position(|x| x.name == b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (left, right) = self.buckets.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.buckets.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    /// Move `amount` from `source` to `target` with a single ledger entry.
    ///
    /// Non-negative sources move at most their current balance; overdraft
    /// sources (Cash) move the full amount. Returns the amount moved.
    pub fn transfer(
        &mut self,
        source: &str,
        target: &str,
        amount: i64,
        month: Month,
        kind: FlowKind,
        ledger: &mut Ledger,
    ) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let Some((src, tgt)) = self.pair_mut(source, target) else {
            return 0;
        };
        let take = if src.may_go_negative {
            amount
        } else {
            amount.min(src.balance().max(0))
        };
        if take <= 0 {
            return 0;
        }
        src.drain_by_amount(take);
        tgt.distribute_by_weight(take);
        ledger.record(month, source, target, take, kind);
        take
    }

    /// Withdraw up to `amount` from `name`; any shortfall is pulled from the
    /// Cash bucket, which may overdraw. Returns the total obtained.
    pub fn withdraw_with_cash_fallback(
        &mut self,
        name: &str,
        amount: i64,
        target: &str,
        month: Month,
        ledger: &mut Ledger,
        warnings: &mut Warnings,
    ) -> i64 {
        let Some(bucket) = self.get_mut(name) else {
            warnings.push(SimulationWarning::BucketNotFound {
                month,
                bucket: name.to_string(),
            });
            return 0;
        };
        let taken = bucket.partial_withdraw(amount, target, month, ledger);
        let shortfall = amount - taken;
        if shortfall > 0 && name != CASH_BUCKET {
            if let Some(cash) = self.get_mut(CASH_BUCKET) {
                tracing::debug!(
                    target: "glidepath",
                    "{month} — ${shortfall} pulled from Cash for '{name}'"
                );
                return taken + cash.withdraw(shortfall, target, month, ledger, warnings);
            }
        }
        taken
    }
}
