//! Append-only audit ledger.
//!
//! Every flow a trial produces — deposits, withdrawals, internal transfers,
//! market gains and losses — is recorded here in emission order. The ledger
//! refers to buckets by name; gain/loss entries use a descriptive label on
//! the non-bucket side.

use serde::{Deserialize, Serialize};

use crate::month::Month;

/// Classification of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Deposit,
    Withdraw,
    Transfer,
    Gain,
    Loss,
}

/// One recorded flow. `amount` is always positive; direction is carried by
/// which side names the bucket (deposits and gains credit `target`,
/// withdrawals and losses debit `source`, transfers do both).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub month: Month,
    pub source: String,
    pub target: String,
    pub amount: i64,
    pub kind: FlowKind,
}

/// Append-only list of ledger entries for one trial.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        month: Month,
        source: impl Into<String>,
        target: impl Into<String>,
        amount: i64,
        kind: FlowKind,
    ) {
        debug_assert!(amount > 0, "ledger amounts are positive, got {amount}");
        self.entries.push(LedgerEntry {
            month,
            source: source.into(),
            target: target.into(),
            amount,
            kind,
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries
    }

    /// Net credited dollars for a bucket: everything that flowed in minus
    /// everything that flowed out, across all entry kinds. Used by the
    /// ledger-symmetry invariant tests.
    pub fn net_flow(&self, bucket: &str) -> i64 {
        self.entries
            .iter()
            .map(|e| {
                let mut net = 0;
                if e.target == bucket {
                    net += e.amount;
                }
                if e.source == bucket {
                    net -= e.amount;
                }
                net
            })
            .sum()
    }

    /// Entries of a given kind, in emission order.
    pub fn of_kind(&self, kind: FlowKind) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }
}
