//! The per-trial forecast engine.
//!
//! Owns every piece of mutable trial state and drives the monthly pipeline
//! in a fixed order: SEPP, premiums, scheduled flows, policy flows, market
//! returns, refills, liquidations, tax accrual, snapshot, and — in December
//! — year-end reconciliation (Roth conversion headroom, settlement from
//! Tax Collection then Cash, refund, tax record).

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::bucket::{Buckets, CASH_BUCKET, TAX_COLLECTION_BUCKET};
use crate::config::SimulationConfig;
use crate::error::{TrialError, Warnings};
use crate::ledger::{FlowKind, Ledger};
use crate::market::{InflationSeries, MonthlyReturnRecord};
use crate::month::Month;
use crate::policy::refill::RefillPolicy;
use crate::policy::rmd::{LifeExpectancyTable, RmdTransaction};
use crate::policy::roth::{RothConversionPolicy, headroom_search};
use crate::policy::salary::SalaryTransaction;
use crate::policy::sepp::SeppTransaction;
use crate::policy::social_security::SocialSecurityTransaction;
use crate::policy::unemployment::UnemploymentTransaction;
use crate::policy::{PropertyTransaction, RentTransaction};
use crate::scheduled::{FixedSchedule, RecurringSchedule};
use crate::tax::calculator::TaxCalculator;
use crate::tax::log::{TaxRecord, YearlyTaxLog};
use crate::tax::premiums::irmaa_monthly_premium;
use crate::transaction::{TaxFlows, Transaction};

/// Per-bucket balances at the end of one tick, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySnapshot {
    pub month: Month,
    pub balances: Vec<(String, i64)>,
}

/// Everything a finished trial produced.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub snapshots: Vec<MonthlySnapshot>,
    pub tax_records: Vec<TaxRecord>,
    pub monthly_returns: Vec<MonthlyReturnRecord>,
    pub ledger: Ledger,
    pub warnings: Warnings,
}

pub struct ForecastEngine<'a> {
    config: &'a SimulationConfig,
    months: Vec<Month>,
    buckets: Buckets,
    scheduled: Vec<Transaction>,
    policies: Vec<Transaction>,
    sepp: Option<Transaction>,
    refill_policy: RefillPolicy,
    inflation: InflationSeries,
    tax: TaxCalculator,
    roth: Option<RothConversionPolicy>,
    rng: SmallRng,

    ledger: Ledger,
    warnings: Warnings,
    snapshots: Vec<MonthlySnapshot>,
    monthly_returns: Vec<MonthlyReturnRecord>,
    tax_records: Vec<TaxRecord>,
    log: YearlyTaxLog,
    /// Previous tick's annual estimate, for the marginal increment.
    prev_estimate: i64,
    monthly_drip: i64,
    /// Tax withheld before the simulation started (first year only).
    baseline_tax_paid: i64,
    first_year: i16,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(config: &'a SimulationConfig, trial_index: u64) -> Result<Self, TrialError> {
        config.validate()?;
        let months = config.forecast_months()?;
        let mut rng = SmallRng::seed_from_u64(trial_index);

        let years: Vec<i16> =
            (config.start_month.year..=config.profile.end_month.year).collect();
        let inflation = InflationSeries::generate(
            &years,
            &config.inflation.baseline(),
            &config.inflation.categories,
            &mut rng,
        );

        let buckets = config.build_buckets()?;
        let profile = &config.profile;
        let eligibility = profile.taxable_eligibility();

        let scheduled = vec![
            Transaction::Fixed(FixedSchedule::new(
                config.fixed_rows.clone(),
                Some(eligibility),
            )),
            Transaction::Recurring(RecurringSchedule::new(
                config.recurring_rows.clone(),
                Some(eligibility),
            )),
        ];

        let mut policies = Vec::new();
        if let Some(salary) = &config.salary {
            policies.push(Transaction::Salary(SalaryTransaction::new(
                salary.annual_gross,
                salary.annual_bonus,
                salary.bonus_month,
                salary.merit_rate,
                salary.merit_month,
                salary.retirement_month,
                salary.targets.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            )));
        }
        for ss in &config.social_security {
            policies.push(Transaction::SocialSecurity(SocialSecurityTransaction::new(
                ss.birth_month,
                ss.full_benefit,
                ss.start_age_months,
                ss.full_age_months,
                ss.payout_pct,
                ss.target.clone(),
            )));
        }
        if let Some(rmd) = &config.rmd {
            policies.push(Transaction::Rmd(RmdTransaction::new(
                profile.birth_month(),
                rmd.start_age,
                rmd.rmd_month,
                rmd.targets.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                LifeExpectancyTable::irs_uniform_lifetime(),
            )));
        }
        if let Some(property) = &config.property {
            policies.push(Transaction::Property(PropertyTransaction::new(
                property.remaining_principal,
                property.apr,
                property.monthly_payment,
                property.monthly_taxes,
                property.monthly_insurance,
                property.annual_maintenance_rate,
            )));
        }
        if let Some(rent) = &config.rent {
            policies.push(Transaction::Rent(RentTransaction::new(rent.monthly_rent)));
        }
        if let Some(unemployment) = &config.unemployment {
            policies.push(Transaction::Unemployment(UnemploymentTransaction::new(
                unemployment.start_month,
                unemployment.end_month,
                unemployment.monthly_amount,
                unemployment.target.clone(),
            )));
        }

        let sepp = config.sepp.as_ref().map(|sepp| {
            Transaction::Sepp(SeppTransaction::new(
                sepp.start_month,
                sepp.end_month,
                sepp.source.clone(),
                sepp.target.clone(),
                sepp.rate,
                profile.birth_month(),
                LifeExpectancyTable::irs_single_life(),
            ))
        });

        let refill_policy = RefillPolicy {
            thresholds: config.refill.thresholds.clone(),
            refill_amounts: config.refill.amounts.clone(),
            sources: config.refill.sources.clone(),
            liquidation_threshold: config.refill.liquidation_threshold,
            liquidation_sources: config.refill.liquidation_sources.clone(),
            liquidation_targets: config.refill.liquidation_targets.clone(),
            taxable_eligibility: eligibility,
            sepp_window: config.sepp.as_ref().map(|s| (s.start_month, s.end_month)),
        };

        let first_year = config.start_month.year;
        let mut log = YearlyTaxLog::new(first_year);
        log.add_baseline(&profile.ytd_baseline);

        Ok(Self {
            config,
            months,
            buckets,
            scheduled,
            policies,
            sepp,
            refill_policy,
            inflation,
            tax: TaxCalculator::new(config.tax_tables.clone()),
            roth: config.roth.clone(),
            rng,
            ledger: Ledger::new(),
            warnings: Warnings::new(),
            snapshots: Vec::new(),
            monthly_returns: Vec::new(),
            tax_records: Vec::new(),
            log,
            prev_estimate: 0,
            monthly_drip: 0,
            baseline_tax_paid: profile.ytd_baseline.tax_paid,
            first_year,
        })
    }

    /// Run the whole trial. A fatal error (missing IRMAA MAGI) aborts the
    /// trial; partial results are discarded.
    pub fn run(mut self) -> Result<EngineOutput, TrialError> {
        let months = std::mem::take(&mut self.months);
        for &month in &months {
            self.rollover_year(month);

            // 1. SEPP withdrawal
            if let Some(sepp) = self.sepp.as_mut() {
                sepp.apply(
                    &mut self.buckets,
                    month,
                    &self.inflation,
                    &mut self.ledger,
                    &mut self.warnings,
                );
            }

            // 2-3. Health premiums
            self.apply_marketplace_premium(month);
            self.apply_medicare_premium(month)?;

            // 4. Scheduled flows
            for tx in &mut self.scheduled {
                tx.apply(
                    &mut self.buckets,
                    month,
                    &self.inflation,
                    &mut self.ledger,
                    &mut self.warnings,
                );
            }

            // 5. Policy flows (Roth and SEPP are handled elsewhere)
            for tx in &mut self.policies {
                tx.apply(
                    &mut self.buckets,
                    month,
                    &self.inflation,
                    &mut self.ledger,
                    &mut self.warnings,
                );
            }

            // 6. Market returns on post-transaction balances
            let outcome = self.config.market.apply(
                &mut self.buckets,
                month,
                self.inflation.rate(month.year),
                &mut self.rng,
                &mut self.ledger,
            );
            self.monthly_returns.push(outcome.record);

            // 7. Threshold refills
            let mut refills =
                self.refill_policy
                    .generate_refills(&self.buckets, month, &mut self.warnings);
            for tx in &mut refills {
                tx.apply(&mut self.buckets, month, &mut self.ledger);
            }

            // 8. Forced liquidations
            let mut liquidations =
                self.refill_policy
                    .generate_liquidations(&self.buckets, month, &mut self.warnings);
            for tx in &mut liquidations {
                tx.apply(&mut self.buckets, month, &mut self.ledger);
            }

            // 9. Tax accrual and withholding drip
            let mut flows = TaxFlows {
                fixed_income_interest: outcome.fixed_income_interest,
                ..TaxFlows::default()
            };
            if let Some(sepp) = &self.sepp {
                flows += sepp.tax_flows();
            }
            for tx in self.scheduled.iter().chain(&self.policies) {
                flows += tx.tax_flows();
            }
            for tx in refills.iter().chain(&liquidations) {
                flows += tx.tax_flows();
            }
            self.log.absorb(flows);
            self.update_tax_drip(month);

            // 10. Snapshot
            self.snapshots.push(MonthlySnapshot {
                month,
                balances: self
                    .buckets
                    .iter()
                    .map(|b| (b.name.clone(), b.balance()))
                    .collect(),
            });

            // 11. Year-end reconciliation
            if month.is_december() {
                self.reconcile_year(month);
            }
        }

        Ok(EngineOutput {
            snapshots: self.snapshots,
            tax_records: self.tax_records,
            monthly_returns: self.monthly_returns,
            ledger: self.ledger,
            warnings: self.warnings,
        })
    }

    /// Reset the yearly log at a calendar-year boundary.
    fn rollover_year(&mut self, month: Month) {
        if month.year != self.log.year {
            self.log = YearlyTaxLog::new(month.year);
            self.prev_estimate = 0;
            self.monthly_drip = 0;
        }
    }

    fn magi_for_year(&self, year: i16) -> Option<i64> {
        self.tax_records
            .iter()
            .find(|r| r.year == year)
            .map(|r| r.agi)
            .or_else(|| self.config.profile.magi.get(&year).copied())
    }

    /// ACA marketplace premiums before retirement and Medicare age.
    fn apply_marketplace_premium(&mut self, month: Month) {
        let Some(retirement) = self.config.retirement_month() else {
            return;
        };
        let profile = &self.config.profile;
        if month >= retirement || profile.age_at(month) >= 65 {
            return;
        }
        // A dependent under 25 keeps the household on the family plan
        let family_plan = profile
            .dependent_birth_month()
            .is_some_and(|dep| month.months_since(dep) < 25 * 12);
        let prior_magi = self.magi_for_year(month.year - 1);
        let premium = self.config.marketplace.monthly_charge(family_plan, prior_magi);
        if premium > 0
            && let Some(cash) = self.buckets.get_mut(CASH_BUCKET)
        {
            cash.withdraw(
                premium,
                "Marketplace Premium",
                month,
                &mut self.ledger,
                &mut self.warnings,
            );
        }
    }

    /// Medicare premiums with the IRMAA surcharge from age 65. The look-back
    /// MAGI (year − 2) must exist; a hole there is fatal for the trial.
    fn apply_medicare_premium(&mut self, month: Month) -> Result<(), TrialError> {
        if self.config.profile.age_at(month) < 65 {
            return Ok(());
        }
        let lookback_year = month.year - 2;
        let magi = self
            .magi_for_year(lookback_year)
            .ok_or(TrialError::MissingMagi {
                year: lookback_year,
            })?;
        let premium = irmaa_monthly_premium(
            magi,
            self.config.medicare.base,
            &self.config.medicare.irmaa_tiers,
            self.inflation.modifier(month.year),
            self.config.profile.married_filing_jointly,
        );
        if premium > 0
            && let Some(cash) = self.buckets.get_mut(CASH_BUCKET)
        {
            cash.withdraw(
                premium,
                "Medicare Premium",
                month,
                &mut self.ledger,
                &mut self.warnings,
            );
        }
        Ok(())
    }

    /// Recompute the annual estimate from the cumulative log and move this
    /// month's withholding from Cash into Tax Collection.
    fn update_tax_drip(&mut self, month: Month) {
        let factor = self.inflation.modifier(month.year);
        let estimate = self.tax.compute(&self.log, factor).total_tax;
        let marginal = estimate - self.prev_estimate;
        self.prev_estimate = estimate;

        let mut paid = self.buckets.balance_of(TAX_COLLECTION_BUCKET).max(0);
        if month.year == self.first_year {
            paid += self.baseline_tax_paid;
        }
        let remaining = (estimate - paid).max(0);
        let months_left = (12 - month.month as i64).max(1);
        self.monthly_drip = remaining / months_left;

        tracing::debug!(
            target: "glidepath",
            "{month} — tax estimate ${estimate} (marginal ${marginal}), drip ${}",
            self.monthly_drip
        );
        if self.monthly_drip > 0 {
            self.buckets.transfer(
                CASH_BUCKET,
                TAX_COLLECTION_BUCKET,
                self.monthly_drip,
                month,
                FlowKind::Transfer,
                &mut self.ledger,
            );
        }
    }

    /// December: Roth headroom, settlement, refund, and the tax record.
    fn reconcile_year(&mut self, month: Month) {
        let factor = self.inflation.modifier(month.year);
        self.attempt_roth_conversion(month, factor);

        let breakdown = self.tax.compute(&self.log, factor);
        let mut due = breakdown.total_tax;
        if month.year == self.first_year {
            due = (due - self.baseline_tax_paid).max(0);
        }

        // Pay from Tax Collection first, the rest from Cash (which may
        // overdraw — the overdraft is the visible distress signal)
        let mut paid_from_collection = 0;
        if due > 0
            && let Some(collection) = self.buckets.get_mut(TAX_COLLECTION_BUCKET)
        {
            paid_from_collection = collection.partial_withdraw(due, "Taxes", month, &mut self.ledger);
        }
        let remainder = due - paid_from_collection;
        if remainder > 0
            && let Some(cash) = self.buckets.get_mut(CASH_BUCKET)
        {
            cash.withdraw(remainder, "Taxes", month, &mut self.ledger, &mut self.warnings);
        }
        tracing::debug!(
            target: "glidepath",
            "{month} — settled ${due}: ${paid_from_collection} from collection, ${remainder} from cash"
        );

        // Positive remainder in Tax Collection flows back to Cash
        let leftover = self.buckets.balance_of(TAX_COLLECTION_BUCKET);
        if leftover > 0 {
            self.buckets.transfer(
                TAX_COLLECTION_BUCKET,
                CASH_BUCKET,
                leftover,
                month,
                FlowKind::Transfer,
                &mut self.ledger,
            );
        }

        let portfolio_value = self.buckets.total_balance();
        let withdrawal_rate = if portfolio_value > 0 {
            (self.log.ordinary_withdrawals + self.log.taxable_gains) as f64
                / portfolio_value as f64
        } else {
            0.0
        };
        self.tax_records.push(TaxRecord {
            year: month.year,
            agi: breakdown.agi,
            taxable_income: breakdown.taxable_income,
            ordinary_tax: breakdown.ordinary_tax,
            payroll_tax: breakdown.payroll_tax,
            capital_gains_tax: breakdown.capital_gains_tax,
            penalty_tax: breakdown.penalty_tax,
            total_tax: breakdown.total_tax,
            effective_rate: breakdown.effective_rate,
            withdrawal_rate,
            portfolio_value,
        });
    }

    /// Find and apply the largest Roth conversion that keeps the year's
    /// effective rate under the active phase's ceiling.
    fn attempt_roth_conversion(&mut self, month: Month, factor: f64) {
        let Some(policy) = &self.roth else {
            return;
        };
        let age = self.config.profile.age_at(month);
        let Some(phase) = policy.phase_for_age(age) else {
            return;
        };
        if !phase.allow_conversion {
            return;
        }
        let source_balance = self.buckets.balance_of(&phase.source);
        if source_balance < phase.source_threshold {
            return;
        }

        let max_conversion = phase.max_conversion.min(source_balance);
        let log = self.log;
        let tax = &self.tax;
        let conversion = headroom_search(max_conversion, phase.max_tax_rate, |candidate| {
            let mut trial_log = log;
            trial_log.roth_conversions += candidate;
            tax.compute(&trial_log, factor).effective_rate
        });
        if conversion <= 0 {
            return;
        }

        let moved = self.buckets.transfer(
            &phase.source,
            &phase.target,
            conversion,
            month,
            FlowKind::Transfer,
            &mut self.ledger,
        );
        if moved > 0 {
            tracing::debug!(
                target: "glidepath",
                "{month} — Roth conversion ${moved} at age {age}"
            );
            self.log.roth_conversions += moved;
        }
    }
}
