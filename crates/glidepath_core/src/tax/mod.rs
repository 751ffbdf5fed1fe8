//! Tax model: bracket evaluation, the running yearly log, the annual
//! calculator, and premium schedules (marketplace + Medicare/IRMAA).

pub mod brackets;
pub mod calculator;
pub mod log;
pub mod premiums;

pub use brackets::{Bracket, RawTaxTables, bracket_progressive, indexed};
pub use calculator::{TaxBreakdown, TaxCalculator};
pub use log::{TaxRecord, YearlyTaxLog, YtdBaseline};
pub use premiums::{
    IrmaaTier, MarketplacePremiums, MedicarePremiums, irmaa_monthly_premium, irmaa_tiers_mfj_2025,
};
