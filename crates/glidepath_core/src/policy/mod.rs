//! Policy-driven flows: the household's own rules for moving money.

pub mod property;
pub mod refill;
pub mod rmd;
pub mod roth;
pub mod salary;
pub mod sepp;
pub mod social_security;
pub mod unemployment;

pub use property::{PropertyTransaction, RentTransaction};
pub use refill::{RefillPolicy, RefillTransaction};
pub use rmd::{LifeExpectancyTable, RmdTransaction};
pub use roth::{RothConversionPolicy, RothPhase};
pub use salary::SalaryTransaction;
pub use sepp::SeppTransaction;
pub use social_security::SocialSecurityTransaction;
pub use unemployment::UnemploymentTransaction;
