//! RCD premium tariff: declared inputs in, premium and applied factors out

mod calculator;
mod input;
pub mod tables;

pub use calculator::{activity_base, calculate_premium, company_age_years, AppliedFactor, FactorKind, TariffResult};
pub use input::{ActivityShare, TariffInput, TerminationReason};
