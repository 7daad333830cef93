//! Premium calculation
//!
//! Adjustments are applied to a running total in this order:
//!
//! 1. activity base (revenue x share x rate per mille)
//! 2. revenue degressivity
//! 3. staff intensity
//! 4. company age
//! 5. experience
//! 6. qualification
//! 7. continuous coverage
//! 8. prior insurer default
//! 9. termination reason
//! 10. uninsured activity
//! 11. minimum premium (adds the shortfall)
//! 12. management fee
//!
//! Every step is recorded, including neutral ones, so two results can be
//! compared factor by factor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::input::TariffInput;
use super::tables::*;
use crate::money::round_cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorKind {
    Multiplier,
    Addition,
}

/// One adjustment step and the running total after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFactor {
    pub code: String,
    pub kind: FactorKind,
    pub value: f64,
    pub running_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffResult {
    /// Activity base before any adjustment
    pub base_premium: f64,

    pub factors: Vec<AppliedFactor>,

    #[serde(rename = "premiumHT")]
    pub premium_ht: f64,

    pub tax_rate: f64,

    pub tax_amount: f64,

    #[serde(rename = "premiumTTC")]
    pub premium_ttc: f64,
}

impl TariffResult {
    pub fn factor(&self, code: &str) -> Option<&AppliedFactor> {
        self.factors.iter().find(|f| f.code == code)
    }
}

struct Accumulator {
    total: f64,
    factors: Vec<AppliedFactor>,
}

impl Accumulator {
    fn multiply(&mut self, code: &str, factor: f64) {
        self.total *= factor;
        self.record(code, FactorKind::Multiplier, factor);
    }

    fn add(&mut self, code: &str, amount: f64) {
        self.total += amount;
        self.record(code, FactorKind::Addition, amount);
    }

    fn record(&mut self, code: &str, kind: FactorKind, value: f64) {
        self.factors.push(AppliedFactor {
            code: code.to_string(),
            kind,
            value,
            running_total: self.total,
        });
    }
}

/// Activity base: revenue x share x rate per mille, summed over activities
pub fn activity_base(input: &TariffInput) -> f64 {
    let revenue = input.annual_revenue.max(0.0);
    if input.activities.is_empty() {
        return revenue * DEFAULT_ACTIVITY_RATE / 1000.0;
    }
    input
        .activities
        .iter()
        .map(|a| revenue * a.share.max(0.0) * activity_rate(&a.code) / 1000.0)
        .sum()
}

fn staff_intensity_factor(input: &TariffInput) -> f64 {
    if input.staff_count <= 0.0 {
        return 1.0;
    }
    band_f64(STAFF_INTENSITY_BANDS, input.annual_revenue / input.staff_count)
}

/// Whole years between incorporation and the reference date
pub fn company_age_years(incorporation: NaiveDate, reference: NaiveDate) -> Option<u32> {
    reference.years_since(incorporation)
}

fn company_age_factor(input: &TariffInput) -> f64 {
    match (input.incorporation_date, input.reference_date) {
        (Some(incorporation), Some(reference)) => company_age_years(incorporation, reference)
            .map(|years| band_u32(COMPANY_AGE_BANDS, years))
            .unwrap_or(UNKNOWN_COMPANY_AGE_FACTOR),
        _ => UNKNOWN_COMPANY_AGE_FACTOR,
    }
}

/// Compute the premium for the declared inputs
///
/// Pure and total: any input yields a result. Callers wanting to reject
/// nonsensical inputs run [`TariffInput::validate`] first.
pub fn calculate_premium(input: &TariffInput) -> TariffResult {
    let base_premium = activity_base(input);
    let mut acc = Accumulator {
        total: base_premium,
        factors: Vec::with_capacity(12),
    };
    acc.record("ACTIVITY_BASE", FactorKind::Addition, base_premium);

    acc.multiply("REVENUE_BAND", band_f64(REVENUE_BANDS, input.annual_revenue.max(0.0)));
    acc.multiply("STAFF_INTENSITY", staff_intensity_factor(input));
    acc.multiply("COMPANY_AGE", company_age_factor(input));
    acc.multiply(
        "EXPERIENCE",
        input
            .experience_years
            .map(|years| band_u32(EXPERIENCE_BANDS, years))
            .unwrap_or(UNKNOWN_EXPERIENCE_FACTOR),
    );
    acc.multiply("QUALIFICATION", if input.qualified { QUALIFIED_FACTOR } else { 1.0 });
    acc.multiply(
        "CONTINUOUS_COVERAGE",
        band_u32(CONTINUOUS_COVERAGE_BANDS, input.continuous_coverage_years.unwrap_or(0)),
    );
    acc.multiply(
        "PRIOR_INSURER_DEFAULT",
        if input.prior_insurer_default { PRIOR_INSURER_DEFAULT_FACTOR } else { 1.0 },
    );
    acc.multiply(
        "TERMINATION_REASON",
        input.termination_reason.map(|r| r.factor()).unwrap_or(1.0),
    );
    acc.multiply(
        "UNINSURED_ACTIVITY",
        if input.uninsured_activity { UNINSURED_ACTIVITY_FACTOR } else { 1.0 },
    );
    acc.add("MINIMUM_PREMIUM", (MINIMUM_PREMIUM - acc.total).max(0.0));
    acc.add("MANAGEMENT_FEE", MANAGEMENT_FEE);

    let premium_ht = round_cents(acc.total);
    let tax_amount = round_cents(premium_ht * INSURANCE_TAX_RATE);

    TariffResult {
        base_premium: round_cents(base_premium),
        factors: acc.factors,
        premium_ht,
        tax_rate: INSURANCE_TAX_RATE,
        tax_amount,
        premium_ttc: round_cents(premium_ht + tax_amount),
    }
}
