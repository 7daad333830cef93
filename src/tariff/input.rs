//! Declared inputs of an RCD premium calculation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};

/// Share of revenue generated by one activity
///
/// Shares are not normalized: a breakdown summing to 0.8 or 1.3 is priced as
/// declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityShare {
    pub code: String,
    pub share: f64,
}

/// Why the previous RCD policy ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    /// Ended at the insured's request or by mutual agreement
    Amicable,
    /// Insurer left the market or stopped the product
    InsurerWithdrawal,
    NonPayment,
    ClaimsHistory,
    Other,
}

impl TerminationReason {
    pub fn factor(&self) -> f64 {
        match self {
            TerminationReason::Amicable | TerminationReason::InsurerWithdrawal => 1.00,
            TerminationReason::NonPayment => 1.30,
            TerminationReason::ClaimsHistory => 1.50,
            TerminationReason::Other => 1.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffInput {
    /// Declared annual revenue excluding tax (EUR)
    pub annual_revenue: f64,

    /// Full-time staff equivalents
    #[serde(default)]
    pub staff_count: f64,

    #[serde(default)]
    pub activities: Vec<ActivityShare>,

    #[serde(default)]
    pub incorporation_date: Option<NaiveDate>,

    /// Years of trade experience of the manager
    #[serde(default)]
    pub experience_years: Option<u32>,

    /// Previous insurer defaulted (liquidation, withdrawal of approval)
    #[serde(default)]
    pub prior_insurer_default: bool,

    /// Years of uninterrupted RCD cover up to the request
    #[serde(default)]
    pub continuous_coverage_years: Option<u32>,

    /// Holds a trade qualification (Qualibat or equivalent)
    #[serde(default)]
    pub qualified: bool,

    /// None when no previous policy was terminated
    #[serde(default)]
    pub termination_reason: Option<TerminationReason>,

    /// Some activity was carried out without cover
    #[serde(default)]
    pub uninsured_activity: bool,

    /// Date the company age is measured at
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

impl TariffInput {
    /// Reject inputs that cannot describe a real company
    pub fn validate(&self) -> Result<()> {
        if !self.annual_revenue.is_finite() || self.annual_revenue < 0.0 {
            return Err(CrmError::validation("le chiffre d'affaires doit être positif ou nul"));
        }
        if !self.staff_count.is_finite() || self.staff_count < 0.0 {
            return Err(CrmError::validation("l'effectif doit être positif ou nul"));
        }
        if let Some(activity) = self
            .activities
            .iter()
            .find(|a| !a.share.is_finite() || a.share < 0.0)
        {
            return Err(CrmError::validation(format!(
                "part d'activité négative pour {}",
                activity.code
            )));
        }
        Ok(())
    }
}
