//! Brokers, quotes and the contracts issued from them

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::tariff::{TariffInput, TariffResult};

/// Insurance product line a quote or contract belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Responsabilité civile décennale
    Rcd,
    /// Dommages-ouvrage
    DommagesOuvrage,
    /// RCD + DO pack
    RcdDo,
}

impl ProductType {
    /// Label written into bordereau rows
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Rcd => "RCD",
            ProductType::DommagesOuvrage => "DO",
            ProductType::RcdDo => "RCD_DO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Draft,
    Submitted,
    Offered,
    Accepted,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "DRAFT",
            QuoteStatus::Submitted => "SUBMITTED",
            QuoteStatus::Offered => "OFFERED",
            QuoteStatus::Accepted => "ACCEPTED",
            QuoteStatus::Rejected => "REJECTED",
        }
    }

    /// Whether a quote in this status belongs in a bordereau
    pub fn is_reportable(&self) -> bool {
        matches!(self, QuoteStatus::Offered | QuoteStatus::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Active,
    Suspended,
    Terminated,
    Expired,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "ACTIVE",
            ContractStatus::Suspended => "SUSPENDED",
            ContractStatus::Terminated => "TERMINATED",
            ContractStatus::Expired => "EXPIRED",
        }
    }

    /// Active and expired contracts are in force for the reported period
    pub fn is_in_force(&self) -> bool {
        matches!(self, ContractStatus::Active | ContractStatus::Expired)
    }
}

/// An intermediary submitting quotes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broker {
    pub id: String,

    /// Short code printed on bordereaux (ORIAS-style)
    pub code: String,

    pub name: String,

    pub email: String,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Broker-submitted insurance request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,

    /// Human-readable reference (e.g. "DEV-2024-0042")
    pub reference: String,

    pub broker_id: String,

    pub product_type: ProductType,

    pub status: QuoteStatus,

    /// Insured company
    pub company_name: String,

    #[serde(default)]
    pub siren: Option<String>,

    #[serde(default)]
    pub postal_code: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    /// Declared inputs of the last premium calculation
    #[serde(default)]
    pub tariff_input: Option<TariffInput>,

    /// Result of the last premium calculation
    #[serde(default)]
    pub calculated_premium: Option<TariffResult>,

    /// Requested cover start date
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Declared activity codes, comma-joined for flat exports
    pub fn activity_codes(&self) -> String {
        self.tariff_input
            .as_ref()
            .map(|input| {
                input
                    .activities
                    .iter()
                    .map(|a| a.code.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default()
    }

    pub fn declared_revenue(&self) -> Option<f64> {
        self.tariff_input.as_ref().map(|input| input.annual_revenue)
    }
}

/// Contract (policy) issued from an accepted quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,

    pub policy_number: String,

    pub quote_id: String,

    pub broker_id: String,

    pub product_type: ProductType,

    pub status: ContractStatus,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    pub premium_ht: f64,

    pub tax_amount: f64,

    pub premium_ttc: f64,

    pub created_at: DateTime<Utc>,
}
