//! Flat row structures for both bordereau formats and their column schemas
//!
//! Column order is fixed: `*_COLUMNS` / `*_columns()` give the CSV header and
//! `to_record` returns the cells in exactly that order.

use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};

use super::format::{
    format_amount, format_date, format_opt_amount, format_opt_date, parse_amount, parse_date,
    parse_opt_amount, parse_opt_date,
};
use crate::error::{CrmError, Result};

/// Header of the legacy single-sheet bordereau
pub const LEGACY_COLUMNS: [&str; 18] = [
    "TYPE",
    "REFERENCE",
    "CODE_COURTIER",
    "COURTIER",
    "PRODUIT",
    "STATUT",
    "RAISON_SOCIALE",
    "SIREN",
    "CODE_POSTAL",
    "VILLE",
    "ACTIVITES",
    "CHIFFRE_AFFAIRES",
    "DATE_EFFET",
    "DATE_ECHEANCE",
    "PRIME_HT",
    "TAXES",
    "PRIME_TTC",
    "DATE_CREATION",
];

/// Kind of record a legacy row was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegacyRowType {
    Contrat,
    Devis,
}

impl LegacyRowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyRowType::Contrat => "CONTRAT",
            LegacyRowType::Devis => "DEVIS",
        }
    }

    fn parse(cell: &str) -> Result<Self> {
        match cell {
            "CONTRAT" => Ok(LegacyRowType::Contrat),
            "DEVIS" => Ok(LegacyRowType::Devis),
            other => Err(CrmError::validation(format!("type de ligne inconnu: {}", other))),
        }
    }
}

/// One line of the legacy bordereau
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRow {
    pub row_type: LegacyRowType,
    /// Policy number for contracts, quote reference for quotes
    pub reference: String,
    pub broker_code: String,
    pub broker_name: String,
    pub product: String,
    pub status: String,
    pub company_name: String,
    #[serde(default)]
    pub siren: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub activities: String,
    #[serde(default)]
    pub declared_revenue: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub premium_ht: f64,
    pub tax_amount: f64,
    pub premium_ttc: f64,
    pub created_at: NaiveDate,
}

impl LegacyRow {
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.row_type.as_str().to_string(),
            self.reference.clone(),
            self.broker_code.clone(),
            self.broker_name.clone(),
            self.product.clone(),
            self.status.clone(),
            self.company_name.clone(),
            self.siren.clone(),
            self.postal_code.clone(),
            self.city.clone(),
            self.activities.clone(),
            format_opt_amount(self.declared_revenue),
            format_opt_date(self.start_date),
            format_opt_date(self.end_date),
            format_amount(self.premium_ht),
            format_amount(self.tax_amount),
            format_amount(self.premium_ttc),
            format_date(self.created_at),
        ]
    }

    pub fn from_record(record: &StringRecord) -> Result<Self> {
        if record.len() != LEGACY_COLUMNS.len() {
            return Err(CrmError::validation(format!(
                "ligne de {} colonnes, {} attendues",
                record.len(),
                LEGACY_COLUMNS.len()
            )));
        }

        Ok(Self {
            row_type: LegacyRowType::parse(&record[0])?,
            reference: record[1].to_string(),
            broker_code: record[2].to_string(),
            broker_name: record[3].to_string(),
            product: record[4].to_string(),
            status: record[5].to_string(),
            company_name: record[6].to_string(),
            siren: record[7].to_string(),
            postal_code: record[8].to_string(),
            city: record[9].to_string(),
            activities: record[10].to_string(),
            declared_revenue: parse_opt_amount(&record[11])?,
            start_date: parse_opt_date(&record[12])?,
            end_date: parse_opt_date(&record[13])?,
            premium_ht: parse_amount(&record[14])?,
            tax_amount: parse_amount(&record[15])?,
            premium_ttc: parse_amount(&record[16])?,
            created_at: parse_date(&record[17])?,
        })
    }
}

/// Named switches controlling optional sections and columns of the v2 format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InclusionOptions {
    /// Also report suspended and terminated contracts
    pub include_terminated: bool,

    /// Also report receipts that are not paid yet
    pub include_unpaid_receipts: bool,

    /// Broker code and name columns on both files
    pub include_broker_details: bool,

    /// HT and tax columns next to the TTC amount
    pub include_tax_breakdown: bool,
}

impl Default for InclusionOptions {
    fn default() -> Self {
        Self {
            include_terminated: false,
            include_unpaid_receipts: true,
            include_broker_details: true,
            include_tax_breakdown: true,
        }
    }
}

/// One line of the v2 "polices" file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliceRow {
    pub policy_number: String,
    pub product: String,
    pub status: String,
    pub company_name: String,
    #[serde(default)]
    pub siren: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub activities: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub premium_ht: f64,
    pub tax_amount: f64,
    pub premium_ttc: f64,
    #[serde(default)]
    pub broker_code: Option<String>,
    #[serde(default)]
    pub broker_name: Option<String>,
}

pub fn police_columns(options: &InclusionOptions) -> Vec<&'static str> {
    let mut columns = vec![
        "NUMERO_POLICE",
        "PRODUIT",
        "STATUT",
        "RAISON_SOCIALE",
        "SIREN",
        "CODE_POSTAL",
        "VILLE",
        "ACTIVITES",
        "DATE_EFFET",
        "DATE_ECHEANCE",
    ];
    if options.include_tax_breakdown {
        columns.extend(["PRIME_HT", "TAXES"]);
    }
    columns.push("PRIME_TTC");
    if options.include_broker_details {
        columns.extend(["CODE_COURTIER", "COURTIER"]);
    }
    columns
}

impl PoliceRow {
    pub fn to_record(&self, options: &InclusionOptions) -> Vec<String> {
        let mut record = vec![
            self.policy_number.clone(),
            self.product.clone(),
            self.status.clone(),
            self.company_name.clone(),
            self.siren.clone(),
            self.postal_code.clone(),
            self.city.clone(),
            self.activities.clone(),
            format_date(self.start_date),
            format_date(self.end_date),
        ];
        if options.include_tax_breakdown {
            record.push(format_amount(self.premium_ht));
            record.push(format_amount(self.tax_amount));
        }
        record.push(format_amount(self.premium_ttc));
        if options.include_broker_details {
            record.push(self.broker_code.clone().unwrap_or_default());
            record.push(self.broker_name.clone().unwrap_or_default());
        }
        record
    }
}

/// One line of the v2 "quittances" (receipts) file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuittanceRow {
    pub receipt_number: String,
    pub policy_number: String,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub amount_ht: f64,
    pub tax_amount: f64,
    pub amount_ttc: f64,
    pub status: String,
    #[serde(default)]
    pub paid_at: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub broker_code: Option<String>,
    #[serde(default)]
    pub broker_name: Option<String>,
}

pub fn quittance_columns(options: &InclusionOptions) -> Vec<&'static str> {
    let mut columns = vec![
        "NUMERO_QUITTANCE",
        "NUMERO_POLICE",
        "NUMERO_ECHEANCE",
        "DATE_ECHEANCE",
        "DEBUT_PERIODE",
        "FIN_PERIODE",
    ];
    if options.include_tax_breakdown {
        columns.extend(["MONTANT_HT", "TAXES"]);
    }
    columns.extend(["MONTANT_TTC", "STATUT", "DATE_PAIEMENT", "MODE_PAIEMENT"]);
    if options.include_broker_details {
        columns.extend(["CODE_COURTIER", "COURTIER"]);
    }
    columns
}

impl QuittanceRow {
    pub fn to_record(&self, options: &InclusionOptions) -> Vec<String> {
        let mut record = vec![
            self.receipt_number.clone(),
            self.policy_number.clone(),
            self.installment_number.to_string(),
            format_date(self.due_date),
            format_date(self.period_start),
            format_date(self.period_end),
        ];
        if options.include_tax_breakdown {
            record.push(format_amount(self.amount_ht));
            record.push(format_amount(self.tax_amount));
        }
        record.push(format_amount(self.amount_ttc));
        record.push(self.status.clone());
        record.push(format_opt_date(self.paid_at));
        record.push(self.payment_method.clone().unwrap_or_default());
        if options.include_broker_details {
            record.push(self.broker_code.clone().unwrap_or_default());
            record.push(self.broker_name.clone().unwrap_or_default());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn police() -> PoliceRow {
        PoliceRow {
            policy_number: "RCD-2024-0001".into(),
            product: "RCD".into(),
            status: "ACTIVE".into(),
            company_name: "Maçonnerie Dupont".into(),
            siren: "123456789".into(),
            postal_code: "69003".into(),
            city: "Lyon".into(),
            activities: "MAC,CARR".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
            premium_ht: 2000.0,
            tax_amount: 180.0,
            premium_ttc: 2180.0,
            broker_code: Some("BRK01".into()),
            broker_name: Some("Courtage Sud".into()),
        }
    }

    #[test]
    fn test_police_record_matches_header_for_every_option_set() {
        let row = police();
        for tax in [false, true] {
            for broker in [false, true] {
                let options = InclusionOptions {
                    include_tax_breakdown: tax,
                    include_broker_details: broker,
                    ..InclusionOptions::default()
                };
                assert_eq!(police_columns(&options).len(), row.to_record(&options).len());
            }
        }
    }

    #[test]
    fn test_police_record_order() {
        let options = InclusionOptions::default();
        let record = police().to_record(&options);
        let columns = police_columns(&options);
        let ttc = columns.iter().position(|c| *c == "PRIME_TTC").unwrap();
        assert_eq!(record[ttc], "2180,00");
        assert_eq!(record[0], "RCD-2024-0001");
        assert_eq!(record[8], "2024-03-01");
    }

    #[test]
    fn test_inclusion_options_defaults_from_partial_json() {
        let options: InclusionOptions =
            serde_json::from_str(r#"{"includeTerminated": true}"#).unwrap();
        assert!(options.include_terminated);
        assert!(options.include_unpaid_receipts);
        assert!(options.include_broker_details);
    }

    #[test]
    fn test_legacy_record_rejects_wrong_width() {
        let record = StringRecord::from(vec!["CONTRAT", "X"]);
        assert!(LegacyRow::from_record(&record).is_err());
    }
}
