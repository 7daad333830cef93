//! Cell formatting shared by every bordereau column
//!
//! Amounts use the French convention (two decimals, comma separator, no
//! thousands grouping); dates are ISO `YYYY-MM-DD`.

use chrono::NaiveDate;

use crate::error::{CrmError, Result};
use crate::money::round_cents;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 1234.5 -> "1234,50"
pub fn format_amount(value: f64) -> String {
    // -0.00 would otherwise print with a sign
    let rounded = round_cents(value) + 0.0;
    format!("{:.2}", rounded).replace('.', ",")
}

pub fn format_opt_amount(value: Option<f64>) -> String {
    value.map(format_amount).unwrap_or_default()
}

/// Parse an amount written by [`format_amount`]; a dot separator is accepted too
pub fn parse_amount(cell: &str) -> Result<f64> {
    cell.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| CrmError::validation(format!("montant invalide '{}': {}", cell, e)))
}

pub fn parse_opt_amount(cell: &str) -> Result<Option<f64>> {
    if cell.trim().is_empty() {
        Ok(None)
    } else {
        parse_amount(cell).map(Some)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_opt_date(date: Option<NaiveDate>) -> String {
    date.map(format_date).unwrap_or_default()
}

pub fn parse_date(cell: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(cell.trim(), DATE_FORMAT)
        .map_err(|e| CrmError::validation(format!("date invalide '{}': {}", cell, e)))
}

pub fn parse_opt_date(cell: &str) -> Result<Option<NaiveDate>> {
    if cell.trim().is_empty() {
        Ok(None)
    } else {
        parse_date(cell).map(Some)
    }
}
