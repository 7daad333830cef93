//! Bordereau reports: row builders, CSV rendering and ZIP packaging
//!
//! Two formats coexist. The legacy format is a single sheet mixing contracts
//! and quotes; the v2 format splits policies and receipts into two files
//! shipped together in one archive. Every export is persisted with a
//! snapshot of its rows so later downloads never re-query live data.

mod archive;
pub mod format;
mod legacy;
mod rows;
mod serialize;
mod v2;

pub use archive::{
    bordereau_zip_file_name, build_zip, generate_file_name, polices_file_name,
    quittances_file_name,
};
pub use legacy::{build_legacy, LegacyBordereau, LegacyFilters, LegacyMetadata, SourceKind, SourceRef};
pub use rows::{
    police_columns, quittance_columns, InclusionOptions, LegacyRow, LegacyRowType, PoliceRow,
    QuittanceRow, LEGACY_COLUMNS,
};
pub use serialize::{
    generate_csv, generate_legacy_csv, generate_polices_csv, generate_quittances_csv,
    parse_legacy_csv, DEFAULT_DELIMITER,
};
pub use v2::{build_v2, V2Bordereau, V2Metadata, V2Request};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::model::{Bordereau, BordereauSnapshot};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Inclusive reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(CrmError::validation(
                "La date de début doit précéder la date de fin",
            ));
        }
        Ok(())
    }

    /// Smallest range covering the rows' effective (or creation) dates
    pub fn covering(rows: &[LegacyRow]) -> Option<Self> {
        let mut dates = rows.iter().map(|r| r.start_date.unwrap_or(r.created_at));
        let first = dates.next()?;
        let (start_date, end_date) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self { start_date, end_date })
    }
}

/// A rendered file ready to be sent as an attachment
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Record a legacy export; the CSV name defaults to the period start month
pub fn legacy_record(
    rows: Vec<LegacyRow>,
    period: DateRange,
    file_name: Option<String>,
    generated_by: &str,
    generated_at: DateTime<Utc>,
) -> Bordereau {
    let file_name = file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| generate_file_name(period.start_date.month(), period.start_date.year()));

    Bordereau {
        id: uuid::Uuid::new_v4().to_string(),
        generated_at,
        generated_by: generated_by.to_string(),
        period_start: period.start_date,
        period_end: period.end_date,
        snapshot: BordereauSnapshot::Legacy { rows },
        file_name_polices: file_name,
        file_name_quittances: String::new(),
    }
}

/// Record a v2 generation with its row snapshot
pub fn v2_record(result: V2Bordereau, generated_by: &str) -> Bordereau {
    let period = result.metadata.date_range;
    let (month, year) = (period.start_date.month(), period.start_date.year());

    Bordereau {
        id: uuid::Uuid::new_v4().to_string(),
        generated_at: result.metadata.generated_at,
        generated_by: generated_by.to_string(),
        period_start: period.start_date,
        period_end: period.end_date,
        snapshot: BordereauSnapshot::V2 {
            polices: result.polices,
            quittances: result.quittances,
            inclusion_options: result.metadata.inclusion_options,
        },
        file_name_polices: polices_file_name(month, year),
        file_name_quittances: quittances_file_name(month, year),
    }
}

/// Re-serialize a stored bordereau from its snapshot
///
/// v2 records give a ZIP of both files named after the period start month;
/// legacy records give their single CSV.
pub fn render_download(bordereau: &Bordereau, delimiter: u8) -> Result<Download> {
    match &bordereau.snapshot {
        BordereauSnapshot::Legacy { rows } => Ok(Download {
            file_name: bordereau.file_name_polices.clone(),
            content_type: CSV_CONTENT_TYPE,
            bytes: generate_legacy_csv(rows, delimiter)?.into_bytes(),
        }),
        BordereauSnapshot::V2 {
            polices,
            quittances,
            inclusion_options,
        } => {
            let polices_csv = generate_polices_csv(polices, inclusion_options, delimiter)?;
            let quittances_csv = generate_quittances_csv(quittances, inclusion_options, delimiter)?;
            let bytes = build_zip(&[
                (bordereau.file_name_polices.as_str(), polices_csv.as_bytes()),
                (bordereau.file_name_quittances.as_str(), quittances_csv.as_bytes()),
            ])?;
            Ok(Download {
                file_name: bordereau_zip_file_name(
                    bordereau.period_start.month(),
                    bordereau.period_start.year(),
                ),
                content_type: ZIP_CONTENT_TYPE,
                bytes,
            })
        }
    }
}
