//! Persisted bordereau generations

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::bordereau::{InclusionOptions, LegacyRow, PoliceRow, QuittanceRow};

/// Row snapshot stored with a bordereau
///
/// Serialized with an explicit `schema` tag so stored documents stay readable
/// when a row layout evolves: a new layout gets a new variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum BordereauSnapshot {
    #[serde(rename = "legacy-v1")]
    Legacy { rows: Vec<LegacyRow> },

    #[serde(rename = "v2", rename_all = "camelCase")]
    V2 {
        polices: Vec<PoliceRow>,
        quittances: Vec<QuittanceRow>,
        inclusion_options: InclusionOptions,
    },
}

impl BordereauSnapshot {
    pub fn schema(&self) -> &'static str {
        match self {
            BordereauSnapshot::Legacy { .. } => "legacy-v1",
            BordereauSnapshot::V2 { .. } => "v2",
        }
    }

    /// (policy rows, receipt rows)
    pub fn row_counts(&self) -> (usize, usize) {
        match self {
            BordereauSnapshot::Legacy { rows } => (rows.len(), 0),
            BordereauSnapshot::V2 { polices, quittances, .. } => (polices.len(), quittances.len()),
        }
    }
}

/// One generated report; immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bordereau {
    pub id: String,

    pub generated_at: DateTime<Utc>,

    /// User id of the generating session
    pub generated_by: String,

    pub period_start: NaiveDate,

    pub period_end: NaiveDate,

    /// Source of truth for re-downloads
    pub snapshot: BordereauSnapshot,

    pub file_name_polices: String,

    /// Empty for legacy exports, which produce a single file
    #[serde(default)]
    pub file_name_quittances: String,
}

/// History listing entry (snapshot rows omitted)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BordereauSummary {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub schema: &'static str,
    pub polices_count: usize,
    pub quittances_count: usize,
    pub file_name_polices: String,
    pub file_name_quittances: String,
}

impl From<&Bordereau> for BordereauSummary {
    fn from(bordereau: &Bordereau) -> Self {
        let (polices_count, quittances_count) = bordereau.snapshot.row_counts();
        Self {
            id: bordereau.id.clone(),
            generated_at: bordereau.generated_at,
            generated_by: bordereau.generated_by.clone(),
            period_start: bordereau.period_start,
            period_end: bordereau.period_end,
            schema: bordereau.snapshot.schema(),
            polices_count,
            quittances_count,
            file_name_polices: bordereau.file_name_polices.clone(),
            file_name_quittances: bordereau.file_name_quittances.clone(),
        }
    }
}
