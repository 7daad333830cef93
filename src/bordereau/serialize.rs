//! Delimited-text rendering of bordereau rows
//!
//! Fields containing the delimiter, a quote or a line break are quoted and
//! inner quotes doubled (RFC 4180); records end with CRLF.

use csv::{ReaderBuilder, Terminator, WriterBuilder};

use super::rows::{
    police_columns, quittance_columns, InclusionOptions, LegacyRow, PoliceRow, QuittanceRow,
    LEGACY_COLUMNS,
};
use crate::error::{CrmError, Result};

pub const DEFAULT_DELIMITER: u8 = b';';

/// Header row followed by one line per record
pub fn generate_csv<I>(header: &[&str], records: I, delimiter: u8) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| CrmError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| CrmError::Internal(format!("CSV is not UTF-8: {}", e)))
}

/// Legacy export; refuses to produce a file without data rows
pub fn generate_legacy_csv(rows: &[LegacyRow], delimiter: u8) -> Result<String> {
    if rows.is_empty() {
        return Err(CrmError::validation("Aucune donnée à exporter"));
    }
    generate_csv(&LEGACY_COLUMNS, rows.iter().map(LegacyRow::to_record), delimiter)
}

/// An empty slice yields a header-only file
pub fn generate_polices_csv(
    rows: &[PoliceRow],
    options: &InclusionOptions,
    delimiter: u8,
) -> Result<String> {
    generate_csv(
        &police_columns(options),
        rows.iter().map(|row| row.to_record(options)),
        delimiter,
    )
}

/// An empty slice yields a header-only file
pub fn generate_quittances_csv(
    rows: &[QuittanceRow],
    options: &InclusionOptions,
    delimiter: u8,
) -> Result<String> {
    generate_csv(
        &quittance_columns(options),
        rows.iter().map(|row| row.to_record(options)),
        delimiter,
    )
}

/// Read a legacy export back into rows
pub fn parse_legacy_csv(text: &str, delimiter: u8) -> Result<Vec<LegacyRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?;
    if headers.iter().ne(LEGACY_COLUMNS.iter().copied()) {
        return Err(CrmError::validation("En-tête de bordereau inattendu"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(LegacyRow::from_record(&record?)?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bordereau::LegacyRowType;
    use crate::store::fixtures::date;

    fn legacy_row(reference: &str, company: &str) -> LegacyRow {
        LegacyRow {
            row_type: LegacyRowType::Contrat,
            reference: reference.into(),
            broker_code: "BRK01".into(),
            broker_name: "Courtage Sud".into(),
            product: "RCD".into(),
            status: "ACTIVE".into(),
            company_name: company.into(),
            siren: "552100554".into(),
            postal_code: "69003".into(),
            city: "Lyon".into(),
            activities: "MACONNERIE,CARRELAGE".into(),
            declared_revenue: Some(300_000.0),
            start_date: Some(date(2024, 3, 1)),
            end_date: None,
            premium_ht: 2000.0,
            tax_amount: 180.0,
            premium_ttc: 2180.0,
            created_at: date(2024, 2, 10),
        }
    }

    #[test]
    fn test_parse_inverts_generate() {
        let rows = vec![
            legacy_row("RCD-2024-0001", "Dupont; Fils & \"Associés\""),
            legacy_row("RCD-2024-0002", "Multi\nligne"),
        ];
        let text = generate_legacy_csv(&rows, DEFAULT_DELIMITER).unwrap();
        assert_eq!(parse_legacy_csv(&text, DEFAULT_DELIMITER).unwrap(), rows);
    }

    #[test]
    fn test_special_characters_are_quoted() {
        let rows = vec![legacy_row("R1", "A;B \"C\"")];
        let text = generate_legacy_csv(&rows, DEFAULT_DELIMITER).unwrap();
        assert!(text.contains("\"A;B \"\"C\"\"\""));
        assert!(text.starts_with("TYPE;REFERENCE;"));
        assert!(text.ends_with("\r\n"));
    }

    #[test]
    fn test_same_rows_same_bytes() {
        let rows = vec![legacy_row("R1", "X"), legacy_row("R2", "Y")];
        assert_eq!(
            generate_legacy_csv(&rows, DEFAULT_DELIMITER).unwrap(),
            generate_legacy_csv(&rows.clone(), DEFAULT_DELIMITER).unwrap()
        );
    }

    #[test]
    fn test_empty_legacy_export_is_rejected() {
        let err = generate_legacy_csv(&[], DEFAULT_DELIMITER).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_empty_v2_files_are_header_only() {
        let options = InclusionOptions::default();
        let polices = generate_polices_csv(&[], &options, DEFAULT_DELIMITER).unwrap();
        assert_eq!(polices, format!("{}\r\n", police_columns(&options).join(";")));
        let quittances = generate_quittances_csv(&[], &options, DEFAULT_DELIMITER).unwrap();
        assert_eq!(quittances.lines().count(), 1);
    }

    #[test]
    fn test_parse_rejects_foreign_header() {
        let err = parse_legacy_csv("A;B\r\n1;2\r\n", DEFAULT_DELIMITER).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_custom_delimiter() {
        let rows = vec![legacy_row("R1", "X")];
        let text = generate_legacy_csv(&rows, b',').unwrap();
        // Decimal commas must be quoted when the delimiter is a comma
        assert!(text.contains("\"2180,00\""));
        assert_eq!(parse_legacy_csv(&text, b',').unwrap(), rows);
    }
}
