// ==============================================================================
// metadata.rs - Run Metadata Parser
// ==============================================================================
// Description: Collection dates and qPCR Ct values from `metadata.tsv`
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated
// Example:
//   sample              date        ct
//   R1234567-102-C-B07  2021-01-10  21.3
//   POS-CTRL-102-C      NA          NA
// ==============================================================================

use chrono::NaiveDate;

use crate::identifiers::decode_specimen_id;
use crate::models::{QpcrResult, Specimen};
use crate::normalizer::{FieldSpec, NormalizedRow, RowError};

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("sample", "sample"),
    FieldSpec::text("date", "collection_date").nullable(),
    FieldSpec::float("ct", "ct_value").nullable(),
];

pub const REQUIRED_COLUMNS: &[&str] = &["sample"];

/// Metadata for one specimen
#[derive(Debug, Clone, PartialEq)]
pub struct SpecimenMetadata {
    pub specimen: Specimen,
    /// Present only when the row carries a Ct value
    pub qpcr: Option<QpcrResult>,
}

/// Build specimen metadata from a normalized row
///
/// # Returns
/// * `Ok(None)` - control rows, which never get a specimen
/// * `Err(RowError::Identifier)` - the sample has no specimen id
pub fn parse_row(row: &NormalizedRow) -> Result<Option<SpecimenMetadata>, RowError> {
    let sample = row.require_text("sample")?;
    let specimen_id = match decode_specimen_id(&sample).map_err(|e| row.identifier_error(e))? {
        Some(id) => id,
        None => return Ok(None),
    };

    let collection_date = match row.text("collection_date") {
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| RowError::MalformedRow {
                path: row.path().to_path_buf(),
                row: row.row(),
                field: "collection_date".to_string(),
                value: raw.clone(),
                reason: format!("expected YYYY-MM-DD: {}", e),
            })?,
        ),
        None => None,
    };

    let qpcr = row.float("ct_value").map(|ct| QpcrResult {
        specimen_id: specimen_id.clone(),
        ct_value: Some(ct),
    });

    Ok(Some(SpecimenMetadata {
        specimen: Specimen {
            id: specimen_id,
            collection_date,
        },
        qpcr,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::TableReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse_all(contents: &str) -> Vec<Result<Option<SpecimenMetadata>, RowError>> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();

        TableReader::open_tsv(file.path())
            .unwrap()
            .read_rows(FIELDS)
            .unwrap()
            .into_iter()
            .map(|row| row.and_then(|r| parse_row(&r)))
            .collect()
    }

    #[test]
    fn test_specimen_with_ct() {
        let rows = parse_all("sample\tdate\tct\nR1234567-102-C-B07\t2021-01-10\t21.3\n");
        let meta = rows[0].clone().unwrap().unwrap();

        assert_eq!(meta.specimen.id, "R1234567");
        assert_eq!(meta.specimen.collection_date, NaiveDate::from_ymd_opt(2021, 1, 10));
        assert_eq!(
            meta.qpcr,
            Some(QpcrResult {
                specimen_id: "R1234567".to_string(),
                ct_value: Some(21.3),
            })
        );
    }

    #[test]
    fn test_na_values() {
        let rows = parse_all("sample\tdate\tct\nR1234567-102-C-B07\tNA\tNA\n");
        let meta = rows[0].clone().unwrap().unwrap();

        assert_eq!(meta.specimen.collection_date, None);
        assert_eq!(meta.qpcr, None);
    }

    #[test]
    fn test_controls_skipped() {
        let rows = parse_all("sample\tdate\tct\nPOS-CTRL-102-C\tNA\tNA\nNEG-CTRL-102-C\t2021-01-10\t\n");
        assert_eq!(rows[0].clone().unwrap(), None);
        assert_eq!(rows[1].clone().unwrap(), None);
    }

    #[test]
    fn test_bad_date() {
        let rows = parse_all("sample\tdate\tct\nR1234567-102-C-B07\t10/01/2021\t21\n");
        match &rows[0] {
            Err(RowError::MalformedRow { field, value, .. }) => {
                assert_eq!(field, "collection_date");
                assert_eq!(value, "10/01/2021");
            }
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_sample_rejected() {
        let rows = parse_all("sample\tdate\tct\n\t2021-01-10\t21\n-102-C-B07\tNA\tNA\n");
        for (idx, row) in rows.iter().enumerate() {
            match row {
                Err(RowError::Identifier { row, .. }) => assert_eq!(*row, idx + 1),
                other => panic!("Expected Identifier error, got {:?}", other),
            }
        }
        assert_eq!(rows.len(), 2);
    }
}
