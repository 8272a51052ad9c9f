// ==============================================================================
// qc_summary.rs - ncov-tools QC Summary Parser
// ==============================================================================
// Description: Typed rows from ncov-tools `*_summary_qc.tsv` files
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated; `qc_pass` holds comma-separated flags
// Example:
//   sample              run_name            num_consensus_snvs ... genome_completeness  qc_pass
//   R1234567-102-C-B07  210115_M00325_0101  28                 ... 0.9987               POSSIBLE_FRAMESHIFT_INDELS
// ==============================================================================

use crate::models::QcSummary;
use crate::normalizer::{FieldSpec, NormalizedRow, RowError};

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("sample", "library_id"),
    FieldSpec::text("run_name", "sequencing_run_id"),
    FieldSpec::int("num_consensus_snvs", "num_consensus_snvs").nullable(),
    FieldSpec::int("num_consensus_n", "num_consensus_n").nullable(),
    FieldSpec::int("num_consensus_iupac", "num_consensus_iupac").nullable(),
    FieldSpec::int("num_variants_snvs", "num_variants_snvs").nullable(),
    FieldSpec::int("num_variants_indel", "num_variants_indel").nullable(),
    FieldSpec::int("num_variants_indel_triplet", "num_variants_indel_triplet").nullable(),
    FieldSpec::float("mean_sequencing_depth", "mean_sequencing_depth").nullable(),
    FieldSpec::int("median_sequencing_depth", "median_sequencing_depth").nullable(),
    FieldSpec::float("genome_completeness", "genome_completeness").nullable(),
    FieldSpec::text("qc_pass", "qc_flags"),
];

pub const REQUIRED_COLUMNS: &[&str] = &["sample", "run_name", "qc_pass"];

/// Build a typed QC summary from a normalized row
pub fn parse_row(row: &NormalizedRow) -> Result<QcSummary, RowError> {
    let qc_flags = row.require_text("qc_flags")?;
    let qc_pass = QcSummary::passes(&qc_flags);

    Ok(QcSummary {
        library_id: row.require_text("library_id")?,
        sequencing_run_id: row.require_text("sequencing_run_id")?,
        num_consensus_snvs: row.int("num_consensus_snvs"),
        num_consensus_n: row.int("num_consensus_n"),
        num_consensus_iupac: row.int("num_consensus_iupac"),
        num_variants_snvs: row.int("num_variants_snvs"),
        num_variants_indel: row.int("num_variants_indel"),
        num_variants_indel_triplet: row.int("num_variants_indel_triplet"),
        mean_sequencing_depth: row.float("mean_sequencing_depth"),
        median_sequencing_depth: row.int("median_sequencing_depth"),
        genome_completeness: row.float("genome_completeness"),
        qc_flags,
        qc_pass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::TableReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "sample\trun_name\tnum_consensus_snvs\tnum_consensus_n\tnum_consensus_iupac\tnum_variants_snvs\tnum_variants_indel\tnum_variants_indel_triplet\tmean_sequencing_depth\tmedian_sequencing_depth\tqpcr_ct\tgenome_completeness\tqc_pass\n";

    fn parse_all(rows: &str) -> Vec<Result<QcSummary, RowError>> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.write_all(rows.as_bytes()).unwrap();
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
    fn test_passing_library() {
        let rows = parse_all("R1-102-C-B07\t210115_M00325_0101\t28\t120\t0\t30\t2\t2\t1523.4\t1480\t21.3\t0.9987\tPASS\n");
        let qc = rows[0].clone().unwrap();

        assert_eq!(qc.library_id, "R1-102-C-B07");
        assert_eq!(qc.sequencing_run_id, "210115_M00325_0101");
        assert_eq!(qc.num_consensus_snvs, Some(28));
        assert_eq!(qc.mean_sequencing_depth, Some(1523.4));
        assert_eq!(qc.median_sequencing_depth, Some(1480));
        assert_eq!(qc.genome_completeness, Some(0.9987));
        assert_eq!(qc.qc_flags, "PASS");
        assert!(qc.qc_pass);
    }

    #[test]
    fn test_failing_flags() {
        let rows = parse_all(
            "R2-102-C-B08\t210115_M00325_0101\tNA\tNA\tNA\tNA\tNA\tNA\tNA\tNA\tNA\t0.41\tINCOMPLETE_GENOME,POSSIBLE_FRAMESHIFT_INDELS\n",
        );
        let qc = rows[0].clone().unwrap();

        assert_eq!(qc.num_consensus_snvs, None);
        assert_eq!(qc.mean_sequencing_depth, None);
        assert_eq!(qc.qc_flags, "INCOMPLETE_GENOME,POSSIBLE_FRAMESHIFT_INDELS");
        assert!(!qc.qc_pass);
    }
}
