// ==============================================================================
// freebayes.rs - Melted freebayes/snpEff Table Parser
// ==============================================================================
// Description: Typed rows from SnpSift-style "melted" freebayes VCF tables
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated, one row per sample/allele/annotation
// Example:
//   SAMPLE              CHROM       POS  REF ALT RO SRR QR AO  SAR QA   DP  ANN[*].EFFECT    ANN[*].IMPACT ...
//   R1234567-102-C-B07  MN908947.3  241  C   T   0  0   0  112 60  7504 112 upstream_gene_variant MODIFIER ...
// Annotation columns may be absent; absent or NA/empty values are null.
// ==============================================================================

use crate::classifier::FrequencyThresholds;
use crate::models::{FreebayesVariant, VariantType};
use crate::normalizer::{FieldSpec, NormalizedRow, RowError};

use super::{classify_or_unresolved, ParsedVariant};

pub const TOOL: &str = "freebayes";

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("SAMPLE", "library_id"),
    FieldSpec::text("CHROM", "ref_accession"),
    FieldSpec::int("POS", "nucleotide_position"),
    FieldSpec::text("REF", "ref_allele"),
    FieldSpec::text("ALT", "alt_allele"),
    FieldSpec::int("RO", "ref_allele_depth"),
    FieldSpec::int("SRR", "ref_allele_depth_reverse_reads"),
    FieldSpec::int("QR", "ref_quality_sum"),
    FieldSpec::int("AO", "alt_allele_depth"),
    FieldSpec::int("SAR", "alt_allele_depth_reverse_reads"),
    FieldSpec::int("QA", "alt_quality_sum"),
    FieldSpec::int("DP", "total_depth"),
    FieldSpec::text("ANN[*].EFFECT", "annotation").nullable(),
    FieldSpec::text("ANN[*].IMPACT", "impact").nullable(),
    FieldSpec::text("ANN[*].GENE", "gene_name").nullable(),
    FieldSpec::text("ANN[*].FEATUREID", "feature_id").nullable(),
    FieldSpec::text("ANN[*].BIOTYPE", "transcript_biotype").nullable(),
    FieldSpec::text("ANN[*].HGVS_C", "nucleotide_change").nullable(),
    FieldSpec::text("ANN[*].HGVS_P", "amino_acid_change").nullable(),
    FieldSpec::int("ANN[*].CDS_POS", "cds_position").nullable(),
    FieldSpec::int("ANN[*].CDS_LEN", "cds_length").nullable(),
    FieldSpec::int("ANN[*].AA_POS", "amino_acid_position").nullable(),
    FieldSpec::int("ANN[*].AA_LEN", "amino_acid_length").nullable(),
    FieldSpec::text("ANN[*].ERRORS", "annotation_errors_warnings_info").nullable(),
];

pub const REQUIRED_COLUMNS: &[&str] = &[
    "SAMPLE", "CHROM", "POS", "REF", "ALT", "RO", "SRR", "QR", "AO", "SAR", "QA", "DP",
];

/// Mean base quality from a quality sum and its observation count
fn mean_quality(quality_sum: i64, depth: i64) -> i64 {
    if depth == 0 {
        0
    } else {
        quality_sum / depth
    }
}

/// Build a typed freebayes variant from a normalized row
///
/// # Arguments
/// * `row` - Row normalized against [`FIELDS`]
/// * `tool_version` - freebayes version recorded with the variant
/// * `thresholds` - Consensus frequency cut-offs
pub fn parse_row(
    row: &NormalizedRow,
    tool_version: &str,
    thresholds: &FrequencyThresholds,
) -> Result<ParsedVariant<FreebayesVariant>, RowError> {
    let ref_allele = row.require_text("ref_allele")?;
    let alt_allele = row.require_text("alt_allele")?;
    let ref_allele_depth = row.require_int("ref_allele_depth")?;
    let alt_allele_depth = row.require_int("alt_allele_depth")?;
    let total_depth = row.require_int("total_depth")?;

    let alt_allele_frequency = if total_depth == 0 {
        0.0
    } else {
        alt_allele_depth as f64 / total_depth as f64
    };

    let variant_type = VariantType::from_vcf_alleles(&ref_allele, &alt_allele);
    let (classification, unresolved) = classify_or_unresolved(
        variant_type,
        &ref_allele,
        &alt_allele,
        alt_allele_frequency,
        thresholds,
    );

    let variant = FreebayesVariant {
        library_id: row.require_text("library_id")?,
        variant_calling_tool: TOOL.to_string(),
        variant_calling_tool_version: tool_version.to_string(),
        ref_accession: row.require_text("ref_accession")?,
        nucleotide_position: row.require_int("nucleotide_position")?,
        ref_allele_depth,
        ref_allele_depth_reverse_reads: row.require_int("ref_allele_depth_reverse_reads")?,
        ref_allele_mean_quality: mean_quality(row.require_int("ref_quality_sum")?, ref_allele_depth),
        alt_allele_depth,
        alt_allele_depth_reverse_reads: row.require_int("alt_allele_depth_reverse_reads")?,
        alt_allele_mean_quality: mean_quality(row.require_int("alt_quality_sum")?, alt_allele_depth),
        alt_allele_frequency,
        total_depth,
        annotation: row.text("annotation"),
        impact: row.text("impact"),
        gene_name: row.text("gene_name"),
        feature_id: row.text("feature_id"),
        transcript_biotype: row.text("transcript_biotype"),
        nucleotide_change: row.text("nucleotide_change"),
        amino_acid_change: row.text("amino_acid_change"),
        cds_position: row.int("cds_position"),
        cds_length: row.int("cds_length"),
        amino_acid_position: row.int("amino_acid_position"),
        amino_acid_length: row.int("amino_acid_length"),
        annotation_errors_warnings_info: row.text("annotation_errors_warnings_info"),
        ref_allele,
        alt_allele,
        variant_type: classification.variant_type,
        consensus_allele: classification.consensus_allele,
        is_ambiguous: classification.is_ambiguous,
    };

    Ok(ParsedVariant { variant, unresolved })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::TableReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn parse_first(contents: &str) -> Result<ParsedVariant<FreebayesVariant>, RowError> {
        let file = create_test_file(contents);
        let mut rows = TableReader::open_tsv(file.path())
            .unwrap()
            .read_rows(FIELDS)
            .unwrap();
        rows.remove(0)
            .and_then(|row| parse_row(&row, "1.3.2", &FrequencyThresholds::default()))
    }

    #[test]
    fn test_annotated_snp() {
        let parsed = parse_first(
            "SAMPLE\tCHROM\tPOS\tREF\tALT\tRO\tSRR\tQR\tAO\tSAR\tQA\tDP\tANN[*].EFFECT\tANN[*].IMPACT\tANN[*].GENE\tANN[*].HGVS_P\tANN[*].AA_POS\n\
             R1-102-C-B07\tMN908947.3\t23403\tA\tG\t2\t1\t70\t98\t50\t3626\t100\tmissense_variant\tMODERATE\tS\tp.Asp614Gly\t614\n",
        )
        .unwrap();
        let v = parsed.variant;

        assert_eq!(v.library_id, "R1-102-C-B07");
        assert_eq!(v.variant_calling_tool, "freebayes");
        assert_eq!(v.variant_calling_tool_version, "1.3.2");
        assert_eq!(v.ref_allele_mean_quality, 35);
        assert_eq!(v.alt_allele_mean_quality, 37);
        assert_eq!(v.alt_allele_frequency, 0.98);
        assert_eq!(v.variant_type, VariantType::Snp);
        assert_eq!(v.consensus_allele.as_deref(), Some("G"));
        assert_eq!(v.is_ambiguous, Some(false));
        assert_eq!(v.annotation.as_deref(), Some("missense_variant"));
        assert_eq!(v.amino_acid_change.as_deref(), Some("p.Asp614Gly"));
        assert_eq!(v.amino_acid_position, Some(614));
        // Columns absent from the file
        assert_eq!(v.feature_id, None);
        assert_eq!(v.cds_length, None);
    }

    #[test]
    fn test_zero_depth_and_deletion() {
        let parsed = parse_first(
            "SAMPLE\tCHROM\tPOS\tREF\tALT\tRO\tSRR\tQR\tAO\tSAR\tQA\tDP\n\
             R1-102-C-B07\tMN908947.3\t11288\tTCTGGTTTT\tT\t0\t0\t0\t0\t0\t0\t0\n",
        )
        .unwrap();
        let v = parsed.variant;

        assert_eq!(v.variant_type, VariantType::Del);
        assert_eq!(v.alt_allele_frequency, 0.0);
        assert_eq!(v.ref_allele_mean_quality, 0);
        assert_eq!(v.consensus_allele, None);
        assert!(parsed.unresolved.is_none());
    }

    #[test]
    fn test_mixed_snp_is_ambiguous() {
        let parsed = parse_first(
            "SAMPLE\tCHROM\tPOS\tREF\tALT\tRO\tSRR\tQR\tAO\tSAR\tQA\tDP\n\
             R1-102-C-B07\tMN908947.3\t100\tC\tT\t50\t20\t1800\t50\t20\t1750\t100\n",
        )
        .unwrap();

        assert_eq!(parsed.variant.consensus_allele.as_deref(), Some("Y"));
        assert_eq!(parsed.variant.is_ambiguous, Some(true));
    }

    #[test]
    fn test_na_annotation_is_null() {
        let parsed = parse_first(
            "SAMPLE\tCHROM\tPOS\tREF\tALT\tRO\tSRR\tQR\tAO\tSAR\tQA\tDP\tANN[*].GENE\tANN[*].CDS_POS\n\
             R1-102-C-B07\tMN908947.3\t100\tC\tT\t0\t0\t0\t10\t5\t350\t10\tNA\t\n",
        )
        .unwrap();
        assert_eq!(parsed.variant.gene_name, None);
        assert_eq!(parsed.variant.cds_position, None);
    }
}
