// ==============================================================================
// models.rs - Surveillance Data Models
// ==============================================================================
// Description: Entity structures stored by the loader, keyed by specimen,
//              library and sequencing-run identifiers
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use chrono::NaiveDate;

/// Sequencing platform class, derived from the instrument id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Instrument ids starting with `M`
    MiSeq,
    /// Instrument ids starting with `V`
    NextSeq,
}

impl Platform {
    pub fn from_instrument_id(instrument_id: &str) -> Option<Self> {
        if instrument_id.starts_with('M') {
            Some(Platform::MiSeq)
        } else if instrument_id.starts_with('V') {
            Some(Platform::NextSeq)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MiSeq => "MISEQ",
            Platform::NextSeq => "NEXTSEQ",
        }
    }
}

/// Variant type derived from the allele strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantType {
    Snp,
    Ins,
    Del,
    Undetermined,
}

impl VariantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantType::Snp => "snp",
            VariantType::Ins => "ins",
            VariantType::Del => "del",
            VariantType::Undetermined => "undetermined",
        }
    }
}

/// Specimen (sample container)
#[derive(Debug, Clone, PartialEq)]
pub struct Specimen {
    pub id: String,
    /// Filled in by the metadata pass
    pub collection_date: Option<NaiveDate>,
}

impl Specimen {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection_date: None,
        }
    }
}

/// Sequencing library prepared from a specimen (or a control well)
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    pub id: String,
    /// None for POS/NEG controls
    pub specimen_id: Option<String>,
    pub plate_id: String,
    pub index_set_id: Option<String>,
    /// Always `<letter><2-digit column>`
    pub well: String,
    pub plate_row: String,
    pub plate_col: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequencingRun {
    pub id: String,
    pub run_date: NaiveDate,
    pub instrument_id: String,
    pub platform: Option<Platform>,
}

/// qPCR result for a specimen
#[derive(Debug, Clone, PartialEq)]
pub struct QpcrResult {
    pub specimen_id: String,
    pub ct_value: Option<f64>,
}

/// Variant called by ivar, one row of a `variants.tsv`
#[derive(Debug, Clone, PartialEq)]
pub struct IvarVariant {
    pub library_id: String,
    pub variant_calling_tool: String,
    pub variant_calling_tool_version: String,
    pub ref_accession: String,
    pub nucleotide_position: i64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub ref_allele_depth: i64,
    pub ref_allele_depth_reverse_reads: i64,
    pub ref_allele_mean_quality: i64,
    pub alt_allele_depth: i64,
    pub alt_allele_depth_reverse_reads: i64,
    pub alt_allele_mean_quality: i64,
    pub alt_allele_frequency: f64,
    pub total_depth: i64,
    pub p_value_fishers_exact: f64,
    pub p_value_pass: bool,
    pub gene_name: Option<String>,
    pub ref_codon: Option<String>,
    pub ref_amino_acid: Option<String>,
    pub alt_codon: Option<String>,
    pub alt_amino_acid: Option<String>,
    pub codon_position: Option<i64>,
    pub mutation_name_by_amino_acid: Option<String>,
    pub variant_type: VariantType,
    /// Unset for indels and for SNPs whose frequency sits on a threshold
    pub consensus_allele: Option<String>,
    pub is_ambiguous: Option<bool>,
}

/// Variant called by freebayes and annotated by snpEff (melted VCF row)
#[derive(Debug, Clone, PartialEq)]
pub struct FreebayesVariant {
    pub library_id: String,
    pub variant_calling_tool: String,
    pub variant_calling_tool_version: String,
    pub ref_accession: String,
    pub nucleotide_position: i64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub ref_allele_depth: i64,
    pub ref_allele_depth_reverse_reads: i64,
    pub ref_allele_mean_quality: i64,
    pub alt_allele_depth: i64,
    pub alt_allele_depth_reverse_reads: i64,
    pub alt_allele_mean_quality: i64,
    pub alt_allele_frequency: f64,
    pub total_depth: i64,
    pub annotation: Option<String>,
    pub impact: Option<String>,
    pub gene_name: Option<String>,
    pub feature_id: Option<String>,
    pub transcript_biotype: Option<String>,
    pub nucleotide_change: Option<String>,
    pub amino_acid_change: Option<String>,
    pub cds_position: Option<i64>,
    pub cds_length: Option<i64>,
    pub amino_acid_position: Option<i64>,
    pub amino_acid_length: Option<i64>,
    pub annotation_errors_warnings_info: Option<String>,
    pub variant_type: VariantType,
    pub consensus_allele: Option<String>,
    pub is_ambiguous: Option<bool>,
}

/// Amino-acid consequence reported by ncov-tools
#[derive(Debug, Clone, PartialEq)]
pub struct AminoAcidMutation {
    pub library_id: String,
    pub ref_accession: String,
    pub nucleotide_position: i64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub consequence: String,
    pub gene: Option<String>,
    pub ref_amino_acid: Option<String>,
    pub alt_amino_acid: Option<String>,
    pub codon_position: Option<i64>,
    pub mutation_name_by_amino_acid: Option<String>,
}

/// Pangolin lineage assignment
#[derive(Debug, Clone, PartialEq)]
pub struct LineageCall {
    pub sequencing_run_id: String,
    pub library_id: String,
    pub lineage: Option<String>,
    pub conflict: Option<f64>,
    pub ambiguity_score: Option<f64>,
    pub scorpio_call: Option<String>,
    pub scorpio_support: Option<f64>,
    pub scorpio_conflict: Option<f64>,
    pub version: String,
    pub pangolin_version: String,
    pub pangolearn_version: String,
    pub pango_version: String,
    pub status: Option<String>,
    pub note: Option<String>,
}

/// ncov-tools per-library QC summary
#[derive(Debug, Clone, PartialEq)]
pub struct QcSummary {
    pub library_id: String,
    pub sequencing_run_id: String,
    pub num_consensus_snvs: Option<i64>,
    pub num_consensus_n: Option<i64>,
    pub num_consensus_iupac: Option<i64>,
    pub num_variants_snvs: Option<i64>,
    pub num_variants_indel: Option<i64>,
    pub num_variants_indel_triplet: Option<i64>,
    pub mean_sequencing_depth: Option<f64>,
    pub median_sequencing_depth: Option<i64>,
    pub genome_completeness: Option<f64>,
    /// Raw comma-separated flag string from the `qc_pass` column
    pub qc_flags: String,
    pub qc_pass: bool,
}

impl QcSummary {
    /// Flags that fail a library
    pub const FAILING_FLAGS: [&'static str; 2] = ["INCOMPLETE_GENOME", "PARTIAL_GENOME"];

    /// A library passes unless its flags contain a failing flag
    pub fn passes(qc_flags: &str) -> bool {
        !qc_flags
            .split(',')
            .map(str::trim)
            .any(|flag| Self::FAILING_FLAGS.contains(&flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_instrument() {
        assert_eq!(Platform::from_instrument_id("M00325"), Some(Platform::MiSeq));
        assert_eq!(Platform::from_instrument_id("VH00123"), Some(Platform::NextSeq));
        assert_eq!(Platform::from_instrument_id("A00123"), None);
        assert_eq!(Platform::MiSeq.as_str(), "MISEQ");
        assert_eq!(Platform::NextSeq.as_str(), "NEXTSEQ");
    }

    #[test]
    fn test_qc_flags() {
        assert!(QcSummary::passes("PASS"));
        assert!(QcSummary::passes(""));
        assert!(QcSummary::passes("POSSIBLE_FRAMESHIFT_INDELS"));
        assert!(!QcSummary::passes("INCOMPLETE_GENOME"));
        assert!(!QcSummary::passes("POSSIBLE_FRAMESHIFT_INDELS,PARTIAL_GENOME"));
    }

    #[test]
    fn test_variant_type_str() {
        assert_eq!(VariantType::Snp.as_str(), "snp");
        assert_eq!(VariantType::Undetermined.as_str(), "undetermined");
    }
}
