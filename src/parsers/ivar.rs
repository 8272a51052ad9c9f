// ==============================================================================
// ivar.rs - ivar Variant Table Parser
// ==============================================================================
// Description: Typed rows from ivar `variants.tsv` files
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated, one file per library, library id = file stem
// Example:
//   REGION      POS  REF ALT REF_DP REF_RV REF_QUAL ALT_DP ALT_RV ALT_QUAL ALT_FREQ TOTAL_DP PVAL PASS GFF_FEATURE REF_CODON REF_AA ALT_CODON ALT_AA
//   MN908947.3  241  C   T   0      0      0        112    60     67       1        112      0    TRUE NA          NA        NA     NA        NA
// ==============================================================================

use std::path::Path;

use crate::classifier::FrequencyThresholds;
use crate::models::{IvarVariant, VariantType};
use crate::normalizer::{FieldSpec, NormalizedRow, RowError};

use super::{classify_or_unresolved, ParsedVariant};

pub const TOOL: &str = "ivar";

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("REGION", "ref_accession"),
    FieldSpec::int("POS", "nucleotide_position"),
    FieldSpec::text("REF", "ref_allele"),
    FieldSpec::text("ALT", "alt_allele"),
    FieldSpec::int("REF_DP", "ref_allele_depth"),
    FieldSpec::int("REF_RV", "ref_allele_depth_reverse_reads"),
    FieldSpec::int("REF_QUAL", "ref_allele_mean_quality"),
    FieldSpec::int("ALT_DP", "alt_allele_depth"),
    FieldSpec::int("ALT_RV", "alt_allele_depth_reverse_reads"),
    FieldSpec::int("ALT_QUAL", "alt_allele_mean_quality"),
    FieldSpec::float("ALT_FREQ", "alt_allele_frequency"),
    FieldSpec::int("TOTAL_DP", "total_depth"),
    FieldSpec::float("PVAL", "p_value_fishers_exact"),
    FieldSpec::boolean("PASS", "p_value_pass"),
    FieldSpec::text("GFF_FEATURE", "gene_name").nullable(),
    FieldSpec::text("REF_CODON", "ref_codon").nullable(),
    FieldSpec::text("REF_AA", "ref_amino_acid").nullable(),
    FieldSpec::text("ALT_CODON", "alt_codon").nullable(),
    FieldSpec::text("ALT_AA", "alt_amino_acid").nullable(),
    FieldSpec::int("CODON_POS", "codon_position").nullable(),
    FieldSpec::text("MUT_NAME", "mutation_name_by_amino_acid").nullable(),
];

/// Header columns a file must carry to be loaded at all
pub const REQUIRED_COLUMNS: &[&str] = &[
    "REGION", "POS", "REF", "ALT", "REF_DP", "REF_RV", "REF_QUAL", "ALT_DP", "ALT_RV",
    "ALT_QUAL", "ALT_FREQ", "TOTAL_DP", "PVAL", "PASS",
];

/// Library id of a variants file: its file name up to the first `.`
///
/// `R1234567-102-C-B07.variants.tsv` → `R1234567-102-C-B07`
pub fn library_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.split('.').next()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Build a typed variant from a normalized row
///
/// # Arguments
/// * `row` - Row normalized against [`FIELDS`]
/// * `library_id` - Library the file belongs to
/// * `tool_version` - ivar version recorded with the variant
/// * `thresholds` - Consensus frequency cut-offs
pub fn parse_row(
    row: &NormalizedRow,
    library_id: &str,
    tool_version: &str,
    thresholds: &FrequencyThresholds,
) -> Result<ParsedVariant<IvarVariant>, RowError> {
    let ref_allele = row.require_text("ref_allele")?;
    let alt_allele = row.require_text("alt_allele")?;
    let alt_allele_frequency = row.require_float("alt_allele_frequency")?;

    let variant_type = VariantType::from_ivar_alleles(&ref_allele, &alt_allele);
    let (classification, unresolved) = classify_or_unresolved(
        variant_type,
        &ref_allele,
        &alt_allele,
        alt_allele_frequency,
        thresholds,
    );

    let variant = IvarVariant {
        library_id: library_id.to_string(),
        variant_calling_tool: TOOL.to_string(),
        variant_calling_tool_version: tool_version.to_string(),
        ref_accession: row.require_text("ref_accession")?,
        nucleotide_position: row.require_int("nucleotide_position")?,
        ref_allele_depth: row.require_int("ref_allele_depth")?,
        ref_allele_depth_reverse_reads: row.require_int("ref_allele_depth_reverse_reads")?,
        ref_allele_mean_quality: row.require_int("ref_allele_mean_quality")?,
        alt_allele_depth: row.require_int("alt_allele_depth")?,
        alt_allele_depth_reverse_reads: row.require_int("alt_allele_depth_reverse_reads")?,
        alt_allele_mean_quality: row.require_int("alt_allele_mean_quality")?,
        alt_allele_frequency,
        total_depth: row.require_int("total_depth")?,
        p_value_fishers_exact: row.require_float("p_value_fishers_exact")?,
        p_value_pass: row.require_bool("p_value_pass")?,
        gene_name: row.text("gene_name"),
        ref_codon: row.text("ref_codon"),
        ref_amino_acid: row.text("ref_amino_acid"),
        alt_codon: row.text("alt_codon"),
        alt_amino_acid: row.text("alt_amino_acid"),
        codon_position: row.int("codon_position"),
        mutation_name_by_amino_acid: row.text("mutation_name_by_amino_acid"),
        ref_allele,
        alt_allele,
        variant_type: classification.variant_type,
        consensus_allele: classification.consensus_allele,
        is_ambiguous: classification.is_ambiguous,
    };

    Ok(ParsedVariant { variant, unresolved })
}
