// ==============================================================================
// amino_acid.rs - ncov-tools Amino-Acid Table Parser
// ==============================================================================
// Description: Typed rows from ncov-tools `*_aa_table.tsv` files
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated
// Example:
//   sample              chr         pos    ref  alt  Consequence       gene  protein  aa
//   R1234567-102-C-B07  MN908947.3  23403  A    G    missense_variant  S     D614G    S:D614G
// ==============================================================================

use crate::classifier::{derive_amino_acid_change, normalize_gene_name, normalize_mutation_name};
use crate::models::AminoAcidMutation;
use crate::normalizer::{FieldSpec, NormalizedRow, RowError};

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("sample", "library_id"),
    FieldSpec::text("chr", "ref_accession"),
    FieldSpec::int("pos", "nucleotide_position"),
    FieldSpec::text("ref", "ref_allele"),
    FieldSpec::text("alt", "alt_allele"),
    FieldSpec::text("Consequence", "consequence"),
    FieldSpec::text("gene", "gene").nullable(),
    FieldSpec::text("protein", "amino_acid_change").nullable(),
    FieldSpec::text("aa", "mutation_name_by_amino_acid").nullable(),
];

pub const REQUIRED_COLUMNS: &[&str] = &["sample", "chr", "pos", "ref", "alt", "Consequence"];

/// Build a typed amino-acid mutation from a normalized row
pub fn parse_row(row: &NormalizedRow) -> Result<AminoAcidMutation, RowError> {
    let consequence = row.require_text("consequence")?;
    let change = derive_amino_acid_change(row.text("amino_acid_change").as_deref(), &consequence);

    Ok(AminoAcidMutation {
        library_id: row.require_text("library_id")?,
        ref_accession: row.require_text("ref_accession")?,
        nucleotide_position: row.require_int("nucleotide_position")?,
        ref_allele: row.require_text("ref_allele")?,
        alt_allele: row.require_text("alt_allele")?,
        consequence,
        gene: row.text("gene").map(|g| normalize_gene_name(&g)),
        ref_amino_acid: change.ref_amino_acid,
        alt_amino_acid: change.alt_amino_acid,
        codon_position: change.codon_position,
        mutation_name_by_amino_acid: row
            .text("mutation_name_by_amino_acid")
            .map(|m| normalize_mutation_name(&m)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::TableReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "sample\tchr\tpos\tref\talt\tConsequence\tgene\tprotein\taa\n";

    fn parse_all(rows: &str) -> Vec<Result<AminoAcidMutation, RowError>> {
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
    fn test_missense_row() {
        let rows = parse_all("R1-102-C-B07\tMN908947.3\t23403\tA\tG\tmissense_variant\tS\tD614G\tS-D614G\n");
        let m = rows[0].clone().unwrap();

        assert_eq!(m.library_id, "R1-102-C-B07");
        assert_eq!(m.nucleotide_position, 23403);
        assert_eq!(m.ref_amino_acid.as_deref(), Some("D"));
        assert_eq!(m.codon_position, Some(614));
        assert_eq!(m.alt_amino_acid.as_deref(), Some("G"));
        assert_eq!(m.mutation_name_by_amino_acid.as_deref(), Some("S:D614G"));
    }

    #[test]
    fn test_orf_names_normalized() {
        let rows = parse_all("R1-102-C-B07\tMN908947.3\t3037\tC\tT\tsynonymous_variant\torf1ab\tF924F\torf1ab-F924F\n");
        let m = rows[0].clone().unwrap();

        assert_eq!(m.gene.as_deref(), Some("ORF1ab"));
        assert_eq!(m.mutation_name_by_amino_acid.as_deref(), Some("ORF1ab:F924F"));
    }

    #[test]
    fn test_deletion_has_no_amino_acid_fields() {
        let rows = parse_all("R1-102-C-B07\tMN908947.3\t11288\tTCTGGTTTT\tT\tinframe_deletion\torf1ab\tSGF3675-3677del\tNA\n");
        let m = rows[0].clone().unwrap();

        assert_eq!(m.ref_amino_acid, None);
        assert_eq!(m.codon_position, None);
        assert_eq!(m.alt_amino_acid, None);
        assert_eq!(m.mutation_name_by_amino_acid, None);
    }

    #[test]
    fn test_empty_protein_is_null() {
        let rows = parse_all("R1-102-C-B07\tMN908947.3\t241\tC\tT\tupstream_gene_variant\tNA\t\tNA\n");
        let m = rows[0].clone().unwrap();

        assert_eq!(m.gene, None);
        assert_eq!(m.ref_amino_acid, None);
        assert_eq!(m.codon_position, None);
    }
}
