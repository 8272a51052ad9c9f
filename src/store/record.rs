// ==============================================================================
// store/record.rs - Storable Records
// ==============================================================================
// Description: Static table/column descriptions for every stored entity
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use rusqlite::types::Value as SqlValue;

use crate::models::{
    AminoAcidMutation, FreebayesVariant, IvarVariant, Library, LineageCall, QcSummary, QpcrResult,
    SequencingRun, Specimen,
};

/// An entity stored in one table under a natural key
///
/// `key_values` and `values` must line up with `KEY_COLUMNS` and `COLUMNS`.
pub trait Record {
    const TABLE: &'static str;
    /// Natural key (the table's primary key)
    const KEY_COLUMNS: &'static [&'static str];
    /// Remaining columns
    const COLUMNS: &'static [&'static str];

    fn key_values(&self) -> Vec<SqlValue>;
    fn values(&self) -> Vec<SqlValue>;
}

/// `k1 IS ?n AND k2 IS ?n+1 ...` over the key columns, numbered from `first`
pub(crate) fn key_predicate<R: Record>(first: usize) -> String {
    R::KEY_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} IS ?{}", column, first + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Human-readable natural key, for error messages
pub(crate) fn describe_key(values: &[SqlValue]) -> String {
    values
        .iter()
        .map(|v| match v {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Real(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Blob(b) => format!("<{} bytes>", b.len()),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

fn opt_text(value: &Option<String>) -> SqlValue {
    SqlValue::from(value.clone())
}

impl Record for Specimen {
    const TABLE: &'static str = "specimen";
    const KEY_COLUMNS: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &["collection_date"];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![text(&self.id)]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::from(
            self.collection_date.map(|d| d.format("%Y-%m-%d").to_string()),
        )]
    }
}

impl Record for Library {
    const TABLE: &'static str = "library";
    const KEY_COLUMNS: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &[
        "specimen_id",
        "plate_id",
        "index_set_id",
        "well",
        "plate_row",
        "plate_col",
    ];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![text(&self.id)]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            opt_text(&self.specimen_id),
            text(&self.plate_id),
            opt_text(&self.index_set_id),
            text(&self.well),
            text(&self.plate_row),
            SqlValue::from(self.plate_col),
        ]
    }
}

impl Record for SequencingRun {
    const TABLE: &'static str = "sequencing_run";
    const KEY_COLUMNS: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &["run_date", "instrument_id", "platform"];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![text(&self.id)]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.run_date.format("%Y-%m-%d").to_string()),
            text(&self.instrument_id),
            SqlValue::from(self.platform.map(|p| p.as_str().to_string())),
        ]
    }
}

impl Record for QpcrResult {
    const TABLE: &'static str = "qpcr_result";
    const KEY_COLUMNS: &'static [&'static str] = &["specimen_id"];
    const COLUMNS: &'static [&'static str] = &["ct_value"];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![text(&self.specimen_id)]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::from(self.ct_value)]
    }
}

const VARIANT_KEY_COLUMNS: &[&str] = &[
    "library_id",
    "variant_calling_tool",
    "variant_calling_tool_version",
    "ref_accession",
    "nucleotide_position",
    "ref_allele",
    "alt_allele",
];

impl Record for IvarVariant {
    const TABLE: &'static str = "variant_ivar";
    const KEY_COLUMNS: &'static [&'static str] = VARIANT_KEY_COLUMNS;
    const COLUMNS: &'static [&'static str] = &[
        "ref_allele_depth",
        "ref_allele_depth_reverse_reads",
        "ref_allele_mean_quality",
        "alt_allele_depth",
        "alt_allele_depth_reverse_reads",
        "alt_allele_mean_quality",
        "alt_allele_frequency",
        "total_depth",
        "p_value_fishers_exact",
        "p_value_pass",
        "gene_name",
        "ref_codon",
        "ref_amino_acid",
        "alt_codon",
        "alt_amino_acid",
        "codon_position",
        "mutation_name_by_amino_acid",
        "variant_type",
        "consensus_allele",
        "is_ambiguous",
    ];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.library_id),
            text(&self.variant_calling_tool),
            text(&self.variant_calling_tool_version),
            text(&self.ref_accession),
            SqlValue::from(self.nucleotide_position),
            text(&self.ref_allele),
            text(&self.alt_allele),
        ]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.ref_allele_depth),
            SqlValue::from(self.ref_allele_depth_reverse_reads),
            SqlValue::from(self.ref_allele_mean_quality),
            SqlValue::from(self.alt_allele_depth),
            SqlValue::from(self.alt_allele_depth_reverse_reads),
            SqlValue::from(self.alt_allele_mean_quality),
            SqlValue::from(self.alt_allele_frequency),
            SqlValue::from(self.total_depth),
            SqlValue::from(self.p_value_fishers_exact),
            SqlValue::from(self.p_value_pass),
            opt_text(&self.gene_name),
            opt_text(&self.ref_codon),
            opt_text(&self.ref_amino_acid),
            opt_text(&self.alt_codon),
            opt_text(&self.alt_amino_acid),
            SqlValue::from(self.codon_position),
            opt_text(&self.mutation_name_by_amino_acid),
            text(self.variant_type.as_str()),
            opt_text(&self.consensus_allele),
            SqlValue::from(self.is_ambiguous),
        ]
    }
}

impl Record for FreebayesVariant {
    const TABLE: &'static str = "variant_freebayes";
    const KEY_COLUMNS: &'static [&'static str] = VARIANT_KEY_COLUMNS;
    const COLUMNS: &'static [&'static str] = &[
        "ref_allele_depth",
        "ref_allele_depth_reverse_reads",
        "ref_allele_mean_quality",
        "alt_allele_depth",
        "alt_allele_depth_reverse_reads",
        "alt_allele_mean_quality",
        "alt_allele_frequency",
        "total_depth",
        "annotation",
        "impact",
        "gene_name",
        "feature_id",
        "transcript_biotype",
        "nucleotide_change",
        "amino_acid_change",
        "cds_position",
        "cds_length",
        "amino_acid_position",
        "amino_acid_length",
        "annotation_errors_warnings_info",
        "variant_type",
        "consensus_allele",
        "is_ambiguous",
    ];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.library_id),
            text(&self.variant_calling_tool),
            text(&self.variant_calling_tool_version),
            text(&self.ref_accession),
            SqlValue::from(self.nucleotide_position),
            text(&self.ref_allele),
            text(&self.alt_allele),
        ]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.ref_allele_depth),
            SqlValue::from(self.ref_allele_depth_reverse_reads),
            SqlValue::from(self.ref_allele_mean_quality),
            SqlValue::from(self.alt_allele_depth),
            SqlValue::from(self.alt_allele_depth_reverse_reads),
            SqlValue::from(self.alt_allele_mean_quality),
            SqlValue::from(self.alt_allele_frequency),
            SqlValue::from(self.total_depth),
            opt_text(&self.annotation),
            opt_text(&self.impact),
            opt_text(&self.gene_name),
            opt_text(&self.feature_id),
            opt_text(&self.transcript_biotype),
            opt_text(&self.nucleotide_change),
            opt_text(&self.amino_acid_change),
            SqlValue::from(self.cds_position),
            SqlValue::from(self.cds_length),
            SqlValue::from(self.amino_acid_position),
            SqlValue::from(self.amino_acid_length),
            opt_text(&self.annotation_errors_warnings_info),
            text(self.variant_type.as_str()),
            opt_text(&self.consensus_allele),
            SqlValue::from(self.is_ambiguous),
        ]
    }
}

impl Record for AminoAcidMutation {
    const TABLE: &'static str = "ncov_tools_amino_acid_mutation";
    const KEY_COLUMNS: &'static [&'static str] = &[
        "library_id",
        "ref_accession",
        "nucleotide_position",
        "ref_allele",
        "alt_allele",
    ];
    const COLUMNS: &'static [&'static str] = &[
        "consequence",
        "gene",
        "ref_amino_acid",
        "alt_amino_acid",
        "codon_position",
        "mutation_name_by_amino_acid",
    ];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.library_id),
            text(&self.ref_accession),
            SqlValue::from(self.nucleotide_position),
            text(&self.ref_allele),
            text(&self.alt_allele),
        ]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.consequence),
            opt_text(&self.gene),
            opt_text(&self.ref_amino_acid),
            opt_text(&self.alt_amino_acid),
            SqlValue::from(self.codon_position),
            opt_text(&self.mutation_name_by_amino_acid),
        ]
    }
}

impl Record for LineageCall {
    const TABLE: &'static str = "pangolin_result";
    const KEY_COLUMNS: &'static [&'static str] = &[
        "sequencing_run_id",
        "library_id",
        "version",
        "pangolin_version",
        "pangolearn_version",
        "pango_version",
    ];
    const COLUMNS: &'static [&'static str] = &[
        "lineage",
        "conflict",
        "ambiguity_score",
        "scorpio_call",
        "scorpio_support",
        "scorpio_conflict",
        "status",
        "note",
    ];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.sequencing_run_id),
            text(&self.library_id),
            text(&self.version),
            text(&self.pangolin_version),
            text(&self.pangolearn_version),
            text(&self.pango_version),
        ]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            opt_text(&self.lineage),
            SqlValue::from(self.conflict),
            SqlValue::from(self.ambiguity_score),
            opt_text(&self.scorpio_call),
            SqlValue::from(self.scorpio_support),
            SqlValue::from(self.scorpio_conflict),
            opt_text(&self.status),
            opt_text(&self.note),
        ]
    }
}

impl Record for QcSummary {
    const TABLE: &'static str = "ncov_tools_summary_qc";
    const KEY_COLUMNS: &'static [&'static str] = &["library_id", "sequencing_run_id"];
    const COLUMNS: &'static [&'static str] = &[
        "num_consensus_snvs",
        "num_consensus_n",
        "num_consensus_iupac",
        "num_variants_snvs",
        "num_variants_indel",
        "num_variants_indel_triplet",
        "mean_sequencing_depth",
        "median_sequencing_depth",
        "genome_completeness",
        "qc_flags",
        "qc_pass",
    ];

    fn key_values(&self) -> Vec<SqlValue> {
        vec![text(&self.library_id), text(&self.sequencing_run_id)]
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.num_consensus_snvs),
            SqlValue::from(self.num_consensus_n),
            SqlValue::from(self.num_consensus_iupac),
            SqlValue::from(self.num_variants_snvs),
            SqlValue::from(self.num_variants_indel),
            SqlValue::from(self.num_variants_indel_triplet),
            SqlValue::from(self.mean_sequencing_depth),
            SqlValue::from(self.median_sequencing_depth),
            SqlValue::from(self.genome_completeness),
            text(&self.qc_flags),
            SqlValue::from(self.qc_pass),
        ]
    }
}
