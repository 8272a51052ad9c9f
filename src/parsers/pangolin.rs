// ==============================================================================
// pangolin.rs - Pangolin Lineage Report Parser
// ==============================================================================
// Description: Typed rows from pangolin lineage CSV reports
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Format: comma-separated
// Example:
//   run_id,sample_id,lineage,conflict,ambiguity_score,scorpio_call,scorpio_support,scorpio_conflict,version,pangolin_version,pangoLEARN_version,pango_version,status,note
//   210115_M00325_0101_000000000-JGYTW,R1234567-102-C-B07,B.1.1.7,0.0,0.98,Alpha (B.1.1.7-like),1.0,0.0,PLEARN-v1.2.66,3.1.11,2021-08-24,v1.2.66,passed_qc,
// ==============================================================================

use crate::models::LineageCall;
use crate::normalizer::{FieldSpec, NormalizedRow, RowError};

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("run_id", "sequencing_run_id"),
    FieldSpec::text("sample_id", "library_id"),
    FieldSpec::text("lineage", "lineage").nullable(),
    FieldSpec::float("conflict", "conflict").nullable(),
    FieldSpec::float("ambiguity_score", "ambiguity_score").nullable(),
    FieldSpec::text("scorpio_call", "scorpio_call").nullable(),
    FieldSpec::float("scorpio_support", "scorpio_support").nullable(),
    FieldSpec::float("scorpio_conflict", "scorpio_conflict").nullable(),
    FieldSpec::text("version", "version"),
    FieldSpec::text("pangolin_version", "pangolin_version"),
    FieldSpec::text("pangoLEARN_version", "pangolearn_version"),
    FieldSpec::text("pango_version", "pango_version"),
    FieldSpec::text("status", "status").nullable(),
    FieldSpec::text("note", "note").nullable(),
];

pub const REQUIRED_COLUMNS: &[&str] = &[
    "run_id",
    "sample_id",
    "version",
    "pangolin_version",
    "pangoLEARN_version",
    "pango_version",
];

/// Build a typed lineage call from a normalized row
pub fn parse_row(row: &NormalizedRow) -> Result<LineageCall, RowError> {
    Ok(LineageCall {
        sequencing_run_id: row.require_text("sequencing_run_id")?,
        library_id: row.require_text("library_id")?,
        lineage: row.text("lineage"),
        conflict: row.float("conflict"),
        ambiguity_score: row.float("ambiguity_score"),
        scorpio_call: row.text("scorpio_call"),
        scorpio_support: row.float("scorpio_support"),
        scorpio_conflict: row.float("scorpio_conflict"),
        version: row.require_text("version")?,
        pangolin_version: row.require_text("pangolin_version")?,
        pangolearn_version: row.require_text("pangolearn_version")?,
        pango_version: row.require_text("pango_version")?,
        status: row.text("status"),
        note: row.text("note"),
    })
}
