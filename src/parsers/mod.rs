// ==============================================================================
// parsers/mod.rs - Input format parsers
// ==============================================================================
// Description: Column tables and typed row constructors for each pipeline
//              output format
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod amino_acid;
pub mod freebayes;
pub mod ivar;
pub mod metadata;
pub mod pangolin;
pub mod qc_summary;

use crate::classifier::{classify_typed, Classification, ClassifyError, FrequencyThresholds};
use crate::models::VariantType;

/// A parsed variant plus the reason its consensus stayed unset, if any
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVariant<T> {
    pub variant: T,
    pub unresolved: Option<ClassifyError>,
}

/// Classify a variant, falling back to an unset consensus on failure
pub(crate) fn classify_or_unresolved(
    variant_type: VariantType,
    ref_allele: &str,
    alt_allele: &str,
    alt_frequency: f64,
    thresholds: &FrequencyThresholds,
) -> (Classification, Option<ClassifyError>) {
    match classify_typed(variant_type, ref_allele, alt_allele, alt_frequency, thresholds) {
        Ok(classification) => (classification, None),
        Err(e) => {
            let classification = e.unresolved().unwrap_or(Classification {
                variant_type,
                consensus_allele: None,
                is_ambiguous: None,
            });
            (classification, Some(e))
        }
    }
}
