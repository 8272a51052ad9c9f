// ==============================================================================
// classifier.rs - Variant Classification and Consensus Calling
// ==============================================================================
// Description: Derives variant type, consensus allele and ambiguity flag from
//              allele strings and alt-allele frequency; decodes amino-acid
//              change strings
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-17
// Version: 1.2.0
// ==============================================================================
// Consensus rule (SNPs only):
//   freq < min_freq_threshold                      → REF
//   min_freq_threshold < freq < freq_threshold     → IUPAC code for (REF, ALT)
//   freq > freq_threshold                          → ALT
//   freq == either threshold                       → unresolved (reported)
// ==============================================================================

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::VariantType;

/// Ambiguity codes that do not resolve to a single base
pub const AMBIGUOUS_CODES: [char; 6] = ['M', 'R', 'W', 'S', 'Y', 'K'];

/// IUPAC code for an ordered (REF, ALT) pair over {A,C,G,T}
const IUPAC_AMBIGUITY: [((char, char), char); 16] = [
    (('A', 'A'), 'A'),
    (('A', 'C'), 'M'),
    (('A', 'G'), 'R'),
    (('A', 'T'), 'W'),
    (('C', 'A'), 'M'),
    (('C', 'C'), 'C'),
    (('C', 'G'), 'S'),
    (('C', 'T'), 'Y'),
    (('G', 'A'), 'R'),
    (('G', 'C'), 'S'),
    (('G', 'G'), 'G'),
    (('G', 'T'), 'K'),
    (('T', 'A'), 'W'),
    (('T', 'C'), 'Y'),
    (('T', 'G'), 'K'),
    (('T', 'T'), 'T'),
];

/// Look up the IUPAC code for an ordered base pair
pub fn iupac_code(ref_base: char, alt_base: char) -> Option<char> {
    IUPAC_AMBIGUITY
        .iter()
        .find(|((r, a), _)| *r == ref_base && *a == alt_base)
        .map(|(_, code)| *code)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("No consensus for {ref_allele}>{alt_allele} at alt frequency {frequency}")]
    AmbiguityLookupMiss {
        variant_type: VariantType,
        ref_allele: String,
        alt_allele: String,
        frequency: f64,
    },

    #[error("Invalid frequency thresholds: min {min} must not exceed {max} (both within 0-1)")]
    InvalidThresholds { min: f64, max: f64 },
}

impl ClassifyError {
    /// Classification to store when the consensus could not be resolved
    pub fn unresolved(&self) -> Option<Classification> {
        match self {
            ClassifyError::AmbiguityLookupMiss { variant_type, .. } => Some(Classification {
                variant_type: *variant_type,
                consensus_allele: None,
                is_ambiguous: None,
            }),
            ClassifyError::InvalidThresholds { .. } => None,
        }
    }
}

/// Alt-allele frequency cut-offs for consensus calling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyThresholds {
    min_freq: f64,
    freq: f64,
}

impl Default for FrequencyThresholds {
    fn default() -> Self {
        Self {
            min_freq: 0.25,
            freq: 0.75,
        }
    }
}

impl FrequencyThresholds {
    pub fn new(min_freq: f64, freq: f64) -> Result<Self, ClassifyError> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(min_freq) || !in_range(freq) || min_freq > freq {
            return Err(ClassifyError::InvalidThresholds {
                min: min_freq,
                max: freq,
            });
        }
        Ok(Self { min_freq, freq })
    }

    pub fn min_freq(&self) -> f64 {
        self.min_freq
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }
}

/// Derived fields for one variant
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub variant_type: VariantType,
    pub consensus_allele: Option<String>,
    pub is_ambiguous: Option<bool>,
}

impl VariantType {
    /// Variant type from ivar-style alleles (`+CT` insertions, `-CT` deletions)
    pub fn from_ivar_alleles(ref_allele: &str, alt_allele: &str) -> Self {
        if ref_allele.chars().count() == 1 && alt_allele.chars().count() == 1 {
            VariantType::Snp
        } else if alt_allele.starts_with('+') {
            VariantType::Ins
        } else if alt_allele.starts_with('-') {
            VariantType::Del
        } else {
            VariantType::Undetermined
        }
    }

    /// Variant type from VCF-style alleles (`AT>A` deletion, `A>AT` insertion)
    pub fn from_vcf_alleles(ref_allele: &str, alt_allele: &str) -> Self {
        let (r, a) = (ref_allele.chars().count(), alt_allele.chars().count());
        if r == 1 && a == 1 {
            VariantType::Snp
        } else if a > r {
            VariantType::Ins
        } else if a < r {
            VariantType::Del
        } else {
            VariantType::Undetermined
        }
    }
}

/// Classify an ivar variant
///
/// # Returns
/// * `Ok(Classification)` - consensus and ambiguity set for SNPs, unset otherwise
/// * `Err(ClassifyError::AmbiguityLookupMiss)` - SNP frequency sits exactly on a
///   threshold, or the pair has no IUPAC code; use [`ClassifyError::unresolved`]
///
/// # Example
/// ```
/// use ncov_db::classifier::{classify, FrequencyThresholds};
///
/// let t = FrequencyThresholds::default();
/// let c = classify("A", "G", 0.5, &t).unwrap();
/// assert_eq!(c.consensus_allele.as_deref(), Some("R"));
/// assert_eq!(c.is_ambiguous, Some(true));
/// ```
pub fn classify(
    ref_allele: &str,
    alt_allele: &str,
    alt_frequency: f64,
    thresholds: &FrequencyThresholds,
) -> Result<Classification, ClassifyError> {
    let variant_type = VariantType::from_ivar_alleles(ref_allele, alt_allele);
    classify_typed(variant_type, ref_allele, alt_allele, alt_frequency, thresholds)
}

/// Classify a variant whose type has already been derived
pub fn classify_typed(
    variant_type: VariantType,
    ref_allele: &str,
    alt_allele: &str,
    alt_frequency: f64,
    thresholds: &FrequencyThresholds,
) -> Result<Classification, ClassifyError> {
    if variant_type != VariantType::Snp {
        return Ok(Classification {
            variant_type,
            consensus_allele: None,
            is_ambiguous: None,
        });
    }

    let miss = || ClassifyError::AmbiguityLookupMiss {
        variant_type,
        ref_allele: ref_allele.to_string(),
        alt_allele: alt_allele.to_string(),
        frequency: alt_frequency,
    };

    let consensus = if alt_frequency < thresholds.min_freq {
        ref_allele.to_string()
    } else if alt_frequency > thresholds.min_freq && alt_frequency < thresholds.freq {
        let ref_base = ref_allele.chars().next().ok_or_else(miss)?;
        let alt_base = alt_allele.chars().next().ok_or_else(miss)?;
        iupac_code(ref_base, alt_base).ok_or_else(miss)?.to_string()
    } else if alt_frequency > thresholds.freq {
        alt_allele.to_string()
    } else {
        // Exactly on a threshold (or NaN)
        return Err(miss());
    };

    let is_ambiguous = is_ambiguous_code(&consensus);

    Ok(Classification {
        variant_type,
        consensus_allele: Some(consensus),
        is_ambiguous: Some(is_ambiguous),
    })
}

fn is_ambiguous_code(consensus: &str) -> bool {
    let mut chars = consensus.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => AMBIGUOUS_CODES.contains(&c),
        _ => false,
    }
}

/// Amino-acid fields decoded from a combined protein change (`S123F`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AminoAcidChange {
    pub ref_amino_acid: Option<String>,
    pub codon_position: Option<i64>,
    pub alt_amino_acid: Option<String>,
}

fn ref_aa_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]+").expect("valid regex"))
}

fn codon_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+").expect("valid regex"))
}

fn alt_aa_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Z]+$").expect("valid regex"))
}

/// Decode a protein change string unless the consequence is a deletion
///
/// Each component that does not match comes back as `None`.
pub fn derive_amino_acid_change(protein_change: Option<&str>, consequence: &str) -> AminoAcidChange {
    let change = match protein_change {
        Some(change) if !change.is_empty() && !consequence.contains("deletion") => change,
        _ => return AminoAcidChange::default(),
    };

    AminoAcidChange {
        ref_amino_acid: ref_aa_pattern().find(change).map(|m| m.as_str().to_string()),
        codon_position: codon_pattern()
            .find(change)
            .and_then(|m| m.as_str().parse::<i64>().ok()),
        alt_amino_acid: alt_aa_pattern().find(change).map(|m| m.as_str().to_string()),
    }
}

/// `orf1ab` → `ORF1ab`
pub fn normalize_gene_name(gene: &str) -> String {
    gene.replace("orf", "ORF")
}

/// `orf1ab-T1001I` → `ORF1ab:T1001I`
pub fn normalize_mutation_name(name: &str) -> String {
    name.replace('-', ":").replace("orf", "ORF")
}
