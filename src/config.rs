// ==============================================================================
// config.rs - Loader Configuration
// ==============================================================================
// Description: Consensus thresholds, pipeline versions and batching settings
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::path::{Path, PathBuf};

use crate::classifier::{ClassifyError, FrequencyThresholds};

/// Records written between batch flushes
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub thresholds: FrequencyThresholds,
    /// Recorded for provenance; no depth filter is applied
    pub min_depth: u32,
    /// ncov2019-artic-nf version in the run output directory name
    pub artic_version: String,
    /// ncov-tools version in the QC output directory name
    pub ncov_tools_version: String,
    pub ivar_version: String,
    pub freebayes_version: String,
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            thresholds: FrequencyThresholds::default(),
            min_depth: 10,
            artic_version: "1.3".to_string(),
            ncov_tools_version: "1.5".to_string(),
            ivar_version: "1.3".to_string(),
            freebayes_version: "1.3.2".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl LoaderConfig {
    pub fn with_thresholds(mut self, min_freq: f64, freq: f64) -> Result<Self, ClassifyError> {
        self.thresholds = FrequencyThresholds::new(min_freq, freq)?;
        Ok(self)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// `<run>/ncov2019-artic-nf-v<artic>-output`
    pub fn artic_output_dir(&self, run_dir: &Path) -> PathBuf {
        run_dir.join(format!("ncov2019-artic-nf-v{}-output", self.artic_version))
    }

    /// Directory holding ivar variant tables
    pub fn ivar_variants_dir(&self, run_dir: &Path) -> PathBuf {
        self.artic_output_dir(run_dir)
            .join("ncovIllumina_sequenceAnalysis_addCodonPositionToVariants")
    }

    /// `<artic output>/ncov-tools-v<version>-output`
    pub fn ncov_tools_output_dir(&self, run_dir: &Path) -> PathBuf {
        self.artic_output_dir(run_dir)
            .join(format!("ncov-tools-v{}-output", self.ncov_tools_version))
    }

    pub fn qc_reports_dir(&self, run_dir: &Path) -> PathBuf {
        self.ncov_tools_output_dir(run_dir).join("qc_reports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.thresholds.min_freq(), 0.25);
        assert_eq!(config.thresholds.freq(), 0.75);
        assert_eq!(config.min_depth, 10);
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn test_run_paths() {
        let config = LoaderConfig::default();
        let run = Path::new("/runs/210115_M00325");

        assert_eq!(
            config.ivar_variants_dir(run),
            PathBuf::from("/runs/210115_M00325/ncov2019-artic-nf-v1.3-output/ncovIllumina_sequenceAnalysis_addCodonPositionToVariants")
        );
        assert_eq!(
            config.qc_reports_dir(run),
            PathBuf::from("/runs/210115_M00325/ncov2019-artic-nf-v1.3-output/ncov-tools-v1.5-output/qc_reports")
        );
    }

    #[test]
    fn test_threshold_validation() {
        assert!(LoaderConfig::default().with_thresholds(0.9, 0.1).is_err());
        let config = LoaderConfig::default().with_thresholds(0.2, 0.8).unwrap();
        assert_eq!(config.thresholds.min_freq(), 0.2);
    }

    #[test]
    fn test_batch_size_floor() {
        assert_eq!(LoaderConfig::default().with_batch_size(0).batch_size, 1);
    }
}
