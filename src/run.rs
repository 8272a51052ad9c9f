// ==============================================================================
// run.rs - Run Orchestrator
// ==============================================================================
// Description: Discovers a sequencing run's pipeline outputs and loads them
//              file by file, reporting progress
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-18
// Version: 1.1.0
// ==============================================================================
// Layout under RUN_DIR (versions from LoaderConfig):
//   **/metadata.tsv
//   ncov2019-artic-nf-v<artic>-output/
//     ncovIllumina_sequenceAnalysis_addCodonPositionToVariants/**/*.tsv
//     ncov-tools-v<ncov-tools>-output/
//       qc_reports/**/*_summary_qc.tsv
//       **/by_plate/<plate>/qc_annotation/*_aa_table.tsv
// ==============================================================================

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::events::{percent, EventSink, LoadEvent};
use crate::loader::{self, FileKind, FileReport};
use crate::store::Store;

/// Files of one kind, in load order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    pub kind: FileKind,
    pub files: Vec<PathBuf>,
}

/// Outcome of loading a run (or a directory of files)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub files_loaded: usize,
    pub files_failed: usize,
    pub totals: FileReport,
}

/// Find a run's input files, grouped in load order
///
/// Missing sub-directories give empty groups; a missing run directory fails.
pub fn discover_run_files(run_dir: &Path, config: &LoaderConfig) -> Result<Vec<FileGroup>, LoadError> {
    require_dir(run_dir)?;

    Ok(vec![
        FileGroup {
            kind: FileKind::Metadata,
            files: find_files(run_dir, 1, usize::MAX, |path| file_name_is(path, "metadata.tsv")),
        },
        FileGroup {
            kind: FileKind::IvarVariants,
            files: find_files(&config.ivar_variants_dir(run_dir), 1, usize::MAX, |path| {
                path.extension().is_some_and(|ext| ext == "tsv")
            }),
        },
        FileGroup {
            kind: FileKind::QcSummary,
            files: find_files(&config.qc_reports_dir(run_dir), 1, usize::MAX, |path| {
                file_name_ends_with(path, "_summary_qc.tsv")
            }),
        },
        FileGroup {
            kind: FileKind::AminoAcidTable,
            files: find_files(&config.ncov_tools_output_dir(run_dir), 1, usize::MAX, |path| {
                file_name_ends_with(path, "_aa_table.tsv") && is_plate_annotation(path)
            }),
        },
    ])
}

/// Load every discovered file of a run
pub fn load_run(
    store: &mut Store,
    config: &LoaderConfig,
    run_dir: &Path,
    events: &mut dyn EventSink,
) -> Result<RunReport, LoadError> {
    let groups = discover_run_files(run_dir, config)?;
    info!("Loading run: {:?}", run_dir);
    events.emit(LoadEvent::run_started(run_dir));

    let mut report = RunReport::default();
    for group in &groups {
        load_group(store, config, group, events, &mut report)?;
    }

    events.emit(LoadEvent::run_completed(run_dir));
    info!(
        "Run loaded: {} files ({} failed), {} records inserted",
        report.files_loaded, report.files_failed, report.totals.inserted
    );
    Ok(report)
}

/// Load every melted freebayes table (`*.tsv`) below `dir`
pub fn load_freebayes_dir(
    store: &mut Store,
    config: &LoaderConfig,
    dir: &Path,
    events: &mut dyn EventSink,
) -> Result<RunReport, LoadError> {
    require_dir(dir)?;
    let group = FileGroup {
        kind: FileKind::FreebayesMelted,
        files: find_files(dir, 1, usize::MAX, |path| {
            path.extension().is_some_and(|ext| ext == "tsv")
        }),
    };

    let mut report = RunReport::default();
    load_group(store, config, &group, events, &mut report)?;
    Ok(report)
}

/// Load a single pangolin lineage report
pub fn load_pangolin_file(
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    let report = loader::load_pangolin_results(store, config, path, events)?;
    events.emit(LoadEvent::file_loaded(
        FileKind::PangolinLineages.label(),
        path,
        percent(1, 1),
    ));
    Ok(report)
}

/// Load one group, emitting progress per file
///
/// Files that cannot be read are reported and skipped; storage failures stop
/// the load.
fn load_group(
    store: &mut Store,
    config: &LoaderConfig,
    group: &FileGroup,
    events: &mut dyn EventSink,
    report: &mut RunReport,
) -> Result<(), LoadError> {
    let total = group.files.len();
    let label = group.kind.label();

    for (n, path) in group.files.iter().enumerate() {
        match loader::load_file(group.kind, store, config, path, events) {
            Ok(file_report) => {
                report.files_loaded += 1;
                report.totals.absorb(&file_report);
                events.emit(LoadEvent::file_loaded(label, path, percent(n + 1, total)));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                report.files_failed += 1;
                events.emit(LoadEvent::file_load_failed(label, path, &e));
            }
        }
    }

    Ok(())
}

fn require_dir(dir: &Path) -> Result<(), LoadError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(LoadError::Discovery {
            path: dir.to_path_buf(),
            reason: "not a directory".to_string(),
        })
    }
}

/// Regular files under `root` accepted by `matches`, in sorted order
fn find_files(
    root: &Path,
    min_depth: usize,
    max_depth: usize,
    matches: impl Fn(&Path) -> bool,
) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(min_depth)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && matches(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// `.../by_plate/<plate>/qc_annotation/<file>`
fn is_plate_annotation(path: &Path) -> bool {
    let mut ancestors = path.ancestors().skip(1).map(Path::file_name);
    let annotation = ancestors.next().flatten();
    let plate = ancestors.next().flatten();
    let by_plate = ancestors.next().flatten();

    annotation.is_some_and(|dir| dir == "qc_annotation")
        && plate.is_some()
        && by_plate.is_some_and(|dir| dir == "by_plate")
}

fn file_name_is(path: &Path, name: &str) -> bool {
    path.file_name().is_some_and(|n| n == name)
}

fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discovery_layout() {
        let dir = tempdir().unwrap();
        let run = dir.path();
        let config = LoaderConfig::default();
        let artic = config.artic_output_dir(run);
        let tools = config.ncov_tools_output_dir(run);

        touch(&run.join("metadata.tsv"));
        touch(&config.ivar_variants_dir(run).join("R2-1-A-A02.variants.tsv"));
        touch(&config.ivar_variants_dir(run).join("R1-1-A-A01.variants.tsv"));
        touch(&config.ivar_variants_dir(run).join("notes.txt"));
        touch(&tools.join("qc_reports/plate1_summary_qc.tsv"));
        touch(&tools.join("qc_reports/plate1_ncov_watch.tsv"));
        touch(&tools.join("by_plate/1/qc_annotation/1_aa_table.tsv"));
        touch(&tools.join("by_plate/1/other/1_aa_table.tsv"));
        touch(&tools.join("rerun/by_plate/2/qc_annotation/2_aa_table.tsv"));
        touch(&tools.join("by_plate/1/extra/qc_annotation/1_aa_table.tsv"));
        touch(&artic.join("unrelated.tsv"));

        let groups = discover_run_files(run, &config).unwrap();
        let kinds: Vec<FileKind> = groups.iter().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FileKind::Metadata,
                FileKind::IvarVariants,
                FileKind::QcSummary,
                FileKind::AminoAcidTable
            ]
        );

        assert_eq!(groups[0].files, vec![run.join("metadata.tsv")]);
        assert_eq!(
            groups[1].files,
            vec![
                config.ivar_variants_dir(run).join("R1-1-A-A01.variants.tsv"),
                config.ivar_variants_dir(run).join("R2-1-A-A02.variants.tsv"),
            ]
        );
        assert_eq!(groups[2].files, vec![tools.join("qc_reports/plate1_summary_qc.tsv")]);
        assert_eq!(
            groups[3].files,
            vec![
                tools.join("by_plate/1/qc_annotation/1_aa_table.tsv"),
                tools.join("rerun/by_plate/2/qc_annotation/2_aa_table.tsv"),
            ]
        );
    }

    #[test]
    fn test_missing_subdirectories_are_empty() {
        let dir = tempdir().unwrap();
        let groups = discover_run_files(dir.path(), &LoaderConfig::default()).unwrap();
        assert!(groups.iter().all(|g| g.files.is_empty()));
    }

    #[test]
    fn test_missing_run_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let result = discover_run_files(&dir.path().join("absent"), &LoaderConfig::default());
        match result {
            Err(e @ LoadError::Discovery { .. }) => assert!(e.is_fatal()),
            other => panic!("Expected Discovery error, got {:?}", other),
        }
    }
}
