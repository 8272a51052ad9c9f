// ==============================================================================
// loader.rs - Per-File Load Pipelines
// ==============================================================================
// Description: Normalizes, decodes, classifies and stores one input file inside
//              a single write session
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-18
// Version: 1.1.0
// ==============================================================================
// Every pipeline follows the same order per row:
//   Specimen → Library → SequencingRun → dependent record
// Row-level failures are reported as events and skipped; storage failures
// abort the file (and the run). The file commits once, after its last row.
// ==============================================================================

use std::path::Path;
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::events::{EventSink, LoadEvent};
use crate::identifiers::{decode_library_id, decode_run_id, LibraryKey};
use crate::models::Specimen;
use crate::normalizer::{FieldSpec, NormalizedRow, RowError, TableReader};
use crate::parsers::{amino_acid, freebayes, ivar, metadata, pangolin, qc_summary, ParsedVariant};
use crate::store::{Outcome, Record, Session, Store, StoreError};

/// Input file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Metadata,
    IvarVariants,
    QcSummary,
    AminoAcidTable,
    PangolinLineages,
    FreebayesMelted,
}

impl FileKind {
    /// `file_type` label used in progress events
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Metadata => "metadata_tsv",
            FileKind::IvarVariants => "ivar_variants_tsv",
            FileKind::QcSummary => "ncov_tools_summary_qc",
            FileKind::AminoAcidTable => "ncov_tools_aa_table",
            FileKind::PangolinLineages => "pangolin_lineages_csv",
            FileKind::FreebayesMelted => "freebayes_melted_tsv",
        }
    }
}

/// Counts for one loaded file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    /// Data rows read (header excluded)
    pub rows_read: usize,
    pub inserted: usize,
    pub already_present: usize,
    /// Rows skipped with a loading error
    pub skipped: usize,
    /// Variants stored without a consensus allele
    pub unresolved: usize,
    /// Null fields filled on existing rows
    pub filled: usize,
    pub flushes: usize,
}

impl FileReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::AlreadyExists => self.already_present += 1,
        }
    }

    /// Add another file's counts to these
    pub fn absorb(&mut self, other: &FileReport) {
        self.rows_read += other.rows_read;
        self.inserted += other.inserted;
        self.already_present += other.already_present;
        self.skipped += other.skipped;
        self.unresolved += other.unresolved;
        self.filled += other.filled;
        self.flushes += other.flushes;
    }
}

/// Why a single row could not be stored
enum RowFailure {
    Row(RowError),
    Store(StoreError),
}

impl From<RowError> for RowFailure {
    fn from(error: RowError) -> Self {
        RowFailure::Row(error)
    }
}

impl From<StoreError> for RowFailure {
    fn from(error: StoreError) -> Self {
        RowFailure::Store(error)
    }
}

/// Load one file of the given kind
pub fn load_file(
    kind: FileKind,
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    match kind {
        FileKind::Metadata => load_metadata(store, config, path, events),
        FileKind::IvarVariants => load_ivar_variants(store, config, path, events),
        FileKind::QcSummary => load_qc_summary(store, config, path, events),
        FileKind::AminoAcidTable => load_amino_acid_table(store, config, path, events),
        FileKind::PangolinLineages => load_pangolin_results(store, config, path, events),
        FileKind::FreebayesMelted => load_freebayes_variants(store, config, path, events),
    }
}

/// Load an ivar `variants.tsv`; the library id comes from the file name
pub fn load_ivar_variants(
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    let library_id = ivar::library_id_from_path(path).unwrap_or_default();
    let key = decode_library_id(&library_id).map_err(|source| LoadError::Identifier {
        path: path.to_path_buf(),
        source,
    })?;

    let rows = read_table(path, b'\t', ivar::REQUIRED_COLUMNS, ivar::FIELDS)?;
    let mut session = store.session(config.batch_size)?;
    store_library(&session, key)?;

    let report = load_rows(&mut session, rows, events, |session, row, events, report| {
        let parsed = ivar::parse_row(row, &library_id, &config.ivar_version, &config.thresholds)?;
        let position = parsed.variant.nucleotide_position;
        store_variant(session, row, parsed, (&library_id, position), events, report)
    })?;

    finish(session, report, path)
}

/// Load a melted freebayes/snpEff table
pub fn load_freebayes_variants(
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    let rows = read_table(path, b'\t', freebayes::REQUIRED_COLUMNS, freebayes::FIELDS)?;
    let mut session = store.session(config.batch_size)?;

    let report = load_rows(&mut session, rows, events, |session, row, events, report| {
        let parsed = freebayes::parse_row(row, &config.freebayes_version, &config.thresholds)?;
        let library_id = parsed.variant.library_id.clone();
        let position = parsed.variant.nucleotide_position;
        store_library_for_row(session, row, &library_id)?;
        store_variant(session, row, parsed, (&library_id, position), events, report)
    })?;

    finish(session, report, path)
}

/// Load an ncov-tools amino-acid table
pub fn load_amino_acid_table(
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    let rows = read_table(path, b'\t', amino_acid::REQUIRED_COLUMNS, amino_acid::FIELDS)?;
    let mut session = store.session(config.batch_size)?;

    let report = load_rows(&mut session, rows, events, |session, row, _, _| {
        let mutation = amino_acid::parse_row(row)?;
        store_library_for_row(session, row, &mutation.library_id)?;
        Ok(Some(session.upsert(&mutation)?))
    })?;

    finish(session, report, path)
}

/// Load an ncov-tools QC summary
pub fn load_qc_summary(
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    let rows = read_table(path, b'\t', qc_summary::REQUIRED_COLUMNS, qc_summary::FIELDS)?;
    let mut session = store.session(config.batch_size)?;

    let report = load_rows(&mut session, rows, events, |session, row, _, _| {
        let summary = qc_summary::parse_row(row)?;
        store_parents_for_row(session, row, &summary.library_id, &summary.sequencing_run_id)?;
        Ok(Some(session.upsert(&summary)?))
    })?;

    finish(session, report, path)
}

/// Load a pangolin lineage report (CSV)
pub fn load_pangolin_results(
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    let rows = read_table(path, b',', pangolin::REQUIRED_COLUMNS, pangolin::FIELDS)?;
    let mut session = store.session(config.batch_size)?;

    let report = load_rows(&mut session, rows, events, |session, row, _, _| {
        let call = pangolin::parse_row(row)?;
        store_parents_for_row(session, row, &call.library_id, &call.sequencing_run_id)?;
        Ok(Some(session.upsert(&call)?))
    })?;

    finish(session, report, path)
}

/// Load run metadata: collection dates and qPCR Ct values
///
/// Existing specimens keep their stored values; only null fields are filled.
pub fn load_metadata(
    store: &mut Store,
    config: &LoaderConfig,
    path: &Path,
    events: &mut dyn EventSink,
) -> Result<FileReport, LoadError> {
    let rows = read_table(path, b'\t', metadata::REQUIRED_COLUMNS, metadata::FIELDS)?;
    let mut session = store.session(config.batch_size)?;

    let report = load_rows(&mut session, rows, events, |session, row, _, report| {
        let meta = match metadata::parse_row(row)? {
            Some(meta) => meta,
            None => return Ok(None),
        };

        let outcome = session.upsert(&meta.specimen)?;
        if outcome == Outcome::AlreadyExists && session.fill_missing(&meta.specimen, "collection_date")? {
            report.filled += 1;
        }

        if let Some(qpcr) = &meta.qpcr {
            if session.upsert(qpcr)? == Outcome::AlreadyExists && session.fill_missing(qpcr, "ct_value")? {
                report.filled += 1;
            }
        }

        Ok(Some(outcome))
    })?;

    finish(session, report, path)
}

fn read_table(
    path: &Path,
    delimiter: u8,
    required: &[&str],
    fields: &[FieldSpec],
) -> Result<Vec<Result<NormalizedRow, RowError>>, LoadError> {
    let reader = TableReader::open(path, delimiter)?;
    reader.require_columns(required)?;
    Ok(reader.read_rows(fields)?)
}

/// Drive `load_row` over every row, reporting and skipping row failures
fn load_rows<F>(
    session: &mut Session<'_>,
    rows: Vec<Result<NormalizedRow, RowError>>,
    events: &mut dyn EventSink,
    mut load_row: F,
) -> Result<FileReport, LoadError>
where
    F: FnMut(
        &Session<'_>,
        &NormalizedRow,
        &mut dyn EventSink,
        &mut FileReport,
    ) -> Result<Option<Outcome>, RowFailure>,
{
    let mut report = FileReport::default();

    for (idx, row) in rows.into_iter().enumerate() {
        report.rows_read += 1;

        let result = match row {
            Ok(row) => load_row(session, &row, &mut *events, &mut report),
            Err(e) => Err(RowFailure::Row(e)),
        };

        match result {
            Ok(Some(outcome)) => report.record(outcome),
            Ok(None) => {}
            Err(RowFailure::Row(e)) => {
                debug!("Skipping row: {}", e);
                report.skipped += 1;
                events.emit(LoadEvent::row_error(&e));
            }
            Err(RowFailure::Store(e)) => return Err(e.into()),
        }

        session.flush_if_due(idx + 1)?;
    }

    Ok(report)
}

fn finish(session: Session<'_>, mut report: FileReport, path: &Path) -> Result<FileReport, LoadError> {
    report.flushes = session.commit()?;
    info!(
        "Loaded {:?}: {} rows, {} inserted, {} already present, {} skipped",
        path, report.rows_read, report.inserted, report.already_present, report.skipped
    );
    Ok(report)
}

/// Store a classified variant, reporting an unresolved consensus
fn store_variant<R: Record>(
    session: &Session<'_>,
    row: &NormalizedRow,
    parsed: ParsedVariant<R>,
    (library_id, position): (&str, i64),
    events: &mut dyn EventSink,
    report: &mut FileReport,
) -> Result<Option<Outcome>, RowFailure> {
    if let Some(e) = &parsed.unresolved {
        report.unresolved += 1;
        events.emit(LoadEvent::unresolved_consensus(
            row.path(),
            row.row(),
            library_id,
            position,
            e,
        ));
    }
    Ok(Some(session.upsert(&parsed.variant)?))
}

/// Create the specimen (unless a control) and the library
fn store_library(session: &Session<'_>, key: LibraryKey) -> Result<(), StoreError> {
    if let Some(specimen_id) = &key.specimen_id {
        session.upsert(&Specimen::new(specimen_id.clone()))?;
    }
    session.upsert(&key.into_library())?;
    Ok(())
}

fn store_library_for_row(
    session: &Session<'_>,
    row: &NormalizedRow,
    library_id: &str,
) -> Result<(), RowFailure> {
    let key = decode_library_id(library_id).map_err(|e| row.identifier_error(e))?;
    Ok(store_library(session, key)?)
}

/// Decode both identifiers before writing, so a bad run id leaves no parents
fn store_parents_for_row(
    session: &Session<'_>,
    row: &NormalizedRow,
    library_id: &str,
    run_id: &str,
) -> Result<(), RowFailure> {
    let key = decode_library_id(library_id).map_err(|e| row.identifier_error(e))?;
    let run = decode_run_id(run_id).map_err(|e| row.identifier_error(e))?;

    store_library(session, key)?;
    session.upsert(&run)?;
    Ok(())
}
