// ==============================================================================
// events.rs - Structured Load Events
// ==============================================================================
// Description: Progress and loading-error events emitted while loading
//              pipeline outputs (one JSON object per line)
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-17
// Version: 1.1.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::classifier::ClassifyError;
use crate::normalizer::RowError;

/// Kind of row-level loading error
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadingErrorKind {
    MalformedRow,
    MalformedIdentifier,
    AmbiguityLookupMiss,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    LoadRunStarted {
        run_dir: String,
    },
    LoadRunCompleted {
        run_dir: String,
    },
    FileLoaded {
        file_type: String,
        filename: String,
        progress_pct: f64,
    },
    FileLoadFailed {
        file_type: String,
        filename: String,
        error: String,
    },
    LoadingError {
        error: LoadingErrorKind,
        input_file: String,
        row: usize,
        input_data_details: BTreeMap<String, String>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoadEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl LoadEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn run_started(run_dir: &Path) -> Self {
        Self::new(EventKind::LoadRunStarted {
            run_dir: absolute(run_dir),
        })
    }

    pub fn run_completed(run_dir: &Path) -> Self {
        Self::new(EventKind::LoadRunCompleted {
            run_dir: absolute(run_dir),
        })
    }

    pub fn file_loaded(file_type: &str, path: &Path, progress_pct: f64) -> Self {
        Self::new(EventKind::FileLoaded {
            file_type: file_type.to_string(),
            filename: file_name(path),
            progress_pct,
        })
    }

    pub fn file_load_failed(file_type: &str, path: &Path, error: &dyn std::fmt::Display) -> Self {
        Self::new(EventKind::FileLoadFailed {
            file_type: file_type.to_string(),
            filename: file_name(path),
            error: error.to_string(),
        })
    }

    pub fn row_error(error: &RowError) -> Self {
        let kind = match error {
            RowError::Identifier { .. } => LoadingErrorKind::MalformedIdentifier,
            _ => LoadingErrorKind::MalformedRow,
        };

        Self::new(EventKind::LoadingError {
            error: kind,
            input_file: absolute(error.path()),
            row: error.row(),
            input_data_details: error.details(),
        })
    }

    /// Consensus could not be resolved for a stored variant
    pub fn unresolved_consensus(
        path: &Path,
        row: usize,
        library_id: &str,
        nucleotide_position: i64,
        error: &ClassifyError,
    ) -> Self {
        let mut details = BTreeMap::new();
        details.insert("library_id".to_string(), library_id.to_string());
        details.insert("nucleotide_position".to_string(), nucleotide_position.to_string());
        if let ClassifyError::AmbiguityLookupMiss {
            ref_allele,
            alt_allele,
            frequency,
            ..
        } = error
        {
            details.insert("ref_allele".to_string(), ref_allele.clone());
            details.insert("alt_allele".to_string(), alt_allele.clone());
            details.insert("alt_allele_frequency".to_string(), frequency.to_string());
        }

        Self::new(EventKind::LoadingError {
            error: LoadingErrorKind::AmbiguityLookupMiss,
            input_file: absolute(path),
            row,
            input_data_details: details,
        })
    }

    pub fn is_loading_error(&self) -> bool {
        matches!(self.kind, EventKind::LoadingError { .. })
    }
}

/// Destination for load events
pub trait EventSink {
    fn emit(&mut self, event: LoadEvent);
}

/// Collects events in memory
impl EventSink for Vec<LoadEvent> {
    fn emit(&mut self, event: LoadEvent) {
        self.push(event);
    }
}

/// Writes one JSON object per line and mirrors each event to tracing
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: LoadEvent) {
        match &event.kind {
            EventKind::LoadingError { .. } | EventKind::FileLoadFailed { .. } => {
                warn!(kind = ?event.kind, "Loading error")
            }
            _ => info!(kind = ?event.kind, "Load progress"),
        }

        // A closed stdout must not abort a load
        let written = serde_json::to_string(&event)
            .map_err(std::io::Error::from)
            .and_then(|line| writeln!(self.writer, "{}", line));
        if let Err(e) = written {
            warn!("Failed to write load event: {}", e);
        }
    }
}

/// Percentage of `total` done after `done` items, rounded to 2 places
pub fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 10000.0).round() / 100.0
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_loaded_shape() {
        let event = LoadEvent::file_loaded(
            "ivar_variants_tsv",
            Path::new("/runs/x/R1-1-A-A01.variants.tsv"),
            percent(1, 3),
        );
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "file_loaded");
        assert_eq!(json["file_type"], "ivar_variants_tsv");
        assert_eq!(json["filename"], "R1-1-A-A01.variants.tsv");
        assert_eq!(json["progress_pct"], 33.33);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_row_error_event() {
        let error = RowError::MalformedRow {
            path: PathBuf::from("/data/sample.tsv"),
            row: 2,
            field: "ref_allele_depth".to_string(),
            value: "lots".to_string(),
            reason: "expected integer".to_string(),
        };
        let event = LoadEvent::row_error(&error);
        assert!(event.is_loading_error());

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "loading_error");
        assert_eq!(json["error"], "malformed_row");
        assert_eq!(json["row"], 2);
        assert_eq!(json["input_file"], "/data/sample.tsv");
        assert_eq!(json["input_data_details"]["ref_allele_depth"], "lots");
    }

    #[test]
    fn test_json_lines_sink() {
        let mut buffer = Vec::new();
        {
            let mut sink = JsonLinesSink::new(&mut buffer);
            sink.emit(LoadEvent::run_started(Path::new("/runs/210115_M00325")));
            sink.emit(LoadEvent::run_completed(Path::new("/runs/210115_M00325")));
        }
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        let first: LoadEvent = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first.kind, EventKind::LoadRunStarted { .. }));
        assert!(lines[1].contains("\"event_type\":\"load_run_completed\""));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(2, 3), 66.67);
        assert_eq!(percent(3, 3), 100.0);
        assert_eq!(percent(0, 0), 100.0);
    }
}
