// ==============================================================================
// normalizer.rs - Delimited Table Normalization
// ==============================================================================
// Description: Maps delimited table columns onto typed record fields through
//              static field tables, with null-sentinel handling
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-17
// Version: 1.1.0
// ==============================================================================
// Order of operations per row:
//   1. column renaming (absent column → null)
//   2. null sentinels ("NA", "") → null for nullable fields
//   3. coercion of the remaining values to int / float / bool
// ==============================================================================

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::identifiers::IdentifierError;

/// Values treated as null for nullable fields
pub const NULL_SENTINELS: [&str; 2] = ["NA", ""];

/// Target type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    Bool,
}

/// One entry of a format's column → field table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: &'static str,
    pub field: &'static str,
    pub kind: FieldKind,
    /// `NA` and empty values become null
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn text(column: &'static str, field: &'static str) -> Self {
        Self::new(column, field, FieldKind::Text)
    }

    pub const fn int(column: &'static str, field: &'static str) -> Self {
        Self::new(column, field, FieldKind::Int)
    }

    pub const fn float(column: &'static str, field: &'static str) -> Self {
        Self::new(column, field, FieldKind::Float)
    }

    pub const fn boolean(column: &'static str, field: &'static str) -> Self {
        Self::new(column, field, FieldKind::Bool)
    }

    pub const fn nullable(self) -> Self {
        Self {
            column: self.column,
            field: self.field,
            kind: self.kind,
            nullable: true,
        }
    }

    const fn new(column: &'static str, field: &'static str, kind: FieldKind) -> Self {
        Self {
            column,
            field,
            kind,
            nullable: false,
        }
    }
}

/// Strictly typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Row-level failures; the row is skipped, the file continues
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("Malformed row {row} in {path}: field '{field}' value '{value}' ({reason})")]
    MalformedRow {
        path: PathBuf,
        row: usize,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field '{field}' at row {row} in {path}")]
    MissingField { path: PathBuf, row: usize, field: String },

    #[error("Unreadable row {row} in {path}: {reason}")]
    Unreadable { path: PathBuf, row: usize, reason: String },

    #[error("Row {row} in {path}: {source}")]
    Identifier {
        path: PathBuf,
        row: usize,
        #[source]
        source: IdentifierError,
    },
}

impl RowError {
    /// 1-based data row index (header excluded)
    pub fn row(&self) -> usize {
        match self {
            RowError::MalformedRow { row, .. }
            | RowError::MissingField { row, .. }
            | RowError::Unreadable { row, .. }
            | RowError::Identifier { row, .. } => *row,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            RowError::MalformedRow { path, .. }
            | RowError::MissingField { path, .. }
            | RowError::Unreadable { path, .. }
            | RowError::Identifier { path, .. } => path,
        }
    }

    /// Offending input values, for error events
    pub fn details(&self) -> BTreeMap<String, String> {
        let mut details = BTreeMap::new();
        match self {
            RowError::MalformedRow { field, value, reason, .. } => {
                details.insert(field.clone(), value.clone());
                details.insert("reason".to_string(), reason.clone());
            }
            RowError::MissingField { field, .. } => {
                details.insert("missing_field".to_string(), field.clone());
            }
            RowError::Unreadable { reason, .. } => {
                details.insert("reason".to_string(), reason.clone());
            }
            RowError::Identifier { source, .. } => {
                let IdentifierError::MalformedIdentifier { id, reason } = source;
                details.insert("identifier".to_string(), id.clone());
                details.insert("reason".to_string(), reason.clone());
            }
        }
        details
    }
}

/// Errors that stop a whole file from being read
#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required columns: {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },
}

/// One normalized row: field name → typed value
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    path: PathBuf,
    row: usize,
    fields: HashMap<&'static str, Value>,
}

impl NormalizedRow {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&Value::Null)
    }

    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field) {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        match self.get(field) {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        match self.get(field) {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        match self.get(field) {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn require_text(&self, field: &str) -> Result<String, RowError> {
        self.text(field).ok_or_else(|| self.missing(field))
    }

    pub fn require_int(&self, field: &str) -> Result<i64, RowError> {
        self.int(field).ok_or_else(|| self.missing(field))
    }

    pub fn require_float(&self, field: &str) -> Result<f64, RowError> {
        self.float(field).ok_or_else(|| self.missing(field))
    }

    pub fn require_bool(&self, field: &str) -> Result<bool, RowError> {
        self.boolean(field).ok_or_else(|| self.missing(field))
    }

    /// Wrap an identifier failure for this row
    pub fn identifier_error(&self, source: IdentifierError) -> RowError {
        RowError::Identifier {
            path: self.path.clone(),
            row: self.row,
            source,
        }
    }

    fn missing(&self, field: &str) -> RowError {
        RowError::MissingField {
            path: self.path.clone(),
            row: self.row,
            field: field.to_string(),
        }
    }
}

/// Normalize one row of raw strings against a field table
///
/// # Arguments
/// * `path` - Source file (for error context)
/// * `row` - 1-based data row index
/// * `headers` - Column name → position in `record`
/// * `record` - Raw row values
/// * `specs` - Static field table for the file format
pub fn normalize_row(
    path: &Path,
    row: usize,
    headers: &HashMap<String, usize>,
    record: &StringRecord,
    specs: &[FieldSpec],
) -> Result<NormalizedRow, RowError> {
    let mut fields = HashMap::with_capacity(specs.len());

    for spec in specs {
        let raw = headers.get(spec.column).and_then(|&idx| record.get(idx));

        let value = match raw {
            None => Value::Null,
            Some(raw) if spec.nullable && NULL_SENTINELS.contains(&raw) => Value::Null,
            Some(raw) => coerce(raw, spec).map_err(|reason| RowError::MalformedRow {
                path: path.to_path_buf(),
                row,
                field: spec.field.to_string(),
                value: raw.to_string(),
                reason,
            })?,
        };

        fields.insert(spec.field, value);
    }

    Ok(NormalizedRow {
        path: path.to_path_buf(),
        row,
        fields,
    })
}

fn coerce(raw: &str, spec: &FieldSpec) -> Result<Value, String> {
    match spec.kind {
        FieldKind::Text => Ok(Value::Text(raw.to_string())),
        FieldKind::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("expected integer: {}", e)),
        FieldKind::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("expected float: {}", e)),
        FieldKind::Bool => parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| "expected boolean".to_string()),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "TRUE" | "True" | "true" | "1" => Some(true),
        "FALSE" | "False" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Delimited table with a header row
pub struct TableReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: HashMap<String, usize>,
}

impl TableReader {
    pub fn open_tsv(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Self::open(path, b'\t')
    }

    pub fn open_csv(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Self::open(path, b',')
    }

    pub fn open(path: impl AsRef<Path>, delimiter: u8) -> Result<Self, TableError> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).map_err(|source| TableError::Io {
            path: path.clone(),
            source,
        })?;

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|source| TableError::Csv {
                path: path.clone(),
                source,
            })?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();

        Ok(Self { path, reader, headers })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.contains_key(column)
    }

    /// Fail unless every listed column is present in the header
    pub fn require_columns(&self, columns: &[&str]) -> Result<(), TableError> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TableError::MissingColumns {
                path: self.path.clone(),
                columns: missing,
            })
        }
    }

    /// Read and normalize every data row
    ///
    /// Row-level failures come back inline so the caller can report and skip
    /// them; only I/O failures abort the file.
    pub fn read_rows(
        mut self,
        specs: &[FieldSpec],
    ) -> Result<Vec<Result<NormalizedRow, RowError>>, TableError> {
        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        let mut row = 0;

        loop {
            row += 1;
            match self.reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    rows.push(normalize_row(&self.path, row, &self.headers, &record, specs));
                }
                Err(e) if e.is_io_error() => {
                    return Err(TableError::Csv {
                        path: self.path.clone(),
                        source: e,
                    });
                }
                Err(e) => rows.push(Err(RowError::Unreadable {
                    path: self.path.clone(),
                    row,
                    reason: e.to_string(),
                })),
            }
        }

        Ok(rows)
    }
}
