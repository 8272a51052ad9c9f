// ==============================================================================
// error.rs - Load Errors
// ==============================================================================
// Description: Errors that stop a file or a whole run from loading
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use std::path::PathBuf;
use thiserror::Error;

use crate::identifiers::IdentifierError;
use crate::normalizer::TableError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LoadError {
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
    MissingHeader { path: PathBuf, columns: Vec<String> },

    #[error("{path}: {source}")]
    Identifier {
        path: PathBuf,
        #[source]
        source: IdentifierError,
    },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot discover input files under {path}: {reason}")]
    Discovery { path: PathBuf, reason: String },
}

impl LoadError {
    /// Storage and discovery failures stop the whole run; the rest only
    /// stop the current file
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::Store(_) | LoadError::Discovery { .. })
    }
}

impl From<TableError> for LoadError {
    fn from(error: TableError) -> Self {
        match error {
            TableError::Io { path, source } => LoadError::Io { path, source },
            TableError::Csv { path, source } => LoadError::Csv { path, source },
            TableError::MissingColumns { path, columns } => LoadError::MissingHeader { path, columns },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        let missing = LoadError::MissingHeader {
            path: PathBuf::from("a.tsv"),
            columns: vec!["POS".to_string()],
        };
        assert!(!missing.is_fatal());
        assert_eq!(missing.to_string(), "a.tsv is missing required columns: POS");

        let discovery = LoadError::Discovery {
            path: PathBuf::from("/runs/none"),
            reason: "not a directory".to_string(),
        };
        assert!(discovery.is_fatal());

        let store = LoadError::from(StoreError::UnsupportedSchemaVersion {
            found: 9,
            supported: 5,
        });
        assert!(store.is_fatal());
    }

    #[test]
    fn test_table_error_conversion() {
        let error = TableError::Io {
            path: PathBuf::from("x.tsv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(matches!(LoadError::from(error), LoadError::Io { .. }));
    }
}
