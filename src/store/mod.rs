// ==============================================================================
// store/mod.rs - SQLite Storage
// ==============================================================================
// Description: Database connection, versioned schema migrations and per-file
//              write sessions
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-18
// Version: 1.1.0
// ==============================================================================
// Schema version is tracked in `PRAGMA user_version`. Migrations are
// append-only; a database newer than this binary is refused.
// ==============================================================================

mod record;
mod session;

pub use record::Record;
pub use session::{Outcome, Session};

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Ordered schema migrations; position + 1 is the resulting schema version
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_core_entities",
        include_str!("../../migrations/0001_core_entities.sql"),
    ),
    (
        "0002_variant_ivar",
        include_str!("../../migrations/0002_variant_ivar.sql"),
    ),
    (
        "0003_ncov_tools",
        include_str!("../../migrations/0003_ncov_tools.sql"),
    ),
    (
        "0004_pangolin_result",
        include_str!("../../migrations/0004_pangolin_result.sql"),
    ),
    (
        "0005_variant_freebayes",
        include_str!("../../migrations/0005_variant_freebayes.sql"),
    ),
];

/// Schema version produced by the bundled migrations
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Row in {table} references a missing parent row (key: {key})")]
    MissingParentRow { table: &'static str, key: String },

    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    #[error("Table {table} has no fillable column '{column}'")]
    UnknownColumn { table: &'static str, column: String },
}

/// One connection to the surveillance database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Opening database: {:?}", path);
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        // Must be set outside any transaction
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Apply pending migrations
    ///
    /// # Returns
    /// * Number of migrations applied (0 when already current)
    pub fn migrate(&mut self) -> Result<usize, StoreError> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchemaVersion {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        let mut applied = 0;
        for (idx, (name, sql)) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let version = idx as i64 + 1;
            debug!("Applying migration {} (schema version {})", name, version);

            let tx = self.conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            applied += 1;
        }

        if applied > 0 {
            info!("Database migrated to schema version {}", SCHEMA_VERSION);
        }
        Ok(applied)
    }

    /// Start a write session (one transaction) for a single input file
    pub fn session(&mut self, batch_size: usize) -> Result<Session<'_>, StoreError> {
        Session::begin(&mut self.conn, batch_size)
    }

    /// Number of stored rows of a record kind
    pub fn count<R: Record>(&self) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Read one column of a stored row by natural key
    pub fn column_value<R: Record>(
        &self,
        key: &[SqlValue],
        column: &str,
    ) -> Result<Option<SqlValue>, StoreError> {
        if !R::KEY_COLUMNS.iter().chain(R::COLUMNS).any(|c| *c == column) {
            return Err(StoreError::UnknownColumn {
                table: R::TABLE,
                column: column.to_string(),
            });
        }

        let sql = format!(
            "SELECT {} FROM {} WHERE {} LIMIT 1",
            column,
            R::TABLE,
            record::key_predicate::<R>(1)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(key.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Specimen;
    use tempfile::tempdir;

    #[test]
    fn test_migrate_fresh_database() {
        let mut store = Store::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), 0);

        assert_eq!(store.migrate().unwrap(), MIGRATIONS.len());
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);

        // Second run is a no-op
        assert_eq!(store.migrate().unwrap(), 0);
    }

    #[test]
    fn test_all_tables_created() {
        let mut store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();

        for table in [
            "specimen",
            "library",
            "sequencing_run",
            "qpcr_result",
            "variant_ivar",
            "variant_freebayes",
            "ncov_tools_amino_acid_mutation",
            "ncov_tools_summary_qc",
            "pangolin_result",
        ] {
            let found: i64 = store
                .connection()
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "missing table {}", table);
        }
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION + 1))
            .unwrap();

        match store.migrate() {
            Err(StoreError::UnsupportedSchemaVersion { found, supported }) => {
                assert_eq!(found, SCHEMA_VERSION + 1);
                assert_eq!(supported, SCHEMA_VERSION);
            }
            other => panic!("Expected UnsupportedSchemaVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ncov.db");

        {
            let mut store = Store::open(&path).unwrap();
            store.migrate().unwrap();
            let session = store.session(1000).unwrap();
            session.upsert(&Specimen::new("R1234567")).unwrap();
            session.commit().unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(store.count::<Specimen>().unwrap(), 1);
    }

    #[test]
    fn test_column_value_rejects_unknown_column() {
        let mut store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();

        let key = [SqlValue::Text("R1".to_string())];
        assert!(matches!(
            store.column_value::<Specimen>(&key, "nope"),
            Err(StoreError::UnknownColumn { .. })
        ));
        assert_eq!(store.column_value::<Specimen>(&key, "collection_date").unwrap(), None);
    }
}
