// ==============================================================================
// store/session.rs - Per-File Write Session
// ==============================================================================
// Description: Natural-key upserts inside one transaction per input file
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-18
// Version: 1.1.0
// ==============================================================================
// Statements execute eagerly inside the transaction, so a row inserted earlier
// in the file is visible to later existence checks. Nothing is committed until
// `commit`; dropping a session rolls the file back.
// ==============================================================================

use rusqlite::types::Value as SqlValue;
use rusqlite::{ffi, params_from_iter, Connection, Transaction};
use tracing::debug;

use super::record::{describe_key, key_predicate, Record};
use super::StoreError;

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    AlreadyExists,
}

pub struct Session<'conn> {
    tx: Transaction<'conn>,
    batch_size: usize,
    flushes: usize,
}

impl<'conn> Session<'conn> {
    pub(crate) fn begin(conn: &'conn mut Connection, batch_size: usize) -> Result<Self, StoreError> {
        Ok(Self {
            tx: conn.transaction()?,
            batch_size: batch_size.max(1),
            flushes: 0,
        })
    }

    /// True when a row with the record's full natural key is stored
    pub fn exists<R: Record>(&self, record: &R) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} LIMIT 1",
            R::TABLE,
            key_predicate::<R>(1)
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        Ok(stmt.exists(params_from_iter(record.key_values()))?)
    }

    /// Insert the record unless its natural key is already stored
    ///
    /// # Returns
    /// * `Outcome::Inserted` - a new row was written
    /// * `Outcome::AlreadyExists` - the key was present; nothing changed
    pub fn upsert<R: Record>(&self, record: &R) -> Result<Outcome, StoreError> {
        if self.exists(record)? {
            return Ok(Outcome::AlreadyExists);
        }
        self.insert(record)
    }

    /// Plain insert; a key-constraint violation reports `AlreadyExists`
    pub(crate) fn insert<R: Record>(&self, record: &R) -> Result<Outcome, StoreError> {
        let columns: Vec<&str> = R::KEY_COLUMNS.iter().chain(R::COLUMNS).copied().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut values = record.key_values();
        values.extend(record.values());

        let mut stmt = self.tx.prepare_cached(&sql)?;
        match stmt.execute(params_from_iter(values)) {
            Ok(_) => Ok(Outcome::Inserted),
            Err(e) => match constraint_code(&e) {
                Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY) | Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                    Ok(Outcome::AlreadyExists)
                }
                Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => Err(StoreError::MissingParentRow {
                    table: R::TABLE,
                    key: describe_key(&record.key_values()),
                }),
                _ => Err(e.into()),
            },
        }
    }

    /// Copy `column` from `record` into the stored row only where the stored
    /// value is null
    ///
    /// # Returns
    /// * `true` when a stored null was replaced
    pub fn fill_missing<R: Record>(&self, record: &R, column: &str) -> Result<bool, StoreError> {
        let idx = R::COLUMNS
            .iter()
            .position(|c| *c == column)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: R::TABLE,
                column: column.to_string(),
            })?;

        let value = record.values().swap_remove(idx);
        if value == SqlValue::Null {
            return Ok(false);
        }

        let sql = format!(
            "UPDATE {} SET {col} = ?1 WHERE {col} IS NULL AND {}",
            R::TABLE,
            key_predicate::<R>(2),
            col = column
        );
        let mut params = vec![value];
        params.extend(record.key_values());

        let mut stmt = self.tx.prepare_cached(&sql)?;
        Ok(stmt.execute(params_from_iter(params))? > 0)
    }

    /// Flush pending pages at every `batch_size`-th record
    ///
    /// # Arguments
    /// * `index` - 1-based index of the record just written
    pub fn flush_if_due(&mut self, index: usize) -> Result<bool, StoreError> {
        if index == 0 || index % self.batch_size != 0 {
            return Ok(false);
        }
        self.tx.cache_flush()?;
        self.flushes += 1;
        debug!("Flushed batch at record {}", index);
        Ok(true)
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Commit everything written in this session
    pub fn commit(self) -> Result<usize, StoreError> {
        let flushes = self.flushes;
        self.tx.commit()?;
        Ok(flushes)
    }
}

fn constraint_code(error: &rusqlite::Error) -> Option<i32> {
    match error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Library, QpcrResult, Specimen};
    use crate::store::Store;
    use chrono::NaiveDate;

    fn migrated_store() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn library(id: &str, specimen_id: Option<&str>) -> Library {
        Library {
            id: id.to_string(),
            specimen_id: specimen_id.map(str::to_string),
            plate_id: "102".to_string(),
            index_set_id: Some("C".to_string()),
            well: "B07".to_string(),
            plate_row: "B".to_string(),
            plate_col: 7,
        }
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = migrated_store();
        let session = store.session(1000).unwrap();

        let specimen = Specimen::new("R1234567");
        assert_eq!(session.upsert(&specimen).unwrap(), Outcome::Inserted);
        assert_eq!(session.upsert(&specimen).unwrap(), Outcome::AlreadyExists);
        session.commit().unwrap();

        assert_eq!(store.count::<Specimen>().unwrap(), 1);
    }

    #[test]
    fn test_constraint_violation_reports_already_exists() {
        let mut store = migrated_store();
        let session = store.session(1000).unwrap();

        let specimen = Specimen::new("R1234567");
        assert_eq!(session.insert(&specimen).unwrap(), Outcome::Inserted);
        assert_eq!(session.insert(&specimen).unwrap(), Outcome::AlreadyExists);
    }

    #[test]
    fn test_missing_parent_row() {
        let mut store = migrated_store();
        let session = store.session(1000).unwrap();

        match session.upsert(&library("R9-102-C-B07", Some("R9"))) {
            Err(StoreError::MissingParentRow { table, key }) => {
                assert_eq!(table, "library");
                assert_eq!(key, "R9-102-C-B07");
            }
            other => panic!("Expected MissingParentRow, got {:?}", other),
        }
    }

    #[test]
    fn test_parent_then_child() {
        let mut store = migrated_store();
        let session = store.session(1000).unwrap();

        session.upsert(&Specimen::new("R1")).unwrap();
        assert_eq!(
            session.upsert(&library("R1-102-C-B07", Some("R1"))).unwrap(),
            Outcome::Inserted
        );
        // Control libraries have no specimen
        assert_eq!(
            session.upsert(&library("POS-CTRL-102-C", None)).unwrap(),
            Outcome::Inserted
        );
        session.commit().unwrap();

        assert_eq!(store.count::<Library>().unwrap(), 2);
    }

    #[test]
    fn test_fill_missing_only_replaces_null() {
        let mut store = migrated_store();
        let session = store.session(1000).unwrap();

        session.upsert(&Specimen::new("R1")).unwrap();

        let mut dated = Specimen::new("R1");
        dated.collection_date = NaiveDate::from_ymd_opt(2021, 1, 10);
        assert!(session.fill_missing(&dated, "collection_date").unwrap());

        let mut redated = Specimen::new("R1");
        redated.collection_date = NaiveDate::from_ymd_opt(2022, 2, 2);
        assert!(!session.fill_missing(&redated, "collection_date").unwrap());

        // Null source value never clears a stored one
        assert!(!session.fill_missing(&Specimen::new("R1"), "collection_date").unwrap());
        session.commit().unwrap();

        let key = [SqlValue::Text("R1".to_string())];
        assert_eq!(
            store.column_value::<Specimen>(&key, "collection_date").unwrap(),
            Some(SqlValue::Text("2021-01-10".to_string()))
        );
    }

    #[test]
    fn test_fill_missing_unknown_column() {
        let mut store = migrated_store();
        let session = store.session(1000).unwrap();
        let ct = QpcrResult {
            specimen_id: "R1".to_string(),
            ct_value: Some(20.0),
        };
        assert!(matches!(
            session.fill_missing(&ct, "specimen_id"),
            Err(StoreError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let mut store = migrated_store();
        {
            let session = store.session(1000).unwrap();
            session.upsert(&Specimen::new("R1")).unwrap();
        }
        assert_eq!(store.count::<Specimen>().unwrap(), 0);
    }

    #[test]
    fn test_flush_boundaries() {
        let mut store = migrated_store();
        let mut session = store.session(2).unwrap();

        for idx in 1..=5 {
            session.upsert(&Specimen::new(format!("R{}", idx))).unwrap();
            session.flush_if_due(idx).unwrap();
        }
        assert_eq!(session.flushes(), 2);
        assert_eq!(session.commit().unwrap(), 2);
        assert_eq!(store.count::<Specimen>().unwrap(), 5);
    }
}
