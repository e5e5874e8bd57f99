//! redb-backed implementation of [`DatasetStore`] and [`ScheduleStore`].
//!
//! # Table design
//!
//! Every table maps a `u64` row index to a JSON-encoded record:
//! ```text
//! modules          0.. -> Module
//! halls            0.. -> Hall
//! schedule_regular 0.. -> ScheduleEntry
//! schedule_exam    0.. -> ScheduleEntry
//! ```
//!
//! A replace deletes the table and re-inserts rows `0..n` inside a single
//! write transaction. redb read transactions see a consistent snapshot, so a
//! reader observes either the previous generation or the new one in full.

use std::path::Path;

use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, TableHandle, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};
use crate::types::{DatasetSnapshot, Hall, Module, ScheduleEntry, ScheduleKind};

use super::{DatasetStore, ScheduleStore};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

type RowTable = TableDefinition<'static, u64, &'static [u8]>;

const MODULES: RowTable = TableDefinition::new("modules");
const HALLS: RowTable = TableDefinition::new("halls");
const SCHEDULE_REGULAR: RowTable = TableDefinition::new("schedule_regular");
const SCHEDULE_EXAM: RowTable = TableDefinition::new("schedule_exam");

const ALL_TABLES: [RowTable; 4] = [MODULES, HALLS, SCHEDULE_REGULAR, SCHEDULE_EXAM];

fn schedule_table(kind: ScheduleKind) -> RowTable {
    match kind {
        ScheduleKind::Regular => SCHEDULE_REGULAR,
        ScheduleKind::Exam => SCHEDULE_EXAM,
    }
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn write_rows<T: Serialize>(wt: &WriteTransaction, def: RowTable, rows: &[T]) -> Result<()> {
    wt.delete_table(def).map_err(db_err)?;
    let mut table = wt.open_table(def).map_err(db_err)?;
    for (i, row) in rows.iter().enumerate() {
        let value = serde_json::to_vec(row)?;
        table.insert(i as u64, value.as_slice()).map_err(db_err)?;
    }
    Ok(())
}

fn read_rows<T: DeserializeOwned>(rt: &ReadTransaction, def: RowTable) -> Result<Vec<T>> {
    let table = rt.open_table(def).map_err(db_err)?;
    let mut rows = Vec::new();
    for entry in table.iter().map_err(db_err)? {
        let (_, v) = entry.map_err(db_err)?;
        let row = serde_json::from_slice(v.value()).map_err(|e| StoreError::Corrupt {
            table: def.name().to_string(),
            reason: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// PlannerDb
// ---------------------------------------------------------------------------

/// Persistent store for the dataset and both schedules.
pub struct PlannerDb {
    db: Database,
}

impl PlannerDb {
    /// Open or create the redb database at `path`.
    ///
    /// Creates every table if missing so reads never hit an absent table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        for def in ALL_TABLES {
            wt.open_table(def).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    fn read<T: DeserializeOwned>(&self, def: RowTable) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        read_rows(&rt, def)
    }
}

impl DatasetStore for PlannerDb {
    fn replace_dataset(&self, dataset: &DatasetSnapshot) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        write_rows(&wt, MODULES, &dataset.modules)?;
        write_rows(&wt, HALLS, &dataset.halls)?;
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn modules(&self) -> Result<Vec<Module>> {
        self.read(MODULES)
    }

    fn halls(&self) -> Result<Vec<Hall>> {
        self.read(HALLS)
    }

    fn snapshot(&self) -> Result<DatasetSnapshot> {
        let rt = self.db.begin_read().map_err(db_err)?;
        Ok(DatasetSnapshot {
            modules: read_rows(&rt, MODULES)?,
            halls: read_rows(&rt, HALLS)?,
        })
    }
}

impl ScheduleStore for PlannerDb {
    fn replace_schedule(&self, kind: ScheduleKind, entries: &[ScheduleEntry]) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        write_rows(&wt, schedule_table(kind), entries)?;
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn schedule(&self, kind: ScheduleKind) -> Result<Vec<ScheduleEntry>> {
        self.read(schedule_table(kind))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, PlannerDb) {
        let dir = TempDir::new().unwrap();
        let db = PlannerDb::open(&dir.path().join("planner.db")).unwrap();
        (dir, db)
    }

    fn module(code: &str) -> Module {
        Module {
            module_code: code.to_string(),
            semester: 5,
            duration: 2,
            department: "CS".to_string(),
            is_common: false,
            students: 120,
        }
    }

    fn hall(name: &str, capacity: u32) -> Hall {
        Hall {
            room_name: name.to_string(),
            capacity,
        }
    }

    fn entry(code: &str, slot: u32) -> ScheduleEntry {
        ScheduleEntry {
            code: code.to_string(),
            day: "Mon".to_string(),
            hall: "LT1".to_string(),
            slot,
            duration: Some(2),
            students: 120,
            department: "CS".to_string(),
            semester: 5,
            is_common: false,
            name: None,
        }
    }

    #[test]
    fn empty_db_reads_empty_tables() {
        let (_dir, db) = open_tmp();
        assert!(db.modules().unwrap().is_empty());
        assert!(db.halls().unwrap().is_empty());
        assert!(db.schedule(ScheduleKind::Regular).unwrap().is_empty());
        assert!(db.schedule(ScheduleKind::Exam).unwrap().is_empty());
    }

    #[test]
    fn replace_dataset_overwrites_previous_rows() {
        let (_dir, db) = open_tmp();
        db.replace_dataset(&DatasetSnapshot {
            modules: vec![module("CS1010"), module("CS1020"), module("CS1030")],
            halls: vec![hall("LT1", 200)],
        })
        .unwrap();
        db.replace_dataset(&DatasetSnapshot {
            modules: vec![module("EE2001")],
            halls: vec![hall("LT2", 80), hall("LT3", 60)],
        })
        .unwrap();

        let modules = db.modules().unwrap();
        assert_eq!(modules, vec![module("EE2001")]);
        let halls = db.halls().unwrap();
        assert_eq!(halls, vec![hall("LT2", 80), hall("LT3", 60)]);
    }

    #[test]
    fn rows_keep_insertion_order() {
        let (_dir, db) = open_tmp();
        let entries: Vec<_> = (0..12).map(|i| entry(&format!("M{i:02}"), i)).collect();
        db.replace_schedule(ScheduleKind::Regular, &entries).unwrap();
        assert_eq!(db.schedule(ScheduleKind::Regular).unwrap(), entries);
    }

    #[test]
    fn schedules_are_independent_per_kind() {
        let (_dir, db) = open_tmp();
        db.replace_schedule(ScheduleKind::Regular, &[entry("CS3203", 0)])
            .unwrap();
        db.replace_schedule(ScheduleKind::Exam, &[entry("EE4001", 1), entry("EE4002", 2)])
            .unwrap();
        db.replace_schedule(ScheduleKind::Exam, &[]).unwrap();

        assert_eq!(db.schedule(ScheduleKind::Regular).unwrap().len(), 1);
        assert!(db.schedule(ScheduleKind::Exam).unwrap().is_empty());
    }

    #[test]
    fn open_read_transaction_sees_previous_generation() {
        let (_dir, db) = open_tmp();
        db.replace_schedule(ScheduleKind::Regular, &[entry("OLD1", 0), entry("OLD2", 1)])
            .unwrap();

        let before = db.db.begin_read().unwrap();
        db.replace_schedule(ScheduleKind::Regular, &[entry("NEW1", 3)])
            .unwrap();

        let old: Vec<ScheduleEntry> = read_rows(&before, SCHEDULE_REGULAR).unwrap();
        assert_eq!(old, vec![entry("OLD1", 0), entry("OLD2", 1)]);
        assert_eq!(
            db.schedule(ScheduleKind::Regular).unwrap(),
            vec![entry("NEW1", 3)]
        );
    }

    #[test]
    fn snapshot_reads_both_tables() {
        let (_dir, db) = open_tmp();
        let dataset = DatasetSnapshot {
            modules: vec![module("CS3203")],
            halls: vec![hall("LT1", 200)],
        };
        db.replace_dataset(&dataset).unwrap();
        assert_eq!(db.snapshot().unwrap(), dataset);
    }

    #[test]
    fn reopen_keeps_committed_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/planner.db");
        {
            let db = PlannerDb::open(&path).unwrap();
            db.replace_schedule(ScheduleKind::Exam, &[entry("CS3203", 0)])
                .unwrap();
        }
        let db = PlannerDb::open(&path).unwrap();
        assert_eq!(db.schedule(ScheduleKind::Exam).unwrap().len(), 1);
    }
}
