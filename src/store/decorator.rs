//! Store decorators
//!
//! Wrappers that add logging or timing around any `RecordStore`.
//!
//! Query operations (`select`, `update`, `delete`) are forwarded as a whole,
//! so the inner store's provided implementation runs and each call is logged
//! once rather than once per underlying edit or remove.

use std::fmt::Debug;
use std::time::Instant;

use crate::error::Result;
use crate::index::SearchField;
use crate::record::{Record, RecordParams};
use crate::snapshot::Snapshot;

use super::{PurgeStat, RecordStore, RestoreReport, Selection, StoreStat};

// =============================================================================
// Logging
// =============================================================================

/// Logs every call with its arguments and outcome
pub struct LoggingStore {
    inner: Box<dyn RecordStore>,
}

impl LoggingStore {
    pub fn new(inner: Box<dyn RecordStore>) -> Self {
        Self { inner }
    }

    fn logged<T, F, D>(&mut self, method: &str, args: String, call: F, describe: D) -> Result<T>
    where
        F: FnOnce(&mut dyn RecordStore) -> Result<T>,
        D: FnOnce(&T) -> String,
    {
        tracing::info!("Calling {}() with {}", method, args);
        let result = call(self.inner.as_mut());
        match &result {
            Ok(value) => tracing::info!("{}() returned {}", method, describe(value)),
            Err(e) => tracing::warn!("{}() failed: {}", method, e),
        }
        result
    }
}

fn debug<T: Debug>(value: &T) -> String {
    format!("{:?}", value)
}

#[allow(clippy::ptr_arg)]
fn count(records: &Vec<Record>) -> String {
    format!("{} records", records.len())
}

impl RecordStore for LoggingStore {
    fn validate(&self, record: &Record) -> Result<()> {
        self.inner.validate(record)
    }

    fn create(&mut self, params: RecordParams) -> Result<i32> {
        let args = format!("{:?}", params);
        self.logged("create", args, |s| s.create(params), debug)
    }

    fn records(&mut self) -> Result<Vec<Record>> {
        self.logged("records", String::new(), |s| s.records(), count)
    }

    fn stat(&mut self) -> Result<StoreStat> {
        self.logged("stat", String::new(), |s| s.stat(), debug)
    }

    fn edit(&mut self, record: Record) -> Result<bool> {
        let args = record.to_string();
        self.logged("edit", args, |s| s.edit(record), debug)
    }

    fn find_by_field(&mut self, field: &SearchField) -> Result<Vec<Record>> {
        let args = format!("{:?}", field);
        self.logged("find_by_field", args, |s| s.find_by_field(field), count)
    }

    fn find_by_id(&mut self, id: i32) -> Result<Option<Record>> {
        self.logged("find_by_id", format!("id = {}", id), |s| s.find_by_id(id), debug)
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        let args = record.to_string();
        self.logged("insert", args, |s| s.insert(record), debug)
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<RestoreReport> {
        let args = format!("{} records", snapshot.len());
        self.logged("restore", args, |s| s.restore(snapshot), |report: &RestoreReport| {
            format!(
                "{} imported, {} rejected",
                report.imported,
                report.rejected.len()
            )
        })
    }

    fn remove(&mut self, id: i32) -> Result<bool> {
        self.logged("remove", format!("id = {}", id), |s| s.remove(id), debug)
    }

    fn purge(&mut self) -> Result<PurgeStat> {
        self.logged("purge", String::new(), |s| s.purge(), debug)
    }

    fn close(&mut self) -> Result<()> {
        self.logged("close", String::new(), |s| s.close(), debug)
    }

    fn make_snapshot(&mut self) -> Result<Snapshot> {
        self.logged("make_snapshot", String::new(), |s| s.make_snapshot(), |snapshot: &Snapshot| {
            format!("{} records", snapshot.len())
        })
    }

    fn select(&mut self, query: &str) -> Result<Selection> {
        self.logged("select", query.to_string(), |s| s.select(query), |selection: &Selection| {
            count(&selection.records)
        })
    }

    fn update(&mut self, query: &str) -> Result<Vec<i32>> {
        self.logged("update", query.to_string(), |s| s.update(query), debug)
    }

    fn delete(&mut self, query: &str) -> Result<Vec<i32>> {
        self.logged("delete", query.to_string(), |s| s.delete(query), debug)
    }
}

// =============================================================================
// Timing
// =============================================================================

/// Logs how long every call took
pub struct TimedStore {
    inner: Box<dyn RecordStore>,
}

impl TimedStore {
    pub fn new(inner: Box<dyn RecordStore>) -> Self {
        Self { inner }
    }

    fn timed<T, F>(&mut self, method: &str, call: F) -> T
    where
        F: FnOnce(&mut dyn RecordStore) -> T,
    {
        let start = Instant::now();
        let result = call(self.inner.as_mut());
        tracing::info!("{}() took {:?}", method, start.elapsed());
        result
    }
}

impl RecordStore for TimedStore {
    fn validate(&self, record: &Record) -> Result<()> {
        self.inner.validate(record)
    }

    fn create(&mut self, params: RecordParams) -> Result<i32> {
        self.timed("create", |s| s.create(params))
    }

    fn records(&mut self) -> Result<Vec<Record>> {
        self.timed("records", |s| s.records())
    }

    fn stat(&mut self) -> Result<StoreStat> {
        self.timed("stat", |s| s.stat())
    }

    fn edit(&mut self, record: Record) -> Result<bool> {
        self.timed("edit", |s| s.edit(record))
    }

    fn find_by_field(&mut self, field: &SearchField) -> Result<Vec<Record>> {
        self.timed("find_by_field", |s| s.find_by_field(field))
    }

    fn find_by_id(&mut self, id: i32) -> Result<Option<Record>> {
        self.timed("find_by_id", |s| s.find_by_id(id))
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        self.timed("insert", |s| s.insert(record))
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<RestoreReport> {
        self.timed("restore", |s| s.restore(snapshot))
    }

    fn remove(&mut self, id: i32) -> Result<bool> {
        self.timed("remove", |s| s.remove(id))
    }

    fn purge(&mut self) -> Result<PurgeStat> {
        self.timed("purge", |s| s.purge())
    }

    fn close(&mut self) -> Result<()> {
        self.timed("close", |s| s.close())
    }

    fn make_snapshot(&mut self) -> Result<Snapshot> {
        self.timed("make_snapshot", |s| s.make_snapshot())
    }

    fn select(&mut self, query: &str) -> Result<Selection> {
        self.timed("select", |s| s.select(query))
    }

    fn update(&mut self, query: &str) -> Result<Vec<i32>> {
        self.timed("update", |s| s.update(query))
    }

    fn delete(&mut self, query: &str) -> Result<Vec<i32>> {
        self.timed("delete", |s| s.delete(query))
    }
}
