//! Store Module
//!
//! The `RecordStore` capability and its backends.
//!
//! ## Backends
//! - [`MemoryStore`]: sorted `Vec<Record>` indexed by id
//! - [`FileStore`]: flat file of fixed 278-byte slots indexed by byte offset
//!
//! ## Decorators
//! [`LoggingStore`] and [`TimedStore`] wrap any `Box<dyn RecordStore>` and
//! implement the same trait, so cross-cutting concerns are composed at
//! construction time instead of being baked into a backend.
//!
//! ## Query Operations
//! `select`, `update` and `delete` are provided methods built on the core
//! operations, so every backend gets the same filter semantics. A query that
//! fails to parse returns `CabinetError::Query` before anything is touched.

mod decorator;
mod file;
mod memory;
mod stream;

use std::collections::BTreeMap;

pub use decorator::{LoggingStore, TimedStore};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use stream::SlotStream;

use crate::error::Result;
use crate::index::SearchField;
use crate::query::{DeleteQuery, Field, Filter, IndexProbe, SelectQuery, UpdateQuery};
use crate::record::{Record, RecordParams};
use crate::snapshot::Snapshot;
use crate::validation::Validator;

/// Live and deleted record counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStat {
    pub live: usize,
    pub deleted: usize,
}

/// Outcome of a purge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStat {
    /// Deleted slots reclaimed
    pub purged: usize,
    /// Live records remaining
    pub live: usize,
}

/// A snapshot record the validator turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub id: i32,
    pub reason: String,
}

/// Outcome of a restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Records written, overwrites included
    pub imported: usize,
    pub rejected: Vec<RejectedRecord>,
}

/// Result of a select: projected columns and matching records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub columns: Vec<Field>,
    pub records: Vec<Record>,
}

/// Storage capability shared by every backend and decorator
///
/// Every method takes `&mut self`: reads on the file backend move the file
/// cursor. Missing ids are reported as `Ok(false)` / `Ok(None)`, never as
/// errors.
pub trait RecordStore {
    /// Check a record against the store's validation rules
    fn validate(&self, record: &Record) -> Result<()>;

    /// Create a record with the next free id (max + 1) and return that id
    fn create(&mut self, params: RecordParams) -> Result<i32>;

    /// All live records
    fn records(&mut self) -> Result<Vec<Record>>;

    /// Live and deleted counts
    fn stat(&mut self) -> Result<StoreStat>;

    /// Replace the fields of the record with `record.id`
    fn edit(&mut self, record: Record) -> Result<bool>;

    /// Records whose indexed field equals `field` (case-insensitive)
    fn find_by_field(&mut self, field: &SearchField) -> Result<Vec<Record>>;

    fn find_by_id(&mut self, id: i32) -> Result<Option<Record>>;

    /// Add a record with an explicit id; fails with `DuplicateId` if taken
    fn insert(&mut self, record: Record) -> Result<()>;

    /// Merge a snapshot: overwrite existing ids, add new ones in id order
    fn restore(&mut self, snapshot: &Snapshot) -> Result<RestoreReport>;

    fn remove(&mut self, id: i32) -> Result<bool>;

    /// Reclaim space held by deleted records
    fn purge(&mut self) -> Result<PurgeStat>;

    /// Flush and release backing resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Owned copy of every live record
    fn make_snapshot(&mut self) -> Result<Snapshot> {
        Ok(Snapshot::new(self.records()?))
    }

    /// `[fields] [where filter]`
    fn select(&mut self, query: &str) -> Result<Selection> {
        let query = SelectQuery::parse(query)?;

        let candidates = match query.filter.as_ref().and_then(Filter::as_index_probe) {
            Some(IndexProbe::Id(id)) => self.find_by_id(id)?.into_iter().collect(),
            Some(IndexProbe::Field(field)) => self.find_by_field(&field)?,
            None => self.records()?,
        };

        let records = candidates
            .into_iter()
            .filter(|record| query.matches(record))
            .collect();

        Ok(Selection {
            columns: query.columns(),
            records,
        })
    }

    /// `set field = value, ... where filter`; returns the updated ids
    ///
    /// Every candidate is validated before the first edit, so an assignment
    /// that breaks a rule for any matching record changes nothing.
    fn update(&mut self, query: &str) -> Result<Vec<i32>> {
        let query = UpdateQuery::parse(query)?;

        let updated: Vec<Record> = self
            .records()?
            .iter()
            .filter(|record| query.filter.eval(record))
            .map(|record| query.apply(record))
            .collect();

        for record in &updated {
            self.validate(record)?;
        }

        let mut ids = Vec::with_capacity(updated.len());
        for record in updated {
            let id = record.id;
            if self.edit(record)? {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// `where filter`; returns the removed ids
    fn delete(&mut self, query: &str) -> Result<Vec<i32>> {
        let query = DeleteQuery::parse(query)?;

        let targets: Vec<i32> = self
            .records()?
            .iter()
            .filter(|record| query.filter.eval(record))
            .map(|record| record.id)
            .collect();

        let mut ids = Vec::with_capacity(targets.len());
        for id in targets {
            if self.remove(id)? {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// Split a snapshot into valid records keyed by id and the ones the
/// validator rejected
///
/// The last occurrence of an id decides its fate: a later invalid copy
/// withdraws an earlier valid one, and a later valid copy clears an earlier
/// rejection.
pub(crate) fn partition_snapshot(
    snapshot: &Snapshot,
    validator: &Validator,
) -> (BTreeMap<i32, Record>, Vec<RejectedRecord>) {
    let mut accepted = BTreeMap::new();
    let mut rejected: Vec<RejectedRecord> = Vec::new();

    for record in snapshot.iter() {
        rejected.retain(|earlier| earlier.id != record.id);
        match validator.validate(record) {
            Ok(()) => {
                accepted.insert(record.id, record.clone());
            }
            Err(e) => {
                tracing::warn!("Restore skipped record #{}: {}", record.id, e);
                accepted.remove(&record.id);
                rejected.push(RejectedRecord {
                    id: record.id,
                    reason: e.message,
                });
            }
        }
    }

    (accepted, rejected)
}
