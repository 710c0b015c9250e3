//! In-memory store
//!
//! A `Vec<Record>` kept sorted by id, plus an index keyed by id.

use crate::error::{CabinetError, Result};
use crate::index::{IndexManager, SearchField};
use crate::record::{Record, RecordParams};
use crate::snapshot::Snapshot;
use crate::validation::Validator;

use super::{partition_snapshot, PurgeStat, RecordStore, RestoreReport, StoreStat};

/// Record store that lives entirely in memory
///
/// Index locations are record ids; an id resolves to its record through a
/// binary search of the sorted list.
pub struct MemoryStore {
    /// Live records, ascending by id
    records: Vec<Record>,
    index: IndexManager<i32>,
    validator: Validator,
}

impl MemoryStore {
    /// Create an empty store using `validator` for every write
    pub fn new(validator: Validator) -> Self {
        Self {
            records: Vec::new(),
            index: IndexManager::new(),
            validator,
        }
    }

    /// The live index (for inspection and tests)
    pub fn index(&self) -> &IndexManager<i32> {
        &self.index
    }

    /// An index rebuilt from the record list
    pub fn rebuilt_index(&self) -> IndexManager<i32> {
        let mut index = IndexManager::new();
        index.reindex_all(self.records.iter().map(|record| (record, record.id)));
        index
    }

    /// Replace the live index with a rebuilt one
    pub fn reindex_all(&mut self) {
        self.index = self.rebuilt_index();
    }

    fn position(&self, id: i32) -> Option<usize> {
        self.records.binary_search_by_key(&id, |record| record.id).ok()
    }

    /// Overwrite the record at `pos`, moving its index entries
    fn replace_at(&mut self, pos: usize, record: Record) {
        let id = record.id;
        self.index.remove(&self.records[pos], id);
        self.records[pos] = record;
        self.index.add(&self.records[pos], id);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Validator::default())
    }
}

impl RecordStore for MemoryStore {
    fn validate(&self, record: &Record) -> Result<()> {
        Ok(self.validator.validate(record)?)
    }

    fn create(&mut self, params: RecordParams) -> Result<i32> {
        let id = next_id(self.index.max_id())?;
        let record = Record::new(id, params);
        self.validate(&record)?;

        self.index.add(&record, id);
        self.records.push(record);

        tracing::debug!("Created record #{} in memory", id);
        Ok(id)
    }

    fn records(&mut self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }

    fn stat(&mut self) -> Result<StoreStat> {
        Ok(StoreStat {
            live: self.records.len(),
            deleted: 0,
        })
    }

    fn edit(&mut self, record: Record) -> Result<bool> {
        let Some(pos) = self.position(record.id) else {
            return Ok(false);
        };
        self.validate(&record)?;

        tracing::debug!("Edited record #{} in memory", record.id);
        self.replace_at(pos, record);
        Ok(true)
    }

    fn find_by_field(&mut self, field: &SearchField) -> Result<Vec<Record>> {
        Ok(self
            .index
            .lookup(field)
            .into_iter()
            .filter_map(|id| self.position(id))
            .map(|pos| self.records[pos].clone())
            .collect())
    }

    fn find_by_id(&mut self, id: i32) -> Result<Option<Record>> {
        Ok(self.position(id).map(|pos| self.records[pos].clone()))
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        self.validate(&record)?;
        if self.index.contains_id(record.id) {
            return Err(CabinetError::DuplicateId(record.id));
        }

        let id = record.id;
        self.index.add(&record, id);
        self.records.push(record);
        self.records.sort_by_key(|record| record.id);

        tracing::debug!("Inserted record #{} in memory", id);
        Ok(())
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<RestoreReport> {
        let (accepted, rejected) = partition_snapshot(snapshot, &self.validator);
        let imported = accepted.len();

        // Overwrites first, while the list is still sorted for binary search.
        let mut fresh = Vec::new();
        for (id, record) in accepted {
            match self.position(id) {
                Some(pos) => self.replace_at(pos, record),
                None => fresh.push(record),
            }
        }

        for record in fresh {
            self.index.add(&record, record.id);
            self.records.push(record);
        }
        self.records.sort_by_key(|record| record.id);

        tracing::info!(
            "Restored {} records in memory ({} rejected)",
            imported,
            rejected.len()
        );
        Ok(RestoreReport { imported, rejected })
    }

    fn remove(&mut self, id: i32) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            return Ok(false);
        };

        self.index.remove(&self.records[pos], id);
        self.records.remove(pos);

        tracing::debug!("Removed record #{} from memory", id);
        Ok(true)
    }

    fn purge(&mut self) -> Result<PurgeStat> {
        Ok(PurgeStat {
            purged: 0,
            live: self.records.len(),
        })
    }
}

/// Id after `max`, or 1 for an empty store
pub(crate) fn next_id(max: Option<i32>) -> Result<i32> {
    max.unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| CabinetError::Storage("Record id space exhausted".to_string()))
}
