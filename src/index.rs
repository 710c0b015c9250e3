//! Index Manager
//!
//! Maps ids and indexed field values to record locations.
//!
//! ## Responsibilities
//! - O(1) id → location lookup
//! - Exact-match, case-insensitive lookup by first name, last name and
//!   date of birth
//! - Full rebuild from a backing store (`reindex_all`)
//!
//! The location type is chosen by the backend: the memory store indexes by
//! record id, the file store by slot byte offset.
//!
//! ## Ordering Contract
//! When a record changes, callers must `remove` it with its *old* field
//! values before they `add` the new ones. Adding first and removing second
//! would drop the fresh entry whenever a key is unchanged.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use chrono::NaiveDate;

use crate::record::{format_date, Record};

/// A field value to search by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchField {
    FirstName(String),
    LastName(String),
    DateOfBirth(NaiveDate),
}

impl SearchField {
    /// Normalized index key for this value
    pub fn key(&self) -> String {
        match self {
            SearchField::FirstName(name) | SearchField::LastName(name) => name_key(name),
            SearchField::DateOfBirth(date) => date_key(*date),
        }
    }

    /// Whether `record` holds this value (same normalization as the index)
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            SearchField::FirstName(name) => name_key(&record.first_name) == name_key(name),
            SearchField::LastName(name) => name_key(&record.last_name) == name_key(name),
            SearchField::DateOfBirth(date) => record.date_of_birth == *date,
        }
    }
}

fn name_key(name: &str) -> String {
    name.to_uppercase()
}

fn date_key(date: NaiveDate) -> String {
    format_date(date).to_uppercase()
}

/// Secondary indexes plus the id map for one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexManager<L>
where
    L: Copy + Ord + Hash,
{
    by_id: HashMap<i32, L>,
    by_first_name: HashMap<String, BTreeSet<L>>,
    by_last_name: HashMap<String, BTreeSet<L>>,
    by_date_of_birth: HashMap<String, BTreeSet<L>>,
}

impl<L> IndexManager<L>
where
    L: Copy + Ord + Hash,
{
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            by_first_name: HashMap::new(),
            by_last_name: HashMap::new(),
            by_date_of_birth: HashMap::new(),
        }
    }

    /// Index `record` at `location`
    pub fn add(&mut self, record: &Record, location: L) {
        self.by_id.insert(record.id, location);
        Self::bucket_add(&mut self.by_first_name, name_key(&record.first_name), location);
        Self::bucket_add(&mut self.by_last_name, name_key(&record.last_name), location);
        Self::bucket_add(
            &mut self.by_date_of_birth,
            date_key(record.date_of_birth),
            location,
        );
    }

    /// Remove the entries `record` produced at `location`
    ///
    /// `record` must carry the field values it was indexed with.
    pub fn remove(&mut self, record: &Record, location: L) {
        if self.by_id.get(&record.id) == Some(&location) {
            self.by_id.remove(&record.id);
        }
        Self::bucket_remove(&mut self.by_first_name, &name_key(&record.first_name), location);
        Self::bucket_remove(&mut self.by_last_name, &name_key(&record.last_name), location);
        Self::bucket_remove(
            &mut self.by_date_of_birth,
            &date_key(record.date_of_birth),
            location,
        );
    }

    /// Locations of records matching `field`, in ascending location order
    pub fn lookup(&self, field: &SearchField) -> Vec<L> {
        let buckets = match field {
            SearchField::FirstName(_) => &self.by_first_name,
            SearchField::LastName(_) => &self.by_last_name,
            SearchField::DateOfBirth(_) => &self.by_date_of_birth,
        };

        buckets
            .get(&field.key())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Location of the record with `id`
    pub fn lookup_id(&self, id: i32) -> Option<L> {
        self.by_id.get(&id).copied()
    }

    /// Whether `id` is currently mapped
    pub fn contains_id(&self, id: i32) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Highest mapped id
    pub fn max_id(&self) -> Option<i32> {
        self.by_id.keys().copied().max()
    }

    /// All mapped ids in ascending order
    pub fn ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_first_name.clear();
        self.by_last_name.clear();
        self.by_date_of_birth.clear();
    }

    /// Rebuild from scratch out of `(record, location)` pairs of live records
    pub fn reindex_all<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a Record, L)>,
    {
        self.clear();
        for (record, location) in entries {
            self.add(record, location);
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bucket_add(buckets: &mut HashMap<String, BTreeSet<L>>, key: String, location: L) {
        buckets.entry(key).or_default().insert(location);
    }

    fn bucket_remove(buckets: &mut HashMap<String, BTreeSet<L>>, key: &str, location: L) {
        if let Some(set) = buckets.get_mut(key) {
            set.remove(&location);
            if set.is_empty() {
                buckets.remove(key);
            }
        }
    }
}

impl<L> Default for IndexManager<L>
where
    L: Copy + Ord + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
