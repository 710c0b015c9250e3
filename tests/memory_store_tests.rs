//! Tests for MemoryStore
//!
//! These tests verify:
//! - Create/edit/remove/find semantics
//! - Insert with explicit ids and duplicate detection
//! - Restore merge ordering and rejection reporting
//! - Stat and purge on a store without deleted slots
//! - Validation on every write path

use chrono::NaiveDate;
use filecabinet::index::SearchField;
use filecabinet::record::{Record, RecordParams};
use filecabinet::snapshot::Snapshot;
use filecabinet::store::{MemoryStore, PurgeStat, RecordStore, StoreStat};
use filecabinet::validation::Validator;
use filecabinet::CabinetError;
use rust_decimal::Decimal;

// =============================================================================
// Helper Functions
// =============================================================================

fn params(first: &str, last: &str) -> RecordParams {
    RecordParams {
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        workplace_number: 12,
        salary: Decimal::new(150_050, 2),
        department: 'A',
    }
}

fn record(id: i32, first: &str, last: &str) -> Record {
    Record::new(id, params(first, last))
}

fn setup_store() -> MemoryStore {
    MemoryStore::new(Validator::default())
}

fn ids(store: &mut MemoryStore) -> Vec<i32> {
    store.records().unwrap().iter().map(|r| r.id).collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_create_assigns_sequential_ids() {
    let mut store = setup_store();

    assert_eq!(store.create(params("John", "Doe")).unwrap(), 1);
    assert_eq!(store.create(params("Mary", "Smith")).unwrap(), 2);
    assert_eq!(store.create(params("Ann", "Lee")).unwrap(), 3);

    assert_eq!(ids(&mut store), vec![1, 2, 3]);
}

#[test]
fn test_create_continues_after_max_id() {
    let mut store = setup_store();
    store.insert(record(10, "John", "Doe")).unwrap();

    assert_eq!(store.create(params("Mary", "Smith")).unwrap(), 11);
}

#[test]
fn test_create_rejects_invalid_record() {
    let mut store = setup_store();
    let result = store.create(params("J", "Doe"));

    assert!(matches!(result, Err(CabinetError::Validation(_))));
    assert!(ids(&mut store).is_empty());
}

#[test]
fn test_edit_existing_and_missing() {
    let mut store = setup_store();
    store.create(params("John", "Doe")).unwrap();

    assert!(store.edit(record(1, "Johnny", "Doe")).unwrap());
    assert!(!store.edit(record(99, "Ghost", "Doe")).unwrap());

    assert_eq!(store.find_by_id(1).unwrap().unwrap().first_name, "Johnny");
    assert!(store
        .find_by_field(&SearchField::FirstName("john".into()))
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .find_by_field(&SearchField::FirstName("JOHNNY".into()))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_edit_invalid_leaves_record_unchanged() {
    let mut store = setup_store();
    store.create(params("John", "Doe")).unwrap();

    let mut bad = record(1, "John", "Doe");
    bad.department = '1';
    assert!(store.edit(bad).is_err());

    assert_eq!(store.find_by_id(1).unwrap(), Some(record(1, "John", "Doe")));
}

#[test]
fn test_remove_and_stat() {
    let mut store = setup_store();
    for name in ["John", "Mary", "Anna"] {
        store.create(params(name, "Doe")).unwrap();
    }

    assert!(store.remove(2).unwrap());
    assert!(!store.remove(2).unwrap());

    assert_eq!(store.stat().unwrap(), StoreStat { live: 2, deleted: 0 });
    assert_eq!(store.find_by_id(2).unwrap(), None);
    assert_eq!(store.purge().unwrap(), PurgeStat { purged: 0, live: 2 });
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_insert_duplicate_fails_unchanged() {
    let mut store = setup_store();
    store.create(params("John", "Doe")).unwrap();

    let result = store.insert(record(1, "Mary", "Smith"));

    assert!(matches!(result, Err(CabinetError::DuplicateId(1))));
    assert_eq!(store.find_by_id(1).unwrap().unwrap().first_name, "John");
}

#[test]
fn test_insert_new_is_indexed_in_order() {
    let mut store = setup_store();
    store.insert(record(5, "John", "Doe")).unwrap();
    store.insert(record(2, "Mary", "Smith")).unwrap();

    assert_eq!(ids(&mut store), vec![2, 5]);
    let found = store
        .find_by_field(&SearchField::LastName("smith".into()))
        .unwrap();
    assert_eq!(found, vec![record(2, "Mary", "Smith")]);
}

#[test]
fn test_insert_rejects_non_positive_id() {
    let mut store = setup_store();
    assert!(store.insert(record(0, "John", "Doe")).is_err());
}

// =============================================================================
// Restore Tests
// =============================================================================

#[test]
fn test_restore_merges_overwrites_and_rejects() {
    let mut store = setup_store();
    for name in ["John", "Mary", "Anna"] {
        store.create(params(name, "Doe")).unwrap();
    }

    let mut invalid = record(7, "Bad", "Salary");
    invalid.salary = Decimal::new(-1, 0);
    let snapshot = Snapshot::new(vec![
        record(5, "Eve", "Adams"),
        record(2, "Maria", "Doe"),
        invalid,
        record(4, "Dan", "Brown"),
    ]);

    let report = store.restore(&snapshot).unwrap();

    assert_eq!(report.imported, 3);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].id, 7);
    assert_eq!(ids(&mut store), vec![1, 2, 3, 4, 5]);
    assert_eq!(store.find_by_id(2).unwrap().unwrap().first_name, "Maria");
    assert_eq!(store.find_by_id(7).unwrap(), None);
    assert_eq!(store.index(), &store.rebuilt_index());
}

#[test]
fn test_restore_last_duplicate_wins() {
    let mut store = setup_store();
    let snapshot = Snapshot::new(vec![record(3, "First", "Copy"), record(3, "Second", "Copy")]);

    let report = store.restore(&snapshot).unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(store.find_by_id(3).unwrap().unwrap().first_name, "Second");
}

#[test]
fn test_restore_later_invalid_copy_withdraws_earlier() {
    let mut store = setup_store();
    let mut invalid = record(5, "Late", "Copy");
    invalid.workplace_number = 0;
    let snapshot = Snapshot::new(vec![record(5, "Early", "Copy"), invalid]);

    let report = store.restore(&snapshot).unwrap();

    assert_eq!(report.imported, 0);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].id, 5);
    assert_eq!(store.find_by_id(5).unwrap(), None);
}

#[test]
fn test_restore_later_valid_copy_clears_rejection() {
    let mut store = setup_store();
    let mut invalid = record(5, "Early", "Copy");
    invalid.workplace_number = 0;
    let snapshot = Snapshot::new(vec![invalid, record(5, "Late", "Copy")]);

    let report = store.restore(&snapshot).unwrap();

    assert_eq!(report.imported, 1);
    assert!(report.rejected.is_empty());
    assert_eq!(store.find_by_id(5).unwrap().unwrap().first_name, "Late");
}

#[test]
fn test_make_snapshot_is_detached() {
    let mut store = setup_store();
    store.create(params("John", "Doe")).unwrap();

    let snapshot = store.make_snapshot().unwrap();
    store.remove(1).unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.records()[0].first_name, "John");
}
