//! Tests for the filter language
//!
//! These tests verify:
//! - Filter evaluation (case-insensitivity, negation, left-to-right chains)
//! - Select projection and index probing
//! - Update validation-before-write and delete semantics
//! - Parse errors name the offending token and position

use chrono::NaiveDate;
use filecabinet::index::SearchField;
use filecabinet::query::{
    DeleteQuery, Field, Filter, IndexProbe, QueryError, SelectQuery, UpdateQuery,
};
use filecabinet::record::Record;
use filecabinet::store::{MemoryStore, RecordStore};
use filecabinet::validation::Validator;
use filecabinet::CabinetError;
use rust_decimal::Decimal;

// =============================================================================
// Helper Functions
// =============================================================================

fn person(id: i32, first: &str, last: &str, department: char) -> Record {
    Record {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        workplace_number: 10,
        salary: Decimal::new(2000, 0),
        department,
    }
}

fn setup_store() -> MemoryStore {
    let mut store = MemoryStore::new(Validator::default());
    store.insert(person(1, "John", "Doe", 'A')).unwrap();
    store.insert(person(2, "John", "Smith", 'B')).unwrap();
    store.insert(person(3, "Mary", "Doe", 'B')).unwrap();
    store
}

fn matching(filter: &str, records: &[Record]) -> Vec<i32> {
    let filter = Filter::parse(filter).unwrap();
    records
        .iter()
        .filter(|r| filter.eval(r))
        .map(|r| r.id)
        .collect()
}

// =============================================================================
// Filter Evaluation Tests
// =============================================================================

#[test]
fn test_and_with_not_equal() {
    let records = [person(1, "John", "Doe", 'A'), person(2, "John", "Smith", 'A')];
    assert_eq!(matching("firstname = john and lastname != doe", &records), vec![2]);
}

#[test]
fn test_chain_is_left_to_right() {
    let records = [
        person(1, "John", "Doe", 'A'),
        person(2, "Mary", "Doe", 'B'),
        person(3, "Mary", "Lee", 'A'),
    ];

    // (john or mary) and department = a
    assert_eq!(
        matching("firstname = john or firstname = mary and department = a", &records),
        vec![1, 3]
    );
    // (department = b and lastname = lee) or firstname = john
    assert_eq!(
        matching("department = b and lastname = lee or firstname = john", &records),
        vec![1]
    );
}

#[test]
fn test_not_binds_to_one_comparison() {
    let records = [person(1, "John", "Doe", 'A'), person(2, "Mary", "Doe", 'B')];
    assert_eq!(matching("not firstname = john and lastname = doe", &records), vec![2]);
    assert_eq!(matching("NOT department != 'b'", &records), vec![2]);
}

#[test]
fn test_typed_comparisons() {
    let records = [person(1, "John", "Doe", 'A'), person(2, "Mary", "Doe", 'B')];
    assert_eq!(matching("salary = 2000.00", &records), vec![1, 2]);
    assert_eq!(matching("dateofbirth = '1990-Jan-01' and id = 2", &records), vec![2]);
    assert_eq!(matching("workplace = 11", &records), Vec::<i32>::new());
}

#[test]
fn test_quoted_values_keep_spaces() {
    let records = [person(1, "Mary Ann", "Doe", 'A'), person(2, "Mary", "Doe", 'A')];
    assert_eq!(matching("firstname = \"mary ann\"", &records), vec![1]);
}

// =============================================================================
// Query Parsing Tests
// =============================================================================

#[test]
fn test_select_projection() {
    let query = SelectQuery::parse("id, lastname where department = b").unwrap();
    assert_eq!(query.columns(), vec![Field::Id, Field::LastName]);

    let all = SelectQuery::parse("").unwrap();
    assert_eq!(all.columns(), Field::ALL.to_vec());
    assert!(all.filter.is_none());

    let star = SelectQuery::parse("*").unwrap();
    assert_eq!(star.columns(), Field::ALL.to_vec());
}

#[test]
fn test_index_probe_only_for_single_equality() {
    let probe = |text: &str| Filter::parse(text).unwrap().as_index_probe();

    assert_eq!(probe("id = 4"), Some(IndexProbe::Id(4)));
    assert_eq!(
        probe("lastname = doe"),
        Some(IndexProbe::Field(SearchField::LastName("doe".into())))
    );
    assert_eq!(probe("lastname != doe"), None);
    assert_eq!(probe("not lastname = doe"), None);
    assert_eq!(probe("lastname = doe and id = 1"), None);
    assert_eq!(probe("salary = 10"), None);
}

#[test]
fn test_update_later_assignment_wins() {
    let query = UpdateQuery::parse("set firstname = a1, firstname = Bob where id = 1").unwrap();
    assert_eq!(query.assignments.len(), 1);
    assert_eq!(query.apply(&person(1, "John", "Doe", 'A')).first_name, "Bob");
}

#[test]
fn test_parse_errors_name_the_token() {
    let err = DeleteQuery::parse("where firstname = john and").unwrap_err();
    assert_eq!(err.message, "expected field name, found end of input");

    let err = UpdateQuery::parse("set firstname = x lastname = y where id = 1").unwrap_err();
    assert_eq!(err.message, "expected 'where', found 'lastname'");
    assert_eq!(err.to_string(), "expected 'where', found 'lastname' at position 19");

    let err = UpdateQuery::parse("set id = 5 where id = 1").unwrap_err();
    assert_eq!(err.message, "id cannot be updated");

    let err = SelectQuery::parse("age where id = 1").unwrap_err();
    assert_eq!(err.message, "unknown field 'age'");

    let err = Filter::parse("id = abc").unwrap_err();
    assert!(err.message.contains("'abc'"), "{}", err.message);

    let err: QueryError = Filter::parse("firstname = 'open").unwrap_err();
    assert_eq!(err.message, "unterminated string literal");
}

#[test]
fn test_delete_requires_where() {
    assert!(DeleteQuery::parse("firstname = john").is_err());
    assert!(UpdateQuery::parse("set firstname = john").is_err());
}

// =============================================================================
// Store Query Operation Tests
// =============================================================================

#[test]
fn test_select_through_store() {
    let mut store = setup_store();

    let selection = store.select("firstname, lastname where firstname = JOHN").unwrap();
    assert_eq!(selection.columns, vec![Field::FirstName, Field::LastName]);
    let ids: Vec<i32> = selection.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let by_id = store.select("where id = 3").unwrap();
    assert_eq!(by_id.records, vec![person(3, "Mary", "Doe", 'B')]);

    let everything = store.select("").unwrap();
    assert_eq!(everything.records.len(), 3);
}

#[test]
fn test_update_through_store() {
    let mut store = setup_store();

    let ids = store
        .update("set salary = 3000, department = C where lastname = doe")
        .unwrap();

    assert_eq!(ids, vec![1, 3]);
    let updated = store.find_by_id(3).unwrap().unwrap();
    assert_eq!(updated.salary, Decimal::new(3000, 0));
    assert_eq!(updated.department, 'C');
    assert_eq!(store.find_by_id(2).unwrap().unwrap().department, 'B');
}

#[test]
fn test_update_invalid_value_changes_nothing() {
    let mut store = setup_store();

    let result = store.update("set firstname = X where department = b");

    assert!(matches!(result, Err(CabinetError::Validation(_))));
    assert_eq!(store.find_by_id(2).unwrap().unwrap().first_name, "John");
    assert_eq!(store.find_by_id(3).unwrap().unwrap().first_name, "Mary");
}

#[test]
fn test_delete_through_store() {
    let mut store = setup_store();

    assert_eq!(store.delete("where department = b").unwrap(), vec![2, 3]);
    assert_eq!(store.delete("where department = b").unwrap(), Vec::<i32>::new());
    assert_eq!(store.records().unwrap(), vec![person(1, "John", "Doe", 'A')]);
}

#[test]
fn test_malformed_query_touches_nothing() {
    let mut store = setup_store();

    let result = store.delete("where firstname john");

    assert!(matches!(result, Err(CabinetError::Query(_))));
    assert_eq!(store.records().unwrap().len(), 3);
}
