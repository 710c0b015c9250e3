//! Tests for snapshots and the CSV codec
//!
//! These tests verify:
//! - CSV output format (header, date format, quoting)
//! - Reading back what was written, including awkward names
//! - Line-numbered errors for malformed rows
//! - Export from one backend and restore into another

use std::fs;
use std::io::{BufReader, Cursor};

use chrono::NaiveDate;
use filecabinet::record::Record;
use filecabinet::snapshot::csv::{read_csv, write_csv, HEADER};
use filecabinet::snapshot::Snapshot;
use filecabinet::store::{FileStore, MemoryStore, RecordStore};
use filecabinet::validation::Validator;
use filecabinet::CabinetError;
use rust_decimal::Decimal;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn record(id: i32, first: &str, last: &str) -> Record {
    Record {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        workplace_number: 12,
        salary: Decimal::new(150_050, 2),
        department: 'A',
    }
}

fn to_csv(snapshot: &Snapshot) -> String {
    let mut out = Vec::new();
    write_csv(snapshot, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

// =============================================================================
// CSV Format Tests
// =============================================================================

#[test]
fn test_write_csv_format() {
    let snapshot = Snapshot::new(vec![record(1, "John", "Doe"), record(2, "Mary", "O'Neil")]);

    let text = to_csv(&snapshot);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], HEADER);
    assert_eq!(lines[1], "1,John,Doe,1990-Jan-01,12,1500.50,A");
    assert_eq!(lines[2], "2,Mary,O'Neil,1990-Jan-01,12,1500.50,A");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_write_csv_quotes_commas_and_quotes() {
    let snapshot = Snapshot::new(vec![record(1, "Smith, Jr.", "The \"Boss\"")]);

    let text = to_csv(&snapshot);

    assert!(text.contains("1,\"Smith, Jr.\",\"The \"\"Boss\"\"\",1990-Jan-01"));
}

#[test]
fn test_read_back_written_csv() {
    let snapshot = Snapshot::new(vec![
        record(3, "Smith, Jr.", "The \"Boss\""),
        record(1, "Zoë", "Ångström"),
    ]);

    let text = to_csv(&snapshot);
    let read = read_csv(BufReader::new(Cursor::new(text))).unwrap();

    assert_eq!(read, snapshot);
}

#[test]
fn test_read_csv_without_header_and_blank_lines() {
    let text = "\n7,Ann,Lee,2001-12-31,3,10,B\r\n\n";

    let read = read_csv(Cursor::new(text)).unwrap();

    assert_eq!(read.len(), 1);
    let ann = &read.records()[0];
    assert_eq!(ann.id, 7);
    assert_eq!(ann.date_of_birth, NaiveDate::from_ymd_opt(2001, 12, 31).unwrap());
    assert_eq!(ann.department, 'B');
}

#[test]
fn test_read_csv_reports_line_numbers() {
    let cases = [
        (format!("{}\n1,John,Doe,1990-Jan-01,12,1500,A\n2,Mary", HEADER), "line 3"),
        ("1,John,Doe,not-a-date,12,1500,A".to_string(), "line 1"),
        ("\n1,John,Doe,1990-Jan-01,12,1500,AB".to_string(), "line 2"),
        ("1,\"John,Doe,1990-Jan-01,12,1500,A".to_string(), "line 1"),
    ];

    for (text, line) in cases {
        match read_csv(Cursor::new(text.clone())) {
            Err(CabinetError::Snapshot(message)) => {
                assert!(message.starts_with(line), "{:?} -> {}", text, message)
            }
            other => panic!("{:?} -> {:?}", text, other),
        }
    }
}

// =============================================================================
// Export / Restore Tests
// =============================================================================

#[test]
fn test_export_from_memory_restore_into_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("export.csv");

    let mut source = MemoryStore::new(Validator::default());
    source.insert(record(4, "John", "Doe")).unwrap();
    source.insert(record(2, "Mary", "Smith")).unwrap();

    let mut file = fs::File::create(&csv_path).unwrap();
    write_csv(&source.make_snapshot().unwrap(), &mut file).unwrap();

    let snapshot = read_csv(BufReader::new(fs::File::open(&csv_path).unwrap())).unwrap();
    let mut target =
        FileStore::open(&temp_dir.path().join("cabinet.db"), Validator::default()).unwrap();
    target.create(record(1, "Ann", "Lee").params()).unwrap();

    let report = target.restore(&snapshot).unwrap();

    assert_eq!(report.imported, 2);
    assert!(report.rejected.is_empty());
    let ids: Vec<i32> = target.records().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
}

#[test]
fn test_snapshot_iteration() {
    let snapshot: Snapshot = vec![record(1, "John", "Doe"), record(2, "Mary", "Doe")]
        .into_iter()
        .collect();

    let names: Vec<&str> = snapshot.iter().map(|r| r.first_name.as_str()).collect();
    assert_eq!(names, vec!["John", "Mary"]);
    assert!(!snapshot.is_empty());

    let owned: Vec<Record> = snapshot.into_records();
    assert_eq!(owned.len(), 2);
}
