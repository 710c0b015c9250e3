//! CSV codec for snapshots
//!
//! ## Format
//! ```text
//! Id,First Name,Last Name,Date of Birth,Workplace Number,Salary,Department
//! 1,John,Doe,1990-Jan-01,12,1500.50,A
//! ```
//!
//! Fields containing a comma, a quote or a line break are wrapped in double
//! quotes with inner quotes doubled. Rows are parsed strictly: a row with the
//! wrong field count or an unparsable value fails the whole import with the
//! line number.

use std::io::{BufRead, Write};

use crate::error::{CabinetError, Result};
use crate::record::{format_date, parse_date, Record};

use super::Snapshot;

/// Header row written before any record
pub const HEADER: &str = "Id,First Name,Last Name,Date of Birth,Workplace Number,Salary,Department";

const FIELD_COUNT: usize = 7;

/// Write `snapshot` as CSV, header first
pub fn write_csv<W: Write>(snapshot: &Snapshot, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", HEADER)?;
    for record in snapshot {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            record.id,
            escape(&record.first_name),
            escape(&record.last_name),
            format_date(record.date_of_birth),
            record.workplace_number,
            record.salary,
            escape(&record.department.to_string()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a CSV document produced by [`write_csv`]
///
/// The header row is optional; blank lines are skipped.
pub fn read_csv<R: BufRead>(reader: R) -> Result<Snapshot> {
    let mut records = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = number + 1;
        let trimmed = line.trim_end_matches('\r');

        if trimmed.trim().is_empty() || (line_no == 1 && trimmed == HEADER) {
            continue;
        }

        let fields = split_row(trimmed).ok_or_else(|| {
            CabinetError::Snapshot(format!("line {}: unterminated quoted field", line_no))
        })?;
        records.push(parse_row(&fields, line_no)?);
    }

    Ok(Snapshot::new(records))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one row into fields, honoring double-quoted fields
fn split_row(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match (ch, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(current);
    Some(fields)
}

fn parse_row(fields: &[String], line_no: usize) -> Result<Record> {
    if fields.len() != FIELD_COUNT {
        return Err(CabinetError::Snapshot(format!(
            "line {}: expected {} fields, found {}",
            line_no,
            FIELD_COUNT,
            fields.len()
        )));
    }

    let bad = |name: &str, value: &str| {
        CabinetError::Snapshot(format!("line {}: invalid {} '{}'", line_no, name, value))
    };

    let id = fields[0].trim().parse().map_err(|_| bad("id", &fields[0]))?;
    let date_of_birth = parse_date(&fields[3]).ok_or_else(|| bad("date of birth", &fields[3]))?;
    let workplace_number = fields[4]
        .trim()
        .parse()
        .map_err(|_| bad("workplace number", &fields[4]))?;
    let salary = fields[5].trim().parse().map_err(|_| bad("salary", &fields[5]))?;

    let mut department = fields[6].trim().chars();
    let department = match (department.next(), department.next()) {
        (Some(c), None) => c,
        _ => return Err(bad("department", &fields[6])),
    };

    Ok(Record {
        id,
        first_name: fields[1].clone(),
        last_name: fields[2].clone(),
        date_of_birth,
        workplace_number,
        salary,
        department,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_quoted_fields() {
        let fields = split_row(r#"1,"Doe, Jr.","say ""hi""",x"#).unwrap();
        assert_eq!(fields, vec!["1", "Doe, Jr.", "say \"hi\"", "x"]);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert!(split_row(r#"1,"open"#).is_none());
    }

    #[test]
    fn test_escape_only_when_needed() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("q\""), "\"q\"\"\"");
    }
}
