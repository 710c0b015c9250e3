//! Command definitions
//!
//! One line of user input parsed into a typed command.
//!
//! ## Syntax
//! ```text
//! create <first>,<last>,<dob>,<workplace>,<salary>,<department>
//! insert <id>,<first>,<last>,<dob>,<workplace>,<salary>,<department>
//! edit <id> <first>,<last>,<dob>,<workplace>,<salary>,<department>
//! find firstname|lastname|dateofbirth <value>
//! remove <id>
//! select <fields> [where <filter>]
//! update set <field> = <value>, ... where <filter>
//! delete where <filter>
//! export csv <path>
//! import csv <path>
//! list | stat | purge | help | exit
//! ```
//!
//! Command names are case-insensitive. Query commands keep the rest of the
//! line verbatim for the query parser.

use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::error::{CabinetError, Result};
use crate::index::SearchField;
use crate::record::{parse_date, Record, RecordParams};

/// Snapshot file formats understood by export/import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Csv,
}

impl SnapshotFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(SnapshotFormat::Csv),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the command list
    Help,

    /// Leave the session
    Exit,

    Create(RecordParams),

    /// Add a record with an explicit id
    Insert(Record),

    /// Print every live record
    List,

    /// Print live and deleted counts
    Stat,

    Edit(Record),

    /// Indexed lookup by one field
    Find(SearchField),

    Remove(i32),

    /// Compact the data file
    Purge,

    Select(String),
    Update(String),
    Delete(String),

    Export { format: SnapshotFormat, path: PathBuf },
    Import { format: SnapshotFormat, path: PathBuf },
}

/// Name and usage of every command, for `help`
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "prints this list"),
    ("exit", "exits the application"),
    ("create <first>,<last>,<dob>,<workplace>,<salary>,<dept>", "creates a record"),
    ("insert <id>,<first>,<last>,<dob>,<workplace>,<salary>,<dept>", "inserts a record with the given id"),
    ("list", "prints all records"),
    ("stat", "prints record counts"),
    ("edit <id> <first>,<last>,<dob>,<workplace>,<salary>,<dept>", "replaces a record"),
    ("find firstname|lastname|dateofbirth <value>", "finds records by an indexed field"),
    ("remove <id>", "removes a record"),
    ("purge", "reclaims space held by removed records"),
    ("select <fields> [where <filter>]", "prints matching records"),
    ("update set <field> = <value>, ... where <filter>", "updates matching records"),
    ("delete where <filter>", "removes matching records"),
    ("export csv <path>", "writes all records to a file"),
    ("import csv <path>", "merges records from a file"),
];

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "help" => Command::Help,
            "exit" => Command::Exit,
            "list" => Command::List,
            "stat" => Command::Stat,
            "purge" => Command::Purge,
            "create" => Command::Create(parse_params(&split_fields(rest, 6)?)?),
            "insert" => {
                let fields = split_fields(rest, 7)?;
                Command::Insert(Record::new(parse_id(&fields[0])?, parse_params(&fields[1..])?))
            }
            "edit" => {
                let (id, fields) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| invalid("edit expects an id followed by the record fields"))?;
                let params = parse_params(&split_fields(fields, 6)?)?;
                Command::Edit(Record::new(parse_id(id)?, params))
            }
            "find" => Command::Find(parse_search(rest)?),
            "remove" => Command::Remove(parse_id(rest)?),
            "select" => Command::Select(required(rest, "select")?),
            "update" => Command::Update(required(rest, "update")?),
            "delete" => Command::Delete(required(rest, "delete")?),
            "export" => {
                let (format, path) = parse_transfer(rest)?;
                Command::Export { format, path }
            }
            "import" => {
                let (format, path) = parse_transfer(rest)?;
                Command::Import { format, path }
            }
            "" => return Err(invalid("empty command")),
            other => {
                return Err(invalid(format!(
                    "unknown command '{}', type 'help' for the list of commands",
                    other
                )))
            }
        };
        Ok(command)
    }
}

fn invalid(message: impl Into<String>) -> CabinetError {
    CabinetError::InvalidCommand(message.into())
}

fn required(rest: &str, command: &str) -> Result<String> {
    if rest.is_empty() {
        Err(invalid(format!("{} expects a query", command)))
    } else {
        Ok(rest.to_string())
    }
}

fn split_fields(rest: &str, expected: usize) -> Result<Vec<String>> {
    let fields: Vec<String> = rest.split(',').map(|f| unquote(f).to_string()).collect();
    if fields.len() != expected {
        return Err(invalid(format!(
            "expected {} comma-separated fields, found {}",
            expected,
            fields.len()
        )));
    }
    Ok(fields)
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}

fn parse_id(text: &str) -> Result<i32> {
    text.trim()
        .parse()
        .map_err(|_| invalid(format!("'{}' is not a record id", text.trim())))
}

/// `first, last, dob, workplace, salary, department`
fn parse_params(fields: &[String]) -> Result<RecordParams> {
    let date_of_birth =
        parse_date(&fields[2]).ok_or_else(|| invalid(format!("'{}' is not a date", fields[2])))?;
    let workplace_number = fields[3]
        .parse::<i16>()
        .map_err(|_| invalid(format!("'{}' is not a workplace number", fields[3])))?;
    let salary = fields[4]
        .parse::<Decimal>()
        .map_err(|_| invalid(format!("'{}' is not a salary", fields[4])))?;

    let mut chars = fields[5].chars();
    let department = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(invalid(format!("'{}' is not a department", fields[5]))),
    };

    Ok(RecordParams {
        first_name: fields[0].clone(),
        last_name: fields[1].clone(),
        date_of_birth,
        workplace_number,
        salary,
        department,
    })
}

fn parse_search(rest: &str) -> Result<SearchField> {
    let (field, value) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| invalid("find expects a field name and a value"))?;
    let value = unquote(value);

    match field.to_lowercase().as_str() {
        "firstname" => Ok(SearchField::FirstName(value.to_string())),
        "lastname" => Ok(SearchField::LastName(value.to_string())),
        "dateofbirth" => parse_date(value)
            .map(SearchField::DateOfBirth)
            .ok_or_else(|| invalid(format!("'{}' is not a date", value))),
        other => Err(invalid(format!("cannot search by '{}'", other))),
    }
}

fn parse_transfer(rest: &str) -> Result<(SnapshotFormat, PathBuf)> {
    let (format, path) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| invalid("expected a format and a file path"))?;
    let format = SnapshotFormat::parse(format)
        .ok_or_else(|| invalid(format!("unsupported format '{}'", format)))?;
    Ok((format, PathBuf::from(unquote(path))))
}
