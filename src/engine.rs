//! Engine Module
//!
//! The cabinet facade that turns commands into store calls.
//!
//! ## Responsibilities
//! - Compose the configured backend with its validator and decorators
//! - Execute parsed commands and render their replies
//! - Convert user-input failures into replies instead of errors
//! - Move snapshots between the store and CSV files

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::command::{Command, SnapshotFormat, COMMANDS};
use crate::config::{Config, StorageKind};
use crate::error::{CabinetError, Result};
use crate::query::Field;
use crate::record::Record;
use crate::snapshot::csv;
use crate::store::{FileStore, LoggingStore, MemoryStore, RecordStore, Selection, TimedStore};

/// Text produced by one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,

    /// Set by `exit`: the session should end after printing
    pub exit: bool,
}

impl Reply {
    /// A one-line reply
    pub fn text(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            exit: false,
        }
    }

    pub fn lines(lines: Vec<String>) -> Self {
        Self { lines, exit: false }
    }

    /// Reply for input the cabinet refused
    pub fn invalid(message: impl std::fmt::Display) -> Self {
        Self::text(format!("invalid parameters: {}", message))
    }

    fn exit() -> Self {
        Self {
            lines: vec!["Exiting an application...".to_string()],
            exit: true,
        }
    }
}

/// A record cabinet: one store plus the command interpreter on top of it
///
/// The store is exclusively owned. Errors caused by the user (bad input,
/// failed validation, duplicate ids, malformed queries or import files) come
/// back as `Reply::invalid`; I/O and integrity failures are returned as
/// errors.
pub struct Cabinet {
    config: Config,
    store: Box<dyn RecordStore>,
}

impl Cabinet {
    /// Open the backend described by `config`
    ///
    /// Decorators are applied innermost first: timing wraps the backend,
    /// logging wraps timing.
    pub fn open(config: Config) -> Result<Self> {
        let validator = config.validator()?;

        let mut store: Box<dyn RecordStore> = match config.storage {
            StorageKind::Memory => Box::new(MemoryStore::new(validator)),
            StorageKind::File => Box::new(FileStore::open(&config.data_file, validator)?),
        };

        if config.measure_time {
            store = Box::new(TimedStore::new(store));
        }
        if config.log_calls {
            store = Box::new(LoggingStore::new(store));
        }

        tracing::info!(
            "Using {} storage with {} validation rules",
            config.storage.as_str(),
            config.validation.as_str()
        );

        Ok(Self { config, store })
    }

    /// Wrap an already constructed store
    pub fn with_store(config: Config, store: Box<dyn RecordStore>) -> Self {
        Self { config, store }
    }

    /// Parse and execute one input line
    pub fn run_line(&mut self, line: &str) -> Result<Reply> {
        match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(e) => Ok(Reply::invalid(e)),
        }
    }

    /// Execute a command
    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        match self.dispatch(command) {
            Err(e) if e.is_user_error() => Ok(Reply::invalid(e)),
            other => other,
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Help => Ok(Reply::lines(
                COMMANDS
                    .iter()
                    .map(|(usage, about)| format!("{:<64} {}", usage, about))
                    .collect(),
            )),
            Command::Exit => Ok(Reply::exit()),
            Command::Create(params) => {
                let id = self.store.create(params)?;
                Ok(Reply::text(format!("Record #{} is created.", id)))
            }
            Command::Insert(record) => {
                let id = record.id;
                self.store.insert(record)?;
                Ok(Reply::text(format!("Record #{} is inserted.", id)))
            }
            Command::List => Ok(record_lines(self.store.records()?)),
            Command::Stat => {
                let stat = self.store.stat()?;
                Ok(Reply::text(format!(
                    "{} record(s), {} deleted.",
                    stat.live, stat.deleted
                )))
            }
            Command::Edit(record) => {
                let id = record.id;
                let reply = if self.store.edit(record)? {
                    format!("Record #{} is updated.", id)
                } else {
                    format!("Record #{} doesn't exist.", id)
                };
                Ok(Reply::text(reply))
            }
            Command::Find(field) => Ok(record_lines(self.store.find_by_field(&field)?)),
            Command::Remove(id) => {
                let reply = if self.store.remove(id)? {
                    format!("Record #{} is removed.", id)
                } else {
                    format!("Record #{} doesn't exist.", id)
                };
                Ok(Reply::text(reply))
            }
            Command::Purge => {
                let stat = self.store.purge()?;
                Ok(Reply::text(format!(
                    "Data file processing is completed: {} of {} records were purged.",
                    stat.purged,
                    stat.purged + stat.live
                )))
            }
            Command::Select(query) => {
                let selection = self.store.select(&query)?;
                Ok(Reply::lines(render_table(&selection)))
            }
            Command::Update(query) => {
                let ids = self.store.update(&query)?;
                Ok(Reply::text(id_summary(&ids, "updated")))
            }
            Command::Delete(query) => {
                let ids = self.store.delete(&query)?;
                Ok(Reply::text(id_summary(&ids, "deleted")))
            }
            Command::Export { format, path } => self.export(format, &path),
            Command::Import { format, path } => self.import(format, &path),
        }
    }

    fn export(&mut self, format: SnapshotFormat, path: &Path) -> Result<Reply> {
        let snapshot = self.store.make_snapshot()?;
        let file = File::create(path).map_err(|e| {
            CabinetError::Snapshot(format!("cannot create {}: {}", path.display(), e))
        })?;

        match format {
            SnapshotFormat::Csv => csv::write_csv(&snapshot, &mut BufWriter::new(file))?,
        }

        tracing::info!("Exported {} records to {}", snapshot.len(), path.display());
        Ok(Reply::text(format!(
            "All records are exported to file {}.",
            path.display()
        )))
    }

    fn import(&mut self, format: SnapshotFormat, path: &Path) -> Result<Reply> {
        let file = File::open(path).map_err(|e| {
            CabinetError::Snapshot(format!("cannot open {}: {}", path.display(), e))
        })?;

        let snapshot = match format {
            SnapshotFormat::Csv => csv::read_csv(BufReader::new(file))?,
        };
        let report = self.store.restore(&snapshot)?;

        let mut lines = vec![format!(
            "{} records were imported from {}.",
            report.imported,
            path.display()
        )];
        lines.extend(
            report
                .rejected
                .iter()
                .map(|rejected| format!("Record #{} was skipped: {}", rejected.id, rejected.reason)),
        );
        Ok(Reply::lines(lines))
    }

    /// Close the store, releasing its file
    pub fn close(mut self) -> Result<()> {
        self.store.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The composed store
    pub fn store_mut(&mut self) -> &mut dyn RecordStore {
        self.store.as_mut()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn record_lines(records: Vec<Record>) -> Reply {
    if records.is_empty() {
        return Reply::text("No records found.");
    }
    Reply::lines(records.iter().map(Record::to_string).collect())
}

fn id_summary(ids: &[i32], verb: &str) -> String {
    match ids {
        [] => "No records matched.".to_string(),
        [id] => format!("Record #{} is {}.", id, verb),
        _ => {
            let list: Vec<String> = ids.iter().map(|id| format!("#{}", id)).collect();
            format!("Records {} are {}.", list.join(", "), verb)
        }
    }
}

/// Render a selection as a bordered text table
fn render_table(selection: &Selection) -> Vec<String> {
    if selection.records.is_empty() {
        return vec!["No records found.".to_string()];
    }

    let rows: Vec<Vec<String>> = selection
        .records
        .iter()
        .map(|record| {
            selection
                .columns
                .iter()
                .map(|field| field.value_of(record).to_string())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = selection
        .columns
        .iter()
        .enumerate()
        .map(|(i, field)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(field.as_str().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let row_line = |cells: &[String]| {
        let cells: Vec<String> = cells
            .iter()
            .zip(&widths)
            .zip(&selection.columns)
            .map(|((cell, &width), field)| match field {
                Field::Id | Field::WorkplaceNumber | Field::Salary => format!(" {:>width$} ", cell),
                _ => format!(" {:<width$} ", cell),
            })
            .collect();
        format!("|{}|", cells.join("|"))
    };

    let header: Vec<String> = selection
        .columns
        .iter()
        .map(|field| field.as_str().to_string())
        .collect();

    let mut lines = vec![border.clone(), row_line(header.as_slice()), border.clone()];
    lines.extend(rows.iter().map(|row| row_line(row.as_slice())));
    lines.push(border);
    lines
}
