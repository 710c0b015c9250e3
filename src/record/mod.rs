//! Record Module
//!
//! The fixed-schema employee record and its binary slot encoding.
//!
//! ## Responsibilities
//! - Define the logical record and the parameter set used to create/edit it
//! - Encode/decode one record to/from a fixed-size slot (see [`codec`])
//! - Provide the canonical date formatting shared by indexes and CSV

pub mod codec;

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub use codec::{SlotStatus, NAME_WIDTH, SLOT_SIZE};

/// Canonical date format (`1990-Jan-01`) used for index keys and CSV
pub const DATE_FORMAT: &str = "%Y-%b-%d";

/// A single employee record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Unique, positive identifier
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub workplace_number: i16,
    pub salary: Decimal,
    /// Single-letter department code
    pub department: char,
}

impl Record {
    /// Build a record from an id and its field values
    pub fn new(id: i32, params: RecordParams) -> Self {
        Self {
            id,
            first_name: params.first_name,
            last_name: params.last_name,
            date_of_birth: params.date_of_birth,
            workplace_number: params.workplace_number,
            salary: params.salary,
            department: params.department,
        }
    }

    /// Copy of the mutable fields (everything but the id)
    pub fn params(&self) -> RecordParams {
        RecordParams {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            date_of_birth: self.date_of_birth,
            workplace_number: self.workplace_number,
            salary: self.salary,
            department: self.department,
        }
    }

    /// Date of birth in the canonical `yyyy-MMM-dd` form
    pub fn formatted_date_of_birth(&self) -> String {
        format_date(self.date_of_birth)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}, {}, {}, {}, {}, {}, {}",
            self.id,
            self.first_name,
            self.last_name,
            self.formatted_date_of_birth(),
            self.workplace_number,
            self.salary,
            self.department
        )
    }
}

/// Field values of a record without its id
///
/// Used by `create` (the store assigns the id) and `edit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordParams {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub workplace_number: i16,
    pub salary: Decimal,
    pub department: char,
}

/// Format a date the way index keys and CSV files expect
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a date in any of the accepted input forms
///
/// Accepts `1990-Jan-01`, `1990-01-01` and `01/31/1990`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    [DATE_FORMAT, "%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}
