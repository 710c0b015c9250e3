//! Filter AST and evaluation
//!
//! Fields, typed values, and the flat left-to-right boolean filter.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::index::SearchField;
use crate::record::{format_date, parse_date, Record};

// =============================================================================
// Fields and Values
// =============================================================================

/// A named record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    FirstName,
    LastName,
    DateOfBirth,
    WorkplaceNumber,
    Salary,
    Department,
}

impl Field {
    /// Every field in display order
    pub const ALL: [Field; 7] = [
        Field::Id,
        Field::FirstName,
        Field::LastName,
        Field::DateOfBirth,
        Field::WorkplaceNumber,
        Field::Salary,
        Field::Department,
    ];

    /// Parse a field name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "id" => Some(Field::Id),
            "firstname" => Some(Field::FirstName),
            "lastname" => Some(Field::LastName),
            "dateofbirth" => Some(Field::DateOfBirth),
            "workplace" | "workplacenumber" => Some(Field::WorkplaceNumber),
            "salary" => Some(Field::Salary),
            "department" => Some(Field::Department),
            _ => None,
        }
    }

    /// Column header for this field
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "Id",
            Field::FirstName => "FirstName",
            Field::LastName => "LastName",
            Field::DateOfBirth => "DateOfBirth",
            Field::WorkplaceNumber => "Workplace",
            Field::Salary => "Salary",
            Field::Department => "Department",
        }
    }

    /// Parse a literal as a value of this field's type
    pub fn parse_value(&self, text: &str) -> Result<Value, String> {
        let text = text.trim();
        let invalid = |kind: &str| format!("'{}' is not a valid {} for {}", text, kind, self.as_str());

        match self {
            Field::Id => text.parse().map(Value::Int).map_err(|_| invalid("integer")),
            Field::FirstName | Field::LastName => Ok(Value::Text(text.to_string())),
            Field::DateOfBirth => parse_date(text).map(Value::Date).ok_or_else(|| invalid("date")),
            Field::WorkplaceNumber => text.parse().map(Value::Short).map_err(|_| invalid("number")),
            Field::Salary => text.parse().map(Value::Money).map_err(|_| invalid("decimal")),
            Field::Department => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(invalid("single character")),
                }
            }
        }
    }

    /// Current value of this field in `record`
    pub fn value_of(&self, record: &Record) -> Value {
        match self {
            Field::Id => Value::Int(record.id),
            Field::FirstName => Value::Text(record.first_name.clone()),
            Field::LastName => Value::Text(record.last_name.clone()),
            Field::DateOfBirth => Value::Date(record.date_of_birth),
            Field::WorkplaceNumber => Value::Short(record.workplace_number),
            Field::Salary => Value::Money(record.salary),
            Field::Department => Value::Char(record.department),
        }
    }

    /// Overwrite this field in `record`
    ///
    /// Returns false if `value` has the wrong type or the field is the id.
    pub fn assign(&self, record: &mut Record, value: &Value) -> bool {
        match (self, value) {
            (Field::FirstName, Value::Text(s)) => record.first_name = s.clone(),
            (Field::LastName, Value::Text(s)) => record.last_name = s.clone(),
            (Field::DateOfBirth, Value::Date(d)) => record.date_of_birth = *d,
            (Field::WorkplaceNumber, Value::Short(n)) => record.workplace_number = *n,
            (Field::Salary, Value::Money(m)) => record.salary = *m,
            (Field::Department, Value::Char(c)) => record.department = *c,
            _ => return false,
        }
        true
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed literal or field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Text(String),
    Date(NaiveDate),
    Short(i16),
    Money(Decimal),
    Char(char),
}

impl Value {
    /// Equality as the filter language sees it: text and characters
    /// compare case-insensitively
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.to_uppercase() == b.to_uppercase(),
            (Value::Char(a), Value::Char(b)) => a.to_uppercase().eq(b.to_uppercase()),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => f.write_str(&format_date(*d)),
            Value::Short(n) => write!(f, "{}", n),
            Value::Money(m) => write!(f, "{}", m),
            Value::Char(c) => write!(f, "{}", c),
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// `field op value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub field: Field,
    pub op: CompareOp,
    pub value: Value,
}

impl Comparison {
    pub fn eval(&self, record: &Record) -> bool {
        let equal = self.field.value_of(record).matches(&self.value);
        match self.op {
            CompareOp::Eq => equal,
            CompareOp::Neq => !equal,
        }
    }
}

/// A comparison with an optional leading `not`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub negated: bool,
    pub comparison: Comparison,
}

impl Term {
    pub fn eval(&self, record: &Record) -> bool {
        self.comparison.eval(record) != self.negated
    }
}

/// Flat chain of terms joined by `and`/`or`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub first: Term,
    pub rest: Vec<(Connective, Term)>,
}

/// Index lookup equivalent to a whole filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexProbe {
    Id(i32),
    Field(SearchField),
}

impl Filter {
    /// Evaluate left to right; each connective short-circuits on the
    /// accumulated result
    pub fn eval(&self, record: &Record) -> bool {
        self.rest
            .iter()
            .fold(self.first.eval(record), |acc, (connective, term)| {
                match connective {
                    Connective::And => acc && term.eval(record),
                    Connective::Or => acc || term.eval(record),
                }
            })
    }

    /// If the filter is a single positive equality on an indexed field or the
    /// id, the index lookup that answers it
    pub fn as_index_probe(&self) -> Option<IndexProbe> {
        if !self.rest.is_empty() || self.first.negated {
            return None;
        }
        let cmp = &self.first.comparison;
        if cmp.op != CompareOp::Eq {
            return None;
        }

        match (cmp.field, &cmp.value) {
            (Field::Id, Value::Int(id)) => Some(IndexProbe::Id(*id)),
            (Field::FirstName, Value::Text(s)) => {
                Some(IndexProbe::Field(SearchField::FirstName(s.clone())))
            }
            (Field::LastName, Value::Text(s)) => {
                Some(IndexProbe::Field(SearchField::LastName(s.clone())))
            }
            (Field::DateOfBirth, Value::Date(d)) => {
                Some(IndexProbe::Field(SearchField::DateOfBirth(*d)))
            }
            _ => None,
        }
    }
}

/// `field = value` in an update's `set` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub field: Field,
    pub value: Value,
}
