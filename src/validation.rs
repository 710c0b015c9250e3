//! Validation
//!
//! Field rules checked before any record reaches a store.
//!
//! A [`Validator`] is a plain ordered list of predicates assembled from
//! [`ValidationRules`]; the first predicate that fails decides the message.
//! Rules come from a preset or from a JSON rules file:
//!
//! ```json
//! {
//!   "default": { "first_name": { "min": 2, "max": 60 }, ... },
//!   "custom":  { ... }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{CabinetError, Result};
use crate::record::{Record, NAME_WIDTH};

/// A record failed one of the field rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Named rule set to build a validator from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPreset {
    #[default]
    Default,
    Custom,
}

impl ValidationPreset {
    /// Key of this preset in a rules file
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationPreset::Default => "default",
            ValidationPreset::Custom => "custom",
        }
    }

    /// Parse a preset name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" => Some(ValidationPreset::Default),
            "custom" => Some(ValidationPreset::Custom),
            _ => None,
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Inclusive length bounds for a name, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

/// Inclusive date bounds; a missing `to` means "today"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

/// All field rules of one preset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationRules {
    pub first_name: LengthRange,
    pub last_name: LengthRange,
    pub date_of_birth: DateRange,
    pub workplace_number: Range<i16>,
    pub salary: Range<Decimal>,
    /// Allowed department letters
    pub departments: String,
}

impl ValidationRules {
    /// Built-in rules for a preset
    pub fn preset(preset: ValidationPreset) -> Self {
        match preset {
            ValidationPreset::Default => Self {
                first_name: LengthRange { min: 2, max: 60 },
                last_name: LengthRange { min: 2, max: 60 },
                date_of_birth: DateRange {
                    from: NaiveDate::from_ymd_opt(1950, 1, 1).unwrap_or(NaiveDate::MIN),
                    to: None,
                },
                workplace_number: Range { min: 1, max: 1000 },
                salary: Range {
                    min: Decimal::ZERO,
                    max: Decimal::new(1_000_000, 0),
                },
                departments: ('A'..='Z').collect(),
            },
            ValidationPreset::Custom => Self {
                first_name: LengthRange {
                    min: 1,
                    max: NAME_WIDTH,
                },
                last_name: LengthRange {
                    min: 1,
                    max: NAME_WIDTH,
                },
                date_of_birth: DateRange {
                    from: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
                    to: None,
                },
                workplace_number: Range {
                    min: 1,
                    max: i16::MAX,
                },
                salary: Range {
                    min: Decimal::ZERO,
                    max: Decimal::new(10_000_000, 0),
                },
                departments: ('A'..='F').collect(),
            },
        }
    }

    /// Load one preset from a JSON rules file
    pub fn load(path: &Path, preset: ValidationPreset) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text, preset)
    }

    /// Parse one preset out of a JSON rules document
    pub fn from_json(text: &str, preset: ValidationPreset) -> Result<Self> {
        let mut sets: HashMap<String, ValidationRules> = serde_json::from_str(text)
            .map_err(|e| CabinetError::Config(format!("Invalid rules file: {}", e)))?;

        sets.remove(preset.as_str()).ok_or_else(|| {
            CabinetError::Config(format!(
                "Rules file has no '{}' section",
                preset.as_str()
            ))
        })
    }
}

// =============================================================================
// Validator
// =============================================================================

type Check = Box<dyn Fn(&Record) -> std::result::Result<(), ValidationError> + Send + Sync>;

/// Ordered list of record checks
pub struct Validator {
    checks: Vec<Check>,
}

impl Validator {
    /// A validator with no checks (accepts everything the codec can store)
    pub fn empty() -> Self {
        Self { checks: Vec::new() }
    }

    /// Assemble the checks for a rule set
    pub fn from_rules(rules: &ValidationRules) -> Self {
        let rules = rules.clone();
        let mut validator = Self::empty();

        validator.push(|record| {
            if record.id > 0 {
                Ok(())
            } else {
                Err(ValidationError::new(format!(
                    "Id must be positive, got {}",
                    record.id
                )))
            }
        });

        let first = rules.first_name;
        validator.push(move |record| check_name("First name", &record.first_name, first));

        let last = rules.last_name;
        validator.push(move |record| check_name("Last name", &record.last_name, last));

        let dates = rules.date_of_birth;
        validator.push(move |record| {
            let to = dates.to.unwrap_or_else(|| Local::now().date_naive());
            if record.date_of_birth < dates.from || record.date_of_birth > to {
                return Err(ValidationError::new(format!(
                    "Date of birth must be between {} and {}",
                    dates.from, to
                )));
            }
            Ok(())
        });

        let workplace = rules.workplace_number;
        validator.push(move |record| {
            if !(workplace.min..=workplace.max).contains(&record.workplace_number) {
                return Err(ValidationError::new(format!(
                    "Workplace number must be between {} and {}",
                    workplace.min, workplace.max
                )));
            }
            Ok(())
        });

        let salary = rules.salary;
        validator.push(move |record| {
            if record.salary < salary.min || record.salary > salary.max {
                return Err(ValidationError::new(format!(
                    "Salary must be between {} and {}",
                    salary.min, salary.max
                )));
            }
            Ok(())
        });

        let departments = rules.departments;
        validator.push(move |record| {
            if !departments.contains(record.department) {
                return Err(ValidationError::new(format!(
                    "Department must be one of '{}'",
                    departments
                )));
            }
            Ok(())
        });

        validator
    }

    /// Built-in validator for a preset
    pub fn preset(preset: ValidationPreset) -> Self {
        Self::from_rules(&ValidationRules::preset(preset))
    }

    /// Append a check
    pub fn push<F>(&mut self, check: F)
    where
        F: Fn(&Record) -> std::result::Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
    }

    /// Run every check in order, stopping at the first failure
    pub fn validate(&self, record: &Record) -> std::result::Result<(), ValidationError> {
        self.checks.iter().try_for_each(|check| check(record))
    }

    /// Number of checks
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Check if there are no checks
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::preset(ValidationPreset::Default)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("checks", &self.checks.len())
            .finish()
    }
}

fn check_name(
    label: &str,
    name: &str,
    range: LengthRange,
) -> std::result::Result<(), ValidationError> {
    if name.trim() != name {
        return Err(ValidationError::new(format!(
            "{} must not start or end with whitespace",
            label
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::new(format!(
            "{} must not contain control characters",
            label
        )));
    }
    if name.len() > NAME_WIDTH {
        return Err(ValidationError::new(format!(
            "{} must fit in {} bytes",
            label, NAME_WIDTH
        )));
    }
    let chars = name.chars().count();
    if chars < range.min || chars > range.max {
        return Err(ValidationError::new(format!(
            "{} must be {} to {} characters long",
            label, range.min, range.max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            id: 1,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            workplace_number: 10,
            salary: Decimal::new(5000, 0),
            department: 'A',
        }
    }

    #[test]
    fn test_default_accepts_valid_record() {
        assert!(Validator::default().validate(&record()).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let mut bad = record();
        bad.first_name = "J".to_string();
        bad.salary = Decimal::new(-1, 0);

        let err = Validator::default().validate(&bad).unwrap_err();
        assert!(err.message.starts_with("First name"));
    }

    #[test]
    fn test_names_reject_control_characters() {
        let mut bad = record();
        bad.last_name = "Do\ne".to_string();

        let err = Validator::default().validate(&bad).unwrap_err();
        assert_eq!(err.to_string(), "Last name must not contain control characters");
    }

    #[test]
    fn test_custom_departments() {
        let mut r = record();
        r.department = 'Z';
        assert!(Validator::preset(ValidationPreset::Default).validate(&r).is_ok());
        assert!(Validator::preset(ValidationPreset::Custom).validate(&r).is_err());
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"{
            "custom": {
                "first_name": { "min": 3, "max": 10 },
                "last_name": { "min": 3, "max": 10 },
                "date_of_birth": { "from": "1980-01-01", "to": "2000-12-31" },
                "workplace_number": { "min": 1, "max": 5 },
                "salary": { "min": "0", "max": "100" },
                "departments": "XY"
            }
        }"#;

        let rules = ValidationRules::from_json(json, ValidationPreset::Custom).unwrap();
        assert_eq!(rules.workplace_number, Range { min: 1, max: 5 });
        assert_eq!(rules.departments, "XY");

        let missing = ValidationRules::from_json(json, ValidationPreset::Default);
        assert!(matches!(missing, Err(CabinetError::Config(_))));
    }
}
