//! Content validation for deal files.
//!
//! Four checks run in a fixed order and the first failing one ends
//! validation for the whole file:
//!
//! 1. [`validate_mandatory_fields`] - D1, Country, Currency, Company present on every row
//! 2. [`validate_data_types`] - present values match the type sheet
//! 3. [`validate_codes`] - Country/Currency/Company resolve in the code sheet
//!    under the matching Type; fills "Country name" as it goes
//! 4. [`validate_active_flag`] - "Active Flag" is "Yes", "No" or absent
//!
//! A failure is a [`ValidationFailure`] value, not an error: the file is
//! rejected as a whole and the offending row/column is kept only so the
//! rejection can be logged.
//!
//! # Example
//!
//! ```rust,ignore
//! use icg_processor::{load_lookup, parser::parse_str, validate};
//!
//! let (mut dataset, _) = parse_str("D1,Country,Currency,Company\n12.59,USA,USD,FB", ',')?;
//! let lookup = load_lookup("lookup/Lookup.xlsx")?;
//! match validate(&mut dataset, &lookup) {
//!     Ok(()) => println!("valid"),
//!     Err(failure) => println!("rejected: {}", failure.category()),
//! }
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::lookup::LookupTable;
use crate::models::{cell, cell_text, columns, CodeType, Dataset, PrimitiveType};

/// Allowed literals of the "Active Flag" column.
pub const ACTIVE_FLAG_VALUES: [&str; 2] = ["Yes", "No"];

/// Which check rejected the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    MissingMandatoryField,
    TypeMismatch,
    InvalidCode,
    InvalidFlag,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::MissingMandatoryField => "missing_mandatory_field",
            FailureCategory::TypeMismatch => "type_mismatch",
            FailureCategory::InvalidCode => "invalid_code",
            FailureCategory::InvalidFlag => "invalid_flag",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a code failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeProblem {
    /// Cell is absent.
    Missing,
    /// No code-sheet row has this Code.
    Unknown,
    /// First matching code-sheet row has another Type.
    WrongType(CodeType),
}

/// First violation found by the validation pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("row {row}: mandatory field '{column}' is missing")]
    MissingMandatoryField { row: usize, column: &'static str },

    #[error("row {row}: column '{column}' expects {expected}, found {found}")]
    TypeMismatch {
        row: usize,
        column: &'static str,
        expected: ExpectedType,
        found: String,
    },

    #[error("row {row}: '{value}' is not a valid {column} code ({problem:?})")]
    InvalidCode {
        row: usize,
        column: &'static str,
        value: String,
        problem: CodeProblem,
    },

    #[error("row {row}: Active Flag must be Yes or No, found '{value}'")]
    InvalidFlag { row: usize, value: String },
}

impl ValidationFailure {
    pub fn category(&self) -> FailureCategory {
        match self {
            ValidationFailure::MissingMandatoryField { .. } => FailureCategory::MissingMandatoryField,
            ValidationFailure::TypeMismatch { .. } => FailureCategory::TypeMismatch,
            ValidationFailure::InvalidCode { .. } => FailureCategory::InvalidCode,
            ValidationFailure::InvalidFlag { .. } => FailureCategory::InvalidFlag,
        }
    }

    /// 0-based row at which the violation was found.
    pub fn row(&self) -> usize {
        match self {
            ValidationFailure::MissingMandatoryField { row, .. }
            | ValidationFailure::TypeMismatch { row, .. }
            | ValidationFailure::InvalidCode { row, .. }
            | ValidationFailure::InvalidFlag { row, .. } => *row,
        }
    }
}

/// Type a column was expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Declared(PrimitiveType),
    /// The type sheet has no entry for the column.
    Undeclared,
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedType::Declared(ty) => write!(f, "{}", ty),
            ExpectedType::Undeclared => f.write_str("a declared type"),
        }
    }
}

pub type ValidationResult = Result<(), ValidationFailure>;

/// Run all four checks in order, stopping at the first failure.
///
/// Only [`validate_codes`] mutates the dataset, and only once the first two
/// checks have passed.
pub fn validate(dataset: &mut Dataset, lookup: &LookupTable) -> ValidationResult {
    validate_mandatory_fields(dataset)?;
    validate_data_types(dataset, lookup)?;
    validate_codes(dataset, lookup)?;
    validate_active_flag(dataset)?;
    debug!(rows = dataset.len(), "all validation checks passed");
    Ok(())
}

/// Every row must carry D1, Country, Currency and Company.
pub fn validate_mandatory_fields(dataset: &Dataset) -> ValidationResult {
    for (index, row) in dataset.rows.iter().enumerate() {
        for column in columns::MANDATORY {
            if cell(row, column).is_none() {
                return Err(ValidationFailure::MissingMandatoryField { row: index, column });
            }
        }
    }
    Ok(())
}

/// Present values of the typed columns must match the type sheet.
pub fn validate_data_types(dataset: &Dataset, lookup: &LookupTable) -> ValidationResult {
    // Resolved once for the run
    let expected: Vec<(&'static str, Option<PrimitiveType>)> = columns::TYPED
        .iter()
        .map(|&column| (column, lookup.expected_type(column)))
        .collect();

    for (index, row) in dataset.rows.iter().enumerate() {
        for &(column, declared) in &expected {
            let Some(value) = cell(row, column) else {
                continue;
            };
            let conforms = declared.is_some_and(|ty| ty.matches(value));
            if !conforms {
                return Err(ValidationFailure::TypeMismatch {
                    row: index,
                    column,
                    expected: declared.map_or(ExpectedType::Undeclared, ExpectedType::Declared),
                    found: describe(value),
                });
            }
        }
    }
    Ok(())
}

/// Country, Currency and Company must resolve to a code of the same Type.
///
/// Resolution takes the first code-sheet row with a matching Code, then
/// compares its Type with the column. A resolved Country writes the code's
/// Name into "Country name".
pub fn validate_codes(dataset: &mut Dataset, lookup: &LookupTable) -> ValidationResult {
    let mut wrote_country_name = false;

    for (index, row) in dataset.rows.iter_mut().enumerate() {
        for column in columns::CODED {
            let Some(value) = cell(row, column).map(cell_text) else {
                return Err(ValidationFailure::InvalidCode {
                    row: index,
                    column,
                    value: String::new(),
                    problem: CodeProblem::Missing,
                });
            };

            let Some(entry) = lookup.resolve(&value) else {
                return Err(ValidationFailure::InvalidCode {
                    row: index,
                    column,
                    value,
                    problem: CodeProblem::Unknown,
                });
            };

            if entry.code_type.as_str() != column {
                return Err(ValidationFailure::InvalidCode {
                    row: index,
                    column,
                    value,
                    problem: CodeProblem::WrongType(entry.code_type),
                });
            }

            if entry.code_type == CodeType::Country {
                let name = entry.name.clone().map_or(Value::Null, Value::String);
                row.insert(columns::COUNTRY_NAME.to_string(), name);
                wrote_country_name = true;
            }
        }
    }

    if wrote_country_name {
        dataset.ensure_column(columns::COUNTRY_NAME);
    }
    Ok(())
}

/// "Active Flag" is optional, but when present must be exactly "Yes" or "No".
pub fn validate_active_flag(dataset: &Dataset) -> ValidationResult {
    for (index, row) in dataset.rows.iter().enumerate() {
        let Some(value) = cell(row, columns::ACTIVE_FLAG) else {
            continue;
        };
        let allowed = value
            .as_str()
            .is_some_and(|flag| ACTIVE_FLAG_VALUES.contains(&flag));
        if !allowed {
            return Err(ValidationFailure::InvalidFlag {
                row: index,
                value: cell_text(value),
            });
        }
    }
    Ok(())
}

fn describe(value: &Value) -> String {
    match PrimitiveType::of(value) {
        Some(ty) => format!("{} '{}'", ty, cell_text(value)),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::CodeEntry;
    use serde_json::{json, Map};
    use std::collections::BTreeMap;

    fn dataset(columns: &[&str], rows: Vec<Value>) -> Dataset {
        Dataset::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.into_iter()
                .map(|r| r.as_object().cloned().unwrap_or_else(Map::new))
                .collect(),
        )
    }

    fn lookup() -> LookupTable {
        let types = BTreeMap::from([
            ("Deal Name".to_string(), PrimitiveType::Str),
            ("D1".to_string(), PrimitiveType::Float),
            ("D2".to_string(), PrimitiveType::Float),
            ("D3".to_string(), PrimitiveType::Float),
            ("D4".to_string(), PrimitiveType::Float),
            ("D5".to_string(), PrimitiveType::Int),
            ("Active Flag".to_string(), PrimitiveType::Str),
            ("Country".to_string(), PrimitiveType::Str),
            ("Currency".to_string(), PrimitiveType::Str),
            ("Company".to_string(), PrimitiveType::Str),
        ]);
        let code = |code: &str, code_type, name: Option<&str>| CodeEntry {
            code: code.into(),
            code_type,
            name: name.map(String::from),
        };
        LookupTable::new(
            types,
            vec![
                code("USA", CodeType::Country, Some("United States")),
                code("GBR", CodeType::Country, Some("United Kingdom")),
                code("USD", CodeType::Currency, Some("US Dollar")),
                code("GBP", CodeType::Currency, None),
                code("FB", CodeType::Company, Some("Facebook")),
            ],
        )
    }

    fn valid_row() -> Value {
        json!({ "D1": 12.59, "Country": "USA", "Currency": "USD", "Company": "FB" })
    }

    const CORE: [&str; 4] = ["D1", "Country", "Currency", "Company"];

    #[test]
    fn test_mandatory_fields_present() {
        let ds = dataset(&CORE, vec![valid_row()]);
        assert!(validate_mandatory_fields(&ds).is_ok());
    }

    #[test]
    fn test_mandatory_column_missing() {
        let ds = dataset(
            &["D1", "Currency", "Company"],
            vec![json!({ "D1": 12.59, "Currency": "USD", "Company": "FB" })],
        );
        let failure = validate_mandatory_fields(&ds).unwrap_err();
        assert_eq!(
            failure,
            ValidationFailure::MissingMandatoryField { row: 0, column: "Country" }
        );
    }

    #[test]
    fn test_mandatory_value_missing_in_later_row() {
        let ds = dataset(
            &CORE,
            vec![
                valid_row(),
                json!({ "D1": null, "Country": "USA", "Currency": "USD", "Company": "FB" }),
            ],
        );
        let failure = validate_mandatory_fields(&ds).unwrap_err();
        assert_eq!(failure.category(), FailureCategory::MissingMandatoryField);
        assert_eq!(failure.row(), 1);
    }

    #[test]
    fn test_data_types_valid() {
        let ds = dataset(&CORE, vec![valid_row()]);
        assert!(validate_data_types(&ds, &lookup()).is_ok());
    }

    #[test]
    fn test_data_types_mismatch() {
        let ds = dataset(
            &CORE,
            vec![json!({ "D1": 12.59, "Country": 1234, "Currency": "USD", "Company": "FB" })],
        );
        let failure = validate_data_types(&ds, &lookup()).unwrap_err();
        assert!(matches!(
            failure,
            ValidationFailure::TypeMismatch { column: "Country", expected: ExpectedType::Declared(PrimitiveType::Str), .. }
        ));

        let ds = dataset(
            &CORE,
            vec![json!({ "D1": 12.59, "Country": "USA", "Currency": "USD", "Company": true })],
        );
        assert_eq!(
            validate_data_types(&ds, &lookup()).unwrap_err().category(),
            FailureCategory::TypeMismatch
        );
    }

    #[test]
    fn test_int_is_not_float() {
        let ds = dataset(
            &CORE,
            vec![json!({ "D1": 12, "Country": "USA", "Currency": "USD", "Company": "FB" })],
        );
        assert!(validate_data_types(&ds, &lookup()).is_err());
    }

    #[test]
    fn test_absent_values_skip_type_check() {
        let ds = dataset(
            &["D1", "D2", "Deal Name"],
            vec![json!({ "D1": 1.5, "D2": null })],
        );
        assert!(validate_data_types(&ds, &lookup()).is_ok());
    }

    #[test]
    fn test_undeclared_column_fails_type_check() {
        let mut table = lookup();
        table.types.remove("D3");
        let ds = dataset(&["D3"], vec![json!({ "D3": 1.0 })]);
        let failure = validate_data_types(&ds, &table).unwrap_err();
        assert!(matches!(
            failure,
            ValidationFailure::TypeMismatch { column: "D3", expected: ExpectedType::Undeclared, .. }
        ));
    }

    #[test]
    fn test_codes_valid_and_country_name_filled() {
        let mut ds = dataset(&CORE, vec![valid_row()]);
        assert!(validate_codes(&mut ds, &lookup()).is_ok());
        assert_eq!(ds.rows[0]["Country name"], json!("United States"));
        assert!(ds.has_column("Country name"));
    }

    #[test]
    fn test_unknown_country_code() {
        let mut ds = dataset(
            &CORE,
            vec![json!({ "D1": 12.59, "Country": "XYZ", "Currency": "USD", "Company": "FB" })],
        );
        let failure = validate_codes(&mut ds, &lookup()).unwrap_err();
        assert!(matches!(
            failure,
            ValidationFailure::InvalidCode { column: "Country", problem: CodeProblem::Unknown, .. }
        ));
    }

    #[test]
    fn test_unknown_currency_code() {
        let mut ds = dataset(
            &CORE,
            vec![json!({ "D1": 12.59, "Country": "USA", "Currency": "ABC", "Company": "FB" })],
        );
        assert_eq!(
            validate_codes(&mut ds, &lookup()).unwrap_err().category(),
            FailureCategory::InvalidCode
        );
    }

    #[test]
    fn test_code_with_wrong_type() {
        let mut ds = dataset(
            &CORE,
            vec![json!({ "D1": 12.59, "Country": "USA", "Currency": "USA", "Company": "FB" })],
        );
        let failure = validate_codes(&mut ds, &lookup()).unwrap_err();
        assert_eq!(
            failure,
            ValidationFailure::InvalidCode {
                row: 0,
                column: "Currency",
                value: "USA".into(),
                problem: CodeProblem::WrongType(CodeType::Country),
            }
        );
    }

    #[test]
    fn test_code_collision_resolves_to_first_entry() {
        let mut table = lookup();
        table.codes.insert(
            0,
            CodeEntry {
                code: "USD".into(),
                code_type: CodeType::Country,
                name: None,
            },
        );
        let mut ds = dataset(&CORE, vec![valid_row()]);
        assert!(validate_codes(&mut ds, &table).is_err());
    }

    #[test]
    fn test_active_flag_values() {
        for flag in [json!("Yes"), json!("No"), Value::Null] {
            let ds = dataset(&["Active Flag"], vec![json!({ "Active Flag": flag })]);
            assert!(validate_active_flag(&ds).is_ok(), "{flag} should pass");
        }

        for flag in [json!("Yo"), json!("true"), json!("yes"), json!(1)] {
            let ds = dataset(&["Active Flag"], vec![json!({ "Active Flag": flag })]);
            let failure = validate_active_flag(&ds).unwrap_err();
            assert_eq!(failure.category(), FailureCategory::InvalidFlag, "{flag} should fail");
        }
    }

    #[test]
    fn test_active_flag_column_absent() {
        let ds = dataset(&["D2"], vec![json!({ "D2": 123.9 })]);
        assert!(validate_active_flag(&ds).is_ok());
    }

    #[test]
    fn test_pipeline_stops_at_first_failure() {
        // Missing Company and an unknown country: only the mandatory check reports
        let mut ds = dataset(
            &["D1", "Country", "Currency"],
            vec![json!({ "D1": 12.59, "Country": "XYZ", "Currency": "USD" })],
        );
        let failure = validate(&mut ds, &lookup()).unwrap_err();
        assert_eq!(failure.category(), FailureCategory::MissingMandatoryField);
        assert!(!ds.has_column("Country name"));
    }

    #[test]
    fn test_type_failure_prevents_code_enrichment() {
        let mut ds = dataset(
            &CORE,
            vec![json!({ "D1": "high", "Country": "USA", "Currency": "USD", "Company": "FB" })],
        );
        let failure = validate(&mut ds, &lookup()).unwrap_err();
        assert_eq!(failure.category(), FailureCategory::TypeMismatch);
        assert!(ds.rows[0].get("Country name").is_none());
    }

    #[test]
    fn test_pipeline_passes_valid_dataset() {
        let mut ds = dataset(
            &["Deal Name", "D1", "Active Flag", "Country", "Currency", "Company"],
            vec![
                json!({ "Deal Name": "Alpha", "D1": 1.5, "Active Flag": "Yes", "Country": "USA", "Currency": "USD", "Company": "FB" }),
                json!({ "Deal Name": "Beta", "D1": 2.5, "Active Flag": null, "Country": "GBR", "Currency": "GBP", "Company": "FB" }),
            ],
        );
        assert!(validate(&mut ds, &lookup()).is_ok());
        assert_eq!(ds.rows[1]["Country name"], json!("United Kingdom"));
    }

    #[test]
    fn test_failure_message() {
        let failure = ValidationFailure::InvalidFlag { row: 3, value: "Yo".into() };
        let msg = failure.to_string();
        assert!(msg.contains("row 3"));
        assert!(msg.contains("Yo"));
        assert_eq!(failure.category().to_string(), "invalid_flag");
    }
}
