//! Domain models for the deal-file pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Dataset`] - Parsed deal file: ordered columns and ordered rows
//! - [`PrimitiveType`] - Closed set of primitive types a column may declare
//! - [`CodeType`] - Classification of a lookup code (Country, Currency, Company)
//! - [`columns`] - Business column names shared by validators and the output generator
//!
//! Rows are JSON objects, one key per present cell. A missing key or a
//! `null` value is an absent cell.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Column Names
// =============================================================================

/// Business column names.
pub mod columns {
    pub const ROW_NO: &str = "RowNo";
    pub const DEAL_NAME: &str = "Deal Name";
    pub const D1: &str = "D1";
    pub const D2: &str = "D2";
    pub const D3: &str = "D3";
    pub const D4: &str = "D4";
    pub const D5: &str = "D5";
    pub const ACTIVE_FLAG: &str = "Active Flag";
    pub const COUNTRY: &str = "Country";
    pub const CURRENCY: &str = "Currency";
    pub const COMPANY: &str = "Company";
    pub const COUNTRY_NAME: &str = "Country name";
    pub const AS_OF_DATE: &str = "AsOfDate";
    pub const PROCESS_IDENTIFIER: &str = "ProcessIdentifier";
    pub const ROW_HASH: &str = "Rowhash";

    /// Columns every row must carry.
    pub const MANDATORY: [&str; 4] = [D1, COUNTRY, CURRENCY, COMPANY];

    /// Columns whose values are checked against the type sheet.
    pub const TYPED: [&str; 10] = [
        DEAL_NAME,
        D1,
        D2,
        D3,
        D4,
        D5,
        ACTIVE_FLAG,
        COUNTRY,
        CURRENCY,
        COMPANY,
    ];

    /// Columns resolved against the code sheet.
    pub const CODED: [&str; 3] = [COUNTRY, CURRENCY, COMPANY];

    /// Final projection of an enriched row.
    pub const OUTPUT: [&str; 15] = [
        ROW_NO,
        DEAL_NAME,
        D1,
        D2,
        D3,
        D4,
        D5,
        ACTIVE_FLAG,
        COUNTRY,
        CURRENCY,
        COMPANY,
        COUNTRY_NAME,
        AS_OF_DATE,
        PROCESS_IDENTIFIER,
        ROW_HASH,
    ];
}

// =============================================================================
// Primitive Types
// =============================================================================

/// Primitive type a business column may declare in the type sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Str,
    Int,
    Float,
    Bool,
}

impl PrimitiveType {
    /// Name used in the type sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Str => "str",
            PrimitiveType::Int => "int",
            PrimitiveType::Float => "float",
            PrimitiveType::Bool => "bool",
        }
    }

    /// Whether a present cell value has this runtime type.
    ///
    /// Integers and floats are distinct: `12` is not a float and `12.0`
    /// is not an int. Booleans are never numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (PrimitiveType::Str, Value::String(_)) => true,
            (PrimitiveType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (PrimitiveType::Float, Value::Number(n)) => n.is_f64(),
            (PrimitiveType::Bool, Value::Bool(_)) => true,
            _ => false,
        }
    }

    /// Runtime type of a present cell value, if it is a primitive.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(PrimitiveType::Str),
            Value::Number(n) if n.is_f64() => Some(PrimitiveType::Float),
            Value::Number(_) => Some(PrimitiveType::Int),
            Value::Bool(_) => Some(PrimitiveType::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimitiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "str" => Ok(PrimitiveType::Str),
            "int" => Ok(PrimitiveType::Int),
            "float" => Ok(PrimitiveType::Float),
            "bool" => Ok(PrimitiveType::Bool),
            other => Err(other.to_string()),
        }
    }
}

// =============================================================================
// Code Types
// =============================================================================

/// Classification of a lookup code.
///
/// The variant names double as the dataset column each code is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    Country,
    Currency,
    Company,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Country => columns::COUNTRY,
            CodeType::Currency => columns::CURRENCY,
            CodeType::Company => columns::COMPANY,
        }
    }

    /// Code type validated by a dataset column, if any.
    pub fn for_column(column: &str) -> Option<Self> {
        column.parse().ok()
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Country" => Ok(CodeType::Country),
            "Currency" => Ok(CodeType::Currency),
            "Company" => Ok(CodeType::Company),
            other => Err(other.to_string()),
        }
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// A parsed deal file.
///
/// `columns` keeps header order; columns appended by enrichment are pushed
/// at the end. Each row is a JSON object keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Register a column if it is not already known.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }
}

/// Present value of a cell: `None` when the key is missing or null.
pub fn cell<'a>(row: &'a Map<String, Value>, column: &str) -> Option<&'a Value> {
    row.get(column).filter(|v| !v.is_null())
}

/// Canonical text of a present cell, as it would be written to CSV.
///
/// Floats always carry a fractional part (`12.0`), booleans are
/// capitalised (`True`/`False`).
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => format!("{:.1}", f),
            _ => n.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_type_from_name() {
        assert_eq!("str".parse::<PrimitiveType>(), Ok(PrimitiveType::Str));
        assert_eq!(" float ".parse::<PrimitiveType>(), Ok(PrimitiveType::Float));
        assert!("decimal".parse::<PrimitiveType>().is_err());
    }

    #[test]
    fn test_primitive_type_matches() {
        assert!(PrimitiveType::Str.matches(&json!("USA")));
        assert!(PrimitiveType::Int.matches(&json!(12)));
        assert!(!PrimitiveType::Int.matches(&json!(12.5)));
        assert!(PrimitiveType::Float.matches(&json!(12.59)));
        assert!(!PrimitiveType::Float.matches(&json!(12)));
        assert!(PrimitiveType::Bool.matches(&json!(true)));
        assert!(!PrimitiveType::Int.matches(&json!(true)));
        assert!(!PrimitiveType::Str.matches(&json!(1234)));
    }

    #[test]
    fn test_code_type_for_column() {
        assert_eq!(CodeType::for_column("Country"), Some(CodeType::Country));
        assert_eq!(CodeType::for_column("Currency"), Some(CodeType::Currency));
        assert_eq!(CodeType::for_column("D1"), None);
    }

    #[test]
    fn test_cell_absent_when_null() {
        let row = json!({ "D1": null, "Country": "USA" });
        let row = row.as_object().unwrap();
        assert!(cell(row, "D1").is_none());
        assert!(cell(row, "D2").is_none());
        assert_eq!(cell(row, "Country"), Some(&json!("USA")));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!(12.59)), "12.59");
        assert_eq!(cell_text(&json!(12.0)), "12.0");
        assert_eq!(cell_text(&json!(7)), "7");
        assert_eq!(cell_text(&json!(false)), "False");
        assert_eq!(cell_text(&json!("FB")), "FB");
    }

    #[test]
    fn test_ensure_column_is_idempotent() {
        let mut ds = Dataset::new(vec!["D1".into()], vec![]);
        ds.ensure_column("Country name");
        ds.ensure_column("Country name");
        assert_eq!(ds.columns, vec!["D1", "Country name"]);
    }
}
