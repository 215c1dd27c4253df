//! Enrich validated deal rows into the published layout.
//!
//! # Architecture
//!
//! ```text
//! Validated dataset (any columns)      →  Enriched rows (fixed layout)
//! ┌──────────────────────────────┐       ┌──────────────────────────────────────┐
//! │ Deal Name, D1, Country, ...  │       │ RowNo, Deal Name, D1 .. D5,          │
//! │ Country name (from lookup)   │  →    │ Active Flag, Country, Currency,      │
//! │                              │       │ Company, Country name, AsOfDate,     │
//! └──────────────────────────────┘       │ ProcessIdentifier, Rowhash           │
//!                                        └──────────────────────────────────────┘
//! ```
//!
//! Projection is lenient: business columns missing from the source are
//! emitted as absent values. Extra source columns are dropped, but still
//! feed the row hash.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::models::{cell, cell_text, columns, Dataset, PrimitiveType};

/// Lineage tag stamped on every published row.
pub const PROCESS_IDENTIFIER: &str = "ICG";

/// Output columns carried over from the validated dataset, in output order.
pub const CARRIED_COLUMNS: [&str; 11] = [
    columns::DEAL_NAME,
    columns::D1,
    columns::D2,
    columns::D3,
    columns::D4,
    columns::D5,
    columns::ACTIVE_FLAG,
    columns::COUNTRY,
    columns::CURRENCY,
    columns::COMPANY,
    columns::COUNTRY_NAME,
];

/// Columns written by the pipeline itself, never part of the row hash.
const DERIVED_COLUMNS: [&str; 5] = [
    columns::ROW_NO,
    columns::COUNTRY_NAME,
    columns::AS_OF_DATE,
    columns::PROCESS_IDENTIFIER,
    columns::ROW_HASH,
];

/// A row in the published layout.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row_no: i64,
    /// Values of [`CARRIED_COLUMNS`], `None` when absent.
    pub carried: Vec<Option<Value>>,
    pub as_of_date: NaiveDateTime,
    pub process_identifier: &'static str,
    pub rowhash: i64,
}

impl EnrichedRow {
    /// Value of a carried column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        CARRIED_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.carried[i].as_ref())
    }
}

/// All enriched rows of one run plus the type of each carried column.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDataset {
    pub rows: Vec<EnrichedRow>,
    /// Type of each [`CARRIED_COLUMNS`] entry, `None` when every value is absent.
    pub carried_types: Vec<Option<PrimitiveType>>,
    pub as_of_date: NaiveDateTime,
}

impl EnrichedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Enrich a validated dataset, stamping every row with `as_of_date`.
pub fn enrich(dataset: &Dataset, as_of_date: NaiveDateTime) -> EnrichedDataset {
    let hashed_columns: Vec<&str> = dataset
        .columns
        .iter()
        .map(String::as_str)
        .filter(|c| !DERIVED_COLUMNS.contains(c))
        .collect();

    let rows = dataset
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| EnrichedRow {
            row_no: index as i64,
            carried: CARRIED_COLUMNS
                .iter()
                .map(|column| cell(row, column).cloned())
                .collect(),
            as_of_date,
            process_identifier: PROCESS_IDENTIFIER,
            rowhash: row_hash(row, &hashed_columns),
        })
        .collect::<Vec<_>>();

    let carried_types = (0..CARRIED_COLUMNS.len())
        .map(|i| column_type(rows.iter().filter_map(|r| r.carried[i].as_ref())))
        .collect();

    EnrichedDataset {
        rows,
        carried_types,
        as_of_date,
    }
}

/// Stable fingerprint of a row's values over `columns`, in that order.
///
/// Each value is encoded as a type tag followed by its canonical text and a
/// unit separator, hashed with SHA-256, and the first 8 digest bytes are
/// read as a big-endian `i64`. Identical values give identical hashes
/// across runs and builds.
pub fn row_hash(row: &Map<String, Value>, columns: &[&str]) -> i64 {
    let mut hasher = Sha256::new();
    for column in columns {
        let (tag, text) = match cell(row, column) {
            None => (0u8, String::new()),
            Some(value) => {
                let tag = match PrimitiveType::of(value) {
                    Some(PrimitiveType::Str) => 1,
                    Some(PrimitiveType::Int) => 2,
                    Some(PrimitiveType::Float) => 3,
                    Some(PrimitiveType::Bool) => 4,
                    None => 5,
                };
                (tag, cell_text(value))
            }
        };
        hasher.update([tag]);
        hasher.update(text.as_bytes());
        hasher.update([0x1F]);
    }

    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(head)
}

/// Common type of a column's present values; mixed columns are strings.
fn column_type<'a, I>(values: I) -> Option<PrimitiveType>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut found: Option<PrimitiveType> = None;
    for value in values {
        let ty = PrimitiveType::of(value).unwrap_or(PrimitiveType::Str);
        found = match found {
            None => Some(ty),
            Some(prev) if prev == ty => Some(prev),
            Some(_) => return Some(PrimitiveType::Str),
        };
    }
    found
}
