//! Reference lookup repository.
//!
//! Loads the two-sheet lookup used by validation:
//!
//! - sheet 0 (type sheet): header row of business column names, first data
//!   row holding the primitive type name of each column
//! - sheet 1 (code sheet): `Code`, `Type`, `Name` rows
//!
//! Workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read with
//! calamine. A JSON document with the same content is accepted too:
//!
//! ```json
//! {
//!   "types": { "D1": "float", "Country": "str" },
//!   "codes": [{ "code": "USA", "type": "Country", "name": "United States" }]
//! }
//! ```
//!
//! Nothing is cached; every run loads its own [`LookupTable`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LookupLoadError, LookupResult};
use crate::models::{CodeType, PrimitiveType};

/// One row of the code sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub code: String,
    #[serde(rename = "type")]
    pub code_type: CodeType,
    #[serde(default)]
    pub name: Option<String>,
}

/// Parsed lookup: declared column types plus code definitions in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    pub types: BTreeMap<String, PrimitiveType>,
    pub codes: Vec<CodeEntry>,
}

impl LookupTable {
    pub fn new(types: BTreeMap<String, PrimitiveType>, codes: Vec<CodeEntry>) -> Self {
        Self { types, codes }
    }

    /// Declared type of a business column.
    pub fn expected_type(&self, column: &str) -> Option<PrimitiveType> {
        self.types.get(column).copied()
    }

    /// First code-sheet entry whose Code equals `code`, whatever its Type.
    pub fn resolve(&self, code: &str) -> Option<&CodeEntry> {
        self.codes.iter().find(|e| e.code == code)
    }

    /// Codes listed under more than one Type, with the Types in sheet order.
    ///
    /// [`Self::resolve`] only ever sees the first of them.
    pub fn collisions(&self) -> Vec<(&str, Vec<CodeType>)> {
        let mut by_code: Vec<(&str, Vec<CodeType>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for entry in &self.codes {
            let slot = *index.entry(entry.code.as_str()).or_insert_with(|| {
                by_code.push((entry.code.as_str(), Vec::new()));
                by_code.len() - 1
            });
            let types = &mut by_code[slot].1;
            if !types.contains(&entry.code_type) {
                types.push(entry.code_type);
            }
        }

        by_code.retain(|(_, types)| types.len() > 1);
        by_code
    }

    /// Number of code entries per Type.
    pub fn code_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.codes {
            *counts.entry(entry.code_type.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Load a lookup from `path`, choosing the reader by file extension.
pub fn load_lookup<P: AsRef<Path>>(path: P) -> LookupResult<LookupTable> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let table = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            if !path.is_file() {
                return Err(LookupLoadError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "lookup file not found"),
                });
            }
            load_workbook(path)?
        }
        "json" => {
            let content = fs::read_to_string(path).map_err(|source| LookupLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            from_json_str(&content)?
        }
        other => return Err(LookupLoadError::UnsupportedFormat(other.to_string())),
    };

    info!(
        columns = table.types.len(),
        codes = table.codes.len(),
        "loaded lookup {}",
        path.display()
    );
    for (code, types) in table.collisions() {
        let types: Vec<&str> = types.iter().map(CodeType::as_str).collect();
        warn!(code, types = ?types, "lookup code is listed under several types, first one wins");
    }

    Ok(table)
}

/// Parse a JSON lookup document.
pub fn from_json_str(content: &str) -> LookupResult<LookupTable> {
    Ok(serde_json::from_str(content)?)
}

/// Read sheets 0 and 1 of a workbook.
pub fn load_workbook(path: &Path) -> LookupResult<LookupTable> {
    let mut workbook = open_workbook_auto(path)?;

    let type_sheet = workbook
        .worksheet_range_at(0)
        .ok_or(LookupLoadError::MissingSheet(0))??;
    let code_sheet = workbook
        .worksheet_range_at(1)
        .ok_or(LookupLoadError::MissingSheet(1))??;

    Ok(LookupTable::new(
        parse_type_sheet(&type_sheet)?,
        parse_code_sheet(&code_sheet)?,
    ))
}

/// Text of a cell, `None` for empty cells.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn parse_type_sheet(range: &Range<Data>) -> LookupResult<BTreeMap<String, PrimitiveType>> {
    let mut rows = range.rows();
    let header = rows.next().ok_or(LookupLoadError::EmptyTypeSheet)?;
    let definitions = rows.next().ok_or(LookupLoadError::EmptyTypeSheet)?;

    let mut types = BTreeMap::new();
    for (i, column) in header.iter().enumerate() {
        let Some(column) = cell_text(column) else {
            continue;
        };
        let Some(type_name) = definitions.get(i).and_then(cell_text) else {
            continue;
        };
        let ty = type_name
            .parse::<PrimitiveType>()
            .map_err(|type_name| LookupLoadError::UnknownType {
                column: column.clone(),
                type_name,
            })?;
        types.insert(column, ty);
    }

    Ok(types)
}

fn parse_code_sheet(range: &Range<Data>) -> LookupResult<Vec<CodeEntry>> {
    let mut rows = range.rows();
    let header: Vec<Option<String>> = rows
        .next()
        .ok_or(LookupLoadError::MissingColumn("Code"))?
        .iter()
        .map(cell_text)
        .collect();

    let position = |name: &'static str| {
        header
            .iter()
            .position(|h| h.as_deref() == Some(name))
            .ok_or(LookupLoadError::MissingColumn(name))
    };
    let code_idx = position("Code")?;
    let type_idx = position("Type")?;
    let name_idx = position("Name").ok();

    let mut codes = Vec::new();
    for (offset, row) in rows.enumerate() {
        let Some(code) = row.get(code_idx).and_then(cell_text) else {
            continue;
        };
        // Sheet row number, header is row 1
        let sheet_row = offset + 2;
        let raw_type = row.get(type_idx).and_then(cell_text).unwrap_or_default();
        let code_type = raw_type
            .parse::<CodeType>()
            .map_err(|value| LookupLoadError::UnknownCodeType { row: sheet_row, value })?;
        let name = name_idx.and_then(|i| row.get(i)).and_then(cell_text);

        codes.push(CodeEntry { code, code_type, name });
    }

    Ok(codes)
}
