//! Delimited-file loader with encoding and delimiter auto-detection.
//!
//! Turns CSV bytes into a [`Dataset`]: header order is kept, empty cells are
//! absent, and each column gets one inferred primitive type so that every
//! present value in a column has the same runtime type. No content
//! validation happens here.

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{DatasetLoadError, DatasetResult};
use crate::models::{Dataset, PrimitiveType};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed dataset
    pub dataset: Dataset,
    /// Detected encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Inferred type per column, `None` when a column has no present value
    pub column_types: Vec<Option<PrimitiveType>>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// A UTF-8 byte order mark is dropped. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to `,` for single-column files.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Load a deal file from disk with auto-detection.
///
/// `delimiter` overrides detection when given.
pub fn load_dataset<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> DatasetResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| DatasetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bytes(&bytes, delimiter)
}

/// Parse CSV bytes with auto-detection of encoding and (optionally) delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> DatasetResult<ParseResult> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DatasetLoadError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    debug!(%encoding, delimiter = %delimiter.escape_default(), "decoded dataset");

    let (dataset, column_types) = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        dataset,
        encoding,
        delimiter,
        column_types,
    })
}

/// Parse CSV text with an explicit delimiter.
///
/// Returns the dataset and the inferred type of each column.
pub fn parse_str(
    content: &str,
    delimiter: char,
) -> DatasetResult<(Dataset, Vec<Option<PrimitiveType>>)> {
    if !delimiter.is_ascii() {
        return Err(DatasetLoadError::InvalidDelimiter(delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(DatasetLoadError::NoHeaders);
    }

    let mut seen = HashSet::new();
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(DatasetLoadError::DuplicateColumn(header.clone()));
        }
    }

    // Raw text cells, row-major; None is an absent cell
    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();

    for record in reader.records() {
        let record = record?;

        // Whitespace-only line; a row of empty fields is kept
        if headers.len() > 1 && record.len() == 1 && record[0].is_empty() {
            continue;
        }

        if record.len() > headers.len() {
            return Err(DatasetLoadError::TooManyFields {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: headers.len(),
                found: record.len(),
            });
        }

        let cells = (0..headers.len())
            .map(|i| record.get(i).filter(|s| !s.is_empty()).map(str::to_string))
            .collect();
        raw_rows.push(cells);
    }

    let column_types: Vec<Option<PrimitiveType>> = (0..headers.len())
        .map(|i| infer_column_type(raw_rows.iter().filter_map(|r| r[i].as_deref())))
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|cells| {
            let mut row = Map::new();
            for ((header, raw), ty) in headers.iter().zip(cells).zip(&column_types) {
                let value = match (raw, ty) {
                    (Some(text), Some(ty)) => convert(&text, *ty),
                    _ => Value::Null,
                };
                row.insert(header.clone(), value);
            }
            row
        })
        .collect();

    Ok((Dataset::new(headers, rows), column_types))
}

/// Infer one type for a column from its present cells.
///
/// Integer beats float beats bool beats string; `None` when no cell is present.
pub fn infer_column_type<'a, I>(cells: I) -> Option<PrimitiveType>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut any = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;

    for text in cells {
        any = true;
        all_int &= text.parse::<i64>().is_ok();
        all_float &= parse_float(text).is_some();
        all_bool &= parse_bool(text).is_some();
        if !(all_int || all_float || all_bool) {
            return Some(PrimitiveType::Str);
        }
    }

    if !any {
        None
    } else if all_int {
        Some(PrimitiveType::Int)
    } else if all_float {
        Some(PrimitiveType::Float)
    } else if all_bool {
        Some(PrimitiveType::Bool)
    } else {
        Some(PrimitiveType::Str)
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Convert a present cell to its column's type.
fn convert(text: &str, ty: PrimitiveType) -> Value {
    let converted = match ty {
        PrimitiveType::Int => text.parse::<i64>().ok().map(Value::from),
        PrimitiveType::Float => parse_float(text).and_then(Number::from_f64).map(Value::Number),
        PrimitiveType::Bool => parse_bool(text).map(Value::Bool),
        PrimitiveType::Str => None,
    };
    converted.unwrap_or_else(|| Value::String(text.to_string()))
}
