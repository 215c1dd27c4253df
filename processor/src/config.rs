//! Run configuration.
//!
//! A run is described by a JSON event carrying seven required string keys:
//!
//! ```json
//! {
//!   "input_dir": "incoming",
//!   "input_file": "Data.csv",
//!   "lookup_dir": "lookup",
//!   "lookup_file": "Lookup.xlsx",
//!   "error_dir": "error_dir",
//!   "csv_output_dir": "output_file_csv",
//!   "parquet_output_dir": "output_file_parquet"
//! }
//! ```
//!
//! An optional `delimiter` (one character) disables delimiter detection.
//! [`RunConfig::from_event`] is the single validation step; it reports the
//! first missing key by name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

/// Keys every invocation event must carry, in reporting order.
pub const REQUIRED_KEYS: [&str; 7] = [
    "input_dir",
    "input_file",
    "lookup_dir",
    "lookup_file",
    "error_dir",
    "csv_output_dir",
    "parquet_output_dir",
];

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub input_file: String,
    pub lookup_dir: PathBuf,
    pub lookup_file: String,
    pub error_dir: PathBuf,
    pub csv_output_dir: PathBuf,
    pub parquet_output_dir: PathBuf,
    pub delimiter: Option<char>,
}

impl RunConfig {
    /// Validate an invocation event.
    pub fn from_event(event: &Value) -> ConfigResult<Self> {
        let object = event.as_object().ok_or(ConfigError::NotAnObject)?;

        for key in REQUIRED_KEYS {
            required(object, key)?;
        }

        let delimiter = match object.get("delimiter") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Some(c),
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: "delimiter",
                            message: format!("expected a single ASCII character, got '{}'", s),
                        })
                    }
                }
            }
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    key: "delimiter",
                    message: "must be a string".to_string(),
                })
            }
        };

        Ok(Self {
            input_dir: required(object, "input_dir")?.into(),
            input_file: required(object, "input_file")?.to_string(),
            lookup_dir: required(object, "lookup_dir")?.into(),
            lookup_file: required(object, "lookup_file")?.to_string(),
            error_dir: required(object, "error_dir")?.into(),
            csv_output_dir: required(object, "csv_output_dir")?.into(),
            parquet_output_dir: required(object, "parquet_output_dir")?.into(),
            delimiter,
        })
    }

    /// Read and validate an event file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Self::from_event(&read_event(path)?)
    }

    pub fn input_path(&self) -> PathBuf {
        self.input_dir.join(&self.input_file)
    }

    pub fn lookup_path(&self) -> PathBuf {
        self.lookup_dir.join(&self.lookup_file)
    }

    /// Directories created before processing starts.
    pub fn output_dirs(&self) -> [&Path; 3] {
        [
            self.error_dir.as_path(),
            self.csv_output_dir.as_path(),
            self.parquet_output_dir.as_path(),
        ]
    }
}

/// Read an event file as raw JSON, without validating keys.
pub fn read_event<P: AsRef<Path>>(path: P) -> ConfigResult<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn required<'a>(object: &'a Map<String, Value>, key: &'static str) -> ConfigResult<&'a str> {
    match object.get(key) {
        None | Some(Value::Null) => Err(ConfigError::MissingKey(key)),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(ConfigError::InvalidValue {
            key,
            message: "must not be empty".to_string(),
        }),
        Some(_) => Err(ConfigError::InvalidValue {
            key,
            message: "must be a string".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> Value {
        json!({
            "input_dir": "test/fixture",
            "input_file": "Data.csv",
            "lookup_dir": "lookup",
            "lookup_file": "Lookup.xlsx",
            "error_dir": "error_dir",
            "csv_output_dir": "output_file_csv/",
            "parquet_output_dir": "output_file_parquet/"
        })
    }

    #[test]
    fn test_valid_event() {
        let config = RunConfig::from_event(&event()).unwrap();
        assert_eq!(config.input_path(), PathBuf::from("test/fixture/Data.csv"));
        assert_eq!(config.lookup_path(), PathBuf::from("lookup/Lookup.xlsx"));
        assert_eq!(config.delimiter, None);
    }

    #[test]
    fn test_each_missing_key_is_named() {
        for key in REQUIRED_KEYS {
            let mut ev = event();
            ev.as_object_mut().unwrap().remove(key);
            let err = RunConfig::from_event(&ev).unwrap_err();
            assert!(matches!(err, ConfigError::MissingKey(k) if k == key), "{key}");
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn test_first_missing_key_reported() {
        let err = RunConfig::from_event(&json!({ "input_dir": "in" })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("input_file")));
    }

    #[test]
    fn test_non_string_value() {
        let mut ev = event();
        ev["error_dir"] = json!(42);
        let err = RunConfig::from_event(&ev).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "error_dir", .. }));
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            RunConfig::from_event(&json!(["input_dir"])),
            Err(ConfigError::NotAnObject)
        ));
    }

    #[test]
    fn test_delimiter() {
        let mut ev = event();
        ev["delimiter"] = json!(";");
        assert_eq!(RunConfig::from_event(&ev).unwrap().delimiter, Some(';'));

        ev["delimiter"] = json!(";;");
        assert!(RunConfig::from_event(&ev).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        fs::write(&path, event().to_string()).unwrap();
        assert_eq!(
            RunConfig::from_file(&path).unwrap(),
            RunConfig::from_event(&event()).unwrap()
        );

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(RunConfig::from_file(&path), Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_output_dirs() {
        let config = RunConfig::from_event(&event()).unwrap();
        let dirs = config.output_dirs();
        assert_eq!(dirs[0], Path::new("error_dir"));
        assert_eq!(dirs[2], Path::new("output_file_parquet/"));
    }
}
