//! Run dispatcher: load → validate → (reject | enrich + publish).
//!
//! ```text
//! Loading ──▶ Validating ──▶ Enriching ──▶ Publishing ──▶ Done
//!                  │
//!                  └──▶ Failed (input copied to error_dir)
//! ```
//!
//! Load and publish failures are fatal and returned as [`DispatchError`].
//! A validation failure is a normal outcome ([`RunOutcome::Rejected`]) and
//! never reaches the enrichment step.
//!
//! # Example
//!
//! ```rust,ignore
//! use icg_processor::{dispatch, RunConfig, RunOutcome};
//!
//! let config = RunConfig::from_file("event.json")?;
//! match dispatch(&config)?.outcome {
//!     RunOutcome::Published { outputs } => println!("wrote {}", outputs.csv.display()),
//!     RunOutcome::Rejected { failure, .. } => println!("rejected: {}", failure.category()),
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::api::types::RunResponse;
use crate::config::RunConfig;
use crate::error::{DispatchResult, LoadError};
use crate::lookup::{load_lookup, LookupTable};
use crate::models::Dataset;
use crate::output::{ensure_dirs, publish, route_to_error, PublishedOutputs};
use crate::parser::load_dataset;
use crate::transform::enrich::enrich;
use crate::validation::{validate, ValidationFailure};

/// States a run moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loading,
    Validating,
    Failed,
    Enriching,
    Publishing,
    Done,
}

/// Terminal outcome of a run that did not hit a fatal error.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// All checks passed; both outputs were written.
    Published { outputs: PublishedOutputs },
    /// A check failed; the input was copied to the error directory.
    Rejected {
        failure: ValidationFailure,
        error_file: PathBuf,
    },
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub input: PathBuf,
    pub rows: usize,
    /// States visited, in order.
    pub states: Vec<RunState>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn is_published(&self) -> bool {
        matches!(self.outcome, RunOutcome::Published { .. })
    }
}

/// Process one file as described by `config`, stamped with the current time.
pub fn dispatch(config: &RunConfig) -> DispatchResult<RunReport> {
    dispatch_at(config, chrono::Local::now().naive_local())
}

/// Process one file, using `now` as the as-of timestamp and publish date.
pub fn dispatch_at(config: &RunConfig, now: NaiveDateTime) -> DispatchResult<RunReport> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id, file = %config.input_file);
    let _guard = span.enter();

    let mut run = Dispatcher::new(run_id, config.input_path());

    ensure_dirs(config.output_dirs())?;

    // Loading
    let (mut dataset, lookup) = load_inputs(
        &run.input,
        &config.lookup_path(),
        config.delimiter,
    )?;
    run.rows = dataset.len();

    // Validating
    run.transition(RunState::Validating);
    if let Err(failure) = validate(&mut dataset, &lookup) {
        run.transition(RunState::Failed);
        warn!(
            category = %failure.category(),
            row = failure.row(),
            "data validation failed: {}",
            failure
        );
        let error_file = route_to_error(&run.input, &config.error_dir)?;
        return Ok(run.finish(RunOutcome::Rejected { failure, error_file }));
    }

    // Enriching
    run.transition(RunState::Enriching);
    let enriched = enrich(&dataset, now);

    // Publishing
    run.transition(RunState::Publishing);
    let outputs = publish(
        &enriched,
        &config.input_file,
        &config.csv_output_dir,
        &config.parquet_output_dir,
        now.date(),
    )?;

    run.transition(RunState::Done);
    Ok(run.finish(RunOutcome::Published { outputs }))
}

/// Load and validate without writing anything.
///
/// Returns the validated (country-name enriched) dataset, or the first
/// failure.
pub fn check_file(
    input: &Path,
    lookup: &Path,
    delimiter: Option<char>,
) -> Result<Result<Dataset, ValidationFailure>, LoadError> {
    let (mut dataset, lookup) = load_inputs(input, lookup, delimiter)?;
    Ok(validate(&mut dataset, &lookup).map(|()| dataset))
}

/// Strict entry point for a raw event object.
///
/// Configuration problems are reported before any filesystem access.
pub fn dispatch_event(event: &Value) -> DispatchResult<RunReport> {
    let config = RunConfig::from_event(event)?;
    dispatch(&config)
}

/// Tolerant entry point: every outcome becomes a [`RunResponse`].
pub fn handle_event(event: &Value) -> RunResponse {
    match dispatch_event(event) {
        Ok(report) => RunResponse::from(report),
        Err(err) => {
            error!("run aborted: {}", err);
            RunResponse::from(err)
        }
    }
}

fn load_inputs(
    input: &Path,
    lookup: &Path,
    delimiter: Option<char>,
) -> Result<(Dataset, LookupTable), LoadError> {
    let parsed = load_dataset(input, delimiter)?;
    info!(
        rows = parsed.dataset.len(),
        columns = parsed.dataset.columns.len(),
        encoding = %parsed.encoding,
        "loaded dataset {}",
        input.display()
    );
    let lookup = load_lookup(lookup)?;
    Ok((parsed.dataset, lookup))
}

/// Tracks the state of a single run.
struct Dispatcher {
    run_id: Uuid,
    input: PathBuf,
    rows: usize,
    states: Vec<RunState>,
}

impl Dispatcher {
    fn new(run_id: Uuid, input: PathBuf) -> Self {
        debug!(state = ?RunState::Loading, "run state");
        Self {
            run_id,
            input,
            rows: 0,
            states: vec![RunState::Loading],
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.states.last(), to = ?next, "run state");
        self.states.push(next);
    }

    fn finish(self, outcome: RunOutcome) -> RunReport {
        match &outcome {
            RunOutcome::Published { .. } => info!(rows = self.rows, "run complete"),
            RunOutcome::Rejected { failure, .. } => {
                info!(category = %failure.category(), "run rejected")
            }
        }
        RunReport {
            run_id: self.run_id,
            input: self.input,
            rows: self.rows,
            states: self.states,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, DispatchError};
    use crate::validation::FailureCategory;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const LOOKUP: &str = r#"{
        "types": {
            "Deal Name": "str", "D1": "float", "D2": "float", "D3": "float", "D4": "float",
            "D5": "int", "Active Flag": "str", "Country": "str", "Currency": "str", "Company": "str"
        },
        "codes": [
            { "code": "USA", "type": "Country", "name": "United States" },
            { "code": "USD", "type": "Currency", "name": "US Dollar" },
            { "code": "FB", "type": "Company", "name": "Facebook" }
        ]
    }"#;

    fn setup(input: &str) -> (TempDir, RunConfig) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("in")).unwrap();
        fs::create_dir_all(root.join("lookup")).unwrap();
        fs::write(root.join("in/Data.csv"), input).unwrap();
        fs::write(root.join("lookup/Lookup.json"), LOOKUP).unwrap();

        let event = json!({
            "input_dir": root.join("in"),
            "input_file": "Data.csv",
            "lookup_dir": root.join("lookup"),
            "lookup_file": "Lookup.json",
            "error_dir": root.join("error"),
            "csv_output_dir": root.join("out/csv"),
            "parquet_output_dir": root.join("out/parquet"),
        });
        let config = RunConfig::from_event(&event).unwrap();
        (dir, config)
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 9, 10).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn test_published_run_states() {
        let (_dir, config) = setup("Deal Name,D1,Country,Currency,Company\nAlpha,1.5,USA,USD,FB\n");
        let report = dispatch_at(&config, now()).unwrap();

        assert!(report.is_published());
        assert_eq!(report.rows, 1);
        assert_eq!(
            report.states,
            vec![
                RunState::Loading,
                RunState::Validating,
                RunState::Enriching,
                RunState::Publishing,
                RunState::Done
            ]
        );
    }

    #[test]
    fn test_rejected_run_states() {
        let (_dir, config) = setup("D1,Country,Currency\n1.5,USA,USD\n");
        let report = dispatch_at(&config, now()).unwrap();

        assert_eq!(
            report.states,
            vec![RunState::Loading, RunState::Validating, RunState::Failed]
        );
        match report.outcome {
            RunOutcome::Rejected { failure, error_file } => {
                assert_eq!(failure.category(), FailureCategory::MissingMandatoryField);
                assert!(error_file.is_file());
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(fs::read_dir(&config.csv_output_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_input_is_fatal_and_not_routed() {
        let (_dir, mut config) = setup("D1\n1.5\n");
        config.input_file = "Nope.csv".into();

        let err = dispatch_at(&config, now()).unwrap_err();
        assert!(matches!(err, DispatchError::Load(LoadError::Dataset(_))));
        assert_eq!(fs::read_dir(&config.error_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_lookup_is_fatal() {
        let (_dir, mut config) = setup("D1\n1.5\n");
        config.lookup_file = "Missing.xlsx".into();

        let err = dispatch_at(&config, now()).unwrap_err();
        assert!(matches!(err, DispatchError::Load(LoadError::Lookup(_))));
    }

    #[test]
    fn test_check_file() {
        let (_dir, config) = setup("D1,Country,Currency,Company\n1.5,USA,USD,FB\n");
        let dataset = check_file(&config.input_path(), &config.lookup_path(), None)
            .unwrap()
            .unwrap();
        assert_eq!(dataset.rows[0]["Country name"], json!("United States"));
        // Nothing written
        assert!(!config.csv_output_dir.exists());
    }

    #[test]
    fn test_row_of_empty_fields_is_rejected() {
        let (_dir, config) = setup("Deal Name,D1,Country,Currency,Company\nA,1.5,USA,USD,FB\n,,,,\n");
        let report = dispatch_at(&config, now()).unwrap();

        assert_eq!(report.rows, 2);
        match report.outcome {
            RunOutcome::Rejected { failure, .. } => {
                assert_eq!(failure.category(), FailureCategory::MissingMandatoryField);
                assert_eq!(failure.row(), 1);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(fs::read_dir(&config.csv_output_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_dispatch_event_missing_key() {
        let err = dispatch_event(&json!({ "input_dir": "in" })).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Config(ConfigError::MissingKey("input_file"))
        ));
    }

    #[test]
    fn test_handle_event_missing_key() {
        let response = handle_event(&json!({ "input_dir": "in" }));
        assert_eq!(response.status_code, 400);
        assert!(response.message.contains("input_file"));
    }
}
