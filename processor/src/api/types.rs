//! Response types for the tolerant entry point.
//!
//! Every invocation, whatever its outcome, is described by one
//! [`RunResponse`] serialized as camelCase JSON.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::DispatchError;
use crate::output::PublishedOutputs;
use crate::transform::pipeline::{RunOutcome, RunReport};

/// Outcome label carried in [`RunResponse::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Published,
    Rejected,
    InvalidConfig,
    LoadFailed,
    PublishFailed,
}

impl RunStatus {
    /// HTTP-style code reported alongside the status.
    pub fn code(&self) -> u16 {
        match self {
            RunStatus::Published | RunStatus::Rejected => 200,
            RunStatus::InvalidConfig => 400,
            RunStatus::LoadFailed | RunStatus::PublishFailed => 500,
        }
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub status_code: u16,
    pub status: RunStatus,
    pub message: String,

    /// Absent when the run never started (bad configuration).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Rows loaded from the input file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<OutputPaths>,

    /// Category of the failed check, for rejected runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file: Option<PathBuf>,
}

/// Published file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub parquet: PathBuf,
}

impl From<PublishedOutputs> for OutputPaths {
    fn from(outputs: PublishedOutputs) -> Self {
        Self {
            csv: outputs.csv,
            parquet: outputs.parquet,
        }
    }
}

impl RunResponse {
    fn new(status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            status_code: status.code(),
            status,
            message: message.into(),
            run_id: None,
            rows: None,
            outputs: None,
            failure: None,
            error_file: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Published
    }
}

impl From<RunReport> for RunResponse {
    fn from(report: RunReport) -> Self {
        let mut response = match report.outcome {
            RunOutcome::Published { outputs } => {
                let mut response = Self::new(RunStatus::Published, "Data processed successfully");
                response.outputs = Some(outputs.into());
                response
            }
            RunOutcome::Rejected {
                failure,
                error_file,
            } => {
                let message = format!("Data validation failed ({}): {}", failure.category(), failure);
                let mut response = Self::new(RunStatus::Rejected, message);
                response.failure = Some(failure.category().to_string());
                response.error_file = Some(error_file);
                response
            }
        };
        response.run_id = Some(report.run_id.to_string());
        response.rows = Some(report.rows);
        response
    }
}

impl From<DispatchError> for RunResponse {
    fn from(err: DispatchError) -> Self {
        let status = match err {
            DispatchError::Config(_) => RunStatus::InvalidConfig,
            DispatchError::Load(_) => RunStatus::LoadFailed,
            DispatchError::Publish(_) => RunStatus::PublishFailed,
        };
        Self::new(status, err.to_string())
    }
}
