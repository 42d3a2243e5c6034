//! Publishing pull-request statuses.
//!
//! The service never talks to a code host directly. It hands a
//! [`StatusDetails`] payload (the shape of a commit status: state, target
//! url, description, context) to a [`StatusReporter`].

use crate::comparison::RunStatus;
use crate::config::ServiceConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Success,
    Pending,
    Failure,
}

impl CommitState {
    pub const fn from_run_status(status: RunStatus) -> Self {
        match status {
            RunStatus::Same => Self::Success,
            RunStatus::Running => Self::Pending,
            RunStatus::Better | RunStatus::Different => Self::Failure,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    pub state: CommitState,
    pub target_url: String,
    pub description: String,
    pub context: String,
}

impl StatusDetails {
    pub fn new(run_number: u32, status: RunStatus, config: &ServiceConfig) -> Self {
        Self {
            state: CommitState::from_run_status(status),
            target_url: config.target_url(run_number),
            description: status.as_str().to_string(),
            context: config.status_context.clone(),
        }
    }
}

pub trait StatusReporter {
    fn report(
        &mut self,
        run_number: u32,
        status: RunStatus,
        details: &StatusDetails,
    ) -> Result<(), ReporterError>;
}

impl<T: StatusReporter + ?Sized> StatusReporter for Box<T> {
    fn report(
        &mut self,
        run_number: u32,
        status: RunStatus,
        details: &StatusDetails,
    ) -> Result<(), ReporterError> {
        (**self).report(run_number, status, details)
    }
}

/// Logs statuses instead of publishing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusReporter;

impl StatusReporter for TracingStatusReporter {
    fn report(
        &mut self,
        run_number: u32,
        status: RunStatus,
        details: &StatusDetails,
    ) -> Result<(), ReporterError> {
        info!(
            target: "postats::status",
            run_number = run_number,
            status = status.as_str(),
            state = details.state.as_str(),
            target_url = %details.target_url,
            context = %details.context,
            "pull request status"
        );
        Ok(())
    }
}

/// One line of the status outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub reported_at: DateTime<Utc>,
    pub run_number: u32,
    #[serde(flatten)]
    pub details: StatusDetails,
}

/// Appends each status as a JSON line for a separate process to post.
#[derive(Debug, Clone)]
pub struct JsonOutboxReporter {
    path: PathBuf,
}

impl JsonOutboxReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusReporter for JsonOutboxReporter {
    fn report(
        &mut self,
        run_number: u32,
        _status: RunStatus,
        details: &StatusDetails,
    ) -> Result<(), ReporterError> {
        if let Some(parent_dir) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent_dir).map_err(|source| ReporterError::Open {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let entry = OutboxEntry {
            reported_at: Utc::now(),
            run_number,
            details: details.clone(),
        };
        let mut line = serde_json::to_string(&entry).map_err(ReporterError::Serialize)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ReporterError::Open {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .map_err(|source| ReporterError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Read every entry written to an outbox file so far.
pub fn read_outbox(path: &Path) -> Result<Vec<OutboxEntry>, ReporterError> {
    let content = fs::read_to_string(path).map_err(|source| ReporterError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ReporterError::Serialize))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("failed to open status outbox '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode status entry: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to append to status outbox '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Returned by reporters that post to a remote status endpoint.
    #[error("status endpoint rejected the update: {0}")]
    Rejected(String),
}
