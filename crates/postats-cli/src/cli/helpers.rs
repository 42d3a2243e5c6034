use super::{CliError, GlobalArgs};
use anyhow::Context;
use postats_core::comparison::RunStatus;
use postats_core::config::{ServiceConfig, load_service_config};
use postats_core::domain::PoStatsError;
use postats_core::report::{ComparisonReport, render_human_summary, write_report_file};
use postats_core::repository::JsonDirectoryRepository;
use postats_core::reporter::JsonOutboxReporter;
use postats_core::service::RunService;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::debug;

pub(super) const STATUS_OUTBOX_FILE: &str = "status-outbox.jsonl";

pub(super) type StoreService = RunService<JsonDirectoryRepository, JsonOutboxReporter>;

pub(super) fn load_config(global: &GlobalArgs) -> Result<ServiceConfig, CliError> {
    match &global.config {
        Some(path) => Ok(load_service_config(path).map_err(PoStatsError::from)?),
        None => Ok(ServiceConfig::default()),
    }
}

pub(super) fn open_service(global: &GlobalArgs) -> Result<StoreService, CliError> {
    let config = load_config(global)?;
    debug!(store = %global.store.display(), "opening run store");
    let repository = JsonDirectoryRepository::open(&global.store).map_err(PoStatsError::from)?;
    let reporter = JsonOutboxReporter::new(global.store.join(STATUS_OUTBOX_FILE));
    Ok(RunService::new(repository, reporter, config))
}

/// Read and decode a JSON input document supplied on the command line.
pub(super) fn read_json_input<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, CliError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {} '{}'", what, path.display()))?;
    serde_json::from_str(&content).map_err(|source| {
        CliError::Service(PoStatsError::input_validation(
            "INPUT.CLI_DOCUMENT",
            format!("failed to parse {} '{}': {}", what, path.display(), source),
        ))
    })
}

/// Print the summary, optionally write the JSON report, and turn the
/// verdict into an exit code.
pub(super) fn finish_with_report(
    report: &ComparisonReport,
    report_path: Option<&Path>,
) -> Result<i32, CliError> {
    println!("{}", render_human_summary(report));
    if let Some(report_path) = report_path {
        write_report_file(report_path, report).map_err(PoStatsError::from)?;
        println!("JSON report: {}", report_path.display());
    }
    Ok(exit_code_for(report.status))
}

pub(super) fn exit_code_for(status: RunStatus) -> i32 {
    if status.is_pass() { 0 } else { 1 }
}
