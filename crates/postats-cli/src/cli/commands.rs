use super::helpers::*;
use super::{CliError, GlobalArgs};
use chrono::Utc;
use postats_core::comparison::RunComparison;
use postats_core::domain::PoStatsError;
use postats_core::model::{Run, SimulationFile};
use postats_core::report::ComparisonReport;
use postats_core::service::AddFilesOutcome;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct OpenArgs {
    /// Pull request number
    #[arg(long = "run")]
    run_number: u32,

    /// Commit being tested
    #[arg(long = "commit", default_value = "")]
    commit_id: String,

    /// Pull request author
    #[arg(long)]
    author: String,

    /// Close automatically once this many files arrive (0 disables)
    #[arg(long = "expected-files", default_value_t = 0)]
    expected_files: u32,
}

#[derive(clap::Args)]
pub(super) struct AddArgs {
    /// Pull request number
    #[arg(long = "run")]
    run_number: u32,

    /// JSON document holding an array of files
    #[arg(long)]
    files: PathBuf,

    /// JSON report output path, used if this upload closes the run
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct CloseArgs {
    /// Pull request number
    #[arg(long = "run")]
    run_number: u32,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Pull request number
    #[arg(long = "run")]
    run_number: u32,
}

#[derive(clap::Args)]
pub(super) struct CompareArgs {
    /// Run document to compare
    #[arg(long)]
    current: PathBuf,

    /// Baseline run document; every file is new without one
    #[arg(long)]
    accepted: Option<PathBuf>,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

pub(super) fn run_open_command(global: &GlobalArgs, args: OpenArgs) -> Result<i32, CliError> {
    let mut service = open_service(global)?;
    let run = service.open_run(
        args.run_number,
        &args.commit_id,
        &args.author,
        args.expected_files,
    )?;

    println!(
        "Opened run {} (commit {}, author {}), closes by {}",
        run.run_number,
        run.commit_id,
        run.author,
        run.close_deadline
            .map_or_else(|| "-".to_string(), |deadline| deadline.to_rfc3339())
    );
    Ok(0)
}

pub(super) fn run_add_command(global: &GlobalArgs, args: AddArgs) -> Result<i32, CliError> {
    let files: Vec<SimulationFile> = read_json_input(&args.files, "files document")?;
    let mut service = open_service(global)?;

    match service.add_files(args.run_number, files)? {
        AddFilesOutcome::Pending { received, expected } => {
            if expected > 0 {
                println!(
                    "Run {}: {} of {} expected files received",
                    args.run_number, received, expected
                );
            } else {
                println!("Run {}: {} files received", args.run_number, received);
            }
            Ok(0)
        }
        AddFilesOutcome::Closed(outcome) => {
            println!("Run {}: all expected files received, run closed", args.run_number);
            finish_with_report(&outcome.report(Utc::now()), args.report.as_deref())
        }
    }
}

pub(super) fn run_close_command(global: &GlobalArgs, args: CloseArgs) -> Result<i32, CliError> {
    let mut service = open_service(global)?;
    let outcome = service.close_run(args.run_number)?;
    finish_with_report(&outcome.report(Utc::now()), args.report.as_deref())
}

pub(super) fn run_accept_command(global: &GlobalArgs, args: RunArgs) -> Result<i32, CliError> {
    let mut service = open_service(global)?;
    let run = service.accept_run(args.run_number)?;
    println!(
        "Accepted run {} (commit {}) as the baseline",
        run.run_number, run.commit_id
    );
    Ok(0)
}

pub(super) fn run_status_command(global: &GlobalArgs, args: RunArgs) -> Result<i32, CliError> {
    let service = open_service(global)?;
    let status = service.status(args.run_number)?;
    println!("Run {}: {}", args.run_number, status);
    Ok(0)
}

pub(super) fn run_expire_command(global: &GlobalArgs) -> Result<i32, CliError> {
    let mut service = open_service(global)?;
    let outcomes = service.close_expired(Utc::now())?;

    for outcome in &outcomes {
        println!("Run {}: closed after timeout ({})", outcome.run.run_number, outcome.status);
    }
    println!("Closed {} expired run(s)", outcomes.len());
    Ok(0)
}

pub(super) fn run_compare_command(args: CompareArgs) -> Result<i32, CliError> {
    let mut current: Run = read_json_input(&args.current, "run document")?;
    let mut accepted = match &args.accepted {
        Some(path) => Some(read_json_input::<Run>(path, "run document")?),
        None => None,
    };
    if current.run_number == 0 {
        return Err(CliError::Service(PoStatsError::input_validation(
            "INPUT.RUN_NUMBER",
            format!("run document '{}' has no run number", args.current.display()),
        )));
    }

    current.ensure_stats_calculated(false);
    if let Some(accepted) = accepted.as_mut() {
        accepted.ensure_stats_calculated(false);
    }

    let comparison = RunComparison::new(&current, accepted.as_ref());
    let report = ComparisonReport::new(&comparison, comparison.overall_status(), Utc::now());
    finish_with_report(&report, args.report.as_deref())
}
