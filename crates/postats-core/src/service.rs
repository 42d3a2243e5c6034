//! Run lifecycle: open, upload, close, accept.
//!
//! A collector opens a run for a pull request, uploads files in one or more
//! batches and then closes it. Closing fixes the baseline, computes the
//! indicators, folds the comparison into a verdict and publishes it. A run
//! that is never closed explicitly is closed by [`RunService::close_expired`]
//! once its deadline passes.

use crate::comparison::{RunComparison, RunStatus};
use crate::config::ServiceConfig;
use crate::domain::{PoStatsError, ServiceResult};
use crate::model::{Run, RunState, SimulationFile};
use crate::report::ComparisonReport;
use crate::repository::RunRepository;
use crate::reporter::{StatusDetails, StatusReporter};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub type Clock = fn() -> DateTime<Utc>;

/// A run together with the baseline it is compared against.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub run: Run,
    pub baseline: Option<Run>,
    pub status: RunStatus,
}

impl ComparisonOutcome {
    pub fn comparison(&self) -> RunComparison<'_> {
        RunComparison::new(&self.run, self.baseline.as_ref())
    }

    pub fn report(&self, generated_at: DateTime<Utc>) -> ComparisonReport {
        ComparisonReport::new(&self.comparison(), self.status, generated_at)
    }
}

#[derive(Debug, Clone)]
pub enum AddFilesOutcome {
    /// Still waiting for files.
    Pending { received: usize, expected: u32 },
    /// The expected number of files arrived and the run was closed.
    Closed(Box<ComparisonOutcome>),
}

pub struct RunService<R, S> {
    repository: R,
    reporter: S,
    config: ServiceConfig,
    clock: Clock,
}

impl<R, S> RunService<R, S>
where
    R: RunRepository,
    S: StatusReporter,
{
    pub fn new(repository: R, reporter: S, config: ServiceConfig) -> Self {
        Self {
            repository,
            reporter,
            config,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn reporter(&self) -> &S {
        &self.reporter
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Open a run for `run_number`, discarding anything previously uploaded
    /// under that number. `expected_file_count` of zero disables closing on
    /// arrival of the last file.
    pub fn open_run(
        &mut self,
        run_number: u32,
        commit_id: &str,
        author: &str,
        expected_file_count: u32,
    ) -> ServiceResult<Run> {
        validate_run_number(run_number)?;
        if author.trim().is_empty() {
            return Err(PoStatsError::input_validation(
                "INPUT.AUTHOR",
                "you must supply an author",
            ));
        }

        let now = (self.clock)();
        let deadline = now + self.config.close_timeout();
        let mut run = match self.repository.load(run_number)? {
            Some(mut existing) => {
                debug!(run_number, id = %existing.id, "resetting existing run");
                existing.reopen(commit_id, author, expected_file_count, now, deadline);
                existing
            }
            None => Run::open(run_number, commit_id, author, expected_file_count, now, deadline),
        };
        self.repository.save(&mut run)?;

        info!(
            run_number,
            commit_id,
            author,
            expected_file_count,
            close_deadline = %deadline,
            "opened run"
        );
        self.publish(run_number, RunStatus::Running);
        Ok(run)
    }

    /// Append uploaded files to an open run. Files are never merged by name.
    pub fn add_files(
        &mut self,
        run_number: u32,
        files: Vec<SimulationFile>,
    ) -> ServiceResult<AddFilesOutcome> {
        validate_run_number(run_number)?;
        let mut run = self.load_existing(run_number)?;
        if !run.is_open() {
            return Err(PoStatsError::input_validation(
                "INPUT.RUN_CLOSED",
                format!("POStats run number {} is closed; open it again to upload", run_number),
            ));
        }

        let batch_size = files.len();
        run.files.extend(files);
        run.close_deadline = Some((self.clock)() + self.config.close_timeout());
        self.repository.save(&mut run)?;

        let received = run.files.len();
        info!(run_number, batch_size, received, "added files to run");

        let expected = run.expected_file_count;
        if expected > 0 && received >= expected as usize {
            debug!(run_number, expected, "all expected files received");
            let outcome = self.close_loaded(run)?;
            return Ok(AddFilesOutcome::Closed(Box::new(outcome)));
        }

        Ok(AddFilesOutcome::Pending { received, expected })
    }

    /// Close a run: fix its baseline, compute its indicators, publish the
    /// verdict. Closing an already closed run recomputes and republishes.
    pub fn close_run(&mut self, run_number: u32) -> ServiceResult<ComparisonOutcome> {
        validate_run_number(run_number)?;
        let run = self.load_existing(run_number)?;
        self.close_loaded(run)
    }

    /// Mark a closed run as accepted, making it the baseline for later runs.
    pub fn accept_run(&mut self, run_number: u32) -> ServiceResult<Run> {
        validate_run_number(run_number)?;
        let mut run = self.load_existing(run_number)?;
        if run.is_open() {
            return Err(PoStatsError::input_validation(
                "INPUT.RUN_OPEN",
                format!("POStats run number {} must be closed before it is accepted", run_number),
            ));
        }

        let accepted_at = (self.clock)();
        run.date_accepted = Some(accepted_at);
        self.repository.save(&mut run)?;

        info!(run_number, accepted_at = %accepted_at, "accepted run as baseline");
        Ok(run)
    }

    /// Close every open run whose deadline is at or before `now`.
    pub fn close_expired(&mut self, now: DateTime<Utc>) -> ServiceResult<Vec<ComparisonOutcome>> {
        let expired = self
            .repository
            .open_runs()?
            .into_iter()
            .filter(|run| run.is_expired(now))
            .collect::<Vec<_>>();

        let mut outcomes = Vec::with_capacity(expired.len());
        for run in expired {
            warn!(
                run_number = run.run_number,
                received = run.files.len(),
                expected = run.expected_file_count,
                "closing abandoned run after timeout"
            );
            outcomes.push(self.close_loaded(run)?);
        }
        Ok(outcomes)
    }

    /// Current verdict of a run. Open runs are `Running`; closed runs are
    /// compared against the baseline fixed when they were closed.
    pub fn status(&self, run_number: u32) -> ServiceResult<RunStatus> {
        Ok(self.comparison(run_number)?.status)
    }

    pub fn comparison(&self, run_number: u32) -> ServiceResult<ComparisonOutcome> {
        validate_run_number(run_number)?;
        let run = self.load_existing(run_number)?;

        let baseline = match run.accepted_run {
            Some(id) => {
                let baseline = self.repository.load_by_id(id)?;
                if baseline.is_none() {
                    warn!(run_number, baseline = %id, "baseline run no longer exists");
                }
                baseline
            }
            None => None,
        };

        let status = if run.is_open() {
            RunStatus::Running
        } else {
            RunComparison::new(&run, baseline.as_ref()).overall_status()
        };

        Ok(ComparisonOutcome {
            run,
            baseline,
            status,
        })
    }

    fn close_loaded(&mut self, mut run: Run) -> ServiceResult<ComparisonOutcome> {
        let baseline = self.repository.most_recently_accepted(Some(run.id))?;
        match &baseline {
            Some(baseline) => debug!(
                run_number = run.run_number,
                baseline_run_number = baseline.run_number,
                baseline = %baseline.id,
                "selected baseline"
            ),
            None => debug!(run_number = run.run_number, "no accepted baseline exists"),
        }

        run.accepted_run = baseline.as_ref().map(|baseline| baseline.id);
        run.ensure_stats_calculated(false);
        run.state = RunState::Closed;
        run.close_deadline = None;
        self.repository.save(&mut run)?;

        let status = RunComparison::new(&run, baseline.as_ref()).overall_status();
        info!(
            run_number = run.run_number,
            statistics = run.statistic_count(),
            status = status.as_str(),
            "closed run"
        );
        self.publish(run.run_number, status);

        Ok(ComparisonOutcome {
            run,
            baseline,
            status,
        })
    }

    fn publish(&mut self, run_number: u32, status: RunStatus) {
        let details = StatusDetails::new(run_number, status, &self.config);
        if let Err(error) = self.reporter.report(run_number, status, &details) {
            warn!(run_number, status = status.as_str(), %error, "failed to publish run status");
        }
    }

    fn load_existing(&self, run_number: u32) -> ServiceResult<Run> {
        self.repository
            .load(run_number)?
            .ok_or_else(|| PoStatsError::run_not_found(run_number))
    }
}

fn validate_run_number(run_number: u32) -> ServiceResult<()> {
    if run_number == 0 {
        return Err(PoStatsError::input_validation(
            "INPUT.RUN_NUMBER",
            "you must supply a pull request number",
        ));
    }
    Ok(())
}
