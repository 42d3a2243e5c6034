use crate::comparison::{
    ComparisonStatus, Indicator, PresenceStatus, RunComparison, RunStatus, VariableComparison,
};
use crate::domain::PoStatsError;
use crate::model::lenient_f64;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub generated_at: DateTime<Utc>,
    pub run_number: u32,
    pub commit_id: String,
    pub author: String,
    pub accepted_run_number: Option<u32>,
    pub status: RunStatus,
    pub passed: bool,
    pub counts: ComparisonCounts,
    /// Statistics that are not the same as the baseline.
    pub changes: Vec<StatisticChange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonCounts {
    pub file_count: usize,
    pub new_file_count: usize,
    pub missing_file_count: usize,
    pub table_count: usize,
    pub new_table_count: usize,
    pub missing_table_count: usize,
    pub statistic_count: usize,
    pub same_count: usize,
    pub better_count: usize,
    pub different_count: usize,
    pub new_count: usize,
    pub missing_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticChange {
    pub file: String,
    pub table: String,
    pub statistic: String,
    pub presence: PresenceStatus,
    pub indicators: Vec<IndicatorChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorChange {
    pub indicator: Indicator,
    #[serde(serialize_with = "lenient_f64::option::serialize")]
    pub accepted: Option<f64>,
    #[serde(serialize_with = "lenient_f64::option::serialize")]
    pub current: Option<f64>,
    pub percent_difference: Option<f64>,
    pub status: ComparisonStatus,
}

impl ComparisonReport {
    /// Summarise `comparison`; the status is taken as given so that an open
    /// run can be reported as running.
    pub fn new(comparison: &RunComparison<'_>, status: RunStatus, generated_at: DateTime<Utc>) -> Self {
        let current = comparison.current();
        let counts = ComparisonCounts::tally(comparison);

        let mut changed = comparison.clone();
        changed.retain_changed();
        let mut changes = Vec::new();
        for file in changed.files() {
            for table in file.tables() {
                changes.extend(
                    table
                        .variables()
                        .iter()
                        .map(|variable| StatisticChange::new(file.name(), table.name(), variable)),
                );
            }
        }

        Self {
            generated_at,
            run_number: current.run_number,
            commit_id: current.commit_id.clone(),
            author: current.author.clone(),
            accepted_run_number: comparison.accepted().map(|run| run.run_number),
            status,
            passed: status.is_pass(),
            counts,
            changes,
        }
    }
}

impl ComparisonCounts {
    pub fn tally(comparison: &RunComparison<'_>) -> Self {
        let mut counts = Self::default();

        for file in comparison.files() {
            counts.file_count += 1;
            match file.presence() {
                PresenceStatus::New => counts.new_file_count += 1,
                PresenceStatus::Missing => counts.missing_file_count += 1,
                PresenceStatus::NoChange => {}
            }

            for table in file.tables() {
                counts.table_count += 1;
                match table.presence() {
                    PresenceStatus::New => counts.new_table_count += 1,
                    PresenceStatus::Missing => counts.missing_table_count += 1,
                    PresenceStatus::NoChange => {}
                }
            }
        }

        for variable in comparison.variables() {
            counts.statistic_count += 1;
            match variable.presence() {
                PresenceStatus::New => counts.new_count += 1,
                PresenceStatus::Missing => counts.missing_count += 1,
                PresenceStatus::NoChange if variable.is_same() => counts.same_count += 1,
                PresenceStatus::NoChange if variable.is_better_or_same() => {
                    counts.better_count += 1
                }
                PresenceStatus::NoChange => counts.different_count += 1,
            }
        }

        counts
    }
}

impl StatisticChange {
    fn new(file: &str, table: &str, variable: &VariableComparison<'_>) -> Self {
        let indicators = Indicator::ALL
            .iter()
            .map(|indicator| {
                let percent_difference = variable.percent_difference(*indicator);
                IndicatorChange {
                    indicator: *indicator,
                    accepted: variable.accepted_value(*indicator),
                    current: variable.current_value(*indicator),
                    percent_difference: percent_difference
                        .is_finite()
                        .then_some(percent_difference),
                    status: variable.status(*indicator),
                }
            })
            .collect();

        Self {
            file: file.to_string(),
            table: table.to_string(),
            statistic: variable.name().to_string(),
            presence: variable.presence(),
            indicators,
        }
    }
}

pub fn render_human_summary(report: &ComparisonReport) -> String {
    let mut lines = Vec::new();
    let verdict = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("POStats status: {} ({})", verdict, report.status));

    let baseline = report
        .accepted_run_number
        .map_or_else(|| "no accepted run".to_string(), |number| format!("accepted run {}", number));
    lines.push(format!(
        "Run {} (commit {}, author {}) compared with {}",
        report.run_number, report.commit_id, report.author, baseline
    ));

    let counts = &report.counts;
    lines.push(format!(
        "Files: {} total ({} new, {} missing)",
        counts.file_count, counts.new_file_count, counts.missing_file_count
    ));
    lines.push(format!(
        "Tables: {} total ({} new, {} missing)",
        counts.table_count, counts.new_table_count, counts.missing_table_count
    ));
    lines.push(format!(
        "Statistics: {} total ({} same, {} better, {} different, {} new, {} missing)",
        counts.statistic_count,
        counts.same_count,
        counts.better_count,
        counts.different_count,
        counts.new_count,
        counts.missing_count
    ));

    for change in &report.changes {
        lines.push(format!(
            "  {} / {} / {}: {}",
            change.file,
            change.table,
            change.statistic,
            describe_change(change)
        ));
    }

    lines.join("\n")
}

fn describe_change(change: &StatisticChange) -> String {
    match change.presence {
        PresenceStatus::New => "New".to_string(),
        PresenceStatus::Missing => "Missing".to_string(),
        PresenceStatus::NoChange => change
            .indicators
            .iter()
            .filter(|indicator| indicator.status != ComparisonStatus::Same)
            .map(|indicator| match indicator.percent_difference {
                Some(percent) => format!("{} {} ({:+.2}%)", indicator.indicator, indicator.status, percent),
                None => format!("{} {}", indicator.indicator, indicator.status),
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to create report directory '{}': {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize report '{}': {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write report '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ReportError> for PoStatsError {
    fn from(error: ReportError) -> Self {
        let message = error.to_string();
        match error {
            ReportError::Directory { .. } | ReportError::Write { .. } => {
                PoStatsError::io_system("IO.REPORT_WRITE", message)
            }
            ReportError::Serialize { .. } => PoStatsError::internal("SYS.REPORT_SERIALIZE", message),
        }
    }
}

pub fn write_report_file(report_path: &Path, report: &ComparisonReport) -> Result<(), ReportError> {
    if let Some(parent_dir) = report_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent_dir).map_err(|source| ReportError::Directory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let report_json = serde_json::to_string_pretty(report).map_err(|source| ReportError::Serialize {
        path: report_path.to_path_buf(),
        source,
    })?;
    fs::write(report_path, report_json).map_err(|source| ReportError::Write {
        path: report_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{ComparisonReport, render_human_summary, write_report_file};
    use crate::comparison::{PresenceStatus, RunComparison, RunStatus};
    use crate::model::{Run, SimulationFile, Statistic, Table};
    use crate::stats::Indicators;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn statistic(name: &str, rmse: f64) -> Statistic {
        Statistic::with_indicators(
            name,
            Indicators {
                count: 50,
                rmse,
                nse: 0.8,
                rsr: 0.5,
            },
        )
    }

    fn run(run_number: u32, statistics: Vec<Statistic>, extra_file: Option<&str>) -> Run {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut run = Run::open(run_number, "abc123", "hol353", 0, now, now);
        run.files
            .push(SimulationFile::new("Wheat", vec![Table::new("PO", statistics)]));
        if let Some(name) = extra_file {
            run.files.push(SimulationFile::new(name, Vec::new()));
        }
        run
    }

    #[test]
    fn report_counts_and_lists_only_changed_statistics() {
        let accepted = run(
            10,
            vec![statistic("a", 1000.0), statistic("b", 1000.0), statistic("gone", 1.0)],
            None,
        );
        let current = run(
            11,
            vec![statistic("a", 1000.0), statistic("b", 1010.0), statistic("c", 5.0)],
            Some("Maize"),
        );
        let comparison = RunComparison::new(&current, Some(&accepted));
        let generated_at = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();

        let report = ComparisonReport::new(&comparison, comparison.overall_status(), generated_at);

        assert_eq!(report.status, RunStatus::Different);
        assert!(!report.passed);
        assert_eq!(report.accepted_run_number, Some(10));
        assert_eq!(report.counts.file_count, 2);
        assert_eq!(report.counts.new_file_count, 1);
        assert_eq!(report.counts.statistic_count, 4);
        assert_eq!(report.counts.same_count, 1);
        assert_eq!(report.counts.different_count, 1);
        assert_eq!(report.counts.new_count, 1);
        assert_eq!(report.counts.missing_count, 1);

        let names = report
            .changes
            .iter()
            .map(|change| change.statistic.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "c", "gone"]);
        assert_eq!(report.changes[1].presence, PresenceStatus::New);

        let summary = render_human_summary(&report);
        assert!(summary.contains("POStats status: FAIL (Different)"));
        assert!(summary.contains("compared with accepted run 10"));
        assert!(summary.contains("Wheat / PO / b: RMSE Different (-1.00%)"));
        assert!(summary.contains("Wheat / PO / c: New"));
        assert!(summary.contains("Wheat / PO / gone: Missing"));
    }

    #[test]
    fn unchanged_run_passes_with_no_changes_listed() {
        let accepted = run(10, vec![statistic("a", 1000.0)], None);
        let current = run(11, vec![statistic("a", 1000.0)], None);
        let comparison = RunComparison::new(&current, Some(&accepted));

        let report = ComparisonReport::new(&comparison, comparison.overall_status(), Utc::now());

        assert!(report.passed);
        assert!(report.changes.is_empty());
        assert!(render_human_summary(&report).starts_with("POStats status: PASS (Same)"));
    }

    #[test]
    fn report_file_is_written_as_pretty_json() {
        let current = run(11, vec![statistic("a", 1000.0)], None);
        let comparison = RunComparison::new(&current, None);
        let report = ComparisonReport::new(&comparison, comparison.overall_status(), Utc::now());

        let temp = TempDir::new().expect("tempdir should be created");
        let report_path = temp.path().join("nested/report.json");
        write_report_file(&report_path, &report).expect("report should be written");

        let content = fs::read_to_string(&report_path).expect("report should be readable");
        let json: Value = serde_json::from_str(&content).expect("report should be JSON");
        assert_eq!(json["run_number"], 11);
        assert_eq!(json["status"], "different");
        assert_eq!(json["accepted_run_number"], Value::Null);
        assert_eq!(json["changes"][0]["presence"], "new");
        assert_eq!(json["changes"][0]["indicators"][1]["indicator"], "rmse");
        assert_eq!(json["changes"][0]["indicators"][1]["current"], 1000.0);
    }

    #[test]
    fn infinite_indicators_are_spelled_out_in_the_json_report() {
        let single_point = Statistic::with_indicators(
            "a",
            Indicators {
                count: 1,
                rmse: 2.0,
                nse: f64::INFINITY,
                rsr: f64::INFINITY,
            },
        );
        let current = run(11, vec![single_point], None);
        let comparison = RunComparison::new(&current, None);
        let report = ComparisonReport::new(&comparison, comparison.overall_status(), Utc::now());

        let json = serde_json::to_value(&report).expect("report should serialize");
        let nse = &json["changes"][0]["indicators"][2];
        assert_eq!(nse["indicator"], "nse");
        assert_eq!(nse["current"], "Infinity");
        assert_eq!(nse["accepted"], Value::Null);
    }
}
