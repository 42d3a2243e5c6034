use super::reconcile::{PresenceStatus, reconcile};
use super::table::FileComparison;
use super::variable::VariableComparison;
use crate::model::Run;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Verdict published for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Same,
    Better,
    Different,
    /// The run is still accepting uploads.
    Running,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Same => "Same",
            Self::Better => "Better",
            Self::Different => "Different",
            Self::Running => "Running",
        }
    }

    /// Only an unchanged run passes; improvements still need a human to
    /// accept them as the new baseline.
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Same)
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Comparison tree of a run against its accepted baseline.
#[derive(Debug, Clone)]
pub struct RunComparison<'a> {
    current: &'a Run,
    accepted: Option<&'a Run>,
    files: Vec<FileComparison<'a>>,
}

impl<'a> RunComparison<'a> {
    pub fn new(current: &'a Run, accepted: Option<&'a Run>) -> Self {
        let files = reconcile(&current.files, accepted.map(|run| run.files.as_slice()))
            .into_iter()
            .map(FileComparison::from_pairing)
            .collect();

        Self {
            current,
            accepted,
            files,
        }
    }

    pub fn current(&self) -> &'a Run {
        self.current
    }

    pub fn accepted(&self) -> Option<&'a Run> {
        self.accepted
    }

    pub fn files(&self) -> &[FileComparison<'a>] {
        &self.files
    }

    /// Every statistic comparison in file, table, name order.
    pub fn variables(&self) -> impl Iterator<Item = &VariableComparison<'a>> {
        self.files
            .iter()
            .flat_map(|file| file.tables())
            .flat_map(|table| table.variables())
    }

    /// Fold the tree into a single verdict. Any added or removed file or
    /// table makes the run different regardless of its statistics.
    pub fn overall_status(&self) -> RunStatus {
        let structure_changed = self.files.iter().any(|file| {
            file.presence() != PresenceStatus::NoChange
                || file
                    .tables()
                    .iter()
                    .any(|table| table.presence() != PresenceStatus::NoChange)
        });
        if structure_changed {
            return RunStatus::Different;
        }

        let mut all_same = true;
        let mut all_better_or_same = true;
        for variable in self.variables() {
            all_same &= variable.is_same();
            all_better_or_same &= variable.is_better_or_same();
        }

        if all_same {
            RunStatus::Same
        } else if all_better_or_same {
            RunStatus::Better
        } else {
            RunStatus::Different
        }
    }

    /// Drop everything that compares as same, leaving only what a reviewer
    /// needs to look at.
    pub fn retain_changed(&mut self) {
        self.files.retain(|file| !file.is_same());
        for file in &mut self.files {
            file.retain_changed();
        }
        self.files
            .retain(|file| file.presence() != PresenceStatus::NoChange || !file.tables().is_empty());
    }
}
