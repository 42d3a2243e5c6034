//! Run storage.
//!
//! Runs are keyed twice: by the pull-request `run_number` that callers use,
//! and by the storage [`RunId`] that baselines point at. Both stores keep
//! `run_number` unique.

use crate::domain::PoStatsError;
use crate::model::{Run, RunId};
use std::fs;
use std::path::{Path, PathBuf};

pub trait RunRepository {
    /// The accepted run with the latest acceptance date, ignoring `exclude`.
    /// Ties go to the highest id.
    fn most_recently_accepted(&self, exclude: Option<RunId>) -> Result<Option<Run>, RepositoryError>;

    fn load(&self, run_number: u32) -> Result<Option<Run>, RepositoryError>;

    fn load_by_id(&self, id: RunId) -> Result<Option<Run>, RepositoryError>;

    /// Insert or replace `run`, assigning an id on first save.
    fn save(&mut self, run: &mut Run) -> Result<RunId, RepositoryError>;

    fn open_runs(&self) -> Result<Vec<Run>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("failed to access run store '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse stored run '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode run {run_number}: {source}")]
    Serialize {
        run_number: u32,
        source: serde_json::Error,
    },
    #[error("run number {run_number} is already stored under id {existing}")]
    DuplicateRunNumber { run_number: u32, existing: RunId },
}

impl From<RepositoryError> for PoStatsError {
    fn from(error: RepositoryError) -> Self {
        let message = error.to_string();
        match error {
            RepositoryError::Io { .. } => PoStatsError::io_system("IO.STORE", message),
            RepositoryError::Parse { .. } => PoStatsError::io_system("IO.STORE_PARSE", message),
            RepositoryError::Serialize { .. } => PoStatsError::internal("SYS.STORE_ENCODE", message),
            RepositoryError::DuplicateRunNumber { .. } => {
                PoStatsError::input_validation("INPUT.RUN_CONFLICT", message)
            }
        }
    }
}

fn select_most_recently_accepted<'a>(
    runs: impl IntoIterator<Item = &'a Run>,
    exclude: Option<RunId>,
) -> Option<&'a Run> {
    runs.into_iter()
        .filter(|run| Some(run.id) != exclude)
        .filter_map(|run| run.date_accepted.map(|accepted| (accepted, run.id, run)))
        .max_by_key(|(accepted, id, _)| (*accepted, *id))
        .map(|(_, _, run)| run)
}

fn check_unique_run_number<'a>(
    runs: impl IntoIterator<Item = &'a Run>,
    run: &Run,
) -> Result<(), RepositoryError> {
    match runs
        .into_iter()
        .find(|stored| stored.run_number == run.run_number && stored.id != run.id)
    {
        Some(existing) => Err(RepositoryError::DuplicateRunNumber {
            run_number: run.run_number,
            existing: existing.id,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    runs: Vec<Run>,
    last_id: u32,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }
}

impl RunRepository for InMemoryRepository {
    fn most_recently_accepted(&self, exclude: Option<RunId>) -> Result<Option<Run>, RepositoryError> {
        Ok(select_most_recently_accepted(&self.runs, exclude).cloned())
    }

    fn load(&self, run_number: u32) -> Result<Option<Run>, RepositoryError> {
        Ok(self
            .runs
            .iter()
            .find(|run| run.run_number == run_number)
            .cloned())
    }

    fn load_by_id(&self, id: RunId) -> Result<Option<Run>, RepositoryError> {
        Ok(self.runs.iter().find(|run| run.id == id).cloned())
    }

    fn save(&mut self, run: &mut Run) -> Result<RunId, RepositoryError> {
        check_unique_run_number(&self.runs, run)?;

        if run.id.is_unsaved() {
            self.last_id += 1;
            run.id = RunId(self.last_id);
        } else {
            self.last_id = self.last_id.max(run.id.0);
        }

        match self.runs.iter_mut().find(|stored| stored.id == run.id) {
            Some(stored) => *stored = run.clone(),
            None => self.runs.push(run.clone()),
        }
        Ok(run.id)
    }

    fn open_runs(&self) -> Result<Vec<Run>, RepositoryError> {
        Ok(self.runs.iter().filter(|run| run.is_open()).cloned().collect())
    }
}

/// One pretty-printed `run-<number>.json` document per run.
#[derive(Debug, Clone)]
pub struct JsonDirectoryRepository {
    root: PathBuf,
}

impl JsonDirectoryRepository {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| RepositoryError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_path(&self, run_number: u32) -> PathBuf {
        self.root.join(format!("run-{}.json", run_number))
    }

    fn read_run(path: &Path) -> Result<Run, RepositoryError> {
        let content = fs::read_to_string(path).map_err(|source| RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| RepositoryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_all(&self) -> Result<Vec<Run>, RepositoryError> {
        let directory = fs::read_dir(&self.root).map_err(|source| RepositoryError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in directory {
            let entry = entry.map_err(|source| RepositoryError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            let is_run_document = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("run-") && name.ends_with(".json"));
            if is_run_document && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| Self::read_run(path)).collect()
    }
}

impl RunRepository for JsonDirectoryRepository {
    fn most_recently_accepted(&self, exclude: Option<RunId>) -> Result<Option<Run>, RepositoryError> {
        let runs = self.read_all()?;
        Ok(select_most_recently_accepted(&runs, exclude).cloned())
    }

    fn load(&self, run_number: u32) -> Result<Option<Run>, RepositoryError> {
        let path = self.run_path(run_number);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_run(&path).map(Some)
    }

    fn load_by_id(&self, id: RunId) -> Result<Option<Run>, RepositoryError> {
        Ok(self.read_all()?.into_iter().find(|run| run.id == id))
    }

    fn save(&mut self, run: &mut Run) -> Result<RunId, RepositoryError> {
        let runs = self.read_all()?;
        check_unique_run_number(&runs, run)?;

        if run.id.is_unsaved() {
            let last_id = runs.iter().map(|stored| stored.id.0).max().unwrap_or(0);
            run.id = RunId(last_id + 1);
        }

        let document = serde_json::to_string_pretty(run).map_err(|source| RepositoryError::Serialize {
            run_number: run.run_number,
            source,
        })?;
        let path = self.run_path(run.run_number);
        fs::write(&path, document).map_err(|source| RepositoryError::Io { path, source })?;
        Ok(run.id)
    }

    fn open_runs(&self) -> Result<Vec<Run>, RepositoryError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(Run::is_open)
            .collect())
    }
}
