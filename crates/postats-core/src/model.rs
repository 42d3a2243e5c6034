//! Run → file → table → statistic hierarchy uploaded by the collector.

use crate::stats::{Indicators, compute_indicators};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage handle of a run. Zero means "not yet saved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u32);

impl RunId {
    pub const UNSAVED: RunId = RunId(0);

    pub const fn is_unsaved(self) -> bool {
        self.0 == 0
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that is reconciled by name against a baseline.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(with = "lenient_f64")]
    pub predicted: f64,
    #[serde(with = "lenient_f64")]
    pub observed: f64,
    #[serde(default)]
    pub label: String,
}

impl DataPoint {
    pub fn new(predicted: f64, observed: f64) -> Self {
        Self {
            predicted,
            observed,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// One named predicted/observed measure and its memoised indicators.
///
/// `count`, `rmse`, `nse` and `rsr` are only written by
/// [`Statistic::ensure_stats_calculated`] (or supplied up front through
/// [`Statistic::with_indicators`] for pre-computed uploads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistic {
    name: String,
    #[serde(default)]
    count: u32,
    #[serde(with = "lenient_f64", default = "nan")]
    rmse: f64,
    #[serde(with = "lenient_f64", default = "nan")]
    nse: f64,
    #[serde(with = "lenient_f64", default = "nan")]
    rsr: f64,
    #[serde(default)]
    data: Vec<DataPoint>,
}

impl Statistic {
    /// A statistic whose indicators are computed lazily from `data`.
    pub fn new(name: impl Into<String>, data: Vec<DataPoint>) -> Self {
        let empty = Indicators::empty();
        Self {
            name: name.into(),
            count: empty.count,
            rmse: empty.rmse,
            nse: empty.nse,
            rsr: empty.rsr,
            data,
        }
    }

    /// A statistic carrying already-computed indicators and no raw data.
    pub fn with_indicators(name: impl Into<String>, indicators: Indicators) -> Self {
        Self {
            name: name.into(),
            count: indicators.count,
            rmse: indicators.rmse,
            nse: indicators.nse,
            rsr: indicators.rsr,
            data: Vec::new(),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn rmse(&self) -> f64 {
        self.rmse
    }

    pub fn nse(&self) -> f64 {
        self.nse
    }

    pub fn rsr(&self) -> f64 {
        self.rsr
    }

    pub fn data(&self) -> &[DataPoint] {
        &self.data
    }

    pub fn indicators(&self) -> Indicators {
        Indicators {
            count: self.count,
            rmse: self.rmse,
            nse: self.nse,
            rsr: self.rsr,
        }
    }

    /// True once the indicators reflect `data`. Statistics without raw data
    /// are taken as they are; a NaN indicator alongside data means it was
    /// never computed.
    pub fn is_calculated(&self) -> bool {
        if self.data.is_empty() {
            return true;
        }
        self.count as usize == self.data.len()
            && !(self.rmse.is_nan() || self.nse.is_nan() || self.rsr.is_nan())
    }

    /// Compute the indicators unless they are already known; `force`
    /// overwrites memoised values.
    pub fn ensure_stats_calculated(&mut self, force: bool) {
        if self.data.is_empty() || (!force && self.is_calculated()) {
            return;
        }

        let (predicted, observed) = self.po_arrays();
        if let Some(indicators) = compute_indicators(&predicted, &observed) {
            self.count = indicators.count;
            self.rmse = indicators.rmse;
            self.nse = indicators.nse;
            self.rsr = indicators.rsr;
        }
    }

    /// Split the paired data into predicted and observed columns.
    pub fn po_arrays(&self) -> (Vec<f64>, Vec<f64>) {
        self.data
            .iter()
            .map(|point| (point.predicted, point.observed))
            .unzip()
    }
}

impl Named for Statistic {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub statistics: Vec<Statistic>,
}

impl Table {
    pub fn new(name: impl Into<String>, statistics: Vec<Statistic>) -> Self {
        Self {
            name: name.into(),
            statistics,
        }
    }
}

impl Named for Table {
    fn name(&self) -> &str {
        &self.name
    }
}

/// One simulation input file and the PO tables found for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SimulationFile {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl SimulationFile {
    pub fn new(name: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }
}

impl Named for SimulationFile {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Open,
    #[default]
    Closed,
}

/// All statistics collected for one commit of one pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(default)]
    pub id: RunId,
    pub run_number: u32,
    #[serde(default)]
    pub commit_id: String,
    #[serde(default)]
    pub author: String,
    pub date_run: DateTime<Utc>,
    #[serde(default)]
    pub date_accepted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: Vec<SimulationFile>,
    #[serde(default)]
    pub accepted_run: Option<RunId>,
    #[serde(default)]
    pub expected_file_count: u32,
    #[serde(default)]
    pub close_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: RunState,
}

impl Run {
    /// A fresh, open run with no files and no baseline.
    pub fn open(
        run_number: u32,
        commit_id: impl Into<String>,
        author: impl Into<String>,
        expected_file_count: u32,
        now: DateTime<Utc>,
        close_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RunId::UNSAVED,
            run_number,
            commit_id: commit_id.into(),
            author: author.into(),
            date_run: now,
            date_accepted: None,
            files: Vec::new(),
            accepted_run: None,
            expected_file_count,
            close_deadline: Some(close_deadline),
            state: RunState::Open,
        }
    }

    /// Reopen an existing run, discarding previously uploaded data but
    /// keeping its storage id.
    pub fn reopen(
        &mut self,
        commit_id: impl Into<String>,
        author: impl Into<String>,
        expected_file_count: u32,
        now: DateTime<Utc>,
        close_deadline: DateTime<Utc>,
    ) {
        let id = self.id;
        *self = Self::open(
            self.run_number,
            commit_id,
            author,
            expected_file_count,
            now,
            close_deadline,
        );
        self.id = id;
    }

    pub fn is_open(&self) -> bool {
        self.state == RunState::Open
    }

    pub fn is_accepted(&self) -> bool {
        self.date_accepted.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_open()
            && self
                .close_deadline
                .is_some_and(|deadline| deadline <= now)
    }

    pub fn ensure_stats_calculated(&mut self, force: bool) {
        for statistic in self.statistics_mut() {
            statistic.ensure_stats_calculated(force);
        }
    }

    pub fn statistic_count(&self) -> usize {
        self.files
            .iter()
            .flat_map(|file| &file.tables)
            .map(|table| table.statistics.len())
            .sum()
    }

    fn statistics_mut(&mut self) -> impl Iterator<Item = &mut Statistic> {
        self.files
            .iter_mut()
            .flat_map(|file| file.tables.iter_mut())
            .flat_map(|table| table.statistics.iter_mut())
    }
}

fn nan() -> f64 {
    f64::NAN
}

/// JSON has no literal for non-finite numbers, so they travel as strings.
pub(crate) mod lenient_f64 {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.trim() {
                "NaN" | "nan" => Ok(f64::NAN),
                "Infinity" | "inf" | "+Infinity" => Ok(f64::INFINITY),
                "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("'{}' is not a valid number", other))),
            },
        }
    }

    /// Optional values: `None` stays `null`, non-finite values use the same
    /// string spellings.
    pub mod option {
        use serde::Serializer;

        pub fn serialize<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
