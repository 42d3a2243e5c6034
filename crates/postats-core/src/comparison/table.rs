use super::reconcile::{Pairing, PresenceStatus, reconcile};
use super::variable::VariableComparison;
use crate::model::{SimulationFile, Table};

/// A table reconciled against its baseline, with one comparison per
/// statistic found on either side.
#[derive(Debug, Clone)]
pub struct TableComparison<'a> {
    name: &'a str,
    presence: PresenceStatus,
    variables: Vec<VariableComparison<'a>>,
}

impl<'a> TableComparison<'a> {
    pub fn new(current: Option<&'a Table>, accepted: Option<&'a Table>) -> Self {
        Self::from_pairing(Pairing::new(current, accepted))
    }

    pub fn from_pairing(pairing: Pairing<'a, Table>) -> Self {
        let current = pairing
            .current()
            .map(|table| table.statistics.as_slice())
            .unwrap_or(&[]);
        let accepted = pairing.accepted().map(|table| table.statistics.as_slice());

        // A table missing from the current run still lists its baseline
        // statistics, each marked missing.
        let variables = reconcile(current, accepted)
            .into_iter()
            .map(VariableComparison::from_pairing)
            .collect();

        Self {
            name: pairing.name(),
            presence: pairing.presence(),
            variables,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn presence(&self) -> PresenceStatus {
        self.presence
    }

    pub fn variables(&self) -> &[VariableComparison<'a>] {
        &self.variables
    }

    pub fn is_same(&self) -> bool {
        self.presence == PresenceStatus::NoChange
            && self.variables.iter().all(VariableComparison::is_same)
    }

    pub fn is_better_or_same(&self) -> bool {
        self.presence == PresenceStatus::NoChange
            && self.variables.iter().all(VariableComparison::is_better_or_same)
    }

    pub(crate) fn retain_changed(&mut self) {
        self.variables.retain(|variable| !variable.is_same());
    }
}

#[derive(Debug, Clone)]
pub struct FileComparison<'a> {
    name: &'a str,
    presence: PresenceStatus,
    tables: Vec<TableComparison<'a>>,
}

impl<'a> FileComparison<'a> {
    pub fn new(current: Option<&'a SimulationFile>, accepted: Option<&'a SimulationFile>) -> Self {
        Self::from_pairing(Pairing::new(current, accepted))
    }

    pub fn from_pairing(pairing: Pairing<'a, SimulationFile>) -> Self {
        let current = pairing
            .current()
            .map(|file| file.tables.as_slice())
            .unwrap_or(&[]);
        let accepted = pairing.accepted().map(|file| file.tables.as_slice());

        let tables = reconcile(current, accepted)
            .into_iter()
            .map(TableComparison::from_pairing)
            .collect();

        Self {
            name: pairing.name(),
            presence: pairing.presence(),
            tables,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn presence(&self) -> PresenceStatus {
        self.presence
    }

    pub fn tables(&self) -> &[TableComparison<'a>] {
        &self.tables
    }

    pub fn is_same(&self) -> bool {
        self.presence == PresenceStatus::NoChange && self.tables.iter().all(TableComparison::is_same)
    }

    pub fn is_better_or_same(&self) -> bool {
        self.presence == PresenceStatus::NoChange
            && self.tables.iter().all(TableComparison::is_better_or_same)
    }

    pub(crate) fn retain_changed(&mut self) {
        self.tables.retain(|table| !table.is_same());
        for table in &mut self.tables {
            table.retain_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileComparison, TableComparison};
    use crate::comparison::reconcile::PresenceStatus;
    use crate::comparison::variable::ComparisonStatus;
    use crate::model::{SimulationFile, Statistic, Table};
    use crate::stats::Indicators;

    fn statistic(name: &str, rmse: f64) -> Statistic {
        Statistic::with_indicators(
            name,
            Indicators {
                count: 10,
                rmse,
                nse: 0.5,
                rsr: 0.5,
            },
        )
    }

    fn table(name: &str, statistics: &[(&str, f64)]) -> Table {
        Table::new(
            name,
            statistics
                .iter()
                .map(|(name, rmse)| statistic(name, *rmse))
                .collect(),
        )
    }

    #[test]
    fn table_variables_are_reconciled_by_name() {
        let accepted = table("PO", &[("a", 1.0), ("c", 1.0)]);
        let current = table("PO", &[("c", 1.0), ("b", 1.0)]);

        let comparison = TableComparison::new(Some(&current), Some(&accepted));

        let summary = comparison
            .variables()
            .iter()
            .map(|variable| (variable.name(), variable.n_status()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("a", ComparisonStatus::Missing),
                ("b", ComparisonStatus::New),
                ("c", ComparisonStatus::Same),
            ]
        );
        assert_eq!(comparison.presence(), PresenceStatus::NoChange);
        assert!(!comparison.is_same());
    }

    #[test]
    fn missing_table_lists_its_baseline_variables_as_missing() {
        let accepted = table("PO", &[("a", 1.0), ("b", 1.0)]);

        let comparison = TableComparison::new(None, Some(&accepted));

        assert_eq!(comparison.presence(), PresenceStatus::Missing);
        assert_eq!(comparison.variables().len(), 2);
        assert!(
            comparison
                .variables()
                .iter()
                .all(|variable| variable.n_status() == ComparisonStatus::Missing)
        );
        assert!(!comparison.is_better_or_same());
    }

    #[test]
    fn file_is_same_only_when_every_table_is_same() {
        let accepted = SimulationFile::new(
            "Wheat",
            vec![table("PO1", &[("a", 1.0)]), table("PO2", &[("b", 1.0)])],
        );
        let same = accepted.clone();
        let improved = SimulationFile::new(
            "Wheat",
            vec![table("PO1", &[("a", 0.5)]), table("PO2", &[("b", 1.0)])],
        );

        let unchanged = FileComparison::new(Some(&same), Some(&accepted));
        assert!(unchanged.is_same());
        assert!(unchanged.is_better_or_same());

        let better = FileComparison::new(Some(&improved), Some(&accepted));
        assert!(!better.is_same());
        assert!(better.is_better_or_same());
        assert_eq!(
            better.tables().iter().map(TableComparison::name).collect::<Vec<_>>(),
            vec!["PO1", "PO2"]
        );
    }

    #[test]
    fn retain_changed_drops_unchanged_tables_and_variables() {
        let accepted = SimulationFile::new(
            "Wheat",
            vec![
                table("PO1", &[("a", 1.0), ("b", 1.0)]),
                table("PO2", &[("c", 1.0)]),
            ],
        );
        let current = SimulationFile::new(
            "Wheat",
            vec![
                table("PO1", &[("a", 1.0), ("b", 2.0)]),
                table("PO2", &[("c", 1.0)]),
            ],
        );

        let mut comparison = FileComparison::new(Some(&current), Some(&accepted));
        comparison.retain_changed();

        assert_eq!(comparison.tables().len(), 1);
        let table = &comparison.tables()[0];
        assert_eq!(table.name(), "PO1");
        assert_eq!(table.variables().len(), 1);
        assert_eq!(table.variables()[0].name(), "b");
        assert_eq!(table.variables()[0].rmse_status(), ComparisonStatus::Different);
    }
}
