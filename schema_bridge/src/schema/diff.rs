//! Column reconciliation between a source table and its reference definition
//!
//! A [`TableMigrationPlan`] resolves common columns by name once per table, so
//! rows can be projected positionally from the source and inserted by name
//! into the target.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::schema::types::ColumnDescriptor;
use crate::utils::naming::{column_list, placeholders, quote_identifier};

/// How one table's rows are carried from the source into the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMigrationPlan {
    pub table_name: String,
    /// All source columns, in declared order
    pub source_columns: Vec<String>,
    /// Columns present on both sides, in source order
    pub common_columns: Vec<String>,
    /// Position of each common column within `source_columns`
    pub source_positions: Vec<usize>,
    /// Source columns with no home in the target; their data is dropped
    pub source_only_columns: IndexSet<String>,
    /// Target columns with no source counterpart; they receive defaults
    pub target_only_columns: IndexSet<String>,
}

impl TableMigrationPlan {
    /// Compare the source and reference definitions of `table_name`
    pub fn compute(
        table_name: &str,
        source: &[ColumnDescriptor],
        reference: &[ColumnDescriptor],
    ) -> Self {
        let source_names: HashSet<&str> = source.iter().map(|c| c.name.as_str()).collect();
        let reference_names: HashSet<&str> = reference.iter().map(|c| c.name.as_str()).collect();

        let mut common_columns = Vec::new();
        let mut source_positions = Vec::new();
        let mut source_only_columns = IndexSet::new();

        for (position, column) in source.iter().enumerate() {
            if reference_names.contains(column.name.as_str()) {
                common_columns.push(column.name.clone());
                source_positions.push(position);
            } else {
                source_only_columns.insert(column.name.clone());
            }
        }

        let target_only_columns = reference
            .iter()
            .filter(|c| !source_names.contains(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();

        Self {
            table_name: table_name.to_string(),
            source_columns: source.iter().map(|c| c.name.clone()).collect(),
            common_columns,
            source_positions,
            source_only_columns,
            target_only_columns,
        }
    }

    /// Whether either side has columns the other lacks
    pub fn has_discrepancies(&self) -> bool {
        !self.source_only_columns.is_empty() || !self.target_only_columns.is_empty()
    }

    /// Pick the common-column values out of a full source row
    pub fn project<T: Clone>(&self, row: &[T]) -> Vec<T> {
        self.source_positions
            .iter()
            .filter_map(|&position| row.get(position).cloned())
            .collect()
    }

    /// Full scan of the source table, columns in declared order
    pub fn select_statement(&self) -> String {
        format!(
            "SELECT {} FROM {}",
            column_list(&self.source_columns),
            quote_identifier(&self.table_name)
        )
    }

    /// Insert addressing exactly the common columns by name
    pub fn insert_statement(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table_name),
            column_list(&self.common_columns),
            placeholders(self.common_columns.len())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns(names: &[&str]) -> Vec<ColumnDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnDescriptor::new(name, i as i64, "TEXT"))
            .collect()
    }

    #[test]
    fn intersects_column_sets() {
        let plan = TableMigrationPlan::compute("t", &columns(&["a", "b", "c"]), &columns(&["b", "c", "d"]));

        assert_eq!(plan.common_columns, vec!["b", "c"]);
        assert_eq!(plan.source_positions, vec![1, 2]);
        assert_eq!(plan.source_only_columns.iter().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(plan.target_only_columns.iter().collect::<Vec<_>>(), vec!["d"]);
        assert!(plan.has_discrepancies());
    }

    #[test]
    fn common_columns_follow_source_order() {
        let plan = TableMigrationPlan::compute("t", &columns(&["z", "x", "y"]), &columns(&["y", "x", "z"]));

        assert_eq!(plan.common_columns, vec!["z", "x", "y"]);
        assert!(!plan.has_discrepancies());
    }

    #[test]
    fn sets_are_disjoint() {
        let plan = TableMigrationPlan::compute(
            "t",
            &columns(&["id", "old_a", "shared", "old_b"]),
            &columns(&["new_a", "id", "shared"]),
        );

        for column in &plan.common_columns {
            assert!(!plan.source_only_columns.contains(column));
            assert!(!plan.target_only_columns.contains(column));
        }
        assert!(plan.source_only_columns.is_disjoint(&plan.target_only_columns));
    }

    #[test]
    fn projects_rows_onto_common_columns() {
        let plan = TableMigrationPlan::compute("t", &columns(&["a", "b", "c"]), &columns(&["c", "d", "b"]));

        assert_eq!(plan.project(&[1, 2, 3]), vec![2, 3]);
    }

    #[test]
    fn statements_name_every_column() {
        let plan = TableMigrationPlan::compute(
            "user",
            &columns(&["id", "order", "legacy"]),
            &columns(&["order", "id", "extra"]),
        );

        assert_eq!(plan.select_statement(), r#"SELECT "id", "order", "legacy" FROM "user""#);
        assert_eq!(plan.insert_statement(), r#"INSERT INTO "user" ("id", "order") VALUES (?, ?)"#);
    }
}
