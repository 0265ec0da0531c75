use super::{PerspectiveNode, TableNode, defaults};
use crate::config::PerspectiveCustomJoinConfig;
use crate::error::PerspectiveError;
use crate::load_request::PerspectiveDataLoadProps;
use crate::sql_tree::Condition;
use crate::value::Row;

/// A user-declared join, possibly into another connection or database.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomJoinNode<'t> {
    pub table: TableNode<'t>,
    pub join: &'t PerspectiveCustomJoinConfig,
}

impl<'t> CustomJoinNode<'t> {
    pub fn joinid(&self) -> &'t str {
        &self.join.joinid
    }

    pub fn child_match_columns(&self) -> Vec<&'t str> {
        self.join
            .columns
            .iter()
            .map(|c| c.base_column_name.as_str())
            .collect()
    }

    pub fn parent_match_columns(&self) -> Vec<&'t str> {
        self.join
            .columns
            .iter()
            .map(|c| c.ref_column_name.as_str())
            .collect()
    }

    /// `parent_alias.base_column = alias.ref_column` for each declared pair.
    pub fn parent_join_condition(&self, alias: &str, parent_alias: &str) -> Vec<Condition> {
        self.join
            .columns
            .iter()
            .map(|c| {
                Condition::columns_equal(&c.base_column_name, parent_alias, &c.ref_column_name, alias)
            })
            .collect()
    }

    pub(super) fn node_load_props(
        &self,
        node: &'t PerspectiveNode<'t>,
        parent_rows: &[Row],
    ) -> Result<PerspectiveDataLoadProps, PerspectiveError> {
        let binding = defaults::Binding::from_rows(
            self.parent_match_columns(),
            &self.child_match_columns(),
            parent_rows,
        );

        defaults::load_props(node, self.table.object, Some(binding))
    }
}
