use super::{PerspectiveNode, TableNode, defaults};
use crate::error::PerspectiveError;
use crate::load_request::PerspectiveDataLoadProps;
use crate::schema::ForeignKeyInfo;
use crate::sql_tree::Condition;
use crate::value::Row;
use std::borrow::Cow;

/// Rows of another table whose foreign key points at the parent's rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceNode<'t> {
    /// The referencing table.
    pub table: TableNode<'t>,
    pub foreign_key: &'t ForeignKeyInfo,

    /// Set when the referencing table holds more than one FK to the parent's
    /// table; names then carry the FK columns to stay distinct.
    pub is_multiple: bool,
}

impl<'t> ReferenceNode<'t> {
    pub fn code_name(&self) -> Cow<'t, str> {
        if self.is_multiple {
            Cow::Owned(format!(
                "{}_{}",
                self.table.code_name(),
                self.foreign_key.columns.join("_")
            ))
        } else {
            self.table.code_name()
        }
    }

    pub fn title(&self) -> String {
        if self.is_multiple {
            format!(
                "{} ({})",
                self.table.title(),
                self.foreign_key.columns.join(", ")
            )
        } else {
            self.table.title().to_string()
        }
    }

    pub fn child_match_columns(&self) -> Vec<&'t str> {
        self.foreign_key
            .referenced_columns
            .iter()
            .map(String::as_str)
            .collect()
    }

    pub fn parent_match_columns(&self) -> Vec<&'t str> {
        self.foreign_key.columns.iter().map(String::as_str).collect()
    }

    /// `parent_alias.referenced_column = alias.column`
    pub fn parent_join_condition(&self, alias: &str, parent_alias: &str) -> Vec<Condition> {
        self.foreign_key
            .column_pairs()
            .map(|(column, referenced)| {
                Condition::columns_equal(referenced, parent_alias, column, alias)
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
