use super::{NodeIcon, PerspectiveNode, defaults};
use crate::error::PerspectiveError;
use crate::load_request::PerspectiveDataLoadProps;
use crate::schema::{
    ColumnInfo, DatabaseInfo, ForeignKeyInfo, NamedObjectInfo, SchemaObject, TableInfo, table_code,
};
use crate::sql_tree::{Condition, Expression, Source};
use crate::value::Row;

/// One column of a table or view.
///
/// A column carrying a single-column foreign key whose referenced table is
/// present in the same database can be expanded into that table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnNode<'t> {
    pub column: &'t ColumnInfo,
    pub object: SchemaObject<'t>,
    pub foreign_key: Option<&'t ForeignKeyInfo>,
    pub ref_table: Option<&'t TableInfo>,
}

impl<'t> ColumnNode<'t> {
    pub fn new(
        column: &'t ColumnInfo,
        object: SchemaObject<'t>,
        db: Option<&'t DatabaseInfo>,
    ) -> Self {
        let foreign_key = object
            .foreign_keys()
            .iter()
            .find(|fk| fk.is_single_column() && fk.columns[0] == column.name);

        let ref_table = foreign_key.and_then(|fk| {
            db?.find_table(fk.referenced_schema.as_deref(), &fk.referenced_table)
        });

        Self {
            column,
            object,
            foreign_key,
            ref_table,
        }
    }

    pub fn column_name(&self) -> &'t str {
        &self.column.name
    }

    /// Foreign key and referenced table, when both resolve.
    pub fn resolved_reference(&self) -> Option<(&'t ForeignKeyInfo, &'t TableInfo)> {
        self.foreign_key.zip(self.ref_table)
    }

    pub fn is_expandable(&self) -> bool {
        self.resolved_reference().is_some()
    }

    pub fn icon(&self, is_circular: bool) -> NodeIcon {
        if is_circular {
            NodeIcon::Circular
        } else if self.column.auto_increment {
            NodeIcon::AutoIncrement
        } else if self.foreign_key.is_some() {
            NodeIcon::ForeignKey
        } else {
            NodeIcon::Column
        }
    }

    /// The referenced table for FK columns, the owning table otherwise.
    pub fn table_code(&self) -> String {
        match self.foreign_key {
            Some(fk) => table_code(fk.referenced_schema.as_deref(), &fk.referenced_table),
            None => self.object.table_code(),
        }
    }

    pub fn named_object(&self) -> Option<NamedObjectInfo> {
        self.foreign_key
            .map(|fk| NamedObjectInfo::new(fk.referenced_schema.as_deref(), &fk.referenced_table))
    }

    pub fn child_match_columns(&self) -> Vec<&'t str> {
        self.foreign_key
            .map(|fk| vec![fk.columns[0].as_str()])
            .unwrap_or_default()
    }

    pub fn parent_match_columns(&self) -> Vec<&'t str> {
        self.foreign_key
            .map(|fk| vec![fk.referenced_columns[0].as_str()])
            .unwrap_or_default()
    }

    /// `parent_alias.column = alias.referenced_column`
    pub fn parent_join_condition(&self, alias: &str, parent_alias: &str) -> Vec<Condition> {
        let Some(fk) = self.foreign_key else {
            return Vec::new();
        };

        fk.column_pairs()
            .map(|(column, referenced)| {
                Condition::columns_equal(column, parent_alias, referenced, alias)
            })
            .collect()
    }

    /// Rewrites the placeholders of a parsed filter to this column.
    pub fn bind_filter(&self, mut condition: Condition, source: Option<&Source>) -> Condition {
        let column = Expression::column(self.column_name(), source.cloned());
        condition.replace_placeholders(&column);
        condition
    }

    pub(super) fn node_load_props(
        &self,
        node: &'t PerspectiveNode<'t>,
        parent_rows: &[Row],
    ) -> Result<Option<PerspectiveDataLoadProps>, PerspectiveError> {
        let Some((_, ref_table)) = self.resolved_reference() else {
            return Ok(None);
        };

        let binding = defaults::Binding::from_rows(
            node.parent_match_columns(),
            &node.child_match_columns(),
            parent_rows,
        );

        defaults::load_props(node, SchemaObject::Table(ref_table), Some(binding)).map(Some)
    }
}
