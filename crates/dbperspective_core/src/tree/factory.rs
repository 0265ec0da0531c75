//! Child enumeration: columns in schema order, then references to the table
//! sorted by title, then custom joins declared under the parent sorted by
//! title.

use super::{ColumnNode, CustomJoinNode, NodeKind, PerspectiveNode, ReferenceNode, TableNode, defaults};
use crate::load_request::DatabaseConfigRef;
use crate::schema::{DatabaseInfo, SchemaObject};

pub(super) fn child_nodes<'t>(
    parent: &'t PerspectiveNode<'t>,
    object: SchemaObject<'t>,
) -> Vec<&'t PerspectiveNode<'t>> {
    let db = parent.db();

    let mut result = column_nodes(parent, object, db);
    result.extend(reference_nodes(parent, object, db));
    result.extend(custom_join_nodes(parent));
    result
}

fn column_nodes<'t>(
    parent: &'t PerspectiveNode<'t>,
    object: SchemaObject<'t>,
    db: Option<&'t DatabaseInfo>,
) -> Vec<&'t PerspectiveNode<'t>> {
    let columns: Vec<ColumnNode<'t>> = object
        .columns()
        .iter()
        .map(|column| ColumnNode::new(column, object, db))
        .collect();

    let circular_columns: Vec<&str> = columns
        .iter()
        .filter(|column| defaults::is_circular_under(parent, &column.table_code()))
        .map(|column| column.column_name())
        .collect();

    let default_columns =
        parent
            .tree
            .column_selector
            .default_columns(object, db, &circular_columns);

    columns
        .into_iter()
        .map(|column| {
            let default_checked = default_columns.iter().any(|c| c == column.column_name());
            parent.tree.alloc_node(
                Some(parent),
                NodeKind::Column(column),
                parent.database_config,
                default_checked,
            )
        })
        .collect()
}

fn reference_nodes<'t>(
    parent: &'t PerspectiveNode<'t>,
    object: SchemaObject<'t>,
    db: Option<&'t DatabaseInfo>,
) -> Vec<&'t PerspectiveNode<'t>> {
    let Some(db) = db else {
        return Vec::new();
    };
    let dependencies = object.dependencies();

    let mut references: Vec<ReferenceNode<'t>> = dependencies
        .iter()
        .filter_map(|fk| {
            let Some(table) = db.find_table(fk.schema.as_deref(), &fk.table_name) else {
                log::debug!(
                    "Skipping reference {} from unknown table {}",
                    fk.name,
                    fk.table_name
                );
                return None;
            };

            let same_table = dependencies
                .iter()
                .filter(|other| other.is_owned_by(fk.schema.as_deref(), &fk.table_name))
                .count();

            Some(ReferenceNode {
                table: TableNode::new(SchemaObject::Table(table)),
                foreign_key: fk,
                is_multiple: same_table >= 2,
            })
        })
        .collect();

    references.sort_by_cached_key(ReferenceNode::title);

    references
        .into_iter()
        .map(|reference| {
            parent.tree.alloc_node(
                Some(parent),
                NodeKind::Reference(reference),
                parent.database_config,
                false,
            )
        })
        .collect()
}

fn custom_join_nodes<'t>(parent: &'t PerspectiveNode<'t>) -> Vec<&'t PerspectiveNode<'t>> {
    let mut joins: Vec<(CustomJoinNode<'t>, DatabaseConfigRef<'t>)> = parent
        .config()
        .custom_joins
        .iter()
        .filter(|join| join.base_unique_name == parent.unique_name())
        .filter_map(|join| {
            let database_config = DatabaseConfigRef {
                conid: join.conid.as_deref().unwrap_or(parent.database_config.conid),
                database: join
                    .database
                    .as_deref()
                    .unwrap_or(parent.database_config.database),
            };

            let object = parent
                .tree
                .database(database_config)
                .and_then(|db| db.find_object(join.ref_schema_name.as_deref(), &join.ref_table_name));

            let Some(object) = object else {
                log::debug!(
                    "Skipping custom join {} to unknown {} in {}/{}",
                    join.join_name,
                    join.ref_table_name,
                    database_config.conid,
                    database_config.database
                );
                return None;
            };

            Some((
                CustomJoinNode {
                    table: TableNode::new(object),
                    join,
                },
                database_config,
            ))
        })
        .collect();

    joins.sort_by(|(a, _), (b, _)| a.join.join_name.cmp(&b.join.join_name));

    joins
        .into_iter()
        .map(|(join, database_config)| {
            parent
                .tree
                .alloc_node(Some(parent), NodeKind::CustomJoin(join), database_config, false)
        })
        .collect()
}
