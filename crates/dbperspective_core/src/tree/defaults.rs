//! Behavior shared by every node variant.

use super::{PerspectiveBaseTable, PerspectiveNode};
use crate::error::PerspectiveError;
use crate::load_request::{OrderByColumn, PerspectiveDataLoadProps};
use crate::schema::SchemaObject;
use crate::sql_tree::{Condition, Source};
use crate::value::{Row, Value, dedup_binding_values, row_value};
use indexmap::IndexSet;

/// Binding columns of a load request and the de-duplicated value tuples
/// taken from the parent rows.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Binding {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

impl Binding {
    /// `columns` are matched on the target table, `value_columns` are read
    /// from `parent_rows` in the same order.
    pub fn from_rows(columns: Vec<&str>, value_columns: &[&str], parent_rows: &[Row]) -> Self {
        let values = dedup_binding_values(parent_rows.iter().map(|row| {
            value_columns
                .iter()
                .map(|column| row_value(row, column))
                .collect::<Vec<_>>()
        }));

        Self {
            columns: columns.into_iter().map(str::to_string).collect(),
            values,
        }
    }
}

pub(super) fn load_props<'t>(
    node: &'t PerspectiveNode<'t>,
    object: SchemaObject<'t>,
    binding: Option<Binding>,
) -> Result<PerspectiveDataLoadProps, PerspectiveError> {
    let (binding_columns, binding_values) = match binding {
        Some(binding) => (Some(binding.columns), Some(binding.values)),
        None => (None, None),
    };

    let props = PerspectiveDataLoadProps {
        schema_name: object.schema().map(str::to_string),
        pure_name: object.name().to_string(),
        binding_columns,
        binding_values,
        data_columns: node
            .data_load_columns()
            .into_iter()
            .map(str::to_string)
            .collect(),
        database_config: node.database_config().to_config(),
        order_by: node.order_by(object)?,
        condition: node.children_condition(None),
    };

    log::trace!(
        "Load props for {}: {} data columns, {} binding tuples",
        node.unique_name(),
        props.data_columns.len(),
        props.binding_values.as_ref().map_or(0, Vec::len)
    );

    Ok(props)
}

/// Pairwise equality of `parent_columns` in `parent_row` and
/// `child_columns` in `child_row`, with SQL `=` semantics: a null or missing
/// cell on either side never matches.
pub(super) fn rows_match(
    parent_row: &Row,
    parent_columns: &[&str],
    child_row: &Row,
    child_columns: &[&str],
) -> bool {
    parent_columns.len() == child_columns.len()
        && parent_columns.iter().zip(child_columns).all(|(p, c)| {
            let (parent_value, child_value) = (row_value(parent_row, p), row_value(child_row, c));
            !parent_value.is_null() && parent_value == child_value
        })
}

pub(super) fn is_circular_under(parent: &PerspectiveNode<'_>, table_code: &str) -> bool {
    parent
        .parent()
        .is_some_and(|grandparent| grandparent.has_table_code(table_code))
}

pub(super) fn data_load_columns<'t>(node: &'t PerspectiveNode<'t>) -> IndexSet<&'t str> {
    let children = node.child_nodes();
    let mut columns = IndexSet::new();

    columns.extend(children.iter().filter_map(|child| child.child_data_column()));
    for child in children
        .iter()
        .filter(|child| child.is_expandable() && child.is_checked())
    {
        columns.extend(child.child_match_columns());
    }
    columns.extend(node.parent_match_columns());

    columns
}

pub(super) fn children_condition<'t>(
    node: &'t PerspectiveNode<'t>,
    source: Option<&Source>,
) -> Option<Condition> {
    let mut conditions: Vec<Condition> = node
        .child_nodes()
        .iter()
        .filter_map(|child| child.parse_filter_condition(source))
        .collect();
    conditions.extend(node.parent_filter_conditions());

    Condition::and_all(conditions)
}

/// User sort entries stored under the node, then the primary key, then the
/// first column.
pub(super) fn order_by<'t>(
    node: &'t PerspectiveNode<'t>,
    object: SchemaObject<'_>,
) -> Result<Vec<OrderByColumn>, PerspectiveError> {
    if let Some(entries) = node.config().sort.get(node.unique_name()) {
        let sorted: Vec<OrderByColumn> = node
            .child_nodes()
            .iter()
            .filter_map(|child| {
                let entry = entries
                    .iter()
                    .find(|e| e.unique_name == child.unique_name())?;
                Some(OrderByColumn {
                    column_name: child.column_name()?.to_string(),
                    direction: entry.order,
                })
            })
            .collect();

        if !sorted.is_empty() {
            return Ok(sorted);
        }
    }

    let primary_key = object.primary_key_columns();
    if !primary_key.is_empty() {
        return Ok(primary_key.into_iter().map(OrderByColumn::asc).collect());
    }

    match object.columns().first() {
        Some(column) => Ok(vec![OrderByColumn::asc(&column.name)]),
        None => Err(PerspectiveError::SchemaInconsistency(format!(
            "{} has no columns to order by",
            object.named_object().qualified_name()
        ))),
    }
}

pub(super) fn base_tables<'t>(node: &'t PerspectiveNode<'t>) -> Vec<PerspectiveBaseTable<'t>> {
    let mut result = Vec::new();

    if let Some(table) = node.base_table() {
        result.push(PerspectiveBaseTable { table, node });
    }

    for child in node.child_nodes() {
        if child.is_checked() {
            result.extend(child.base_tables());
        }
    }

    result
}

pub(super) fn find_child_node_by_unique_path<'t>(
    node: &'t PerspectiveNode<'t>,
    path: &[&str],
) -> Option<&'t PerspectiveNode<'t>> {
    let Some((first, rest)) = path.split_first() else {
        return Some(node);
    };

    node.child_nodes()
        .into_iter()
        .find(|child| child.code_name() == *first)?
        .find_child_node_by_unique_path(rest)
}
