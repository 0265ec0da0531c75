//! Correlated EXISTS subqueries for parent filters.
//!
//! A parent filter names a descendant node. The filters on that node's
//! children constrain every ancestor through a subquery that joins from the
//! descendant back up to the ancestor:
//!
//! ```text
//! EXISTS (SELECT * FROM leaf base_0
//!         INNER JOIN hop base_1 ON <leaf join>
//!         ...
//!         WHERE <last hop join to ancestor> AND <leaf filters on base_0>)
//! ```

use super::PerspectiveNode;
use crate::sql_tree::{Condition, FromSource, JoinType, Relation, Select, Source};

fn alias(index: usize) -> String {
    format!("base_{}", index)
}

pub(super) fn parent_filter_conditions<'t>(node: &'t PerspectiveNode<'t>) -> Vec<Condition> {
    let parent_filters = &node.config().parent_filters;
    if parent_filters.is_empty() {
        return Vec::new();
    }

    let root = node.root();

    parent_filters
        .iter()
        .filter_map(|parent_filter| {
            let Some(leaf) = root.find_node_by_unique_name(&parent_filter.unique_name) else {
                log::debug!("Parent filter {} does not resolve", parent_filter.unique_name);
                return None;
            };

            if leaf.unique_name() == node.unique_name() {
                return None;
            }

            if !leaf.supports_parent_filter() {
                log::debug!(
                    "Parent filter {} crosses a database boundary",
                    parent_filter.unique_name
                );
                return None;
            }

            exists_condition(node, leaf)
        })
        .collect()
}

/// Builds the EXISTS condition constraining `scope` by `leaf`, or `None`
/// when `leaf` is not a descendant of `scope`.
fn exists_condition<'t>(
    scope: &'t PerspectiveNode<'t>,
    leaf: &'t PerspectiveNode<'t>,
) -> Option<Condition> {
    let scope_object = scope.named_object()?;

    let mut from = FromSource {
        name: leaf.named_object()?,
        alias: alias(0),
        relations: Vec::new(),
    };

    let mut last_node = leaf;
    let mut last_alias = alias(0);

    loop {
        let parent = last_node.parent()?;
        if parent.unique_name() == scope.unique_name() {
            break;
        }

        let next_alias = alias(from.relations.len() + 1);
        from.relations.push(Relation {
            join_type: JoinType::Inner,
            alias: next_alias.clone(),
            name: parent.named_object()?,
            conditions: last_node.parent_join_condition(&last_alias, &next_alias),
        });

        last_node = parent;
        last_alias = next_alias;
    }

    let mut conditions = last_node.parent_join_condition(&last_alias, &scope_object.name);
    conditions.extend(leaf.children_condition(Some(&Source::alias(alias(0)))));

    log::trace!(
        "Parent filter {} under {}: {} join hops",
        leaf.unique_name(),
        scope.unique_name(),
        from.relations.len()
    );

    Some(Condition::Exists {
        sub_query: Box::new(Select {
            from,
            select_all: true,
            where_clause: Condition::and_all(conditions),
        }),
    })
}
