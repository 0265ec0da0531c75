use crate::load_request::SortDirection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Column-name pair of a custom join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomJoinColumn {
    pub base_column_name: String,
    pub ref_column_name: String,
}

/// A user-declared join that is not implied by schema foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveCustomJoinConfig {
    pub joinid: String,
    pub join_name: String,

    /// Unique name of the node the join is attached under.
    pub base_unique_name: String,

    #[serde(default)]
    pub ref_schema_name: Option<String>,
    pub ref_table_name: String,

    pub columns: Vec<CustomJoinColumn>,

    /// Overrides the connection of the base node.
    #[serde(default)]
    pub conid: Option<String>,

    /// Overrides the database of the base node.
    #[serde(default)]
    pub database: Option<String>,
}

impl PerspectiveCustomJoinConfig {
    /// Creates a join with a fresh id in the base node's database.
    pub fn new(
        join_name: impl Into<String>,
        base_unique_name: impl Into<String>,
        ref_schema_name: Option<&str>,
        ref_table_name: impl Into<String>,
        columns: Vec<CustomJoinColumn>,
    ) -> Self {
        Self {
            joinid: Uuid::new_v4().to_string(),
            join_name: join_name.into(),
            base_unique_name: base_unique_name.into(),
            ref_schema_name: ref_schema_name.map(str::to_string),
            ref_table_name: ref_table_name.into(),
            columns,
            conid: None,
            database: None,
        }
    }

    /// Targets another connection and/or database.
    pub fn with_target(mut self, conid: Option<&str>, database: Option<&str>) -> Self {
        self.conid = conid.map(str::to_string);
        self.database = database.map(str::to_string);
        self
    }
}

/// Marks a descendant node whose filters also constrain its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveParentFilterConfig {
    pub unique_name: String,
}

/// Sort entry for one child of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveSortEntry {
    pub unique_name: String,
    pub order: SortDirection,
}

/// Persisted perspective state.
///
/// The column sets only store exceptions to each node's default: a node that
/// is checked by default appears in `unchecked_columns` once the user unchecks
/// it, never in `checked_columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerspectiveConfig {
    pub checked_columns: Vec<String>,
    pub unchecked_columns: Vec<String>,
    pub expanded_columns: Vec<String>,

    /// Filter text by node unique name.
    pub filters: BTreeMap<String, String>,

    /// Sort entries by parent unique name.
    pub sort: BTreeMap<String, Vec<PerspectiveSortEntry>>,

    pub custom_joins: Vec<PerspectiveCustomJoinConfig>,
    pub parent_filters: Vec<PerspectiveParentFilterConfig>,
}

/// The three unique-name sets of a [`PerspectiveConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSet {
    Expanded,
    Checked,
    Unchecked,
}

/// A requested configuration change.
///
/// The tree never mutates configuration; it returns patches for the host to
/// apply with [`PerspectiveConfig::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigPatch {
    IncludeInColumnSet {
        set: ColumnSet,
        unique_name: String,
    },
    ExcludeFromColumnSet {
        set: ColumnSet,
        unique_name: String,
    },
    SetFilter {
        unique_name: String,
        filter: Option<String>,
    },
    SetSort {
        parent_unique_name: String,
        entries: Vec<PerspectiveSortEntry>,
    },
    AddCustomJoin(PerspectiveCustomJoinConfig),
    RemoveCustomJoin {
        joinid: String,
    },
    AddParentFilter {
        unique_name: String,
    },
    RemoveParentFilter {
        unique_name: String,
    },
}

impl ConfigPatch {
    pub fn column_set(set: ColumnSet, unique_name: &str, include: bool) -> Self {
        let unique_name = unique_name.to_string();
        if include {
            ConfigPatch::IncludeInColumnSet { set, unique_name }
        } else {
            ConfigPatch::ExcludeFromColumnSet { set, unique_name }
        }
    }
}

impl PerspectiveConfig {
    pub fn column_set(&self, set: ColumnSet) -> &[String] {
        match set {
            ColumnSet::Expanded => &self.expanded_columns,
            ColumnSet::Checked => &self.checked_columns,
            ColumnSet::Unchecked => &self.unchecked_columns,
        }
    }

    fn column_set_mut(&mut self, set: ColumnSet) -> &mut Vec<String> {
        match set {
            ColumnSet::Expanded => &mut self.expanded_columns,
            ColumnSet::Checked => &mut self.checked_columns,
            ColumnSet::Unchecked => &mut self.unchecked_columns,
        }
    }

    pub fn contains(&self, set: ColumnSet, unique_name: &str) -> bool {
        self.column_set(set).iter().any(|n| n == unique_name)
    }

    pub fn filter(&self, unique_name: &str) -> Option<&str> {
        self.filters.get(unique_name).map(String::as_str)
    }

    pub fn is_parent_filter(&self, unique_name: &str) -> bool {
        self.parent_filters
            .iter()
            .any(|f| f.unique_name == unique_name)
    }

    /// Returns the configuration with `patch` applied.
    ///
    /// Including a name in the checked set removes it from the unchecked set
    /// and vice versa, so the two never overlap.
    pub fn apply(&self, patch: &ConfigPatch) -> PerspectiveConfig {
        let mut next = self.clone();

        match patch {
            ConfigPatch::IncludeInColumnSet { set, unique_name } => {
                let opposite = match set {
                    ColumnSet::Checked => Some(ColumnSet::Unchecked),
                    ColumnSet::Unchecked => Some(ColumnSet::Checked),
                    ColumnSet::Expanded => None,
                };
                if let Some(opposite) = opposite {
                    next.column_set_mut(opposite).retain(|n| n != unique_name);
                }

                let target = next.column_set_mut(*set);
                if !target.contains(unique_name) {
                    target.push(unique_name.clone());
                }
            }
            ConfigPatch::ExcludeFromColumnSet { set, unique_name } => {
                next.column_set_mut(*set).retain(|n| n != unique_name);
            }
            ConfigPatch::SetFilter {
                unique_name,
                filter: Some(filter),
            } if !filter.trim().is_empty() => {
                next.filters.insert(unique_name.clone(), filter.clone());
            }
            ConfigPatch::SetFilter { unique_name, .. } => {
                next.filters.remove(unique_name);
            }
            ConfigPatch::SetSort {
                parent_unique_name,
                entries,
            } => {
                if entries.is_empty() {
                    next.sort.remove(parent_unique_name);
                } else {
                    next.sort.insert(parent_unique_name.clone(), entries.clone());
                }
            }
            ConfigPatch::AddCustomJoin(join) => {
                next.custom_joins.retain(|j| j.joinid != join.joinid);
                next.custom_joins.push(join.clone());
            }
            ConfigPatch::RemoveCustomJoin { joinid } => {
                next.custom_joins.retain(|j| &j.joinid != joinid);
            }
            ConfigPatch::AddParentFilter { unique_name } => {
                if !next.is_parent_filter(unique_name) {
                    next.parent_filters.push(PerspectiveParentFilterConfig {
                        unique_name: unique_name.clone(),
                    });
                }
            }
            ConfigPatch::RemoveParentFilter { unique_name } => {
                next.parent_filters.retain(|f| &f.unique_name != unique_name);
            }
        }

        next
    }

    pub fn apply_all<'p>(&self, patches: impl IntoIterator<Item = &'p ConfigPatch>) -> Self {
        patches
            .into_iter()
            .fold(self.clone(), |config, patch| config.apply(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_is_idempotent() {
        let patch = ConfigPatch::column_set(ColumnSet::Expanded, "orders::customer_id", true);
        let config = PerspectiveConfig::default().apply(&patch).apply(&patch);

        assert_eq!(config.expanded_columns, vec!["orders::customer_id"]);
    }

    #[test]
    fn test_checked_and_unchecked_are_exclusive() {
        let config = PerspectiveConfig::default()
            .apply(&ConfigPatch::column_set(ColumnSet::Checked, "a::b", true))
            .apply(&ConfigPatch::column_set(ColumnSet::Unchecked, "a::b", true));

        assert!(!config.contains(ColumnSet::Checked, "a::b"));
        assert!(config.contains(ColumnSet::Unchecked, "a::b"));
    }

    #[test]
    fn test_exclude_removes_all_occurrences() {
        let config = PerspectiveConfig {
            expanded_columns: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            ..Default::default()
        };

        let next = config.apply(&ConfigPatch::column_set(ColumnSet::Expanded, "a", false));
        assert_eq!(next.expanded_columns, vec!["b"]);
        assert_eq!(config.expanded_columns.len(), 3);
    }

    #[test]
    fn test_blank_filter_clears() {
        let config = PerspectiveConfig::default()
            .apply(&ConfigPatch::SetFilter {
                unique_name: "orders::total".to_string(),
                filter: Some(">100".to_string()),
            })
            .apply(&ConfigPatch::SetFilter {
                unique_name: "orders::total".to_string(),
                filter: Some("  ".to_string()),
            });

        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_custom_join_lifecycle() {
        let join = PerspectiveCustomJoinConfig::new(
            "Notes",
            "customers",
            None,
            "notes",
            vec![CustomJoinColumn {
                base_column_name: "id".to_string(),
                ref_column_name: "customer_id".to_string(),
            }],
        );
        let joinid = join.joinid.clone();

        let config = PerspectiveConfig::default().apply(&ConfigPatch::AddCustomJoin(join));
        assert_eq!(config.custom_joins.len(), 1);

        let config = config.apply(&ConfigPatch::RemoveCustomJoin { joinid });
        assert!(config.custom_joins.is_empty());
    }

    #[test]
    fn test_deserializes_camel_case_with_defaults() {
        let json = r#"{
            "checkedColumns": ["orders::total"],
            "filters": {"orders::total": ">100"},
            "parentFilters": [{"uniqueName": "customers::orders"}]
        }"#;

        let config: PerspectiveConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.checked_columns, vec!["orders::total"]);
        assert_eq!(config.filter("orders::total"), Some(">100"));
        assert!(config.is_parent_filter("customers::orders"));
        assert!(config.custom_joins.is_empty());
    }
}
