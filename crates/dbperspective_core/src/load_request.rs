use crate::sql_tree::Condition;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Connection and database a node's rows live in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub conid: String,
    pub database: String,
}

impl DatabaseConfig {
    pub fn new(conid: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            conid: conid.into(),
            database: database.into(),
        }
    }

    pub fn borrowed(&self) -> DatabaseConfigRef<'_> {
        DatabaseConfigRef {
            conid: &self.conid,
            database: &self.database,
        }
    }
}

/// Borrowed [`DatabaseConfig`], stored on tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatabaseConfigRef<'a> {
    pub conid: &'a str,
    pub database: &'a str,
}

impl DatabaseConfigRef<'_> {
    pub fn to_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.conid, self.database)
    }
}

/// Sort direction for ORDER BY clauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

/// Column with sort direction for ORDER BY clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderByColumn {
    pub column_name: String,
    #[serde(rename = "order")]
    pub direction: SortDirection,
}

impl OrderByColumn {
    pub fn asc(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Fetch request for the rows of one tree node.
///
/// When `binding_columns` is set, the executor restricts the target to rows
/// whose binding columns match one of the `binding_values` tuples; tuples are
/// already de-duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveDataLoadProps {
    #[serde(default)]
    pub schema_name: Option<String>,
    pub pure_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_columns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_values: Option<Vec<Vec<Value>>>,

    pub data_columns: Vec<String>,
    pub database_config: DatabaseConfig,
    pub order_by: Vec<OrderByColumn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl PerspectiveDataLoadProps {
    pub fn is_bound(&self) -> bool {
        self.binding_columns.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_serializes_sql_direction() {
        let json = serde_json::to_value(OrderByColumn::desc("created_at")).unwrap();
        assert_eq!(json["columnName"], "created_at");
        assert_eq!(json["order"], "DESC");
    }

    #[test]
    fn test_unbound_request_omits_binding_fields() {
        let props = PerspectiveDataLoadProps {
            schema_name: None,
            pure_name: "orders".to_string(),
            binding_columns: None,
            binding_values: None,
            data_columns: vec!["id".to_string()],
            database_config: DatabaseConfig::new("local", "shop"),
            order_by: vec![OrderByColumn::asc("id")],
            condition: None,
        };

        let json = serde_json::to_value(&props).unwrap();
        assert!(json.get("bindingColumns").is_none());
        assert!(json.get("condition").is_none());
        assert_eq!(json["databaseConfig"]["conid"], "local");
        assert!(!props.is_bound());
    }
}
