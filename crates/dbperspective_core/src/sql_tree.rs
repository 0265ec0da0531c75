//! Dialect-free SQL condition and select structures.
//!
//! These are handed to an external compiler that renders dialect-specific SQL
//! text; nothing in this crate produces query strings.

use crate::Value;
use crate::schema::NamedObjectInfo;
use serde::{Deserialize, Serialize};

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// Table reference an expression is resolved against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<NamedObjectInfo>,
}

impl Source {
    pub fn alias(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "exprType", rename_all = "camelCase")]
pub enum Expression {
    #[serde(rename_all = "camelCase")]
    Column {
        column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Source>,
    },
    Value {
        value: Value,
    },
    /// Stands for "the filtered column" until a node rewrites it.
    Placeholder,
}

impl Expression {
    pub fn column(column_name: impl Into<String>, source: Option<Source>) -> Self {
        Expression::Column {
            column_name: column_name.into(),
            source,
        }
    }

    pub fn value(value: Value) -> Self {
        Expression::Value { value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "conditionType", rename_all = "camelCase")]
pub enum Condition {
    Binary {
        operator: CompareOp,
        left: Expression,
        right: Expression,
    },
    And {
        conditions: Vec<Condition>,
    },
    Or {
        conditions: Vec<Condition>,
    },
    IsNull {
        expr: Expression,
    },
    IsNotNull {
        expr: Expression,
    },
    Like {
        left: Expression,
        right: Expression,
    },
    NotLike {
        left: Expression,
        right: Expression,
    },
    #[serde(rename_all = "camelCase")]
    Exists {
        sub_query: Box<Select>,
    },
}

impl Condition {
    pub fn binary(operator: CompareOp, left: Expression, right: Expression) -> Self {
        Condition::Binary {
            operator,
            left,
            right,
        }
    }

    /// `parent_alias.left_column = alias.right_column`
    pub fn columns_equal(
        left_column: &str,
        left_alias: &str,
        right_column: &str,
        right_alias: &str,
    ) -> Self {
        Condition::binary(
            CompareOp::Eq,
            Expression::column(left_column, Some(Source::alias(left_alias))),
            Expression::column(right_column, Some(Source::alias(right_alias))),
        )
    }

    /// Conjunction that never produces a degenerate AND.
    ///
    /// Returns `None` for no conditions and the bare condition for one.
    pub fn and_all(mut conditions: Vec<Condition>) -> Option<Condition> {
        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Condition::And { conditions }),
        }
    }

    /// Disjunction with the same collapsing rules as [`Condition::and_all`].
    pub fn or_all(mut conditions: Vec<Condition>) -> Option<Condition> {
        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Condition::Or { conditions }),
        }
    }

    pub fn is_exists(&self) -> bool {
        matches!(self, Condition::Exists { .. })
    }

    /// Rewrites every placeholder expression to `replacement`.
    ///
    /// Subqueries are left untouched.
    pub fn replace_placeholders(&mut self, replacement: &Expression) {
        let replace = |expr: &mut Expression| {
            if matches!(expr, Expression::Placeholder) {
                *expr = replacement.clone();
            }
        };

        match self {
            Condition::Binary { left, right, .. }
            | Condition::Like { left, right }
            | Condition::NotLike { left, right } => {
                replace(left);
                replace(right);
            }
            Condition::IsNull { expr } | Condition::IsNotNull { expr } => replace(expr),
            Condition::And { conditions } | Condition::Or { conditions } => {
                for condition in conditions {
                    condition.replace_placeholders(replacement);
                }
            }
            Condition::Exists { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    #[serde(rename = "INNER JOIN")]
    Inner,
}

/// One joined relation of a FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub join_type: JoinType,
    pub alias: String,
    pub name: NamedObjectInfo,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromSource {
    pub name: NamedObjectInfo,
    pub alias: String,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Select {
    pub from: FromSource,
    pub select_all: bool,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(column: &str, value: i64) -> Condition {
        Condition::binary(
            CompareOp::Eq,
            Expression::column(column, None),
            Expression::value(Value::Int(value)),
        )
    }

    #[test]
    fn test_and_all_collapses() {
        assert_eq!(Condition::and_all(Vec::new()), None);
        assert_eq!(Condition::and_all(vec![eq("a", 1)]), Some(eq("a", 1)));
        assert!(matches!(
            Condition::and_all(vec![eq("a", 1), eq("b", 2)]),
            Some(Condition::And { conditions }) if conditions.len() == 2
        ));
    }

    #[test]
    fn test_replace_placeholders_nested() {
        let mut condition = Condition::Or {
            conditions: vec![
                Condition::IsNull {
                    expr: Expression::Placeholder,
                },
                Condition::binary(
                    CompareOp::Gt,
                    Expression::Placeholder,
                    Expression::value(Value::Int(5)),
                ),
            ],
        };

        let column = Expression::column("qty", Some(Source::alias("base_0")));
        condition.replace_placeholders(&column);

        let Condition::Or { conditions } = condition else {
            panic!("expected OR");
        };
        assert_eq!(conditions[0], Condition::IsNull { expr: column.clone() });
        assert!(matches!(&conditions[1], Condition::Binary { left, .. } if *left == column));
    }

    #[test]
    fn test_serializes_tagged() {
        let json = serde_json::to_value(eq("id", 7)).unwrap();
        assert_eq!(json["conditionType"], "binary");
        assert_eq!(json["operator"], "=");
        assert_eq!(json["left"]["exprType"], "column");
        assert_eq!(json["left"]["columnName"], "id");
    }

    #[test]
    fn test_exists_subquery_serializes_inner_joins() {
        let exists = Condition::Exists {
            sub_query: Box::new(Select {
                from: FromSource {
                    name: NamedObjectInfo::new(None, "order_items"),
                    alias: "base_0".to_string(),
                    relations: vec![Relation {
                        join_type: JoinType::Inner,
                        alias: "base_1".to_string(),
                        name: NamedObjectInfo::new(None, "orders"),
                        conditions: vec![Condition::columns_equal("id", "base_1", "order_id", "base_0")],
                    }],
                },
                select_all: true,
                where_clause: None,
            }),
        };

        let json = serde_json::to_value(&exists).unwrap();
        assert_eq!(json["conditionType"], "exists");
        assert_eq!(json["subQuery"]["from"]["relations"][0]["joinType"], "INNER JOIN");
        assert!(json["subQuery"].get("where").is_none());
    }
}
