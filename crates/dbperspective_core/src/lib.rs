mod config;
mod default_columns;
mod error;
mod filter;
mod load_request;
mod schema;
mod schema_builder;
mod sql_tree;
mod store;
mod tree;
mod value;

pub use config::{
    ColumnSet, ConfigPatch, CustomJoinColumn, PerspectiveConfig, PerspectiveCustomJoinConfig,
    PerspectiveParentFilterConfig, PerspectiveSortEntry,
};
pub use default_columns::{DefaultColumnSelector, NameHeuristicSelector};
pub use error::PerspectiveError;
pub use filter::{DefaultFilterParser, FilterParser, FilterType, filter_type_for, parse_filter};
pub use load_request::{
    DatabaseConfig, DatabaseConfigRef, OrderByColumn, PerspectiveDataLoadProps, SortDirection,
};
pub use schema::{
    ColumnInfo, DatabaseInfo, ForeignKeyInfo, NamedObjectInfo, SchemaObject, SchemaSnapshot,
    TableInfo, ViewInfo, table_code,
};
pub use schema_builder::{
    ForeignKeyBuilder, ForeignKeyColumnRow, link_dependencies, link_snapshot_dependencies,
};
pub use sql_tree::{
    CompareOp, Condition, Expression, FromSource, JoinType, Relation, Select, Source,
};
pub use store::PerspectiveStore;
pub use tree::{
    ColumnNode, CustomJoinNode, NodeIcon, NodeKind, PerspectiveBaseTable,
    PerspectiveFilterColumnInfo, PerspectiveNode, PerspectiveTree, ReferenceNode, TableNode,
    UNIQUE_NAME_SEPARATOR,
};
pub use value::{Row, Value, binding_key, dedup_binding_values, row_value};
