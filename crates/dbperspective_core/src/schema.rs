use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column metadata within a table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,

    /// Database-specific type (e.g., "integer", "varchar(255)").
    pub type_name: String,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub is_primary_key: bool,

    #[serde(default)]
    pub auto_increment: bool,

    /// Default value expression, if any.
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Foreign key constraint.
///
/// `columns` and `referenced_columns` are parallel lists: the column at index
/// `i` references the referenced column at the same index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub name: String,

    /// Schema of the table owning the constraint.
    #[serde(default)]
    pub schema: Option<String>,

    /// Table owning the constraint (the referencing side).
    pub table_name: String,

    pub columns: Vec<String>,

    #[serde(default)]
    pub referenced_schema: Option<String>,

    pub referenced_table: String,

    pub referenced_columns: Vec<String>,

    #[serde(default)]
    pub on_update: Option<String>,

    #[serde(default)]
    pub on_delete: Option<String>,
}

impl ForeignKeyInfo {
    pub fn is_single_column(&self) -> bool {
        self.columns.len() == 1 && self.referenced_columns.len() == 1
    }

    /// Column pairs `(column, referenced_column)` in declaration order.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.referenced_columns.iter())
            .map(|(c, r)| (c.as_str(), r.as_str()))
    }

    pub fn references(&self, schema: Option<&str>, table: &str) -> bool {
        self.referenced_schema.as_deref() == schema && self.referenced_table == table
    }

    pub fn is_owned_by(&self, schema: Option<&str>, table: &str) -> bool {
        self.schema.as_deref() == schema && self.table_name == table
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,

    /// Schema name (PostgreSQL, SQL Server) or `None` (SQLite, MySQL).
    #[serde(default)]
    pub schema: Option<String>,

    pub columns: Vec<ColumnInfo>,

    /// Foreign keys declared on this table.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,

    /// Foreign keys of other tables that reference this table.
    #[serde(default)]
    pub dependencies: Vec<ForeignKeyInfo>,
}

impl TableInfo {
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// View metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewInfo {
    pub name: String,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// Schema + name of a table or view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedObjectInfo {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
}

impl NamedObjectInfo {
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.into(),
        }
    }

    /// Parses `schema.table` or `table`.
    pub fn from_qualified(qualified_name: &str) -> Self {
        match qualified_name.split_once('.') {
            Some((schema, table)) => Self::new(Some(schema), table),
            None => Self::new(None, qualified_name),
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }
}

/// Structure of one database: its tables and views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(default)]
    pub tables: Vec<TableInfo>,

    #[serde(default)]
    pub views: Vec<ViewInfo>,
}

impl DatabaseInfo {
    pub fn find_table(&self, schema: Option<&str>, name: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.name == name && t.schema.as_deref() == schema)
    }

    pub fn find_view(&self, schema: Option<&str>, name: &str) -> Option<&ViewInfo> {
        self.views
            .iter()
            .find(|v| v.name == name && v.schema.as_deref() == schema)
    }

    /// Finds a table, falling back to a view of the same name.
    pub fn find_object(&self, schema: Option<&str>, name: &str) -> Option<SchemaObject<'_>> {
        self.find_table(schema, name)
            .map(SchemaObject::Table)
            .or_else(|| self.find_view(schema, name).map(SchemaObject::View))
    }
}

/// Multi-database schema snapshot: connection id → database name → structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot {
    pub connections: BTreeMap<String, BTreeMap<String, DatabaseInfo>>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database(&self, conid: &str, database: &str) -> Option<&DatabaseInfo> {
        self.connections.get(conid)?.get(database)
    }

    pub fn insert_database(
        &mut self,
        conid: impl Into<String>,
        database: impl Into<String>,
        info: DatabaseInfo,
    ) {
        self.connections
            .entry(conid.into())
            .or_default()
            .insert(database.into(), info);
    }

    pub fn with_database(
        mut self,
        conid: impl Into<String>,
        database: impl Into<String>,
        info: DatabaseInfo,
    ) -> Self {
        self.insert_database(conid, database, info);
        self
    }

    pub fn databases_mut(&mut self) -> impl Iterator<Item = &mut DatabaseInfo> {
        self.connections.values_mut().flat_map(|dbs| dbs.values_mut())
    }
}

/// Borrowed table-or-view reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaObject<'a> {
    Table(&'a TableInfo),
    View(&'a ViewInfo),
}

impl<'a> SchemaObject<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            SchemaObject::Table(t) => &t.name,
            SchemaObject::View(v) => &v.name,
        }
    }

    pub fn schema(&self) -> Option<&'a str> {
        match self {
            SchemaObject::Table(t) => t.schema.as_deref(),
            SchemaObject::View(v) => v.schema.as_deref(),
        }
    }

    pub fn columns(&self) -> &'a [ColumnInfo] {
        match self {
            SchemaObject::Table(t) => &t.columns,
            SchemaObject::View(v) => &v.columns,
        }
    }

    /// Views never carry keys.
    pub fn primary_key_columns(&self) -> Vec<&'a str> {
        match self {
            SchemaObject::Table(t) => t.primary_key_columns(),
            SchemaObject::View(_) => Vec::new(),
        }
    }

    pub fn foreign_keys(&self) -> &'a [ForeignKeyInfo] {
        match self {
            SchemaObject::Table(t) => &t.foreign_keys,
            SchemaObject::View(_) => &[],
        }
    }

    pub fn dependencies(&self) -> &'a [ForeignKeyInfo] {
        match self {
            SchemaObject::Table(t) => &t.dependencies,
            SchemaObject::View(_) => &[],
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, SchemaObject::View(_))
    }

    pub fn named_object(&self) -> NamedObjectInfo {
        NamedObjectInfo::new(self.schema(), self.name())
    }

    /// Physical identity used for circular-reference detection.
    pub fn table_code(&self) -> String {
        table_code(self.schema(), self.name())
    }
}

pub fn table_code(schema: Option<&str>, name: &str) -> String {
    format!("{}|{}", schema.unwrap_or_default(), name)
}
