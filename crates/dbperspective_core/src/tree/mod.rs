//! Perspective tree over a schema snapshot.
//!
//! A [`PerspectiveTree`] owns an arena; every [`PerspectiveNode`] it hands out
//! lives in that arena and refers to its parent through a plain shared
//! reference. Each position is built the first time it is reached and reused
//! afterwards, so repeated queries against one tree allocate nothing new.
//! Trees built from identical inputs yield structurally equal nodes.

mod column;
mod custom_join;
mod defaults;
mod factory;
mod parent_filter;
mod reference;
mod table;

pub use column::ColumnNode;
pub use custom_join::CustomJoinNode;
pub use reference::ReferenceNode;
pub use table::TableNode;

use crate::config::{ColumnSet, ConfigPatch, PerspectiveConfig, PerspectiveCustomJoinConfig};
use crate::default_columns::{DefaultColumnSelector, NameHeuristicSelector};
use crate::error::PerspectiveError;
use crate::filter::{DefaultFilterParser, FilterParser, FilterType};
use crate::load_request::{DatabaseConfig, DatabaseConfigRef, OrderByColumn, PerspectiveDataLoadProps};
use crate::schema::{DatabaseInfo, ForeignKeyInfo, NamedObjectInfo, SchemaObject, SchemaSnapshot};
use crate::sql_tree::{Condition, Source};
use crate::value::Row;
use bumpalo::Bump;
use indexmap::IndexSet;
use serde::Serialize;
use std::borrow::Cow;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;

/// Joins a parent's unique name and a child's code name.
pub const UNIQUE_NAME_SEPARATOR: &str = "::";

/// Entry point: the inputs a perspective is computed from, plus the node arena.
pub struct PerspectiveTree<'a> {
    arena: Bump,
    snapshot: &'a SchemaSnapshot,
    config: &'a PerspectiveConfig,
    database_config: DatabaseConfig,
    root_object: NamedObjectInfo,
    column_selector: &'a dyn DefaultColumnSelector,
    filter_parser: &'a dyn FilterParser,
    root: OnceCell<Option<&'a PerspectiveNode<'a>>>,
    children: RefCell<HashMap<&'a str, Vec<&'a PerspectiveNode<'a>>>>,
}

impl<'a> PerspectiveTree<'a> {
    pub fn new(
        snapshot: &'a SchemaSnapshot,
        config: &'a PerspectiveConfig,
        database_config: DatabaseConfig,
        root_object: NamedObjectInfo,
    ) -> Self {
        Self {
            arena: Bump::new(),
            snapshot,
            config,
            database_config,
            root_object,
            column_selector: &NameHeuristicSelector,
            filter_parser: &DefaultFilterParser,
            root: OnceCell::new(),
            children: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_column_selector(mut self, selector: &'a dyn DefaultColumnSelector) -> Self {
        self.column_selector = selector;
        self
    }

    pub fn with_filter_parser(mut self, parser: &'a dyn FilterParser) -> Self {
        self.filter_parser = parser;
        self
    }

    pub fn snapshot(&self) -> &'a SchemaSnapshot {
        self.snapshot
    }

    pub fn config(&self) -> &'a PerspectiveConfig {
        self.config
    }

    pub fn database_config(&self) -> &DatabaseConfig {
        &self.database_config
    }

    pub fn root_object(&self) -> &NamedObjectInfo {
        &self.root_object
    }

    /// The root node, or `None` when the root table or view is not part of
    /// the snapshot.
    pub fn root(&'a self) -> Option<&'a PerspectiveNode<'a>> {
        *self.root.get_or_init(|| self.build_root())
    }

    pub fn find_node_by_unique_name(&'a self, unique_name: &str) -> Option<&'a PerspectiveNode<'a>> {
        self.root()?.find_node_by_unique_name(unique_name)
    }

    /// Bytes held by the node arena.
    pub fn allocated_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    fn build_root(&'a self) -> Option<&'a PerspectiveNode<'a>> {
        let database_config = self.database_config.borrowed();

        let Some(object) = self.database(database_config).and_then(|db| {
            db.find_object(self.root_object.schema.as_deref(), &self.root_object.name)
        }) else {
            log::debug!(
                "Perspective root {} not found in {}/{}",
                self.root_object.qualified_name(),
                database_config.conid,
                database_config.database
            );
            return None;
        };

        Some(self.alloc_node(
            None,
            NodeKind::Table(TableNode::new(object)),
            database_config,
            false,
        ))
    }

    /// Children of `parent`, built by `build` on first request.
    fn children_of(
        &'a self,
        parent: &'a PerspectiveNode<'a>,
        build: impl FnOnce() -> Vec<&'a PerspectiveNode<'a>>,
    ) -> Vec<&'a PerspectiveNode<'a>> {
        if let Some(children) = self.children.borrow().get(parent.unique_name) {
            return children.clone();
        }

        let children = build();
        self.children
            .borrow_mut()
            .insert(parent.unique_name, children.clone());
        children
    }

    fn database(&self, database_config: DatabaseConfigRef<'_>) -> Option<&'a DatabaseInfo> {
        self.snapshot
            .database(database_config.conid, database_config.database)
    }

    fn alloc_node(
        &'a self,
        parent: Option<&'a PerspectiveNode<'a>>,
        kind: NodeKind<'a>,
        database_config: DatabaseConfigRef<'a>,
        default_checked: bool,
    ) -> &'a PerspectiveNode<'a> {
        let code_name: &'a str = match kind.code_name() {
            Cow::Borrowed(name) => name,
            Cow::Owned(name) => self.arena.alloc_str(&name),
        };

        let unique_name: &'a str = match parent {
            Some(parent) => self.arena.alloc_str(&format!(
                "{}{}{}",
                parent.unique_name, UNIQUE_NAME_SEPARATOR, code_name
            )),
            None => code_name,
        };

        self.arena.alloc(PerspectiveNode {
            tree: self,
            parent,
            kind,
            code_name,
            unique_name,
            level: parent.map_or(0, |p| p.level + 1),
            database_config,
            default_checked,
        })
    }
}

impl fmt::Debug for PerspectiveTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerspectiveTree")
            .field("database_config", &self.database_config)
            .field("root_object", &self.root_object)
            .field("allocated_bytes", &self.arena.allocated_bytes())
            .field("built_parents", &self.children.borrow().len())
            .finish()
    }
}

/// Variant-specific part of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind<'t> {
    Table(TableNode<'t>),
    Column(ColumnNode<'t>),
    Reference(ReferenceNode<'t>),
    CustomJoin(CustomJoinNode<'t>),
}

impl<'t> NodeKind<'t> {
    fn code_name(&self) -> Cow<'t, str> {
        match self {
            NodeKind::Table(table) => table.code_name(),
            NodeKind::Column(column) => Cow::Borrowed(column.column_name()),
            NodeKind::Reference(reference) => reference.code_name(),
            NodeKind::CustomJoin(join) => Cow::Borrowed(join.joinid()),
        }
    }

    /// Table or view this node enumerates children from.
    fn children_object(&self) -> Option<SchemaObject<'t>> {
        match self {
            NodeKind::Table(table) => Some(table.object),
            NodeKind::Column(column) => column.ref_table.map(SchemaObject::Table),
            NodeKind::Reference(reference) => Some(reference.table.object),
            NodeKind::CustomJoin(join) => Some(join.table.object),
        }
    }
}

/// Icon hint for tree renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeIcon {
    Table,
    View,
    Column,
    ForeignKey,
    AutoIncrement,
    Circular,
    CustomJoin,
}

/// Filter metadata of a column node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveFilterColumnInfo {
    pub column_name: String,
    pub filter_type: FilterType,
    pub pure_name: String,
    pub schema_name: Option<String>,
    pub foreign_key: Option<ForeignKeyInfo>,
}

/// A physical table participating in a perspective, with the node it
/// belongs to.
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveBaseTable<'t> {
    pub table: SchemaObject<'t>,
    pub node: &'t PerspectiveNode<'t>,
}

/// One position in the perspective tree.
pub struct PerspectiveNode<'t> {
    tree: &'t PerspectiveTree<'t>,
    parent: Option<&'t PerspectiveNode<'t>>,
    kind: NodeKind<'t>,
    code_name: &'t str,
    unique_name: &'t str,
    level: usize,
    database_config: DatabaseConfigRef<'t>,
    default_checked: bool,
}

impl<'t> PerspectiveNode<'t> {
    pub fn kind(&self) -> &NodeKind<'t> {
        &self.kind
    }

    /// Identifier unique among siblings.
    pub fn code_name(&self) -> &'t str {
        self.code_name
    }

    /// Path of code names from the root, joined by [`UNIQUE_NAME_SEPARATOR`].
    pub fn unique_name(&self) -> &'t str {
        self.unique_name
    }

    pub fn title(&self) -> String {
        match &self.kind {
            NodeKind::Table(table) => table.title().to_string(),
            NodeKind::Column(column) => column.column_name().to_string(),
            NodeKind::Reference(reference) => reference.title(),
            NodeKind::CustomJoin(join) => join.join.join_name.clone(),
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn parent(&self) -> Option<&'t PerspectiveNode<'t>> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn root(&'t self) -> &'t PerspectiveNode<'t> {
        match self.parent {
            Some(parent) => parent.root(),
            None => self,
        }
    }

    pub fn database_config(&self) -> DatabaseConfigRef<'t> {
        self.database_config
    }

    /// Structure of the database this node's rows live in.
    pub fn db(&self) -> Option<&'t DatabaseInfo> {
        self.tree.database(self.database_config)
    }

    pub fn config(&self) -> &'t PerspectiveConfig {
        self.tree.config
    }

    pub fn is_expandable(&self) -> bool {
        match &self.kind {
            NodeKind::Column(column) => column.is_expandable(),
            NodeKind::Table(_) | NodeKind::Reference(_) | NodeKind::CustomJoin(_) => true,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.config().contains(ColumnSet::Expanded, self.unique_name)
    }

    pub fn default_checked(&self) -> bool {
        self.default_checked
    }

    pub fn is_checked(&self) -> bool {
        let config = self.config();
        if config.contains(ColumnSet::Checked, self.unique_name) {
            true
        } else if config.contains(ColumnSet::Unchecked, self.unique_name) {
            false
        } else {
            self.default_checked
        }
    }

    /// Patch that sets the expanded state, or flips it when `value` is `None`.
    pub fn toggle_expanded(&self, value: Option<bool>) -> ConfigPatch {
        let expanded = value.unwrap_or(!self.is_expanded());
        ConfigPatch::column_set(ColumnSet::Expanded, self.unique_name, expanded)
    }

    /// Patch that sets the checked state, or flips it when `value` is `None`.
    ///
    /// Only the deviation from `default_checked` is recorded.
    pub fn toggle_checked(&self, value: Option<bool>) -> ConfigPatch {
        let checked = value.unwrap_or(!self.is_checked());
        if self.default_checked {
            ConfigPatch::column_set(ColumnSet::Unchecked, self.unique_name, !checked)
        } else {
            ConfigPatch::column_set(ColumnSet::Checked, self.unique_name, checked)
        }
    }

    pub fn set_filter(&self, filter: Option<&str>) -> ConfigPatch {
        ConfigPatch::SetFilter {
            unique_name: self.unique_name.to_string(),
            filter: filter.map(str::to_string),
        }
    }

    pub fn child_nodes(&'t self) -> Vec<&'t PerspectiveNode<'t>> {
        match self.kind.children_object() {
            Some(object) => self
                .tree
                .children_of(self, || factory::child_nodes(self, object)),
            None => Vec::new(),
        }
    }

    pub fn icon(&self) -> NodeIcon {
        match &self.kind {
            NodeKind::Table(table) | NodeKind::Reference(ReferenceNode { table, .. }) => {
                table.icon()
            }
            NodeKind::Column(column) => column.icon(self.is_circular()),
            NodeKind::CustomJoin(_) => NodeIcon::CustomJoin,
        }
    }

    /// Physical table this node stands for, as `schema|name`.
    pub fn table_code(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Table(table)
            | NodeKind::Reference(ReferenceNode { table, .. })
            | NodeKind::CustomJoin(CustomJoinNode { table, .. }) => Some(table.table_code()),
            NodeKind::Column(column) => Some(column.table_code()),
        }
    }

    /// Whether this node or any of its ancestors stands for `code`.
    pub fn has_table_code(&self, code: &str) -> bool {
        self.table_code().as_deref() == Some(code)
            || self.parent.is_some_and(|parent| parent.has_table_code(code))
    }

    /// A column is circular when its table already appears at its
    /// grandparent or above.
    pub fn is_circular(&self) -> bool {
        match &self.kind {
            NodeKind::Column(column) => {
                self.parent
                    .is_some_and(|parent| defaults::is_circular_under(parent, &column.table_code()))
            }
            _ => false,
        }
    }

    pub fn named_object(&self) -> Option<NamedObjectInfo> {
        match &self.kind {
            NodeKind::Table(table)
            | NodeKind::Reference(ReferenceNode { table, .. })
            | NodeKind::CustomJoin(CustomJoinNode { table, .. }) => {
                Some(table.object.named_object())
            }
            NodeKind::Column(column) => column.named_object(),
        }
    }

    pub fn column_name(&self) -> Option<&'t str> {
        match &self.kind {
            NodeKind::Column(column) => Some(column.column_name()),
            _ => None,
        }
    }

    /// Key under which a renderer stores this node's value in a row.
    pub fn field_name(&self) -> Cow<'t, str> {
        match &self.kind {
            NodeKind::Column(column) => Cow::Owned(format!("{}Ref", column.column_name())),
            _ => Cow::Borrowed(self.code_name),
        }
    }

    pub fn filter_type(&self) -> FilterType {
        match &self.kind {
            NodeKind::Column(column) => self.tree.filter_parser.filter_type(&column.column.type_name),
            _ => FilterType::String,
        }
    }

    pub fn filter(&self) -> Option<&'t str> {
        self.config().filter(self.unique_name)
    }

    pub fn filter_info(&self) -> Option<PerspectiveFilterColumnInfo> {
        let NodeKind::Column(column) = &self.kind else {
            return None;
        };

        Some(PerspectiveFilterColumnInfo {
            column_name: column.column_name().to_string(),
            filter_type: self.filter_type(),
            pure_name: column.object.name().to_string(),
            schema_name: column.object.schema().map(str::to_string),
            foreign_key: column.foreign_key.cloned(),
        })
    }

    pub fn custom_join_config(&self) -> Option<&'t PerspectiveCustomJoinConfig> {
        match &self.kind {
            NodeKind::CustomJoin(join) => Some(join.join),
            _ => None,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(&self.kind, NodeKind::Reference(reference) if reference.is_multiple)
    }

    /// Column this node contributes to its parent's select list.
    pub fn child_data_column(&self) -> Option<&'t str> {
        if !self.is_expandable() && self.is_checked() {
            Some(self.code_name)
        } else {
            None
        }
    }

    /// This node's filter, with its placeholder bound to the node's column.
    ///
    /// Only column nodes carry filters. Unparseable filters are logged and
    /// ignored.
    pub fn parse_filter_condition(&self, source: Option<&Source>) -> Option<Condition> {
        let NodeKind::Column(column) = &self.kind else {
            return None;
        };
        let filter = self.filter()?;

        match self
            .tree
            .filter_parser
            .parse_filter(filter, self.filter_type())
        {
            Ok(condition) => condition.map(|c| column.bind_filter(c, source)),
            Err(e) => {
                log::warn!("Ignoring filter of {}: {}", self.unique_name, e);
                None
            }
        }
    }

    /// Columns of the parent's rows that correlate with this node's rows.
    pub fn child_match_columns(&self) -> Vec<&'t str> {
        match &self.kind {
            NodeKind::Table(_) => Vec::new(),
            NodeKind::Column(column) => column.child_match_columns(),
            NodeKind::Reference(reference) => reference.child_match_columns(),
            NodeKind::CustomJoin(join) => join.child_match_columns(),
        }
    }

    /// Columns of this node's rows that correlate with the parent's rows.
    pub fn parent_match_columns(&self) -> Vec<&'t str> {
        match &self.kind {
            NodeKind::Table(_) => Vec::new(),
            NodeKind::Column(column) => column.parent_match_columns(),
            NodeKind::Reference(reference) => reference.parent_match_columns(),
            NodeKind::CustomJoin(join) => join.parent_match_columns(),
        }
    }

    /// In-memory counterpart of [`PerspectiveNode::parent_join_condition`].
    pub fn match_child_row(&self, parent_row: &Row, child_row: &Row) -> bool {
        match &self.kind {
            NodeKind::Table(_) => true,
            NodeKind::Column(column) if column.foreign_key.is_none() => false,
            _ => defaults::rows_match(
                parent_row,
                &self.child_match_columns(),
                child_row,
                &self.parent_match_columns(),
            ),
        }
    }

    /// Join predicate between this node's rows (`alias`) and its parent's
    /// rows (`parent_alias`).
    pub fn parent_join_condition(&self, alias: &str, parent_alias: &str) -> Vec<Condition> {
        match &self.kind {
            NodeKind::Table(_) => Vec::new(),
            NodeKind::Column(column) => column.parent_join_condition(alias, parent_alias),
            NodeKind::Reference(reference) => reference.parent_join_condition(alias, parent_alias),
            NodeKind::CustomJoin(join) => join.parent_join_condition(alias, parent_alias),
        }
    }

    pub fn data_load_columns(&'t self) -> IndexSet<&'t str> {
        defaults::data_load_columns(self)
    }

    pub fn children_condition(&'t self, source: Option<&Source>) -> Option<Condition> {
        defaults::children_condition(self, source)
    }

    pub fn order_by(&'t self, object: SchemaObject<'_>) -> Result<Vec<OrderByColumn>, PerspectiveError> {
        defaults::order_by(self, object)
    }

    /// Load request for this node's rows given the already fetched rows of
    /// its parent. `Ok(None)` when the node has nothing to fetch.
    pub fn node_load_props(
        &'t self,
        parent_rows: &[Row],
    ) -> Result<Option<PerspectiveDataLoadProps>, PerspectiveError> {
        match &self.kind {
            NodeKind::Table(table) => table.node_load_props(self).map(Some),
            NodeKind::Column(column) => column.node_load_props(self, parent_rows),
            NodeKind::Reference(reference) => reference.node_load_props(self, parent_rows).map(Some),
            NodeKind::CustomJoin(join) => join.node_load_props(self, parent_rows).map(Some),
        }
    }

    pub fn base_tables(&'t self) -> Vec<PerspectiveBaseTable<'t>> {
        defaults::base_tables(self)
    }

    pub fn find_child_node_by_unique_path(&'t self, path: &[&str]) -> Option<&'t PerspectiveNode<'t>> {
        defaults::find_child_node_by_unique_path(self, path)
    }

    /// Resolves a unique name relative to this node's own code name.
    pub fn find_node_by_unique_name(&'t self, unique_name: &str) -> Option<&'t PerspectiveNode<'t>> {
        if unique_name.is_empty() {
            return None;
        }

        let path: Vec<&str> = unique_name.split(UNIQUE_NAME_SEPARATOR).collect();
        if path[0] != self.code_name {
            return None;
        }

        self.find_child_node_by_unique_path(&path[1..])
    }

    /// Whether every node from the root down to this one shares one database.
    pub fn supports_parent_filter(&self) -> bool {
        match self.parent {
            Some(parent) => {
                (parent.is_root() || parent.supports_parent_filter())
                    && parent.database_config == self.database_config
            }
            None => false,
        }
    }

    pub fn is_parent_filter(&self) -> bool {
        self.config().is_parent_filter(self.unique_name)
    }

    /// Correlated EXISTS conditions of the parent filters declared below
    /// this node.
    pub fn parent_filter_conditions(&'t self) -> Vec<Condition> {
        parent_filter::parent_filter_conditions(self)
    }

    fn base_table(&self) -> Option<SchemaObject<'t>> {
        self.kind.children_object()
    }
}

impl PartialEq for PerspectiveNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.unique_name == other.unique_name
            && self.kind == other.kind
            && self.database_config == other.database_config
            && self.default_checked == other.default_checked
    }
}

impl fmt::Debug for PerspectiveNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerspectiveNode")
            .field("unique_name", &self.unique_name)
            .field("title", &self.title())
            .field("level", &self.level)
            .field("default_checked", &self.default_checked)
            .field("database_config", &self.database_config)
            .finish()
    }
}
