use dbperspective_core::{
    ColumnInfo, DatabaseConfig, DatabaseInfo, ForeignKeyInfo, NamedObjectInfo, Row, SchemaSnapshot,
    TableInfo, Value, link_snapshot_dependencies,
};

pub const CONID: &str = "local";
pub const DATABASE: &str = "shop";
pub const CRM_DATABASE: &str = "crm";

pub fn column(name: impl Into<String>, type_name: impl Into<String>) -> ColumnInfo {
    ColumnInfo {
        name: name.into(),
        type_name: type_name.into(),
        nullable: true,
        is_primary_key: false,
        auto_increment: false,
        default_value: None,
    }
}

pub fn pk_column(name: impl Into<String>) -> ColumnInfo {
    ColumnInfo {
        nullable: false,
        is_primary_key: true,
        auto_increment: true,
        ..column(name, "integer")
    }
}

pub fn fk(
    table_name: &str,
    column_name: &str,
    referenced_table: &str,
    referenced_column: &str,
) -> ForeignKeyInfo {
    ForeignKeyInfo {
        name: format!("fk_{}_{}", table_name, column_name),
        schema: None,
        table_name: table_name.to_string(),
        columns: vec![column_name.to_string()],
        referenced_schema: None,
        referenced_table: referenced_table.to_string(),
        referenced_columns: vec![referenced_column.to_string()],
        on_update: None,
        on_delete: None,
    }
}

pub fn table(
    name: impl Into<String>,
    columns: Vec<ColumnInfo>,
    foreign_keys: Vec<ForeignKeyInfo>,
) -> TableInfo {
    TableInfo {
        name: name.into(),
        schema: None,
        columns,
        foreign_keys,
        dependencies: Vec::new(),
    }
}

pub fn database(tables: Vec<TableInfo>) -> DatabaseInfo {
    DatabaseInfo {
        tables,
        views: Vec::new(),
    }
}

/// Links reverse dependencies of every database in the snapshot.
pub fn snapshot(databases: Vec<(&str, DatabaseInfo)>) -> SchemaSnapshot {
    let mut snapshot = SchemaSnapshot::new();
    for (name, info) in databases {
        snapshot.insert_database(CONID, name, info);
    }
    link_snapshot_dependencies(&mut snapshot);
    snapshot
}

pub fn database_config() -> DatabaseConfig {
    DatabaseConfig::new(CONID, DATABASE)
}

pub fn root(name: &str) -> NamedObjectInfo {
    NamedObjectInfo::new(None, name)
}

pub fn row(values: &[(&str, Value)]) -> Row {
    values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// `customers <- orders <- order_items`.
pub fn shop_database() -> DatabaseInfo {
    database(vec![
        table(
            "customers",
            vec![pk_column("id"), column("name", "varchar(100)")],
            Vec::new(),
        ),
        table(
            "orders",
            vec![
                pk_column("id"),
                column("customer_id", "integer"),
                column("total", "decimal(10,2)"),
            ],
            vec![fk("orders", "customer_id", "customers", "id")],
        ),
        table(
            "order_items",
            vec![
                pk_column("id"),
                column("order_id", "integer"),
                column("product", "varchar(100)"),
                column("quantity", "integer"),
            ],
            vec![fk("order_items", "order_id", "orders", "id")],
        ),
    ])
}

/// Notes kept in a separate database, keyed by customer id.
pub fn crm_database() -> DatabaseInfo {
    database(vec![table(
        "notes",
        vec![
            pk_column("id"),
            column("customer_id", "integer"),
            column("body", "text"),
        ],
        Vec::new(),
    )])
}

pub fn shop_snapshot() -> SchemaSnapshot {
    snapshot(vec![(DATABASE, shop_database()), (CRM_DATABASE, crm_database())])
}

/// Two foreign keys from `orders` to `employees`.
pub fn sales_snapshot() -> SchemaSnapshot {
    snapshot(vec![(
        DATABASE,
        database(vec![
            table(
                "employees",
                vec![pk_column("id"), column("name", "varchar(100)")],
                Vec::new(),
            ),
            table(
                "orders",
                vec![
                    pk_column("id"),
                    column("sold_by", "integer"),
                    column("shipped_by", "integer"),
                ],
                vec![
                    fk("orders", "sold_by", "employees", "id"),
                    fk("orders", "shipped_by", "employees", "id"),
                ],
            ),
        ]),
    )])
}

/// `categories.parent_id -> categories.id`.
pub fn categories_snapshot() -> SchemaSnapshot {
    snapshot(vec![(
        DATABASE,
        database(vec![table(
            "categories",
            vec![
                pk_column("id"),
                column("parent_id", "integer"),
                column("title", "varchar(100)"),
            ],
            vec![fk("categories", "parent_id", "categories", "id")],
        )]),
    )])
}

pub fn snapshot_json(snapshot: &SchemaSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).expect("serialize snapshot")
}
