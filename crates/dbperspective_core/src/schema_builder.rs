use crate::schema::{DatabaseInfo, ForeignKeyInfo, SchemaSnapshot};
use std::collections::HashMap;

/// Builder for grouping FK rows by constraint into `ForeignKeyInfo` structs.
///
/// Introspection queries return one row per FK column. This builder groups
/// them by (owning table, constraint name), keeping column order.
#[derive(Default)]
pub struct ForeignKeyBuilder {
    map: HashMap<(Option<String>, String, String), ForeignKeyInfo>,
    order: Vec<(Option<String>, String, String)>,
}

/// One introspected FK column row.
#[derive(Debug, Clone)]
pub struct ForeignKeyColumnRow {
    pub schema: Option<String>,
    pub table_name: String,
    pub name: String,
    pub column: String,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column to a foreign key. Creates the FK if it doesn't exist.
    pub fn add_column(&mut self, row: ForeignKeyColumnRow) {
        let key = (row.schema.clone(), row.table_name.clone(), row.name.clone());

        if !self.map.contains_key(&key) {
            self.order.push(key.clone());
        }

        let entry = self.map.entry(key).or_insert_with(|| ForeignKeyInfo {
            name: row.name,
            schema: row.schema,
            table_name: row.table_name,
            columns: Vec::new(),
            referenced_schema: row.referenced_schema,
            referenced_table: row.referenced_table,
            referenced_columns: Vec::new(),
            on_update: None,
            on_delete: None,
        });

        if !entry.columns.contains(&row.column) {
            entry.columns.push(row.column);
            entry.referenced_columns.push(row.referenced_column);
        }
    }

    /// Finalize and return the foreign keys in first-seen order.
    pub fn build(mut self) -> Vec<ForeignKeyInfo> {
        self.order
            .iter()
            .filter_map(|key| self.map.remove(key))
            .collect()
    }

    /// Finalize and attach each FK to its owning table in `db`.
    ///
    /// FKs whose owning table is not part of `db` are dropped.
    pub fn attach_to(self, db: &mut DatabaseInfo) {
        for fk in self.build() {
            if let Some(table) = db
                .tables
                .iter_mut()
                .find(|t| fk.is_owned_by(t.schema.as_deref(), &t.name))
            {
                table.foreign_keys.push(fk);
            } else {
                log::debug!("Dropping FK {} of unknown table {}", fk.name, fk.table_name);
            }
        }
    }
}

/// Rebuilds every table's reverse `dependencies` from the forward FKs of all
/// tables in the database.
///
/// Dependencies are ordered by referencing table, then by FK declaration order.
pub fn link_dependencies(db: &mut DatabaseInfo) {
    let all_fks: Vec<ForeignKeyInfo> = db
        .tables
        .iter()
        .flat_map(|t| t.foreign_keys.iter().cloned())
        .collect();

    for table in db.tables.iter_mut() {
        table.dependencies = all_fks
            .iter()
            .filter(|fk| fk.references(table.schema.as_deref(), &table.name))
            .cloned()
            .collect();
    }
}

/// Applies [`link_dependencies`] to every database of the snapshot.
pub fn link_snapshot_dependencies(snapshot: &mut SchemaSnapshot) {
    for db in snapshot.databases_mut() {
        link_dependencies(db);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnInfo, TableInfo};

    fn row(table: &str, name: &str, column: &str, ref_table: &str, ref_column: &str) -> ForeignKeyColumnRow {
        ForeignKeyColumnRow {
            schema: None,
            table_name: table.to_string(),
            name: name.to_string(),
            column: column.to_string(),
            referenced_schema: None,
            referenced_table: ref_table.to_string(),
            referenced_column: ref_column.to_string(),
        }
    }

    fn table(name: &str) -> TableInfo {
        TableInfo {
            name: name.to_string(),
            schema: None,
            columns: vec![ColumnInfo {
                name: "id".to_string(),
                type_name: "int".to_string(),
                nullable: false,
                is_primary_key: true,
                auto_increment: false,
                default_value: None,
            }],
            foreign_keys: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_groups_composite_fk_rows() {
        let mut builder = ForeignKeyBuilder::new();
        builder.add_column(row("lines", "fk_lines_order", "order_no", "orders", "no"));
        builder.add_column(row("lines", "fk_lines_order", "order_year", "orders", "year"));
        builder.add_column(row("lines", "fk_lines_product", "product_id", "products", "id"));

        let fks = builder.build();
        assert_eq!(fks.len(), 2);
        assert_eq!(fks[0].columns, vec!["order_no", "order_year"]);
        assert_eq!(fks[0].referenced_columns, vec!["no", "year"]);
        assert!(fks[1].is_single_column());
    }

    #[test]
    fn test_link_dependencies() {
        let mut db = DatabaseInfo {
            tables: vec![table("customers"), table("orders")],
            views: Vec::new(),
        };

        let mut builder = ForeignKeyBuilder::new();
        builder.add_column(row("orders", "fk_customer", "customer_id", "customers", "id"));
        builder.attach_to(&mut db);
        link_dependencies(&mut db);

        let customers = db.find_table(None, "customers").unwrap();
        assert_eq!(customers.dependencies.len(), 1);
        assert_eq!(customers.dependencies[0].table_name, "orders");
        assert!(db.find_table(None, "orders").unwrap().dependencies.is_empty());
    }
}
