use crate::schema::{DatabaseInfo, SchemaObject};

/// Picks the columns of a table that start out checked.
pub trait DefaultColumnSelector {
    /// `circular_columns` names the FK columns that would re-enter a table
    /// already present higher up the tree; they must not be returned.
    fn default_columns(
        &self,
        object: SchemaObject<'_>,
        db: Option<&DatabaseInfo>,
        circular_columns: &[&str],
    ) -> Vec<String>;
}

/// Checks the most descriptive column of a table plus every FK column whose
/// referenced table has a name-like column of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameHeuristicSelector;

const NAME_PREDICATES: &[fn(&str) -> bool] = &[
    |c| c == "name",
    |c| c == "title",
    |c| c.contains("name"),
    |c| c.contains("title"),
    |c| c.contains("subject"),
];

fn name_like_column<'a>(object: SchemaObject<'a>) -> Option<&'a str> {
    let columns = object.columns();

    NAME_PREDICATES.iter().find_map(|predicate| {
        columns
            .iter()
            .find(|c| predicate(&c.name.to_lowercase()))
            .map(|c| c.name.as_str())
    })
}

fn descriptive_column<'a>(object: SchemaObject<'a>) -> Option<&'a str> {
    name_like_column(object)
        .or_else(|| {
            object
                .columns()
                .iter()
                .find(|c| c.type_name.to_lowercase().contains("char"))
                .map(|c| c.name.as_str())
        })
        .or_else(|| object.columns().first().map(|c| c.name.as_str()))
}

impl DefaultColumnSelector for NameHeuristicSelector {
    fn default_columns(
        &self,
        object: SchemaObject<'_>,
        db: Option<&DatabaseInfo>,
        circular_columns: &[&str],
    ) -> Vec<String> {
        let mut result: Vec<String> = descriptive_column(object)
            .filter(|name| !circular_columns.contains(name))
            .map(|name| vec![name.to_string()])
            .unwrap_or_default();

        let Some(db) = db else {
            return result;
        };

        for fk in object.foreign_keys().iter().filter(|fk| fk.is_single_column()) {
            let column = fk.columns[0].as_str();
            if circular_columns.contains(&column) || result.iter().any(|c| c == column) {
                continue;
            }

            let has_name = db
                .find_table(fk.referenced_schema.as_deref(), &fk.referenced_table)
                .and_then(|t| name_like_column(SchemaObject::Table(t)))
                .is_some();

            if has_name {
                result.push(column.to_string());
            }
        }

        result
    }
}
