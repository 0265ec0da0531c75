use std::fs;
use std::path::PathBuf;
use std::process;

use dbperspective_core::{
    DatabaseConfig, NamedObjectInfo, PerspectiveConfig, PerspectiveNode, PerspectiveStore,
    PerspectiveTree, Row, SchemaSnapshot, Value, link_snapshot_dependencies,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Tree,
    Load,
}

#[derive(Debug)]
struct Args {
    command: Command,
    schema: PathBuf,
    config: Option<PathBuf>,
    perspective: Option<String>,
    conid: String,
    database: String,
    table: String,
    node: Option<String>,
    rows: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1)).unwrap_or_else(|e| fatal(&e));

    match run(&args) {
        Ok(output) => println!("{output}"),
        Err(e) => fatal(&e),
    }
}

fn print_usage() {
    eprintln!("Usage: dbperspective <tree|load> --schema <file> --table <name> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --schema <file>       Schema snapshot JSON (conid -> database -> structure)");
    eprintln!("  --table <name>        Root table or view, optionally schema-qualified");
    eprintln!("  --conid <id>          Connection id (default: local)");
    eprintln!("  --database <name>     Database name (default: the only one of the connection)");
    eprintln!("  --config <file>       Perspective config JSON");
    eprintln!("  --perspective <name>  Saved perspective to load instead of --config");
    eprintln!("  --node <unique name>  Node to compile a load request for (load only)");
    eprintln!("  --rows <file>         Parent rows as a JSON array of objects (load only)");
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut raw = raw.into_iter();

    let command = match raw.next().as_deref() {
        Some("tree") => Command::Tree,
        Some("load") => Command::Load,
        Some("--help") | Some("-h") | None => {
            print_usage();
            process::exit(0);
        }
        Some(other) => return Err(format!("Unknown command: {other}")),
    };

    let mut schema = None;
    let mut config = None;
    let mut perspective = None;
    let mut conid = None;
    let mut database = None;
    let mut table = None;
    let mut node = None;
    let mut rows = None;

    while let Some(arg) = raw.next() {
        let mut value = || raw.next().ok_or_else(|| format!("{arg} requires a value"));

        match arg.as_str() {
            "--schema" => schema = Some(PathBuf::from(value()?)),
            "--config" => config = Some(PathBuf::from(value()?)),
            "--perspective" => perspective = Some(value()?),
            "--conid" => conid = Some(value()?),
            "--database" => database = Some(value()?),
            "--table" => table = Some(value()?),
            "--node" => node = Some(value()?),
            "--rows" => rows = Some(PathBuf::from(value()?)),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    if config.is_some() && perspective.is_some() {
        return Err("--config and --perspective are mutually exclusive".to_string());
    }

    Ok(Args {
        command,
        schema: schema.ok_or("--schema is required")?,
        config,
        perspective,
        conid: conid.unwrap_or_else(|| "local".to_string()),
        database: database.unwrap_or_default(),
        table: table.ok_or("--table is required")?,
        node,
        rows,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf, what: &str) -> Result<T, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {what} '{}': {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {what} '{}': {e}", path.display()))
}

fn load_config(args: &Args) -> Result<PerspectiveConfig, String> {
    if let Some(path) = &args.config {
        return read_json(path, "config");
    }

    match &args.perspective {
        Some(name) => PerspectiveStore::new()
            .and_then(|store| store.load(name))
            .map_err(|e| format!("Failed to load perspective '{name}': {e}")),
        None => Ok(PerspectiveConfig::default()),
    }
}

/// Resolves an empty `--database` to the connection's only database.
fn resolve_database(snapshot: &SchemaSnapshot, args: &Args) -> Result<DatabaseConfig, String> {
    if !args.database.is_empty() {
        return Ok(DatabaseConfig::new(&args.conid, &args.database));
    }

    let databases = snapshot
        .connections
        .get(&args.conid)
        .ok_or_else(|| format!("Connection '{}' not found in schema", args.conid))?;

    match databases.keys().collect::<Vec<_>>().as_slice() {
        [only] => Ok(DatabaseConfig::new(&args.conid, only.as_str())),
        _ => Err(format!(
            "Connection '{}' has {} databases, pass --database",
            args.conid,
            databases.len()
        )),
    }
}

fn run(args: &Args) -> Result<String, String> {
    let mut snapshot: SchemaSnapshot = read_json(&args.schema, "schema")?;
    link_snapshot_dependencies(&mut snapshot);

    let config = load_config(args)?;
    let database_config = resolve_database(&snapshot, args)?;

    log::info!(
        "Building perspective of {} in {}/{}",
        args.table,
        database_config.conid,
        database_config.database
    );

    let tree = PerspectiveTree::new(
        &snapshot,
        &config,
        database_config,
        NamedObjectInfo::from_qualified(&args.table),
    );
    let root = tree
        .root()
        .ok_or_else(|| format!("Table '{}' not found", args.table))?;

    match args.command {
        Command::Tree => {
            let mut output = String::new();
            render_tree(root, &mut output);
            Ok(output.trim_end().to_string())
        }
        Command::Load => {
            let node = match &args.node {
                Some(unique_name) => root
                    .find_node_by_unique_name(unique_name)
                    .ok_or_else(|| format!("Node '{unique_name}' not found"))?,
                None => root,
            };

            let rows = match &args.rows {
                Some(path) => read_rows(path)?,
                None => Vec::new(),
            };

            let props = node
                .node_load_props(&rows)
                .map_err(|e| format!("Failed to compile load request: {e}"))?;

            serde_json::to_string_pretty(&props).map_err(|e| e.to_string())
        }
    }
}

/// One line per node; children are listed for the root and expanded nodes.
fn render_tree<'t>(node: &'t PerspectiveNode<'t>, output: &mut String) {
    let indent = "  ".repeat(node.level());
    let check = if node.is_checked() { "[x]" } else { "[ ]" };
    let marker = match (node.is_expandable(), node.is_root() || node.is_expanded()) {
        (false, _) => " ",
        (true, true) => "-",
        (true, false) => "+",
    };
    let circular = if node.is_circular() { " (circular)" } else { "" };

    output.push_str(&format!(
        "{indent}{marker} {check} {}{circular}  [{}]\n",
        node.title(),
        node.unique_name()
    ));

    if node.is_expandable() && (node.is_root() || node.is_expanded()) {
        for child in node.child_nodes() {
            render_tree(child, output);
        }
    }
}

fn read_rows(path: &PathBuf) -> Result<Vec<Row>, String> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = read_json(path, "rows")?;

    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(column, value)| (column, json_to_value(value)))
                .collect()
        })
        .collect())
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n
                .as_f64()
                .map(Value::Float)
                .unwrap_or_else(|| Value::Decimal(n.to_string())),
        },
        serde_json::Value::String(s) => Value::Text(s),
        other => Value::Json(other.to_string()),
    }
}

fn fatal(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbperspective_test_support::fixtures::{shop_snapshot, snapshot_json};

    fn args(raw: &[&str]) -> Result<Args, String> {
        parse_args(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args_defaults() {
        let args = args(&["tree", "--schema", "s.json", "--table", "public.orders"]).unwrap();

        assert_eq!(args.command, Command::Tree);
        assert_eq!(args.conid, "local");
        assert!(args.database.is_empty());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["plot"]).is_err());
        assert!(args(&["tree", "--table", "orders"]).is_err());
        assert!(args(&["tree", "--schema"]).is_err());
        assert!(args(&["load", "--schema", "s", "--table", "t", "--bogus"]).is_err());
        assert!(
            args(&[
                "load",
                "--schema",
                "s",
                "--table",
                "t",
                "--config",
                "c",
                "--perspective",
                "p"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_json_rows_become_typed_values() {
        assert_eq!(json_to_value(serde_json::json!(7)), Value::Int(7));
        assert_eq!(json_to_value(serde_json::json!(1.5)), Value::Float(1.5));
        assert_eq!(json_to_value(serde_json::json!("7")), Value::Text("7".to_string()));
        assert_eq!(json_to_value(serde_json::json!(null)), Value::Null);
        assert_eq!(
            json_to_value(serde_json::json!({"a": 1})),
            Value::Json("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_tree_and_load_commands() {
        let dir = tempfile::tempdir().unwrap();

        let schema = dir.path().join("schema.json");
        fs::write(&schema, snapshot_json(&shop_snapshot())).unwrap();
        let rows = dir.path().join("rows.json");
        fs::write(&rows, r#"[{"customer_id": 7}, {"customer_id": 7}, {"customer_id": 9}]"#).unwrap();

        let schema_arg = schema.to_string_lossy().to_string();
        let rows_arg = rows.to_string_lossy().to_string();

        let tree_args = args(&[
            "tree", "--schema", &schema_arg, "--database", "shop", "--table", "orders",
        ])
        .unwrap();
        let output = run(&tree_args).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "- [ ] orders  [orders]");
        assert_eq!(lines[1], "    [x] id  [orders::id]");
        assert_eq!(lines[2], "  + [x] customer_id  [orders::customer_id]");

        let load_args = args(&[
            "load",
            "--schema",
            &schema_arg,
            "--database",
            "shop",
            "--table",
            "orders",
            "--node",
            "orders::customer_id",
            "--rows",
            &rows_arg,
        ])
        .unwrap();
        let props: serde_json::Value = serde_json::from_str(&run(&load_args).unwrap()).unwrap();
        assert_eq!(props["pureName"], "customers");
        assert_eq!(props["bindingColumns"], serde_json::json!(["id"]));
        assert_eq!(props["bindingValues"].as_array().unwrap().len(), 2);

        let missing = args(&["tree", "--schema", &schema_arg, "--table", "orders"]).unwrap();
        assert!(run(&missing).unwrap_err().contains("pass --database"));
    }
}
