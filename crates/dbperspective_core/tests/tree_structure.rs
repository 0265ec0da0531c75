use dbperspective_core::{
    ColumnSet, ConfigPatch, NodeIcon, PerspectiveConfig, PerspectiveNode, PerspectiveTree,
};
use dbperspective_test_support::fixtures::{
    categories_snapshot, database_config, root, sales_snapshot, shop_snapshot,
};
use std::collections::HashSet;

fn collect<'t>(node: &'t PerspectiveNode<'t>, depth: usize, out: &mut Vec<&'t PerspectiveNode<'t>>) {
    out.push(node);
    if depth == 0 {
        return;
    }
    for child in node.child_nodes() {
        collect(child, depth - 1, out);
    }
}

fn titles(nodes: &[&PerspectiveNode<'_>]) -> Vec<String> {
    nodes.iter().map(|n| n.title()).collect()
}

#[test]
fn unique_names_are_unique_and_resolve() {
    let snapshot = shop_snapshot();
    let config = PerspectiveConfig::default();
    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("customers"));

    let mut nodes = Vec::new();
    collect(tree.root().expect("root"), 4, &mut nodes);

    let mut seen = HashSet::new();
    for node in &nodes {
        assert!(seen.insert(node.unique_name()), "duplicate {}", node.unique_name());
    }

    for node in &nodes {
        let found = tree
            .find_node_by_unique_name(node.unique_name())
            .expect("resolves");
        assert_eq!(found, *node);
        assert_eq!(found.level(), node.level());
    }
}

#[test]
fn children_are_columns_then_references_then_custom_joins() {
    let snapshot = shop_snapshot();
    let config = PerspectiveConfig::default().apply(&ConfigPatch::AddCustomJoin(
        dbperspective_core::PerspectiveCustomJoinConfig::new(
            "Account notes",
            "customers",
            None,
            "notes",
            vec![dbperspective_core::CustomJoinColumn {
                base_column_name: "id".to_string(),
                ref_column_name: "customer_id".to_string(),
            }],
        )
        .with_target(None, Some("crm")),
    ));
    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("customers"));

    let root = tree.root().expect("root");
    let children = root.child_nodes();

    assert_eq!(titles(&children), vec!["id", "name", "orders", "Account notes"]);
    assert_eq!(children[2].unique_name(), "customers::orders");
    assert_eq!(children[3].icon(), NodeIcon::CustomJoin);
    assert_eq!(children[3].database_config().database, "crm");
    assert!(children.iter().all(|c| c.level() == 1));
}

#[test]
fn missing_root_yields_no_tree() {
    let snapshot = shop_snapshot();
    let config = PerspectiveConfig::default();
    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("invoices"));

    assert!(tree.root().is_none());
    assert!(tree.find_node_by_unique_name("invoices").is_none());
}

#[test]
fn lookup_misses_return_none() {
    let snapshot = shop_snapshot();
    let config = PerspectiveConfig::default();
    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("orders"));
    let root = tree.root().expect("root");

    assert!(root.find_node_by_unique_name("").is_none());
    assert!(root.find_node_by_unique_name("customers").is_none());
    assert!(root.find_node_by_unique_name("orders::missing").is_none());
    assert!(root.find_node_by_unique_name("orders::total::anything").is_none());
    assert_eq!(
        root.find_node_by_unique_name("orders"),
        Some(root),
    );
}

#[test]
fn multiple_references_are_disambiguated() {
    let snapshot = sales_snapshot();
    let config = PerspectiveConfig::default();
    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("employees"));

    let references: Vec<_> = tree
        .root()
        .expect("root")
        .child_nodes()
        .into_iter()
        .filter(|n| n.column_name().is_none())
        .collect();

    assert_eq!(references.len(), 2);
    assert!(references.iter().all(|n| n.is_multiple()));
    assert_eq!(references[0].code_name(), "orders_shipped_by");
    assert_eq!(references[1].code_name(), "orders_sold_by");
    assert_eq!(references[0].title(), "orders (shipped_by)");
    assert_ne!(references[0].unique_name(), references[1].unique_name());
}

#[test]
fn self_reference_is_cut_off_by_circular_detection() {
    let snapshot = categories_snapshot();
    let config = PerspectiveConfig::default();
    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("categories"));

    let first = tree
        .find_node_by_unique_name("categories::parent_id")
        .expect("first level");
    assert!(!first.is_circular());
    assert!(first.default_checked());
    assert_eq!(first.icon(), NodeIcon::ForeignKey);

    let second = tree
        .find_node_by_unique_name("categories::parent_id::parent_id")
        .expect("second level");
    assert!(second.is_circular());
    assert!(!second.default_checked());
    assert_eq!(second.icon(), NodeIcon::Circular);

    let third = tree
        .find_node_by_unique_name("categories::parent_id::parent_id::parent_id")
        .expect("third level");
    assert!(third.is_circular());
    assert!(!third.is_checked());

    // Base tables stop where default checking stops.
    let base_tables = tree.root().expect("root").base_tables();
    assert_eq!(base_tables.len(), 2);
    assert_eq!(base_tables[1].node.unique_name(), "categories::parent_id");
}

#[test]
fn checked_state_tracks_defaults_and_overrides() {
    let snapshot = shop_snapshot();
    let mut config = PerspectiveConfig::default();

    let names = {
        let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("customers"));
        let name = tree.find_node_by_unique_name("customers::name").expect("name");
        let id = tree.find_node_by_unique_name("customers::id").expect("id");

        assert!(name.default_checked() && name.is_checked());
        assert!(!id.default_checked() && !id.is_checked());

        vec![name.toggle_checked(None), id.toggle_checked(None)]
    };
    config = config.apply_all(&names);

    assert_eq!(config.unchecked_columns, vec!["customers::name"]);
    assert_eq!(config.checked_columns, vec!["customers::id"]);

    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("customers"));
    let name = tree.find_node_by_unique_name("customers::name").expect("name");
    let id = tree.find_node_by_unique_name("customers::id").expect("id");
    assert!(!name.is_checked());
    assert!(id.is_checked());

    let patches = vec![name.toggle_checked(Some(true)), id.toggle_checked(Some(false))];
    let config = config.apply_all(&patches);

    assert!(config.checked_columns.is_empty());
    assert!(config.unchecked_columns.is_empty());
}

#[test]
fn checked_and_unchecked_never_overlap() {
    let snapshot = shop_snapshot();
    let mut config = PerspectiveConfig::default();

    for value in [Some(false), None, Some(true), Some(false), None, None] {
        let patch = {
            let tree =
                PerspectiveTree::new(&snapshot, &config, database_config(), root("customers"));
            tree.find_node_by_unique_name("customers::name")
                .expect("name")
                .toggle_checked(value)
        };
        config = config.apply(&patch);

        let name = "customers::name";
        assert!(
            !(config.contains(ColumnSet::Checked, name) && config.contains(ColumnSet::Unchecked, name))
        );
    }
}

#[test]
fn toggle_expanded_flips_membership() {
    let snapshot = shop_snapshot();
    let config = PerspectiveConfig::default();
    let tree = PerspectiveTree::new(&snapshot, &config, database_config(), root("orders"));
    let node = tree
        .find_node_by_unique_name("orders::customer_id")
        .expect("customer_id");

    let expanded = config.apply(&node.toggle_expanded(None));
    assert_eq!(expanded.expanded_columns, vec!["orders::customer_id"]);

    let tree = PerspectiveTree::new(&snapshot, &expanded, database_config(), root("orders"));
    let node = tree
        .find_node_by_unique_name("orders::customer_id")
        .expect("customer_id");
    assert!(node.is_expanded());
    assert!(expanded.apply(&node.toggle_expanded(None)).expanded_columns.is_empty());
}
