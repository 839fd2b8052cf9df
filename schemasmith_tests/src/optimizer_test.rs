use std::collections::BTreeMap;

use schemasmith_core::optimizer::Optimizer;
use schemasmith_core::schema::{
    AdvisoryKind, ColumnInput, IndexInput, IndexKind, Origin, PartitionInput, PartitionKind,
    TableInput,
};
use schemasmith_core::types::datatype::DataType;
use schemasmith_core::workload::{QueryPattern, TableWorkload};
use schemasmith_core::{Schema, WorkloadCategory};

use crate::fixtures::*;

fn cardinality(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs.iter().map(|(c, n)| (c.to_string(), *n)).collect()
}

#[test]
fn oltp_covers_foreign_keys() {
    let schema = shop();
    let out = Optimizer::default()
        .optimize(&schema, WorkloadCategory::Oltp, &oltp_traits())
        .unwrap();

    let orders = out.schema.table("orders").unwrap();
    assert_eq!(orders.indexes.len(), 1);
    let ix = &orders.indexes[0];
    assert_eq!(ix.name, "idx_orders_customer_id");
    assert_eq!(ix.columns, vec!["customer_id"]);
    assert_eq!(ix.kind, IndexKind::BTree);
    assert_eq!(ix.origin, Origin::Optimizer);
    assert!(out.schema.table("customers").unwrap().indexes.is_empty());
    assert_eq!(out.schema.workload(), Some(WorkloadCategory::Oltp));

    let note = out
        .rationale
        .iter()
        .find(|r| r.rule == "foreign-key-covering")
        .unwrap();
    assert_eq!(note.table.as_deref(), Some("orders"));
    assert_eq!(note.index.as_deref(), Some("idx_orders_customer_id"));

    // The input schema is untouched.
    assert!(schema.table("orders").unwrap().indexes.is_empty());
}

#[test]
fn oltp_covers_every_outgoing_foreign_key() {
    let schema = schema_of(vec![
        id_table("a"),
        id_table("b"),
        child_table("c", "a_id", "a"),
        child_table("d", "b_id", "b"),
        child_table("e", "c_id", "c"),
    ]);
    let out = Optimizer::default()
        .optimize(&schema, WorkloadCategory::Oltp, &oltp_traits())
        .unwrap();
    for fk in out.schema.all_foreign_keys() {
        let table = out.schema.table(&fk.table).unwrap();
        assert!(table.has_access_path(&fk.columns), "{} not covered", fk.table);
    }
}

#[test]
fn optimizer_is_idempotent() {
    for (category, traits) in [
        (WorkloadCategory::Oltp, oltp_traits()),
        (WorkloadCategory::Olap, olap_traits()),
        (WorkloadCategory::Htap, htap_traits()),
    ] {
        let optimizer = Optimizer::default();
        let once = optimizer.optimize(&shop(), category, &traits).unwrap();
        let twice = optimizer.optimize(&once.schema, category, &traits).unwrap();
        assert_eq!(once.schema, twice.schema, "{category} changed on second pass");
        assert!(twice.rationale.iter().all(|r| r.index.is_none() || r.rule == "wide-index-audit"));
        assert!(twice.rationale.iter().all(|r| r.partition_key.is_none()));
    }
}

#[test]
fn declared_index_prefix_covers_foreign_key() {
    let mut input = shop_input();
    input.tables[0]
        .indexes
        .push(IndexInput::on(&["customer_id", "placed_at"]));
    let schema = Schema::from_input(&input).unwrap();
    let out = Optimizer::default()
        .optimize(&schema, WorkloadCategory::Oltp, &oltp_traits())
        .unwrap();
    let orders = out.schema.table("orders").unwrap();
    assert_eq!(orders.indexes.len(), 1);
    assert_eq!(orders.indexes[0].origin, Origin::Declared);
    assert_eq!(orders.indexes[0].kind, IndexKind::Composite);
}

#[test]
fn oltp_lookup_columns_get_hash_indexes() {
    let traits = oltp_traits().with_table(
        "customers",
        TableWorkload {
            lookup_columns: vec!["email".to_string(), "country".to_string()],
            ..TableWorkload::default()
        },
    );
    let out = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Oltp, &traits)
        .unwrap();
    let customers = out.schema.table("customers").unwrap();
    // email is already unique, so only country needs an index.
    assert_eq!(customers.indexes.len(), 1);
    assert_eq!(customers.indexes[0].name, "hidx_customers_country");
    assert_eq!(customers.indexes[0].kind, IndexKind::Hash);
}

#[test]
fn missing_primary_key_is_an_advisory() {
    let logs = TableInput::new("logs", vec![ColumnInput::new("message", DataType::Text)]);
    let schema = schema_of(vec![logs]);
    let out = Optimizer::default()
        .optimize(&schema, WorkloadCategory::Oltp, &oltp_traits())
        .unwrap();
    let advisories = out.schema.advisories();
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::MissingPrimaryKey);
    assert_eq!(advisories[0].table.as_deref(), Some("logs"));
}

#[test]
fn wide_declared_index_is_flagged_not_removed() {
    let mut input = shop_input();
    input.tables[0].indexes.push(IndexInput::on(&[
        "customer_id",
        "placed_at",
        "status",
        "total",
    ]));
    let schema = Schema::from_input(&input).unwrap();
    let out = Optimizer::default()
        .optimize(&schema, WorkloadCategory::Oltp, &oltp_traits())
        .unwrap();
    assert_eq!(out.schema.table("orders").unwrap().indexes.len(), 1);
    let wide: Vec<_> = out
        .schema
        .advisories()
        .iter()
        .filter(|a| a.kind == AdvisoryKind::WideIndex)
        .collect();
    assert_eq!(wide.len(), 1);
    assert_eq!(
        wide[0].index.as_deref(),
        Some("idx_orders_customer_id_placed_at_status_total")
    );
}

#[test]
fn olap_partitions_on_time_column() {
    let out = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Olap, &olap_traits())
        .unwrap();
    let orders = out.schema.table("orders").unwrap();
    let p = orders.partitioning.as_ref().unwrap();
    assert_eq!(p.kind, PartitionKind::Range);
    assert_eq!(p.columns, vec!["placed_at"]);
    assert_eq!(p.origin, Origin::Optimizer);
    // Customers has no time-like or hinted categorical column.
    assert!(out.schema.table("customers").unwrap().partitioning.is_none());

    // Aggregations group on the foreign key.
    assert!(orders.has_access_path(&["customer_id".to_string()]));
    let note = out.rationale.iter().find(|r| r.rule == "partitioning").unwrap();
    assert_eq!(note.partition_key, Some(vec!["placed_at".to_string()]));
}

#[test]
fn partition_key_outside_the_primary_key_is_reported() {
    let out = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Olap, &olap_traits())
        .unwrap();
    let orders = out.schema.table("orders").unwrap();
    // Columns are never rewritten to make room for the key.
    assert_eq!(orders.primary_key(), vec!["id"]);
    let notes: Vec<_> = out
        .schema
        .advisories()
        .iter()
        .filter(|a| a.kind == AdvisoryKind::PartitionKeyOutsideUniqueKey)
        .collect();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].table.as_deref(), Some("orders"));
    assert!(notes[0].message.contains("(id)"), "{}", notes[0].message);
    assert!(notes[0].message.contains("(placed_at)"), "{}", notes[0].message);

    let events = TableInput::new(
        "events",
        vec![
            ColumnInput::new("id", DataType::BigInt).primary_key(),
            ColumnInput::new("happened_at", DataType::Timestamp).primary_key(),
            ColumnInput::new("kind", DataType::VarChar(16)),
        ],
    );
    let out = Optimizer::default()
        .optimize(&schema_of(vec![events]), WorkloadCategory::Olap, &olap_traits())
        .unwrap();
    let p = out.schema.table("events").unwrap().partitioning.clone().unwrap();
    assert_eq!(p.columns, vec!["happened_at"]);
    assert!(out.schema.advisories().is_empty());
}

#[test]
fn olap_prefers_higher_cardinality_time_column() {
    let mut orders = orders();
    orders
        .columns
        .push(ColumnInput::new("shipped_at", DataType::Timestamp));
    let schema = schema_of(vec![orders, customers()]);
    let traits = olap_traits().with_table(
        "orders",
        TableWorkload {
            cardinality: cardinality(&[("placed_at", 1_000), ("shipped_at", 90_000)]),
            ..TableWorkload::default()
        },
    );
    let out = Optimizer::default()
        .optimize(&schema, WorkloadCategory::Olap, &traits)
        .unwrap();
    let p = out.schema.table("orders").unwrap().partitioning.clone().unwrap();
    assert_eq!(p.columns, vec!["shipped_at"]);
}

#[test]
fn olap_falls_back_to_categorical_columns() {
    let events = || {
        TableInput::new(
            "events",
            vec![
                ColumnInput::new("id", DataType::BigInt).primary_key(),
                ColumnInput::new("region", DataType::VarChar(16)),
                ColumnInput::new("kind", DataType::VarChar(16)),
            ],
        )
    };
    let list_traits = olap_traits().with_table(
        "events",
        TableWorkload {
            cardinality: cardinality(&[("region", 12), ("kind", 3)]),
            ..TableWorkload::default()
        },
    );
    let out = Optimizer::default()
        .optimize(&schema_of(vec![events()]), WorkloadCategory::Olap, &list_traits)
        .unwrap();
    let p = out.schema.table("events").unwrap().partitioning.clone().unwrap();
    assert_eq!(p.kind, PartitionKind::List);
    assert_eq!(p.columns, vec!["region"]);

    let hash_traits = olap_traits().with_table(
        "events",
        TableWorkload {
            cardinality: cardinality(&[("region", 5_000)]),
            ..TableWorkload::default()
        },
    );
    let out = Optimizer::default()
        .optimize(&schema_of(vec![events()]), WorkloadCategory::Olap, &hash_traits)
        .unwrap();
    let p = out.schema.table("events").unwrap().partitioning.clone().unwrap();
    assert_eq!(p.kind, PartitionKind::Hash);

    // Without hints nothing is guessed.
    let out = Optimizer::default()
        .optimize(&schema_of(vec![events()]), WorkloadCategory::Olap, &olap_traits())
        .unwrap();
    assert!(out.schema.table("events").unwrap().partitioning.is_none());
}

#[test]
fn declared_partitioning_is_kept() {
    let mut input = shop_input();
    input.tables[0].partitioning = Some(PartitionInput {
        kind: PartitionKind::Hash,
        columns: vec!["customer_id".to_string()],
    });
    let schema = Schema::from_input(&input).unwrap();
    let out = Optimizer::default()
        .optimize(&schema, WorkloadCategory::Olap, &olap_traits())
        .unwrap();
    let p = out.schema.table("orders").unwrap().partitioning.clone().unwrap();
    assert_eq!(p.kind, PartitionKind::Hash);
    assert_eq!(p.origin, Origin::Declared);
    assert!(
        out.rationale
            .iter()
            .any(|r| r.rule == "partitioning" && r.message.contains("kept existing"))
    );
}

#[test]
fn htap_partitions_only_scan_heavy_tables_and_records_tradeoff() {
    let out = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Htap, &htap_traits())
        .unwrap();
    let orders = out.schema.table("orders").unwrap();
    assert!(orders.partitioning.is_some());
    assert!(orders.has_access_path(&["customer_id".to_string()]));
    assert!(out.schema.table("customers").unwrap().partitioning.is_none());

    let tradeoffs: Vec<_> = out
        .schema
        .advisories()
        .iter()
        .filter(|a| a.kind == AdvisoryKind::HybridTradeoff)
        .collect();
    assert_eq!(tradeoffs.len(), 2);
    assert!(tradeoffs.iter().any(|a| a.table.as_deref() == Some("orders")));
    assert!(tradeoffs.iter().any(|a| a.table.is_none()));
}

#[test]
fn htap_respects_point_lookup_hint() {
    let traits = htap_traits().with_table(
        "orders",
        TableWorkload {
            dominant: Some(QueryPattern::PointLookup),
            ..TableWorkload::default()
        },
    );
    let out = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Htap, &traits)
        .unwrap();
    assert!(out.schema.table("orders").unwrap().partitioning.is_none());
}
