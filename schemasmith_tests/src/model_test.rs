use schemasmith_core::schema::{
    ColumnInput, ForeignKeyInput, Index, IndexInput, IndexKind, OnDelete, Origin, SchemaInput,
    TableInput,
};
use schemasmith_core::types::datatype::DataType;
use schemasmith_core::{DesignError, Schema};
use serde_json::json;

use crate::fixtures::*;

fn validation_message(input: SchemaInput) -> String {
    match Schema::from_input(&input) {
        Err(DesignError::Validation(msg)) => msg,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn shop_schema_builds_with_defaults() {
    let schema = shop();
    assert_eq!(schema.table_names(), vec!["orders", "customers"]);

    let orders = schema.table("orders").unwrap();
    assert_eq!(orders.primary_key(), vec!["id".to_string()]);
    // Primary-key columns default to NOT NULL, others to nullable.
    assert!(!orders.column("id").unwrap().nullable);
    assert!(orders.column("status").unwrap().nullable);
    assert_eq!(orders.foreign_keys.len(), 1);
    assert_eq!(orders.foreign_keys[0].ref_table, "customers");
    assert!(schema.workload().is_none());
}

#[test]
fn empty_schema_is_rejected() {
    let msg = validation_message(SchemaInput::default());
    assert!(msg.contains("at least one table"));
}

#[test]
fn duplicate_table_is_rejected() {
    let msg = validation_message(SchemaInput {
        tables: vec![customers(), customers()],
    });
    assert!(msg.contains("declared more than once"));
}

#[test]
fn duplicate_column_is_rejected() {
    let t = TableInput::new(
        "t",
        vec![
            ColumnInput::new("a", DataType::Integer),
            ColumnInput::new("a", DataType::Text),
        ],
    );
    let msg = validation_message(SchemaInput { tables: vec![t] });
    assert!(msg.contains("column 'a' more than once"));
}

#[test]
fn foreign_key_to_unknown_table_is_rejected() {
    let msg = validation_message(SchemaInput {
        tables: vec![orders()],
    });
    assert!(msg.contains("unknown table 'customers'"));
}

#[test]
fn foreign_key_must_target_unique_columns() {
    let child = TableInput::new(
        "orders",
        vec![
            ColumnInput::new("id", DataType::Integer).primary_key(),
            ColumnInput::new("country", DataType::VarChar(2)),
        ],
    )
    .with_foreign_key(ForeignKeyInput::new("country", "customers", "country"));
    let msg = validation_message(SchemaInput {
        tables: vec![customers(), child],
    });
    assert!(msg.contains("must target PRIMARY KEY or UNIQUE columns"));
}

#[test]
fn foreign_key_may_target_unique_column() {
    let child = TableInput::new(
        "newsletters",
        vec![
            ColumnInput::new("id", DataType::Integer).primary_key(),
            ColumnInput::new("email", DataType::VarChar(120)),
        ],
    )
    .with_foreign_key(ForeignKeyInput::new("email", "customers", "email"));
    let schema = schema_of(vec![customers(), child]);
    assert_eq!(schema.foreign_keys("newsletters").unwrap().len(), 1);
}

#[test]
fn set_null_requires_nullable_column() {
    let mut fk = ForeignKeyInput::new("customer_id", "customers", "id");
    fk.on_delete = OnDelete::SetNull;
    let mut child = orders();
    child.foreign_keys = vec![fk];
    let msg = validation_message(SchemaInput {
        tables: vec![customers(), child],
    });
    assert!(msg.contains("SET NULL requires nullable column"));
}

#[test]
fn nullable_primary_key_is_rejected() {
    let t = TableInput::new(
        "t",
        vec![ColumnInput::new("id", DataType::Integer).primary_key().nullable()],
    );
    let msg = validation_message(SchemaInput { tables: vec![t] });
    assert!(msg.contains("cannot be nullable"));
}

#[test]
fn conflicting_primary_keys_are_rejected() {
    let mut t = TableInput::new(
        "t",
        vec![
            ColumnInput::new("a", DataType::Integer).primary_key(),
            ColumnInput::new("b", DataType::Integer),
        ],
    );
    t.primary_key = vec!["b".to_string()];
    let msg = validation_message(SchemaInput { tables: vec![t] });
    assert!(msg.contains("more than one PRIMARY KEY"));
}

#[test]
fn table_level_primary_key_marks_columns() {
    let mut t = TableInput::new(
        "line_items",
        vec![
            ColumnInput::new("order_id", DataType::BigInt),
            ColumnInput::new("line_no", DataType::Integer),
        ],
    );
    t.primary_key = vec!["order_id".to_string(), "line_no".to_string()];
    let schema = schema_of(vec![t]);
    let table = schema.table("line_items").unwrap();
    assert_eq!(table.primary_key(), vec!["order_id", "line_no"]);
    assert!(table.columns.iter().all(|c| !c.nullable));
    assert!(table.has_access_path(&["order_id".to_string()]));
    assert!(!table.has_access_path(&["line_no".to_string()]));
}

#[test]
fn multi_column_hash_index_is_rejected() {
    let mut ix = IndexInput::on(&["customer_id", "placed_at"]);
    ix.kind = Some(IndexKind::Hash);
    let msg = validation_message(SchemaInput {
        tables: vec![customers(), orders().with_index(ix)],
    });
    assert!(msg.contains("exactly one column"));
}

#[test]
fn index_on_unknown_column_is_rejected() {
    let msg = validation_message(SchemaInput {
        tables: vec![customers(), orders().with_index(IndexInput::on(&["missing"]))],
    });
    assert!(msg.contains("unknown column 'orders.missing'"));
}

#[test]
fn add_index_skips_equivalent_and_names_uniquely() {
    let mut schema = shop();
    let cols = vec!["customer_id".to_string()];
    let name = schema.index_name_for("orders", &cols, "idx");
    assert_eq!(name, "idx_orders_customer_id");

    let index = Index {
        name: name.clone(),
        table: "orders".to_string(),
        columns: cols.clone(),
        kind: IndexKind::BTree,
        unique: false,
        origin: Origin::Optimizer,
    };
    assert!(schema.add_index(index.clone()).unwrap());
    assert!(!schema.add_index(index).unwrap());
    assert_eq!(
        schema.index_name_for("orders", &cols, "idx"),
        "idx_orders_customer_id_2"
    );
}

#[test]
fn add_index_rejects_name_clash_with_different_columns() {
    let mut schema = shop();
    let first = Index {
        name: "ix".to_string(),
        table: "orders".to_string(),
        columns: vec!["status".to_string()],
        kind: IndexKind::BTree,
        unique: false,
        origin: Origin::Declared,
    };
    let mut second = first.clone();
    second.columns = vec!["placed_at".to_string()];
    assert!(schema.add_index(first).unwrap());
    let err = schema.add_index(second).unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[test]
fn schema_input_reads_json() {
    let input: SchemaInput = serde_json::from_value(json!({
        "tables": [
            {
                "name": "posts",
                "columns": [
                    { "name": "id", "type": "uuid", "primary_key": true },
                    { "name": "author_id", "type": "int", "nullable": false },
                    { "name": "body", "type": "text", "default": "''" },
                    { "name": "score", "type": "numeric(6,1)" }
                ],
                "foreign_keys": [
                    { "columns": ["author_id"], "references": "authors", "ref_columns": ["id"], "on_delete": "cascade" }
                ],
                "indexes": [ { "columns": ["author_id"], "kind": "hash" } ]
            },
            { "name": "authors", "columns": [ { "name": "id", "type": "integer", "primary_key": true } ] }
        ]
    }))
    .unwrap();
    let schema = Schema::from_input(&input).unwrap();
    let posts = schema.table("posts").unwrap();
    assert_eq!(posts.column("id").unwrap().dtype, DataType::Uuid);
    assert_eq!(
        posts.column("score").unwrap().dtype,
        DataType::Decimal {
            precision: 6,
            scale: 1
        }
    );
    assert_eq!(posts.foreign_keys[0].on_delete, OnDelete::Cascade);
    assert_eq!(posts.indexes[0].kind, IndexKind::Hash);
    assert_eq!(posts.indexes[0].name, "idx_posts_author_id");
}

#[test]
fn unknown_type_in_json_is_an_error() {
    let result: Result<SchemaInput, _> = serde_json::from_value(json!({
        "tables": [ { "name": "t", "columns": [ { "name": "a", "type": "money" } ] } ]
    }));
    assert!(result.is_err());
}
