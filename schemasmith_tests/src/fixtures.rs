use schemasmith_core::Schema;
use schemasmith_core::schema::{ColumnInput, ForeignKeyInput, SchemaInput, TableInput};
use schemasmith_core::types::datatype::DataType;
use schemasmith_core::workload::{Consistency, QueryMix, WorkloadTraits};

pub fn customers() -> TableInput {
    TableInput::new(
        "customers",
        vec![
            ColumnInput::new("id", DataType::BigInt).primary_key(),
            ColumnInput::new("email", DataType::VarChar(120)).unique().not_null(),
            ColumnInput::new("country", DataType::VarChar(2)),
        ],
    )
}

pub fn orders() -> TableInput {
    TableInput::new(
        "orders",
        vec![
            ColumnInput::new("id", DataType::BigInt).primary_key(),
            ColumnInput::new("customer_id", DataType::BigInt).not_null(),
            ColumnInput::new("placed_at", DataType::Timestamp).not_null(),
            ColumnInput::new("status", DataType::VarChar(20)),
            ColumnInput::new(
                "total",
                DataType::Decimal {
                    precision: 10,
                    scale: 2,
                },
            ),
        ],
    )
    .with_foreign_key(ForeignKeyInput::new("customer_id", "customers", "id"))
}

/// Orders declared before customers, so ordering has real work to do.
pub fn shop_input() -> SchemaInput {
    SchemaInput {
        tables: vec![orders(), customers()],
    }
}

pub fn shop() -> Schema {
    Schema::from_input(&shop_input()).unwrap()
}

pub fn schema_of(tables: Vec<TableInput>) -> Schema {
    Schema::from_input(&SchemaInput { tables }).unwrap()
}

/// Write-heavy, point-lookup, strict.
pub fn oltp_traits() -> WorkloadTraits {
    WorkloadTraits::new(0.3, QueryMix::new(0.8, 0.1, 0.1), Consistency::Strict)
}

/// Read-heavy, aggregation-dominated.
pub fn olap_traits() -> WorkloadTraits {
    WorkloadTraits::new(0.9, QueryMix::new(0.1, 0.2, 0.7), Consistency::Eventual)
}

/// Mixed reads, comparable lookups and aggregations.
pub fn htap_traits() -> WorkloadTraits {
    WorkloadTraits::new(0.6, QueryMix::new(0.45, 0.1, 0.45), Consistency::Strict)
}

pub fn id_table(name: &str) -> TableInput {
    TableInput::new(name, vec![ColumnInput::new("id", DataType::Integer).primary_key()])
}

/// `name(id pk, <fk_col> int)` referencing `target(id)`.
pub fn child_table(name: &str, fk_col: &str, target: &str) -> TableInput {
    TableInput::new(
        name,
        vec![
            ColumnInput::new("id", DataType::Integer).primary_key(),
            ColumnInput::new(fk_col, DataType::Integer),
        ],
    )
    .with_foreign_key(ForeignKeyInput::new(fk_col, target, "id"))
}
