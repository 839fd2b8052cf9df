pub mod catalog;
pub mod input;
pub mod model;

pub use catalog::Schema;
pub use input::{ColumnInput, ForeignKeyInput, IndexInput, PartitionInput, SchemaInput, TableInput};
pub use model::{
    Advisory, AdvisoryKind, Column, ForeignKey, Index, IndexKind, OnDelete, Origin, PartitionKind, Partitioning,
    Table, WorkloadCategory,
};
