pub mod config;
pub mod ddl;
pub mod dml;
pub mod error;
pub mod optimizer;
pub mod order;
pub mod parser;
pub mod perf;
pub mod sample;
pub mod schema;
pub mod session;
pub mod types;
pub mod workload;

pub use config::CoreConfig;
pub use error::{DesignError, Result};
pub use schema::{Schema, SchemaInput, WorkloadCategory};
pub use session::{DesignInput, DesignOutput, DesignSession, QueryInput, SchemaSource};
pub use workload::WorkloadTraits;
