pub mod datatype;
pub mod value;

use std::collections::BTreeMap;

use value::Value;

/// A simulated row: column name to value.
pub type Row = BTreeMap<String, Value>;
