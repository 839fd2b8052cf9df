//! Checks hand-written sample rows against a schema.

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{DesignError, Result};
use crate::schema::Schema;
use crate::types::value::value_from_json;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleFinding {
    pub table: String,
    pub row: usize,
    pub column: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SampleReport {
    pub checked_rows: usize,
    pub findings: Vec<SampleFinding>,
}

impl SampleReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Parses `json` as `{ "table": [ { "col": value, ... } ] }` and validates it.
pub fn validate_samples(schema: &Schema, json: &str) -> Result<SampleReport> {
    let doc: JsonValue = serde_json::from_str(json)
        .map_err(|e| DesignError::validation(format!("Malformed sample JSON: {e}")))?;
    validate_sample_value(schema, &doc)
}

/// Same as [`validate_samples`] for an already-parsed document.
///
/// Type, nullability and unknown-column problems become findings. A document
/// that is not shaped like sample data, or names a table the schema lacks, is an error.
pub fn validate_sample_value(schema: &Schema, doc: &JsonValue) -> Result<SampleReport> {
    let tables = doc
        .as_object()
        .ok_or_else(|| DesignError::validation("Sample data must be an object keyed by table name"))?;

    let mut report = SampleReport::default();
    for (table_name, rows) in tables {
        let table = schema.table(table_name)?;
        let rows = rows.as_array().ok_or_else(|| {
            DesignError::validation(format!("Samples for '{table_name}' must be an array of rows"))
        })?;
        for (idx, row) in rows.iter().enumerate() {
            report.checked_rows += 1;
            let mut finding = |column: Option<&str>, message: String| {
                report.findings.push(SampleFinding {
                    table: table_name.clone(),
                    row: idx,
                    column: column.map(str::to_string),
                    message,
                })
            };
            let Some(cells) = row.as_object() else {
                finding(None, "row is not a JSON object".to_string());
                continue;
            };
            for name in cells.keys() {
                if !table.has_column(name) {
                    finding(Some(name), format!("unknown column '{name}'"));
                }
            }
            for col in &table.columns {
                let Some(raw) = cells.get(&col.name) else {
                    if col.default.is_none() && !col.nullable {
                        finding(Some(&col.name), format!("missing value for NOT NULL column '{}'", col.name));
                    }
                    continue;
                };
                match value_from_json(&col.dtype, raw) {
                    Ok(v) if v.is_null() && !col.nullable => {
                        finding(Some(&col.name), format!("'{}' cannot be NULL", col.name));
                    }
                    Ok(_) => {}
                    Err(e) => finding(Some(&col.name), e),
                }
            }
        }
    }
    debug!(rows = report.checked_rows, findings = report.findings.len(), "samples validated");
    Ok(report)
}
