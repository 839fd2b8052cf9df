//! Illustrative result sets for a query shape.
//!
//! Rows are synthesized from column types and names only. They show what a
//! result looks like, never what real data would contain.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::config::SimulatorConfig;
use crate::error::{DesignError, Result};
use crate::schema::{Column, Schema, Table};
use crate::types::Row;
use crate::types::datatype::DataType;
use crate::types::value::{Value, parse_value, value_to_string};

const UUID_BASE: u128 = 0x1b4e_28ba_2fa1_41d2_883f_0016_d3cc_a000;

const NAMES: [&str; 6] = [
    "Alice Johnson",
    "Bob Smith",
    "Carla Diaz",
    "Dev Patel",
    "Emma Brown",
    "Farid Khan",
];
const STATUSES: [&str; 4] = ["active", "pending", "shipped", "cancelled"];
const CITIES: [&str; 5] = ["Lisbon", "Austin", "Osaka", "Nairobi", "Toronto"];
const COUNTRIES: [&str; 5] = ["PT", "US", "JP", "KE", "CA"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "like")]
    Like,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub function: AggregateFn,
    /// `None` means `*`; only valid for `count`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

impl Aggregate {
    pub fn output_name(&self) -> String {
        match (&self.alias, &self.column) {
            (Some(alias), _) => alias.clone(),
            (None, Some(col)) => format!("{}({col})", self.function),
            (None, None) => format!("{}(*)", self.function),
        }
    }
}

/// Representative query: which table, which columns, and an optional filter/grouping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryShape {
    pub table: String,
    /// Empty means every column (or the group-by columns when grouping).
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub group_by: Vec<String>,
    pub aggregates: Vec<Aggregate>,
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl QueryShape {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filter(mut self, column: &str, op: CompareOp, value: &str) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.to_string(),
        });
        self
    }

    pub fn group_by(mut self, columns: &[&str], aggregates: Vec<Aggregate>) -> Self {
        self.group_by = columns.iter().map(|c| c.to_string()).collect();
        self.aggregates = aggregates;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedResultSet {
    pub table: String,
    pub columns: Vec<String>,
    pub column_types: Vec<DataType>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default)]
pub struct DmlSimulator {
    config: SimulatorConfig,
}

impl DmlSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn simulate(&self, schema: &Schema, shape: &QueryShape) -> Result<SimulatedResultSet> {
        let table = schema.table(&shape.table)?;
        for c in shape.columns.iter().chain(shape.group_by.iter()) {
            require_column(table, c)?;
        }
        let pinned = pinned_values(table, &shape.filters)?;
        // Child column -> referenced parent column, so key values line up with the parent's rows.
        let references: HashMap<&str, &str> = table
            .foreign_keys
            .iter()
            .flat_map(|fk| {
                fk.columns
                    .iter()
                    .zip(&fk.ref_columns)
                    .map(|(c, r)| (c.as_str(), r.as_str()))
            })
            .collect();
        // Pinning a whole key can only ever match one row.
        let row_count = if pins_unique_key(table, &pinned) {
            self.config.row_count.min(1)
        } else {
            self.config.row_count
        };

        let base_rows: Vec<Row> = (0..row_count)
            .map(|i| {
                table
                    .columns
                    .iter()
                    .map(|col| {
                        let value = match pinned.get(col.name.as_str()) {
                            Some(v) => v.clone(),
                            None => synth_value(col, references.get(col.name.as_str()).copied(), i),
                        };
                        (col.name.clone(), value)
                    })
                    .collect()
            })
            .collect();

        let mut result = if shape.aggregates.is_empty() && shape.group_by.is_empty() {
            project(table, shape, base_rows)?
        } else {
            aggregate(table, shape, base_rows)?
        };
        if let Some(limit) = shape.limit {
            result.rows.truncate(limit);
        }
        debug!(table = %shape.table, rows = result.rows.len(), "query simulated");
        Ok(result)
    }
}

fn require_column<'t>(table: &'t Table, name: &str) -> Result<&'t Column> {
    table.column(name).ok_or_else(|| {
        DesignError::validation(format!("Unknown column '{}.{name}'", table.name))
    })
}

/// Equality filters fix the column's value; other operators are only type-checked.
fn pinned_values(table: &Table, filters: &[Filter]) -> Result<HashMap<String, Value>> {
    let mut pinned = HashMap::new();
    for f in filters {
        let col = require_column(table, &f.column)?;
        if f.op == CompareOp::Like {
            if !col.dtype.is_textual() {
                return Err(DesignError::validation(format!(
                    "LIKE requires a text column, '{}' is {}",
                    col.name, col.dtype
                )));
            }
            continue;
        }
        let value = parse_value(&col.dtype, &f.value).map_err(|e| {
            DesignError::validation(format!("WHERE value for '{}': {e}", col.name))
        })?;
        if f.op == CompareOp::Eq {
            pinned.insert(col.name.clone(), value);
        }
    }
    Ok(pinned)
}

fn pins_unique_key(table: &Table, pinned: &HashMap<String, Value>) -> bool {
    let covered = |cols: &[String]| !cols.is_empty() && cols.iter().all(|c| pinned.contains_key(c));
    covered(&table.primary_key())
        || table
            .columns
            .iter()
            .any(|c| c.unique && pinned.contains_key(&c.name))
        || table.unique_constraints.iter().any(|u| covered(u))
        || table
            .indexes
            .iter()
            .any(|ix| ix.unique && covered(&ix.columns))
}

fn project(table: &Table, shape: &QueryShape, rows: Vec<Row>) -> Result<SimulatedResultSet> {
    let columns: Vec<&Column> = if shape.columns.is_empty() {
        table.columns.iter().collect()
    } else {
        shape
            .columns
            .iter()
            .map(|c| require_column(table, c))
            .collect::<Result<_>>()?
    };
    let rows = rows
        .into_iter()
        .map(|mut row| {
            columns
                .iter()
                .map(|c| (c.name.clone(), row.remove(&c.name).unwrap_or(Value::Null)))
                .collect()
        })
        .collect();
    Ok(SimulatedResultSet {
        table: table.name.clone(),
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        column_types: columns.iter().map(|c| c.dtype.clone()).collect(),
        rows,
    })
}

fn aggregate(table: &Table, shape: &QueryShape, rows: Vec<Row>) -> Result<SimulatedResultSet> {
    for c in &shape.columns {
        if !shape.group_by.contains(c) {
            return Err(DesignError::validation(format!(
                "Column '{c}' must appear in GROUP BY or inside an aggregate"
            )));
        }
    }
    let key_columns: &[String] = if shape.columns.is_empty() {
        &shape.group_by
    } else {
        &shape.columns
    };

    let mut columns = Vec::new();
    let mut column_types = Vec::new();
    for c in key_columns {
        columns.push(c.clone());
        column_types.push(require_column(table, c)?.dtype.clone());
    }
    for agg in &shape.aggregates {
        columns.push(agg.output_name());
        column_types.push(aggregate_type(table, agg)?);
    }

    // Groups keep first-seen order.
    let mut groups: Vec<(Vec<String>, Vec<Row>)> = Vec::new();
    for row in rows {
        let key: Vec<String> = shape
            .group_by
            .iter()
            .map(|c| row.get(c).map(value_to_string).unwrap_or_default())
            .collect();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (_, members) in &groups {
        let mut row: Row = BTreeMap::new();
        for c in key_columns {
            let v = members[0].get(c).cloned().unwrap_or(Value::Null);
            row.insert(c.clone(), v);
        }
        for agg in &shape.aggregates {
            row.insert(agg.output_name(), evaluate(table, agg, members)?);
        }
        out.push(row);
    }

    Ok(SimulatedResultSet {
        table: table.name.clone(),
        columns,
        column_types,
        rows: out,
    })
}

fn aggregate_type(table: &Table, agg: &Aggregate) -> Result<DataType> {
    let column = match &agg.column {
        None if agg.function == AggregateFn::Count => return Ok(DataType::BigInt),
        None => {
            return Err(DesignError::validation(format!(
                "{}(*) is not valid; only count(*)",
                agg.function
            )));
        }
        Some(c) => require_column(table, c)?,
    };
    let numeric = column.dtype.is_integral() || matches!(column.dtype, DataType::Decimal { .. });
    match agg.function {
        AggregateFn::Count => Ok(DataType::BigInt),
        AggregateFn::Sum | AggregateFn::Avg if !numeric => Err(DesignError::validation(format!(
            "{}({}) requires a numeric column, got {}",
            agg.function, column.name, column.dtype
        ))),
        AggregateFn::Sum => Ok(match column.dtype {
            DataType::Decimal { scale, .. } => DataType::Decimal {
                precision: 38,
                scale,
            },
            _ => DataType::BigInt,
        }),
        AggregateFn::Avg => Ok(DataType::Decimal {
            precision: 18,
            scale: 2,
        }),
        AggregateFn::Min | AggregateFn::Max => Ok(column.dtype.clone()),
    }
}

fn evaluate(table: &Table, agg: &Aggregate, members: &[Row]) -> Result<Value> {
    let Some(column) = &agg.column else {
        return Ok(Value::BigInt(members.len() as i64));
    };
    let dtype = &require_column(table, column)?.dtype;
    let values: Vec<&Value> = members
        .iter()
        .filter_map(|r| r.get(column))
        .filter(|v| **v != Value::Null)
        .collect();

    let value = match agg.function {
        AggregateFn::Count => Value::BigInt(values.len() as i64),
        AggregateFn::Sum | AggregateFn::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let total: Decimal = values.iter().filter_map(|v| as_decimal(v)).sum();
            if agg.function == AggregateFn::Avg {
                Value::Decimal((total / Decimal::from(values.len() as i64)).round_dp(2))
            } else if dtype.is_integral() {
                total.to_i64().map(Value::BigInt).unwrap_or(Value::Decimal(total))
            } else {
                Value::Decimal(total)
            }
        }
        AggregateFn::Min => pick_extreme(&values, Ordering::Less),
        AggregateFn::Max => pick_extreme(&values, Ordering::Greater),
    };
    Ok(value)
}

fn as_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Int(n) => Some(Decimal::from(*n)),
        Value::BigInt(n) => Some(Decimal::from(*n)),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn pick_extreme(values: &[&Value], want: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for v in values {
        best = match best {
            Some(b) if compare_values(v, b) != Some(want) => Some(b),
            _ => Some(*v),
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        (Value::Uuid(x), Value::Uuid(y)) => Some(x.cmp(y)),
        (Value::VarChar(x) | Value::Text(x), Value::VarChar(y) | Value::Text(y)) => Some(x.cmp(y)),
        _ => Some(as_decimal(a)?.cmp(&as_decimal(b)?)),
    }
}

/// Deterministic example value for row `i` (0-based). `references` names the
/// parent column when `col` is part of a foreign key.
fn synth_value(col: &Column, references: Option<&str>, i: usize) -> Value {
    let is_foreign_key = references.is_some();
    let n = i as u64 + 1;
    // Foreign keys cycle through the first few parent keys so groups repeat.
    let key = if is_foreign_key { (i as u64 % 3) + 1 } else { n };
    match &col.dtype {
        DataType::Integer => Value::Int(integer_sample(col, is_foreign_key, key, i) as i32),
        DataType::BigInt => Value::BigInt(integer_sample(col, is_foreign_key, key, i)),
        DataType::Decimal { precision, scale } => decimal_sample(*precision, *scale, i),
        DataType::Boolean => Value::Bool(i % 2 == 0),
        DataType::Timestamp => timestamp_sample(i).map(Value::Timestamp).unwrap_or(Value::Null),
        DataType::Uuid => Value::Uuid(Uuid::from_u128(UUID_BASE + u128::from(key))),
        DataType::Json => Value::Json(json!({ "id": n, "tag": format!("sample-{n}") })),
        DataType::Text => Value::Text(text_value(&col.name, references, key, i)),
        DataType::VarChar(max) => {
            let s: String = text_value(&col.name, references, key, i)
                .chars()
                .take(*max)
                .collect();
            Value::VarChar(s)
        }
    }
}

fn integer_sample(col: &Column, is_foreign_key: bool, key: u64, i: usize) -> i64 {
    if col.primary_key || col.unique || is_foreign_key {
        return key as i64;
    }
    let name = col.name.to_lowercase();
    if name.contains("qty") || name.contains("quantity") || name.contains("count") {
        return (i as i64 % 5) + 1;
    }
    ((i as i64 * 7) % 50) + 10
}

fn decimal_sample(precision: u32, scale: u32, i: usize) -> Value {
    let frac_digits = scale.min(4);
    let int_digits = precision.saturating_sub(scale).min(6);
    let int_part = if int_digits == 0 {
        0
    } else {
        (10 + i as i64 * 7) % 10_i64.pow(int_digits)
    };
    let frac_mod = 10_i64.pow(frac_digits);
    let fraction = (99 + i as i64 * 37) % frac_mod;
    Value::Decimal(Decimal::new(int_part * frac_mod + fraction, frac_digits))
}

fn timestamp_sample(i: usize) -> Option<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 15)?.and_hms_opt(9, 30, 0)?;
    let step = TimeDelta::try_days(i as i64)? + TimeDelta::try_hours(i as i64)?;
    base.checked_add_signed(step)
}

/// A foreign key renders the value its parent column holds in row `key - 1`.
fn text_value(column: &str, references: Option<&str>, key: u64, i: usize) -> String {
    match references {
        Some(parent) => text_sample(parent, key, key.saturating_sub(1) as usize),
        None => text_sample(column, key, i),
    }
}

fn text_sample(column: &str, key: u64, i: usize) -> String {
    let name = column.to_lowercase();
    if name.contains("email") {
        return format!("user{key}@example.com");
    }
    if name.contains("status") {
        return STATUSES[i % STATUSES.len()].to_string();
    }
    if name.contains("country") {
        return COUNTRIES[i % COUNTRIES.len()].to_string();
    }
    if name.contains("city") {
        return CITIES[i % CITIES.len()].to_string();
    }
    if name.contains("name") {
        return NAMES[i % NAMES.len()].to_string();
    }
    if name.contains("code") {
        return format!("CODE-{key:04}");
    }
    format!("{column}_{key}")
}

/// Formats a result set as a tab-separated table, header first.
pub fn format_result_set(result: &SimulatedResultSet) -> String {
    let header = result.columns.join("\t");
    if result.rows.is_empty() {
        return header;
    }
    let row_lines = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(|c| row.get(c).map(value_to_string).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{header}\n{row_lines}")
}
