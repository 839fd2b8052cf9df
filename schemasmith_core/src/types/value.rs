use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::types::datatype::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Decimal(Decimal),
    VarChar(String),
    Text(String),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Json(JsonValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True when the value is a legal instance of `dtype`. `Null` matches every type;
    /// nullability is checked separately against the column.
    pub fn matches_type(&self, dtype: &DataType) -> bool {
        match (self, dtype) {
            (Value::Null, _) => true,
            (Value::Bool(_), DataType::Boolean) => true,
            (Value::Int(_), DataType::Integer) => true,
            (Value::BigInt(_), DataType::BigInt) => true,
            (Value::Decimal(d), DataType::Decimal { precision, scale }) => {
                validate_decimal_bounds(d, *precision, *scale).is_ok()
            }
            (Value::VarChar(s), DataType::VarChar(max)) => s.chars().count() <= *max,
            (Value::Text(_), DataType::Text) => true,
            (Value::Timestamp(_), DataType::Timestamp) => true,
            (Value::Uuid(_), DataType::Uuid) => true,
            (Value::Json(_), DataType::Json) => true,
            _ => false,
        }
    }
}

pub fn parse_value(dtype: &DataType, token: &str) -> Result<Value, String> {
    if token.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    match dtype {
        DataType::Boolean => parse_bool(token).map(Value::Bool),
        DataType::Integer => {
            let n: i32 = token
                .parse()
                .map_err(|_| format!("Expected integer but got '{token}'"))?;
            Ok(Value::Int(n))
        }
        DataType::BigInt => {
            let n: i64 = token
                .parse()
                .map_err(|_| format!("Expected bigint but got '{token}'"))?;
            Ok(Value::BigInt(n))
        }
        DataType::Decimal { precision, scale } => {
            let d = token
                .parse::<Decimal>()
                .map_err(|_| format!("Expected decimal but got '{token}'"))?;
            validate_decimal_bounds(&d, *precision, *scale)?;
            Ok(Value::Decimal(d))
        }
        DataType::VarChar(max) => {
            let len = token.chars().count();
            if len > *max {
                return Err(format!("Expected varchar({max}) but got length {len}"));
            }
            Ok(Value::VarChar(token.to_string()))
        }
        DataType::Text => Ok(Value::Text(token.to_string())),
        DataType::Timestamp => parse_timestamp(token).map(Value::Timestamp),
        DataType::Uuid => {
            let u = Uuid::parse_str(token).map_err(|_| format!("Expected uuid but got '{token}'"))?;
            Ok(Value::Uuid(u))
        }
        DataType::Json => {
            let j: JsonValue = serde_json::from_str(token)
                .map_err(|_| format!("Expected valid JSON but got '{token}'"))?;
            Ok(Value::Json(j))
        }
    }
}

/// Interprets a JSON sample cell as a value of `dtype`.
pub fn value_from_json(dtype: &DataType, raw: &JsonValue) -> Result<Value, String> {
    match (dtype, raw) {
        (_, JsonValue::Null) => Ok(Value::Null),
        (DataType::Json, other) => Ok(Value::Json(other.clone())),
        (DataType::Boolean, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),
        (DataType::Integer, JsonValue::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int)
            .ok_or_else(|| format!("Expected integer but got {n}")),
        (DataType::BigInt, JsonValue::Number(n)) => n
            .as_i64()
            .map(Value::BigInt)
            .ok_or_else(|| format!("Expected bigint but got {n}")),
        (DataType::Decimal { .. }, JsonValue::Number(n)) => parse_value(dtype, &n.to_string()),
        (_, JsonValue::String(s)) => parse_value(dtype, s),
        (_, other) => Err(format!("Expected {dtype} but got {other}")),
    }
}

pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::VarChar(s) => s.clone(),
        Value::Text(s) => s.clone(),
        Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        Value::Uuid(u) => u.to_string(),
        Value::Json(j) => j.to_string(),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i32(*n),
            Value::BigInt(n) => serializer.serialize_i64(*n),
            Value::Json(j) => j.serialize(serializer),
            other => serializer.serialize_str(&value_to_string(other)),
        }
    }
}

fn parse_bool(token: &str) -> Result<bool, String> {
    match token.to_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(format!("Expected boolean but got '{token}'")),
    }
}

fn parse_timestamp(token: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(token, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| format!("Expected timestamp 'YYYY-MM-DD HH:MM:SS' but got '{token}'"))
}

pub(crate) fn validate_decimal_bounds(d: &Decimal, precision: u32, scale: u32) -> Result<(), String> {
    let actual_scale = d.scale();
    if actual_scale > scale {
        return Err(format!(
            "Decimal scale {} exceeds allowed scale {}",
            actual_scale, scale
        ));
    }
    // Leading zeros of a pure fraction are not significant: 0.99 fits decimal(2,2).
    let normalized = d.abs().normalize();
    let int_part = normalized.trunc();
    let int_digits = if int_part.is_zero() {
        0
    } else {
        int_part.to_string().len() as u32
    };
    let digits = int_digits + normalized.scale();
    if digits > precision {
        return Err(format!(
            "Decimal precision {} exceeds allowed precision {}",
            digits, precision
        ));
    }
    Ok(())
}
