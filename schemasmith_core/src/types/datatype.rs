use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DesignError;

/// Semantic column types the designer understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Integer,
    BigInt,
    Decimal { precision: u32, scale: u32 },
    Text,
    VarChar(usize),
    Boolean,
    Timestamp,
    Uuid,
    Json,
}

impl DataType {
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Integer | DataType::BigInt)
    }

    pub fn is_time_like(&self) -> bool {
        matches!(self, DataType::Timestamp)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::Text | DataType::VarChar(_))
    }
}

pub fn parse_datatype(s: &str) -> Result<DataType, DesignError> {
    let lower = s.trim().to_lowercase();
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(inner) = compact
        .strip_prefix("varchar(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let n: usize = inner
            .parse()
            .map_err(|_| DesignError::parse(format!("Bad varchar length in '{s}'")))?;
        if n == 0 {
            return Err(DesignError::parse("varchar length must be > 0"));
        }
        return Ok(DataType::VarChar(n));
    }

    for prefix in ["decimal(", "numeric("] {
        if let Some(inner) = compact
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let mut parts = inner.splitn(2, ',');
            let p = parts.next().unwrap_or("");
            let sc = parts.next().unwrap_or("0");
            let precision: u32 = p
                .parse()
                .map_err(|_| DesignError::parse(format!("Bad decimal precision in '{s}'")))?;
            let scale: u32 = sc
                .parse()
                .map_err(|_| DesignError::parse(format!("Bad decimal scale in '{s}'")))?;
            if precision == 0 || precision > 38 {
                return Err(DesignError::parse("decimal precision must be in 1..=38"));
            }
            if scale > precision {
                return Err(DesignError::parse("decimal scale cannot exceed precision"));
            }
            return Ok(DataType::Decimal { precision, scale });
        }
    }

    match compact.as_str() {
        "int" | "integer" | "int4" | "serial" => Ok(DataType::Integer),
        "bigint" | "int8" | "bigserial" => Ok(DataType::BigInt),
        "decimal" | "numeric" => Ok(DataType::Decimal {
            precision: 18,
            scale: 2,
        }),
        "text" | "string" => Ok(DataType::Text),
        "varchar" => Ok(DataType::VarChar(255)),
        "bool" | "boolean" => Ok(DataType::Boolean),
        "timestamp" | "timestamptz" | "datetime" => Ok(DataType::Timestamp),
        "uuid" => Ok(DataType::Uuid),
        "json" | "jsonb" => Ok(DataType::Json),
        _ => Err(DesignError::parse(format!(
            "Unknown type '{}'. Use integer|bigint|decimal(p,s)|text|varchar(n)|boolean|timestamp|uuid|json",
            s.trim()
        ))),
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            DataType::Text => write!(f, "TEXT"),
            DataType::VarChar(n) => write!(f, "VARCHAR({n})"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Uuid => write!(f, "UUID"),
            DataType::Json => write!(f, "JSON"),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = DesignError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_datatype(&value)
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string().to_lowercase()
    }
}
