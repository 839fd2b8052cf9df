use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::datatype::DataType;

/// Workload category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkloadCategory {
    Oltp,
    Olap,
    Htap,
}

impl WorkloadCategory {
    pub const ALL: [WorkloadCategory; 3] = [
        WorkloadCategory::Oltp,
        WorkloadCategory::Olap,
        WorkloadCategory::Htap,
    ];
}

impl fmt::Display for WorkloadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadCategory::Oltp => write!(f, "OLTP"),
            WorkloadCategory::Olap => write!(f, "OLAP"),
            WorkloadCategory::Htap => write!(f, "HTAP"),
        }
    }
}

/// A single column in a table definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub dtype: DataType,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
    #[default]
    NoAction,
}

impl fmt::Display for OnDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnDelete::Cascade => write!(f, "CASCADE"),
            OnDelete::Restrict => write!(f, "RESTRICT"),
            OnDelete::SetNull => write!(f, "SET NULL"),
            OnDelete::NoAction => write!(f, "NO ACTION"),
        }
    }
}

/// Outgoing foreign-key edge. The referenced table is held by name only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
    pub table: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: OnDelete,
}

impl ForeignKey {
    pub fn is_self_reference(&self) -> bool {
        self.table == self.ref_table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexKind {
    BTree,
    Hash,
    Composite,
}

impl IndexKind {
    pub fn for_columns(columns: &[String]) -> Self {
        if columns.len() > 1 {
            IndexKind::Composite
        } else {
            IndexKind::BTree
        }
    }

    /// Access method used when the index is created.
    pub fn method(&self) -> &'static str {
        match self {
            IndexKind::Hash => "hash",
            IndexKind::BTree | IndexKind::Composite => "btree",
        }
    }

    /// Whether the index keeps keys ordered (usable for range scans and grouping).
    pub fn is_ordered(&self) -> bool {
        !matches!(self, IndexKind::Hash)
    }
}

/// Who asked for an index or partitioning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Declared,
    Optimizer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub kind: IndexKind,
    pub unique: bool,
    pub origin: Origin,
}

impl Index {
    /// True when `columns` is a leading prefix of this index.
    pub fn covers(&self, columns: &[String]) -> bool {
        !columns.is_empty() && self.columns.starts_with(columns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Range,
    Hash,
    List,
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKind::Range => write!(f, "RANGE"),
            PartitionKind::Hash => write!(f, "HASH"),
            PartitionKind::List => write!(f, "LIST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partitioning {
    pub table: String,
    pub kind: PartitionKind,
    pub columns: Vec<String>,
    pub origin: Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisoryKind {
    MissingPrimaryKey,
    WideIndex,
    HybridTradeoff,
    PartitionKeyOutsideUniqueKey,
}

/// Note attached to the schema by the optimizer, reported later as a bottleneck.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub table: Option<String>,
    pub index: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_constraints: Vec<Vec<String>>,
    pub indexes: Vec<Index>,
    pub partitioning: Option<Partitioning>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Primary-key columns in declaration order.
    pub fn primary_key(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    /// True when `columns` is the primary key or one of the unique column sets.
    pub fn is_unique_key(&self, columns: &[String]) -> bool {
        let pk = self.primary_key();
        if !pk.is_empty() && same_set(&pk, columns) {
            return true;
        }
        if columns.len() == 1
            && self
                .column(&columns[0])
                .is_some_and(|c| c.unique || c.primary_key)
        {
            return true;
        }
        self.unique_constraints.iter().any(|u| same_set(u, columns))
            || self
                .indexes
                .iter()
                .any(|ix| ix.unique && same_set(&ix.columns, columns))
    }

    /// Primary and unique keys that do not contain every column of `key`.
    /// PostgreSQL rejects such keys on a partitioned table.
    pub fn keys_missing(&self, key: &[String]) -> Vec<Vec<String>> {
        let mut keys = vec![self.primary_key()];
        keys.extend(
            self.columns
                .iter()
                .filter(|c| c.unique && !c.primary_key)
                .map(|c| vec![c.name.clone()]),
        );
        keys.extend(self.unique_constraints.iter().cloned());
        keys.extend(
            self.indexes
                .iter()
                .filter(|ix| ix.unique)
                .map(|ix| ix.columns.clone()),
        );
        keys.into_iter()
            .filter(|k| !k.is_empty() && !key.iter().all(|c| k.contains(c)))
            .collect()
    }

    /// True when an existing access path has `columns` as its leading prefix.
    pub fn has_access_path(&self, columns: &[String]) -> bool {
        if columns.is_empty() {
            return false;
        }
        let pk = self.primary_key();
        if pk.starts_with(columns) {
            return true;
        }
        if columns.len() == 1
            && self
                .column(&columns[0])
                .is_some_and(|c| c.unique)
        {
            return true;
        }
        self.unique_constraints.iter().any(|u| u.starts_with(columns))
            || self.indexes.iter().any(|ix| ix.covers(columns))
    }

    /// Ordered access path (b-tree prefix) led by `column`.
    pub fn has_ordered_access_on(&self, column: &str) -> bool {
        let lead = [column.to_string()];
        self.primary_key().starts_with(&lead)
            || self.unique_constraints.iter().any(|u| u.starts_with(&lead))
            || self
                .indexes
                .iter()
                .any(|ix| ix.kind.is_ordered() && ix.covers(&lead))
    }

    /// Number of physical indexes maintained on every write, primary key included.
    pub fn index_count(&self) -> usize {
        let pk = usize::from(!self.primary_key().is_empty());
        let unique_columns = self
            .columns
            .iter()
            .filter(|c| c.unique && !c.primary_key)
            .count();
        pk + unique_columns + self.unique_constraints.len() + self.indexes.len()
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|c| b.contains(c))
}
