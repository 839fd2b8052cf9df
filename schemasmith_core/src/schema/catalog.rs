use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{DesignError, Result};
use crate::schema::input::{SchemaInput, TableInput};
use crate::schema::model::{
    Advisory, Column, ForeignKey, Index, IndexKind, OnDelete, Origin, Partitioning, Table,
    WorkloadCategory,
};

/// A validated relational schema owned by one design session.
///
/// Tables live in an arena in declaration order; foreign keys name their target
/// table and are resolved through `slots`, so cyclic references never turn into
/// cyclic ownership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    tables: Vec<Table>,
    #[serde(skip)]
    slots: HashMap<String, usize>,
    workload: Option<WorkloadCategory>,
    advisories: Vec<Advisory>,
}

impl Schema {
    /// Builds and validates a schema from the collaborator's structured description.
    pub fn from_input(input: &SchemaInput) -> Result<Self> {
        if input.tables.is_empty() {
            return Err(DesignError::validation("Schema must declare at least one table"));
        }

        let mut tables: Vec<Table> = Vec::with_capacity(input.tables.len());
        let mut slots: HashMap<String, usize> = HashMap::new();
        for t in &input.tables {
            if slots.contains_key(&t.name) {
                return Err(DesignError::validation(format!(
                    "Table '{}' is declared more than once",
                    t.name
                )));
            }
            let table = build_table(t)?;
            slots.insert(t.name.clone(), tables.len());
            tables.push(table);
        }

        let mut schema = Self {
            tables,
            slots,
            workload: None,
            advisories: Vec::new(),
        };

        // Foreign keys can only be checked once every table is known.
        for t in &input.tables {
            let mut fks: Vec<ForeignKey> = Vec::new();
            for fk in &t.foreign_keys {
                let fk = ForeignKey {
                    table: t.name.clone(),
                    columns: fk.columns.clone(),
                    ref_table: fk.ref_table.clone(),
                    ref_columns: fk.ref_columns.clone(),
                    on_delete: fk.on_delete,
                };
                schema.validate_foreign_key(&fk)?;
                if fks.iter().any(|x| {
                    x.columns == fk.columns
                        && x.ref_table == fk.ref_table
                        && x.ref_columns == fk.ref_columns
                }) {
                    return Err(DesignError::validation(format!(
                        "FOREIGN KEY ({}) on '{}' is declared more than once",
                        fk.columns.join(","),
                        t.name
                    )));
                }
                fks.push(fk);
            }
            let slot = schema.slot(&t.name)?;
            schema.tables[slot].foreign_keys = fks;
        }

        debug!(
            tables = schema.tables.len(),
            foreign_keys = schema.all_foreign_keys().count(),
            "schema validated"
        );
        Ok(schema)
    }

    fn slot(&self, table: &str) -> Result<usize> {
        self.slots
            .get(table)
            .copied()
            .ok_or_else(|| DesignError::validation(format!("Table '{}' does not exist", table)))
    }

    fn validate_foreign_key(&self, fk: &ForeignKey) -> Result<()> {
        let child = self.table(&fk.table)?;
        if fk.columns.is_empty() || fk.ref_columns.is_empty() {
            return Err(DesignError::validation("FOREIGN KEY column list cannot be empty"));
        }
        if fk.columns.len() != fk.ref_columns.len() {
            return Err(DesignError::validation(
                "FOREIGN KEY column count must match referenced column count",
            ));
        }
        for c in &fk.columns {
            let col = child.column(c).ok_or_else(|| {
                DesignError::validation(format!(
                    "FOREIGN KEY references unknown column '{}.{}'",
                    fk.table, c
                ))
            })?;
            if fk.on_delete == OnDelete::SetNull && !col.nullable {
                return Err(DesignError::validation(format!(
                    "FOREIGN KEY ON DELETE SET NULL requires nullable column '{}.{}'",
                    fk.table, c
                )));
            }
        }
        let parent = self.tables_by_name(&fk.ref_table).ok_or_else(|| {
            DesignError::validation(format!(
                "FOREIGN KEY on '{}' references unknown table '{}'",
                fk.table, fk.ref_table
            ))
        })?;
        for c in &fk.ref_columns {
            if !parent.has_column(c) {
                return Err(DesignError::validation(format!(
                    "FOREIGN KEY references unknown parent column '{}.{}'",
                    fk.ref_table, c
                )));
            }
        }
        if !parent.is_unique_key(&fk.ref_columns) {
            return Err(DesignError::validation(format!(
                "FOREIGN KEY reference {}({}) must target PRIMARY KEY or UNIQUE columns",
                fk.ref_table,
                fk.ref_columns.join(",")
            )));
        }
        Ok(())
    }

    fn tables_by_name(&self, name: &str) -> Option<&Table> {
        self.slots.get(name).map(|&i| &self.tables[i])
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables_by_name(name)
            .ok_or_else(|| DesignError::validation(format!("Table '{}' does not exist", name)))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// All tables in declaration order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Outgoing foreign keys of one table.
    pub fn foreign_keys(&self, table: &str) -> Result<&[ForeignKey]> {
        Ok(&self.table(table)?.foreign_keys)
    }

    pub fn all_foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.tables.iter().flat_map(|t| t.foreign_keys.iter())
    }

    pub fn workload(&self) -> Option<WorkloadCategory> {
        self.workload
    }

    pub fn set_workload(&mut self, category: WorkloadCategory) {
        self.workload = Some(category);
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Adds an index unless one with the same leading columns and kind already exists.
    /// Returns whether the schema changed. Columns and foreign keys are never touched.
    pub fn add_index(&mut self, index: Index) -> Result<bool> {
        let slot = self.slot(&index.table)?;
        let table = &self.tables[slot];
        if index.columns.is_empty() {
            return Err(DesignError::validation("INDEX column list cannot be empty"));
        }
        for c in &index.columns {
            if !table.has_column(c) {
                return Err(DesignError::validation(format!(
                    "INDEX references unknown column '{}.{}'",
                    index.table, c
                )));
            }
        }
        if table
            .indexes
            .iter()
            .any(|ix| ix.columns == index.columns && ix.kind.method() == index.kind.method())
        {
            return Ok(false);
        }
        if table.indexes.iter().any(|ix| ix.name == index.name) {
            return Err(DesignError::validation(format!(
                "INDEX '{}' already exists on '{}'",
                index.name, index.table
            )));
        }
        debug!(table = %index.table, index = %index.name, columns = ?index.columns, "index added");
        self.tables[slot].indexes.push(index);
        Ok(true)
    }

    /// Sets a partitioning strategy on a table that has none.
    /// Returns `false` without changes when the table is already partitioned.
    pub fn set_partitioning(&mut self, partitioning: Partitioning) -> Result<bool> {
        let slot = self.slot(&partitioning.table)?;
        let table = &self.tables[slot];
        if table.partitioning.is_some() {
            return Ok(false);
        }
        validate_partition_columns(table, &partitioning.columns)?;
        debug!(table = %partitioning.table, kind = %partitioning.kind, columns = ?partitioning.columns, "partitioning set");
        self.tables[slot].partitioning = Some(partitioning);
        Ok(true)
    }

    /// Records an advisory note; duplicates are ignored.
    pub fn add_advisory(&mut self, advisory: Advisory) -> bool {
        if self.advisories.contains(&advisory) {
            return false;
        }
        self.advisories.push(advisory);
        true
    }

    /// Picks an index name that is free on `table`, derived from its columns.
    pub fn index_name_for(&self, table: &str, columns: &[String], prefix: &str) -> String {
        let base = format!("{prefix}_{}_{}", table, columns.join("_"));
        let taken: HashSet<&str> = self
            .tables_by_name(table)
            .map(|t| t.indexes.iter().map(|ix| ix.name.as_str()).collect())
            .unwrap_or_default();
        if !taken.contains(base.as_str()) {
            return base;
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{base}_{n}");
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn build_table(t: &TableInput) -> Result<Table> {
    if t.columns.is_empty() {
        return Err(DesignError::validation(format!(
            "Table '{}' must declare at least one column",
            t.name
        )));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for c in &t.columns {
        if !seen.insert(c.name.as_str()) {
            return Err(DesignError::validation(format!(
                "Table '{}' declares column '{}' more than once",
                t.name, c.name
            )));
        }
    }

    let flagged: Vec<&str> = t
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    if !flagged.is_empty() && !t.primary_key.is_empty() {
        let same = flagged.len() == t.primary_key.len()
            && t.primary_key.iter().all(|c| flagged.contains(&c.as_str()));
        if !same {
            return Err(DesignError::validation(format!(
                "Table '{}' declares more than one PRIMARY KEY",
                t.name
            )));
        }
    }
    for pk_col in &t.primary_key {
        if !seen.contains(pk_col.as_str()) {
            return Err(DesignError::validation(format!(
                "PRIMARY KEY references unknown column '{}.{}'",
                t.name, pk_col
            )));
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(t.columns.len());
    for c in &t.columns {
        let primary_key = c.primary_key || t.primary_key.contains(&c.name);
        if primary_key && c.nullable == Some(true) {
            return Err(DesignError::validation(format!(
                "PRIMARY KEY column '{}.{}' cannot be nullable",
                t.name, c.name
            )));
        }
        columns.push(Column {
            name: c.name.clone(),
            dtype: c.dtype.clone(),
            nullable: c.nullable.unwrap_or(!primary_key),
            default: c.default.clone(),
            primary_key,
            unique: c.unique,
        });
    }

    let mut table = Table {
        name: t.name.clone(),
        columns,
        foreign_keys: Vec::new(),
        unique_constraints: Vec::new(),
        indexes: Vec::new(),
        partitioning: None,
    };

    for uniq in &t.unique {
        if uniq.is_empty() {
            return Err(DesignError::validation("UNIQUE column list cannot be empty"));
        }
        for c in uniq {
            if !table.has_column(c) {
                return Err(DesignError::validation(format!(
                    "UNIQUE references unknown column '{}.{}'",
                    t.name, c
                )));
            }
        }
        if table.unique_constraints.iter().any(|u| u == uniq) {
            return Err(DesignError::validation(format!(
                "UNIQUE constraint on {}({}) is declared more than once",
                t.name,
                uniq.join(",")
            )));
        }
        table.unique_constraints.push(uniq.clone());
    }

    for ix in &t.indexes {
        if ix.columns.is_empty() {
            return Err(DesignError::validation("INDEX column list cannot be empty"));
        }
        for c in &ix.columns {
            if !table.has_column(c) {
                return Err(DesignError::validation(format!(
                    "INDEX references unknown column '{}.{}'",
                    t.name, c
                )));
            }
        }
        let kind = ix.kind.unwrap_or_else(|| IndexKind::for_columns(&ix.columns));
        if kind == IndexKind::Hash && ix.columns.len() > 1 {
            return Err(DesignError::validation(format!(
                "HASH index on {}({}) must have exactly one column",
                t.name,
                ix.columns.join(",")
            )));
        }
        let name = ix
            .name
            .clone()
            .unwrap_or_else(|| format!("idx_{}_{}", t.name, ix.columns.join("_")));
        if table.indexes.iter().any(|x| x.name == name) {
            return Err(DesignError::validation(format!(
                "INDEX '{}' is declared more than once on '{}'",
                name, t.name
            )));
        }
        table.indexes.push(Index {
            name,
            table: t.name.clone(),
            columns: ix.columns.clone(),
            kind,
            unique: ix.unique,
            origin: Origin::Declared,
        });
    }

    if let Some(p) = &t.partitioning {
        validate_partition_columns(&table, &p.columns)?;
        table.partitioning = Some(Partitioning {
            table: t.name.clone(),
            kind: p.kind,
            columns: p.columns.clone(),
            origin: Origin::Declared,
        });
    }

    Ok(table)
}

fn validate_partition_columns(table: &Table, columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(DesignError::validation("PARTITION key cannot be empty"));
    }
    for c in columns {
        if !table.has_column(c) {
            return Err(DesignError::validation(format!(
                "PARTITION key references unknown column '{}.{}'",
                table.name, c
            )));
        }
    }
    Ok(())
}
