//! Text front end: DDL scripts into [`SchemaInput`], SELECT statements into [`QueryShape`].

mod common;
mod create;
mod select;
mod tokenizer;

use std::collections::HashMap;

use tracing::debug;

use crate::dml::QueryShape;
use crate::error::{DesignError, Result};
use crate::schema::{SchemaInput, TableInput};

use tokenizer::{split_statements, tokenize};

/// Parses every `CREATE TABLE` and `CREATE INDEX` statement in `sql`.
/// Other statements (DML, comments, `SET`, ...) are skipped.
pub fn parse_ddl(sql: &str) -> Result<SchemaInput> {
    let statements = split_statements(tokenize(sql)?);
    let mut input = SchemaInput::default();
    let mut pending_indexes = Vec::new();

    for tokens in &statements {
        if !tokens[0].eq_ignore_ascii_case("create") || tokens.len() < 2 {
            debug!(keyword = %tokens[0], "skipping non-DDL statement");
            continue;
        }
        let second = tokens[1].to_lowercase();
        match second.as_str() {
            "table" => input.tables.push(create::parse_create_table(tokens)?),
            "index" | "unique" => pending_indexes.push(create::parse_create_index(tokens)?),
            other => debug!(object = other, "skipping unsupported CREATE statement"),
        }
    }

    if input.tables.is_empty() {
        return Err(DesignError::parse("No CREATE TABLE statements found"));
    }

    for ci in pending_indexes {
        let table = input
            .tables
            .iter_mut()
            .find(|t| t.name == ci.table)
            .ok_or_else(|| {
                DesignError::parse(format!("CREATE INDEX references unknown table '{}'", ci.table))
            })?;
        table.indexes.push(ci.index);
    }
    resolve_implicit_references(&mut input)?;

    Ok(input)
}

/// Fills `references t` clauses that named no columns with `t`'s primary key.
fn resolve_implicit_references(input: &mut SchemaInput) -> Result<()> {
    let primary_keys: HashMap<String, Vec<String>> = input
        .tables
        .iter()
        .map(|t| (t.name.clone(), declared_primary_key(t)))
        .collect();
    for table in &mut input.tables {
        for fk in table.foreign_keys.iter_mut().filter(|fk| fk.ref_columns.is_empty()) {
            match primary_keys.get(&fk.ref_table) {
                Some(pk) if !pk.is_empty() => fk.ref_columns = pk.clone(),
                Some(_) => {
                    return Err(DesignError::parse(format!(
                        "REFERENCES {} needs a column list: '{}' has no primary key",
                        fk.ref_table, fk.ref_table
                    )));
                }
                None => {
                    return Err(DesignError::parse(format!(
                        "Table '{}' references unknown table '{}'",
                        table.name, fk.ref_table
                    )));
                }
            }
        }
    }
    Ok(())
}

fn declared_primary_key(table: &TableInput) -> Vec<String> {
    if !table.primary_key.is_empty() {
        return table.primary_key.clone();
    }
    table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect()
}

/// Parses one `SELECT` statement into the shape the DML simulator consumes.
pub fn parse_select(sql: &str) -> Result<QueryShape> {
    let mut statements = split_statements(tokenize(sql)?);
    if statements.len() != 1 {
        return Err(DesignError::parse("Expected exactly one SELECT statement"));
    }
    let tokens = statements.remove(0);
    if !tokens[0].eq_ignore_ascii_case("select") {
        return Err(DesignError::parse(format!("Expected SELECT but got '{}'", tokens[0])));
    }
    select::parse_select(&tokens)
}
