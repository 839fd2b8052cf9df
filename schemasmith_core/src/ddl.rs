use serde::Serialize;

use crate::error::Result;
use crate::order::order_tables;
use crate::parser::parse_ddl;
use crate::schema::{Index, OnDelete, Schema, Table};

/// Everything needed to create one table, in executable order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DdlStatement {
    pub table: String,
    pub create_table: String,
    pub create_indexes: Vec<String>,
}

impl DdlStatement {
    /// The table statement followed by its index statements.
    pub fn sql(&self) -> String {
        let mut parts = vec![self.create_table.clone()];
        parts.extend(self.create_indexes.iter().cloned());
        parts.join("\n")
    }
}

/// One statement per table, ordered so foreign-key targets are created first.
pub fn emit_ddl(schema: &Schema) -> Result<Vec<DdlStatement>> {
    Ok(order_tables(schema)?
        .into_iter()
        .map(|table| DdlStatement {
            table: table.name.clone(),
            create_table: render_create_table(table),
            create_indexes: table.indexes.iter().map(render_create_index).collect(),
        })
        .collect())
}

/// The whole script, statements separated by blank lines.
pub fn render_script(statements: &[DdlStatement]) -> String {
    statements
        .iter()
        .map(|s| s.sql())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parses `CREATE TABLE`/`CREATE INDEX` text, validates it and re-emits it in dependency order.
pub fn order_ddl_text(sql: &str) -> Result<Vec<DdlStatement>> {
    let input = parse_ddl(sql)?;
    let schema = Schema::from_input(&input)?;
    emit_ddl(&schema)
}

pub fn render_create_table(table: &Table) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let mut line = format!("{} {}", c.name, c.dtype);
            if !c.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &c.default {
                line.push_str(&format!(" DEFAULT {default}"));
            }
            if c.unique && !c.primary_key {
                line.push_str(" UNIQUE");
            }
            line
        })
        .collect();

    let pk = table.primary_key();
    if !pk.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }
    for uniq in &table.unique_constraints {
        lines.push(format!("UNIQUE ({})", uniq.join(", ")));
    }
    for fk in &table.foreign_keys {
        let mut line = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            fk.columns.join(", "),
            fk.ref_table,
            fk.ref_columns.join(", ")
        );
        if fk.on_delete != OnDelete::NoAction {
            line.push_str(&format!(" ON DELETE {}", fk.on_delete));
        }
        lines.push(line);
    }

    let body = lines
        .iter()
        .map(|l| format!("    {l}"))
        .collect::<Vec<_>>()
        .join(",\n");
    let partition = table
        .partitioning
        .as_ref()
        .map(|p| format!(" PARTITION BY {} ({})", p.kind, p.columns.join(", ")))
        .unwrap_or_default();
    format!("CREATE TABLE {} (\n{}\n){};", table.name, body, partition)
}

pub fn render_create_index(index: &Index) -> String {
    format!(
        "CREATE {}INDEX {} ON {} USING {} ({});",
        if index.unique { "UNIQUE " } else { "" },
        index.name,
        index.table,
        index.kind.method(),
        index.columns.join(", ")
    )
}
