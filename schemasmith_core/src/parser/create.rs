use crate::error::{DesignError, Result};
use crate::schema::{
    ColumnInput, ForeignKeyInput, IndexInput, IndexKind, OnDelete, PartitionInput, PartitionKind,
    TableInput,
};
use crate::types::datatype::{DataType, parse_datatype};

use super::common::{parse_column_name_list, parse_on_delete, skip_parenthesized, unqualified};

const USAGE: &str = "Usage: create table <table> (<col> <type> [constraints], ...)";

/// Index statement before it is attached to its table.
pub(super) struct CreateIndex {
    pub table: String,
    pub index: IndexInput,
}

pub(super) fn parse_create_table(tokens: &[String]) -> Result<TableInput> {
    // create table [if not exists] <table> ( ... ) [partition by <kind> (cols)]
    if tokens.len() < 5 || !tokens[1].eq_ignore_ascii_case("table") {
        return Err(DesignError::parse(USAGE));
    }
    let mut i = 2usize;
    if i + 2 < tokens.len()
        && tokens[i].eq_ignore_ascii_case("if")
        && tokens[i + 1].eq_ignore_ascii_case("not")
        && tokens[i + 2].eq_ignore_ascii_case("exists")
    {
        i += 3;
    }
    if i + 1 >= tokens.len() || tokens[i + 1] != "(" {
        return Err(DesignError::parse("CREATE TABLE requires parenthesized column definitions"));
    }
    let mut table = TableInput::new(unqualified(&tokens[i]), Vec::new());
    let open = i + 1;
    let after_body = skip_parenthesized(tokens, open, tokens.len())?;
    let end = after_body - 1;
    i = open + 1;

    while i < end {
        let t = tokens[i].to_lowercase();
        if matches!(t.as_str(), "primary" | "unique" | "foreign" | "constraint" | "check") {
            i = parse_table_constraint(tokens, i, end, &mut table)?;
        } else {
            i = parse_column(tokens, i, end, &mut table)?;
        }
        if i < end {
            if tokens[i] != "," {
                return Err(DesignError::parse(format!(
                    "Bad CREATE TABLE '{}' column list. Columns must be comma-separated.",
                    table.name
                )));
            }
            i += 1;
            if i >= end {
                return Err(DesignError::parse("Bad CREATE column list. Trailing comma is not allowed."));
            }
        }
    }

    if table.columns.is_empty() {
        return Err(DesignError::parse(format!(
            "CREATE TABLE '{}' requires at least one column",
            table.name
        )));
    }

    let mut i = after_body;
    if i < tokens.len() {
        if i + 2 < tokens.len()
            && tokens[i].eq_ignore_ascii_case("partition")
            && tokens[i + 1].eq_ignore_ascii_case("by")
        {
            let kind = match tokens[i + 2].to_lowercase().as_str() {
                "range" => PartitionKind::Range,
                "hash" => PartitionKind::Hash,
                "list" => PartitionKind::List,
                other => {
                    return Err(DesignError::parse(format!(
                        "Unknown partitioning '{other}'. Use range|hash|list"
                    )));
                }
            };
            let (columns, next) = parse_column_name_list(tokens, i + 3, tokens.len())?;
            table.partitioning = Some(PartitionInput { kind, columns });
            i = next;
        }
        if i != tokens.len() {
            return Err(DesignError::parse(format!(
                "Unexpected '{}' after CREATE TABLE '{}'",
                tokens[i], table.name
            )));
        }
    }

    Ok(table)
}

fn parse_column(tokens: &[String], start: usize, end: usize, table: &mut TableInput) -> Result<usize> {
    let name = unqualified(&tokens[start]);
    let (dtype, mut i) = parse_datatype_in_create(tokens, start + 1, end)?;
    let mut column = ColumnInput::new(name.clone(), dtype);

    while i < end && tokens[i] != "," {
        let t = tokens[i].to_lowercase();
        match t.as_str() {
            "primary" => {
                if i + 1 >= end || !tokens[i + 1].eq_ignore_ascii_case("key") {
                    return Err(DesignError::parse("Bad PRIMARY KEY constraint. Use 'primary key'"));
                }
                column.primary_key = true;
                i += 2;
            }
            "unique" => {
                column.unique = true;
                i += 1;
            }
            "not" => {
                if i + 1 >= end || !tokens[i + 1].eq_ignore_ascii_case("null") {
                    return Err(DesignError::parse("Bad NOT NULL constraint. Use 'not null'"));
                }
                column.nullable = Some(false);
                i += 2;
            }
            "null" => {
                column.nullable = Some(true);
                i += 1;
            }
            "default" => {
                let (expr, next) = parse_default(tokens, i + 1, end)?;
                column.default = Some(expr);
                i = next;
            }
            "references" => {
                if i + 1 >= end {
                    return Err(DesignError::parse("Bad REFERENCES clause. Missing parent table"));
                }
                let ref_table = unqualified(&tokens[i + 1]);
                let (ref_columns, mut next) = parse_referenced_columns(tokens, i + 2, end)?;
                let mut fk = ForeignKeyInput {
                    columns: vec![name.clone()],
                    ref_table,
                    ref_columns,
                    on_delete: OnDelete::NoAction,
                };
                next = parse_referential_actions(tokens, next, end, &mut fk)?;
                table.foreign_keys.push(fk);
                i = next;
            }
            "check" => {
                i = skip_parenthesized(tokens, i + 1, end)?;
            }
            "auto_increment" | "autoincrement" => {
                i += 1;
            }
            other => {
                return Err(DesignError::parse(format!(
                    "Unknown column constraint token '{other}' on '{}.{}'",
                    table.name, name
                )));
            }
        }
    }

    table.columns.push(column);
    Ok(i)
}

fn parse_default(tokens: &[String], start: usize, end: usize) -> Result<(String, usize)> {
    if start >= end || tokens[start] == "," {
        return Err(DesignError::parse("DEFAULT requires an expression"));
    }
    // A function call such as now() or gen_random_uuid().
    if start + 1 < end && tokens[start + 1] == "(" {
        let next = skip_parenthesized(tokens, start + 1, end)?;
        let args = tokens[start + 2..next - 1].join(" ");
        return Ok((format!("{}({})", tokens[start], args), next));
    }
    Ok((tokens[start].clone(), start + 1))
}

/// An omitted list means the parent's primary key; it stays empty until every table is parsed.
fn parse_referenced_columns(tokens: &[String], start: usize, end: usize) -> Result<(Vec<String>, usize)> {
    if start < end && tokens[start] == "(" {
        parse_column_name_list(tokens, start, end)
    } else {
        Ok((Vec::new(), start))
    }
}

fn parse_referential_actions(
    tokens: &[String],
    mut next: usize,
    end: usize,
    fk: &mut ForeignKeyInput,
) -> Result<usize> {
    loop {
        if next + 1 < end
            && tokens[next].eq_ignore_ascii_case("on")
            && tokens[next + 1].eq_ignore_ascii_case("delete")
        {
            let (action, consumed) = parse_on_delete(tokens, next + 2, end)?;
            fk.on_delete = action;
            next = next + 2 + consumed;
            continue;
        }
        if next + 1 < end
            && tokens[next].eq_ignore_ascii_case("on")
            && tokens[next + 1].eq_ignore_ascii_case("update")
        {
            // Update actions are accepted and not modelled.
            let (_, consumed) = parse_on_delete(tokens, next + 2, end)?;
            next = next + 2 + consumed;
            continue;
        }
        return Ok(next);
    }
}

fn parse_table_constraint(
    tokens: &[String],
    mut start: usize,
    end: usize,
    table: &mut TableInput,
) -> Result<usize> {
    if tokens[start].eq_ignore_ascii_case("constraint") {
        if start + 2 >= end {
            return Err(DesignError::parse("Bad CONSTRAINT clause. Use constraint <name> <definition>"));
        }
        start += 2;
    }
    let t = tokens[start].to_lowercase();
    match t.as_str() {
        "primary" => {
            if start + 1 >= end || !tokens[start + 1].eq_ignore_ascii_case("key") {
                return Err(DesignError::parse("Bad PRIMARY KEY constraint. Use primary key(col1,col2)"));
            }
            if !table.primary_key.is_empty() {
                return Err(DesignError::parse(format!(
                    "Table '{}' declares more than one PRIMARY KEY",
                    table.name
                )));
            }
            let (cols, next) = parse_column_name_list(tokens, start + 2, end)?;
            table.primary_key = cols;
            Ok(next)
        }
        "unique" => {
            let mut i = start + 1;
            if i < end && (tokens[i].eq_ignore_ascii_case("key") || tokens[i].eq_ignore_ascii_case("index")) {
                i += 1;
            }
            let (cols, next) = parse_column_name_list(tokens, i, end)?;
            table.unique.push(cols);
            Ok(next)
        }
        "foreign" => {
            if start + 1 >= end || !tokens[start + 1].eq_ignore_ascii_case("key") {
                return Err(DesignError::parse(
                    "Bad FOREIGN KEY constraint. Use foreign key(col) references t(col)",
                ));
            }
            let (columns, after_cols) = parse_column_name_list(tokens, start + 2, end)?;
            if after_cols >= end || !tokens[after_cols].eq_ignore_ascii_case("references") {
                return Err(DesignError::parse("Bad FOREIGN KEY constraint. Missing REFERENCES"));
            }
            if after_cols + 1 >= end {
                return Err(DesignError::parse("Bad FOREIGN KEY constraint. Missing parent table"));
            }
            let ref_table = unqualified(&tokens[after_cols + 1]);
            let (ref_columns, next) = parse_referenced_columns(tokens, after_cols + 2, end)?;
            let mut fk = ForeignKeyInput {
                columns,
                ref_table,
                ref_columns,
                on_delete: OnDelete::NoAction,
            };
            let next = parse_referential_actions(tokens, next, end, &mut fk)?;
            table.foreign_keys.push(fk);
            Ok(next)
        }
        "check" => skip_parenthesized(tokens, start + 1, end),
        _ => Err(DesignError::parse("Unknown table constraint")),
    }
}

pub(super) fn parse_datatype_in_create(
    tokens: &[String],
    start: usize,
    end: usize,
) -> Result<(DataType, usize)> {
    if start >= end {
        return Err(DesignError::parse("Missing datatype in CREATE column definition"));
    }
    let t = tokens[start].to_lowercase();
    match t.as_str() {
        "varchar" | "character" => {
            let mut i = start;
            if t == "character" {
                if start + 1 >= end || !tokens[start + 1].eq_ignore_ascii_case("varying") {
                    return Err(DesignError::parse("Bad character type. Use character varying(n)"));
                }
                i += 1;
            }
            if i + 3 >= end || tokens[i + 1] != "(" || tokens[i + 3] != ")" {
                return Err(DesignError::parse("Bad varchar type. Use varchar(n)"));
            }
            let combined = format!("varchar({})", tokens[i + 2]);
            Ok((parse_datatype(&combined)?, i + 4))
        }
        "decimal" | "numeric" if start + 1 < end && tokens[start + 1] == "(" => {
            if start + 3 < end && tokens[start + 3] == ")" {
                let combined = format!("decimal({},0)", tokens[start + 2]);
                return Ok((parse_datatype(&combined)?, start + 4));
            }
            if start + 5 >= end
                || tokens[start + 3] != ","
                || tokens[start + 5] != ")"
            {
                return Err(DesignError::parse("Bad decimal type. Use decimal(p,s)"));
            }
            let combined = format!("decimal({},{})", tokens[start + 2], tokens[start + 4]);
            Ok((parse_datatype(&combined)?, start + 6))
        }
        "timestamp" => {
            // timestamp [with|without time zone]
            if start + 3 < end
                && (tokens[start + 1].eq_ignore_ascii_case("with")
                    || tokens[start + 1].eq_ignore_ascii_case("without"))
                && tokens[start + 2].eq_ignore_ascii_case("time")
                && tokens[start + 3].eq_ignore_ascii_case("zone")
            {
                return Ok((DataType::Timestamp, start + 4));
            }
            Ok((DataType::Timestamp, start + 1))
        }
        _ => Ok((parse_datatype(&tokens[start])?, start + 1)),
    }
}

pub(super) fn parse_create_index(tokens: &[String]) -> Result<CreateIndex> {
    // create [unique] index [if not exists] [name] on <table> [using btree|hash] (col[,col...])
    let usage = "Usage: create [unique] index [name] on <table> [using btree|hash] (<col>, ...)";
    let mut i = 1usize;
    let mut unique = false;
    if i < tokens.len() && tokens[i].eq_ignore_ascii_case("unique") {
        unique = true;
        i += 1;
    }
    if i >= tokens.len() || !tokens[i].eq_ignore_ascii_case("index") {
        return Err(DesignError::parse(usage));
    }
    i += 1;
    if i + 2 < tokens.len()
        && tokens[i].eq_ignore_ascii_case("if")
        && tokens[i + 1].eq_ignore_ascii_case("not")
        && tokens[i + 2].eq_ignore_ascii_case("exists")
    {
        i += 3;
    }
    let mut name = None;
    if i < tokens.len() && !tokens[i].eq_ignore_ascii_case("on") {
        name = Some(unqualified(&tokens[i]));
        i += 1;
    }
    if i + 1 >= tokens.len() || !tokens[i].eq_ignore_ascii_case("on") {
        return Err(DesignError::parse(usage));
    }
    let table = unqualified(&tokens[i + 1]);
    i += 2;
    let mut kind = None;
    if i + 1 < tokens.len() && tokens[i].eq_ignore_ascii_case("using") {
        kind = match tokens[i + 1].to_lowercase().as_str() {
            "btree" => None,
            "hash" => Some(IndexKind::Hash),
            other => {
                return Err(DesignError::parse(format!(
                    "Unknown index method '{other}'. Use btree|hash"
                )));
            }
        };
        i += 2;
    }
    let (columns, next) = parse_column_name_list(tokens, i, tokens.len())?;
    if next != tokens.len() {
        return Err(DesignError::parse(usage));
    }
    Ok(CreateIndex {
        table,
        index: IndexInput {
            name,
            columns,
            kind,
            unique,
        },
    })
}
