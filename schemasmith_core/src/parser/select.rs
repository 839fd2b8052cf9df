use crate::dml::{Aggregate, AggregateFn, CompareOp, Filter, QueryShape};
use crate::error::{DesignError, Result};

use super::common::unqualified;

const USAGE: &str = "Usage: select <col1,col2|*|fn(col)> from <table> [where <col> <op> <value> [and ...]] [group by <col1,col2>] [order by <col>] [limit <n>]";

pub(super) fn parse_select(tokens: &[String]) -> Result<QueryShape> {
    let projection_start = if tokens.len() > 1 && tokens[1].eq_ignore_ascii_case("distinct") {
        2
    } else {
        1
    };
    let from_idx = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("from"))
        .ok_or_else(|| DesignError::parse(USAGE))?;
    if from_idx <= projection_start || from_idx + 1 >= tokens.len() {
        return Err(DesignError::parse(USAGE));
    }

    let mut shape = QueryShape::new(unqualified(&tokens[from_idx + 1]));
    parse_projection(&tokens[projection_start..from_idx], &mut shape)?;

    let mut i = from_idx + 2;
    // Optional table alias.
    if i < tokens.len() && !is_clause_keyword(&tokens[i]) {
        if tokens[i].eq_ignore_ascii_case("as") {
            i += 1;
        }
        i += 1;
    }

    if i < tokens.len() && tokens[i].eq_ignore_ascii_case("where") {
        let where_end = find_clause_end(tokens, i + 1);
        shape.filters = parse_filters(&tokens[i + 1..where_end])?;
        i = where_end;
    }

    if i < tokens.len() && tokens[i].eq_ignore_ascii_case("group") {
        if i + 2 >= tokens.len() || !tokens[i + 1].eq_ignore_ascii_case("by") {
            return Err(DesignError::parse(USAGE));
        }
        let (cols, next) = parse_group_by_columns(tokens, i + 2)?;
        shape.group_by = cols;
        i = next;
    }

    if i < tokens.len() && tokens[i].eq_ignore_ascii_case("having") {
        // Having narrows groups; it does not change the result shape.
        i = find_clause_end(tokens, i + 1);
    }

    if i < tokens.len() && tokens[i].eq_ignore_ascii_case("order") {
        if i + 2 >= tokens.len() || !tokens[i + 1].eq_ignore_ascii_case("by") {
            return Err(DesignError::parse(USAGE));
        }
        i = find_clause_end(tokens, i + 2);
    }

    if i < tokens.len() && tokens[i].eq_ignore_ascii_case("limit") {
        if i + 1 >= tokens.len() {
            return Err(DesignError::parse(USAGE));
        }
        let n = tokens[i + 1]
            .parse::<usize>()
            .map_err(|_| DesignError::parse("LIMIT must be a non-negative integer"))?;
        shape.limit = Some(n);
        i += 2;
    }

    if i != tokens.len() {
        return Err(DesignError::parse(format!("Unexpected '{}' in SELECT. {USAGE}", tokens[i])));
    }
    Ok(shape)
}

fn is_clause_keyword(token: &str) -> bool {
    ["where", "group", "having", "order", "limit", "offset"]
        .iter()
        .any(|k| token.eq_ignore_ascii_case(k))
}

fn find_clause_end(tokens: &[String], start: usize) -> usize {
    (start..tokens.len())
        .find(|&i| is_clause_keyword(&tokens[i]))
        .unwrap_or(tokens.len())
}

fn parse_projection(tokens: &[String], shape: &mut QueryShape) -> Result<()> {
    if tokens.len() == 1 && tokens[0] == "*" {
        return Ok(());
    }
    if tokens.is_empty() {
        return Err(DesignError::parse(
            "SELECT column list cannot be empty. Use '*' or comma-separated column names.",
        ));
    }

    let mut i = 0usize;
    while i < tokens.len() {
        if tokens[i] == "," {
            return Err(DesignError::parse("Bad SELECT column list. Unexpected comma."));
        }
        if i + 1 < tokens.len() && tokens[i + 1] == "(" {
            let close = (i + 2..tokens.len())
                .find(|&j| tokens[j] == ")")
                .ok_or_else(|| DesignError::parse("Bad SELECT function syntax. Use fn(col) or fn(*)"))?;
            let function = parse_aggregate_fn(&tokens[i])?;
            let args: Vec<&String> = tokens[i + 2..close]
                .iter()
                .filter(|t| !t.eq_ignore_ascii_case("distinct"))
                .collect();
            let column = match args.as_slice() {
                [] => return Err(DesignError::parse("Bad SELECT function syntax. Use fn(col) or fn(*)")),
                [star] if star.as_str() == "*" => None,
                [col] => Some(unqualified(col)),
                _ => return Err(DesignError::parse("Aggregate functions take one argument")),
            };
            if column.is_none() && function != AggregateFn::Count {
                return Err(DesignError::parse(format!("{}(*) is not valid; only count(*)", function)));
            }
            i = close + 1;
            let alias = take_alias(tokens, &mut i)?;
            shape.aggregates.push(Aggregate {
                function,
                column,
                alias,
            });
        } else {
            let column = unqualified(&tokens[i]);
            i += 1;
            // Aliases on plain columns do not change the column's type.
            take_alias(tokens, &mut i)?;
            shape.columns.push(column);
        }
        if i < tokens.len() {
            if tokens[i] != "," {
                return Err(DesignError::parse("Bad SELECT column list. Use comma-separated column names."));
            }
            i += 1;
            if i >= tokens.len() {
                return Err(DesignError::parse("SELECT column list cannot end with comma"));
            }
        }
    }
    Ok(())
}

fn take_alias(tokens: &[String], i: &mut usize) -> Result<Option<String>> {
    if *i < tokens.len() && tokens[*i].eq_ignore_ascii_case("as") {
        if *i + 1 >= tokens.len() || tokens[*i + 1] == "," {
            return Err(DesignError::parse("Bad SELECT alias syntax. Use: <expr> as <alias>"));
        }
        let alias = tokens[*i + 1].clone();
        *i += 2;
        return Ok(Some(alias));
    }
    Ok(None)
}

fn parse_aggregate_fn(raw: &str) -> Result<AggregateFn> {
    match raw.to_lowercase().as_str() {
        "count" => Ok(AggregateFn::Count),
        "sum" => Ok(AggregateFn::Sum),
        "avg" => Ok(AggregateFn::Avg),
        "min" => Ok(AggregateFn::Min),
        "max" => Ok(AggregateFn::Max),
        other => Err(DesignError::parse(format!(
            "Unknown function '{other}'. Use count|sum|avg|min|max"
        ))),
    }
}

fn parse_compare_op(raw: &str) -> Result<CompareOp> {
    match raw.to_lowercase().as_str() {
        "=" => Ok(CompareOp::Eq),
        "!=" | "<>" => Ok(CompareOp::Ne),
        ">" => Ok(CompareOp::Gt),
        "<" => Ok(CompareOp::Lt),
        ">=" => Ok(CompareOp::Gte),
        "<=" => Ok(CompareOp::Lte),
        "like" => Ok(CompareOp::Like),
        _ => Err(DesignError::parse(format!(
            "Unknown WHERE operator '{raw}'. Use =|!=|<>|>|<|>=|<=|like"
        ))),
    }
}

fn parse_filters(tokens: &[String]) -> Result<Vec<Filter>> {
    let mut filters = Vec::new();
    let mut i = 0usize;
    loop {
        if i + 3 > tokens.len() {
            return Err(DesignError::parse("WHERE predicate must be <column> <op> <value>"));
        }
        let column = unqualified(&tokens[i]);
        let op = parse_compare_op(&tokens[i + 1])?;
        let value = strip_literal_quotes(&tokens[i + 2]);
        filters.push(Filter { column, op, value });
        i += 3;
        if i >= tokens.len() {
            return Ok(filters);
        }
        if tokens[i].eq_ignore_ascii_case("and") {
            i += 1;
            continue;
        }
        if tokens[i].eq_ignore_ascii_case("or") {
            return Err(DesignError::parse("Only AND-combined WHERE predicates are supported"));
        }
        return Err(DesignError::parse(format!("Unexpected '{}' in WHERE clause", tokens[i])));
    }
}

fn strip_literal_quotes(token: &str) -> String {
    token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .map(|t| t.replace("''", "'"))
        .unwrap_or_else(|| token.to_string())
}

fn parse_group_by_columns(tokens: &[String], mut i: usize) -> Result<(Vec<String>, usize)> {
    let mut cols: Vec<String> = Vec::new();
    loop {
        if i >= tokens.len() {
            return Err(DesignError::parse("GROUP BY requires at least one column"));
        }
        if tokens[i] == "," || tokens[i] == "(" || tokens[i] == ")" {
            return Err(DesignError::parse("Bad GROUP BY column list"));
        }
        cols.push(unqualified(&tokens[i]));
        i += 1;
        if i < tokens.len() && tokens[i] == "," {
            i += 1;
            continue;
        }
        break;
    }
    Ok((cols, i))
}
