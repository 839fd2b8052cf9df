use crate::error::{DesignError, Result};
use crate::schema::OnDelete;

pub(super) fn parse_on_delete(tokens: &[String], start: usize, end: usize) -> Result<(OnDelete, usize)> {
    if start >= end {
        return Err(DesignError::parse(
            "Unknown ON DELETE action ''. Use restrict|cascade|set null|no action",
        ));
    }

    let t0 = tokens[start].to_lowercase();
    match t0.as_str() {
        "restrict" => Ok((OnDelete::Restrict, 1)),
        "cascade" => Ok((OnDelete::Cascade, 1)),
        "set" => {
            if start + 1 < end && tokens[start + 1].eq_ignore_ascii_case("null") {
                Ok((OnDelete::SetNull, 2))
            } else {
                Err(DesignError::parse(
                    "Unknown ON DELETE action 'set'. Use restrict|cascade|set null|no action",
                ))
            }
        }
        "no" => {
            if start + 1 < end && tokens[start + 1].eq_ignore_ascii_case("action") {
                Ok((OnDelete::NoAction, 2))
            } else {
                Err(DesignError::parse(
                    "Unknown ON DELETE action 'no'. Use restrict|cascade|set null|no action",
                ))
            }
        }
        other => Err(DesignError::parse(format!(
            "Unknown ON DELETE action '{other}'. Use restrict|cascade|set null|no action"
        ))),
    }
}

/// Parses `( col [, col ...] )` starting at `start`; returns the names and the
/// index just past the closing parenthesis.
pub(super) fn parse_column_name_list(
    tokens: &[String],
    start: usize,
    end: usize,
) -> Result<(Vec<String>, usize)> {
    if start >= end || tokens[start] != "(" {
        return Err(DesignError::parse("Column list must start with '('"));
    }
    let mut i = start + 1;
    let mut cols: Vec<String> = Vec::new();
    let mut expect_col = true;
    while i < end {
        if tokens[i] == ")" {
            if cols.is_empty() || expect_col {
                return Err(DesignError::parse("Column list cannot be empty"));
            }
            return Ok((cols, i + 1));
        }
        if expect_col {
            if tokens[i] == "," {
                return Err(DesignError::parse("Bad column list"));
            }
            cols.push(unqualified(&tokens[i]));
            expect_col = false;
        } else if tokens[i] != "," {
            return Err(DesignError::parse("Bad column list, expected comma"));
        } else {
            expect_col = true;
        }
        i += 1;
    }
    Err(DesignError::parse("Unclosed column list"))
}

/// Index just past the parenthesis matching the `(` at `open`.
pub(super) fn skip_parenthesized(tokens: &[String], open: usize, end: usize) -> Result<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < end {
        if tokens[i] == "(" {
            depth += 1;
        } else if tokens[i] == ")" {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Ok(i + 1);
            }
        }
        i += 1;
    }
    Err(DesignError::parse("Unbalanced parentheses"))
}

/// Drops a `schema.` or `table.` qualifier.
pub(super) fn unqualified(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}
