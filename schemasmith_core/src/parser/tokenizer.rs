use crate::error::{DesignError, Result};

/// Splits SQL text into tokens.
///
/// Single-quoted literals keep their quotes so they can be re-emitted verbatim;
/// double-quoted and backticked identifiers lose theirs. `--` and `/* */`
/// comments are dropped.
pub(crate) fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut it = input.chars().peekable();

    while let Some(ch) = it.next() {
        match ch {
            '-' if it.peek() == Some(&'-') => {
                flush(&mut tokens, &mut current);
                for c in it.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }

            '/' if it.peek() == Some(&'*') => {
                flush(&mut tokens, &mut current);
                it.next();
                let mut prev = '\0';
                let mut closed = false;
                for c in it.by_ref() {
                    if prev == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = c;
                }
                if !closed {
                    return Err(DesignError::parse("Unclosed block comment"));
                }
            }

            '\'' => {
                if !current.is_empty() {
                    return Err(DesignError::parse(
                        "Quote (') cannot start in the middle of a token. Add whitespace before the quote.",
                    ));
                }
                let mut literal = String::from("'");
                let mut closed = false;
                while let Some(c) = it.next() {
                    if c == '\'' {
                        if it.peek() == Some(&'\'') {
                            it.next();
                            literal.push_str("''");
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    literal.push(c);
                }
                if !closed {
                    return Err(DesignError::parse("Unclosed quote (') in input"));
                }
                literal.push('\'');
                tokens.push(literal);
            }

            '"' | '`' => {
                let close = ch;
                let mut closed = false;
                for c in it.by_ref() {
                    if c == close {
                        closed = true;
                        break;
                    }
                    current.push(c);
                }
                if !closed {
                    return Err(DesignError::parse(format!("Unclosed identifier quote ({close})")));
                }
            }

            c if c.is_whitespace() => flush(&mut tokens, &mut current),

            ',' | '(' | ')' | ';' => {
                flush(&mut tokens, &mut current);
                tokens.push(ch.to_string());
            }

            '>' | '<' | '=' | '!' => {
                flush(&mut tokens, &mut current);
                match it.peek().copied() {
                    Some('=') => {
                        it.next();
                        tokens.push(format!("{ch}="));
                    }
                    Some('>') if ch == '<' => {
                        it.next();
                        tokens.push("<>".to_string());
                    }
                    _ => tokens.push(ch.to_string()),
                }
            }

            _ => current.push(ch),
        }
    }

    flush(&mut tokens, &mut current);
    Ok(tokens)
}

fn flush(tokens: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Groups tokens into statements at `;`, dropping empty statements.
pub(crate) fn split_statements(tokens: Vec<String>) -> Vec<Vec<String>> {
    let mut statements: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for t in tokens {
        if t == ";" {
            if !current.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
        } else {
            current.push(t);
        }
    }
    if !current.is_empty() {
        statements.push(current);
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_punctuation_and_keeps_literals() {
        let tokens = tokenize("create table t (name varchar(10) default 'it''s', x int);").unwrap();
        assert_eq!(
            tokens,
            vec![
                "create", "table", "t", "(", "name", "varchar", "(", "10", ")", "default",
                "'it''s'", ",", "x", "int", ")", ";"
            ]
        );
    }

    #[test]
    fn drops_comments_and_identifier_quotes() {
        let tokens = tokenize("-- header\nselect \"Id\" /* inline */ from `users`").unwrap();
        assert_eq!(tokens, vec!["select", "Id", "from", "users"]);
    }

    #[test]
    fn two_char_operators() {
        let tokens = tokenize("a>=1 and b<>2 and c!=3").unwrap();
        assert_eq!(tokens, vec!["a", ">=", "1", "and", "b", "<>", "2", "and", "c", "!=", "3"]);
    }

    #[test]
    fn unclosed_literal_is_an_error() {
        assert!(tokenize("select 'oops").is_err());
    }

    #[test]
    fn statements_split_on_semicolon() {
        let tokens = tokenize("a b; ; c").unwrap();
        assert_eq!(
            split_statements(tokens),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
    }
}
