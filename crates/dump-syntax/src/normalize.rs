use crate::sentinel::is_zero_date_sentinel;
use model::core::value::Value;

/// Turns one raw value token into a value.
///
/// * unquoted `NULL` (any case) or an empty token is null
/// * a single-quoted literal is unescaped; zero-date sentinels become null
/// * anything else is kept as a raw token for the target store to coerce
pub fn normalize_token(token: &str) -> Value {
    let token = token.trim();

    if token.is_empty() || token.eq_ignore_ascii_case("NULL") {
        return Value::Null;
    }

    if let Some(inner) = quoted_inner(token) {
        let text = unescape(inner);
        if is_zero_date_sentinel(&text) {
            return Value::Null;
        }
        return Value::String(text);
    }

    Value::Raw(token.to_string())
}

pub fn normalize_tuple(tokens: &[String]) -> Vec<Value> {
    tokens.iter().map(|t| normalize_token(t)).collect()
}

fn quoted_inner(token: &str) -> Option<&str> {
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Resolves doubled quotes and MySQL backslash escapes.
fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('b') => out.push('\u{8}'),
                Some('Z') => out.push('\u{1a}'),
                // PostgreSQL text cannot hold NUL
                Some('0') => {}
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::parse_insert;

    #[test]
    fn test_null_forms() {
        assert_eq!(normalize_token("NULL"), Value::Null);
        assert_eq!(normalize_token("null"), Value::Null);
        assert_eq!(normalize_token(""), Value::Null);
        assert_eq!(normalize_token("'NULL'"), Value::String("NULL".into()));
    }

    #[test]
    fn test_quoted_literals_are_unescaped() {
        assert_eq!(normalize_token("'it''s'"), Value::String("it's".into()));
        assert_eq!(normalize_token(r"'l\'eau'"), Value::String("l'eau".into()));
        assert_eq!(normalize_token(r"'C:\\temp'"), Value::String(r"C:\temp".into()));
        assert_eq!(
            normalize_token(r"'ligne 1\nligne 2'"),
            Value::String("ligne 1\nligne 2".into())
        );
        assert_eq!(normalize_token(r"'a\0b'"), Value::String("ab".into()));
        assert_eq!(normalize_token("''"), Value::String(String::new()));
    }

    #[test]
    fn test_bare_tokens_stay_raw() {
        assert_eq!(normalize_token(" 42 "), Value::Raw("42".into()));
        assert_eq!(normalize_token("-1.5e3"), Value::Raw("-1.5e3".into()));
        assert_eq!(normalize_token("NOW()"), Value::Raw("NOW()".into()));
    }

    #[test]
    fn test_quoted_zero_dates_become_null() {
        for token in [
            "'0000-00-00'",
            "'0000-00-00 00:00:00'",
            "'0000-00-00T00:00:00'",
            "'0000-00-00T00:00:00Z'",
        ] {
            assert_eq!(normalize_token(token), Value::Null, "{token}");
        }
        // unquoted sentinels are left for the loader's retry
        assert_eq!(normalize_token("0000-00-00"), Value::Raw("0000-00-00".into()));
    }

    #[test]
    fn test_tokenize_then_normalize() {
        let stmt = parse_insert("INSERT INTO t (a,b,c) VALUES ('x,y', 5, 'it''s');")
            .unwrap()
            .unwrap();

        let values = normalize_tuple(&stmt.tuples[0]);
        assert_eq!(
            values,
            vec![
                Value::String("x,y".into()),
                Value::Raw("5".into()),
                Value::String("it's".into()),
            ]
        );
    }
}
