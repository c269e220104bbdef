use crate::lexer::error::LexerError;

pub mod error;

#[cfg(test)]
mod tests;

/// One `INSERT INTO <table> (<cols>) VALUES (<vals>)[, (<vals>)...]` line.
///
/// Value tokens are kept raw (quotes and escapes intact); turning them into
/// values is the normalizer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Lower-cased source table name.
    pub table: String,
    pub columns: Vec<String>,
    pub tuples: Vec<Vec<String>>,
}

impl InsertStatement {
    /// Yields every tuple, rejecting those whose arity differs from the
    /// column list.
    pub fn checked_tuples(&self) -> impl Iterator<Item = Result<&[String], LexerError>> + '_ {
        self.tuples.iter().map(move |tuple| {
            if tuple.len() == self.columns.len() {
                Ok(tuple.as_slice())
            } else {
                Err(LexerError::ColumnCountMismatch {
                    table: self.table.clone(),
                    columns: self.columns.len(),
                    values: tuple.len(),
                })
            }
        })
    }
}

/// Parses one dump line.
///
/// Returns `Ok(None)` for anything that is not an INSERT (DDL, comments,
/// blank lines) and an error for INSERT lines that cannot be read.
pub fn parse_insert(line: &str) -> Result<Option<InsertStatement>, LexerError> {
    let mut lexer = LineLexer::new(line.trim_start_matches('\u{feff}'));

    lexer.skip_whitespace();
    if !lexer.eat_keyword("INSERT") {
        return Ok(None);
    }
    lexer.skip_whitespace();
    if lexer.eat_keyword("IGNORE") {
        lexer.skip_whitespace();
    }
    if !lexer.eat_keyword("INTO") {
        return Err(lexer.expected("INTO"));
    }

    lexer.skip_whitespace();
    let table = lexer.table_name()?;
    lexer.skip_whitespace();
    let columns = lexer.column_list()?;
    lexer.skip_whitespace();
    if !lexer.eat_keyword("VALUES") {
        return Err(lexer.expected("VALUES"));
    }

    let mut tuples = Vec::new();
    loop {
        lexer.skip_whitespace();
        if !lexer.eat('(') {
            return Err(lexer.expected("'('"));
        }
        tuples.push(lexer.value_tuple()?);

        lexer.skip_whitespace();
        if lexer.eat(',') {
            continue;
        }
        lexer.eat(';');
        lexer.skip_whitespace();
        if lexer.at_end() {
            break;
        }
        return Err(LexerError::TrailingInput {
            column: lexer.column(),
        });
    }

    Ok(Some(InsertStatement {
        table,
        columns,
        tuples,
    }))
}

struct LineLexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> LineLexer<'a> {
    fn new(input: &'a str) -> Self {
        LineLexer { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// 1-based character column of the cursor.
    fn column(&self) -> usize {
        self.input[..self.pos].chars().count() + 1
    }

    fn expected(&self, expected: &'static str) -> LexerError {
        LexerError::Expected {
            expected,
            column: self.column(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Case-insensitive keyword match on a word boundary.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = &self.input[self.pos..];
        let Some(head) = rest.get(..keyword.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(keyword) {
            return false;
        }
        if rest[keyword.len()..].chars().next().is_some_and(is_ident_char) {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn table_name(&mut self) -> Result<String, LexerError> {
        let mut name = self.identifier()?;
        // `schema`.`table`: keep the last part
        while self.eat('.') {
            name = self.identifier()?;
        }
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(LexerError::MissingTable);
        }
        Ok(name)
    }

    /// Bare identifier, or one quoted with backticks, double or single quotes.
    fn identifier(&mut self) -> Result<String, LexerError> {
        match self.peek() {
            Some(quote @ ('`' | '"' | '\'')) => {
                let column = self.column();
                self.bump();
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => {
                            if self.peek() == Some(quote) {
                                self.bump();
                                out.push(quote);
                            } else {
                                return Ok(out);
                            }
                        }
                        Some(c) => out.push(c),
                        None => return Err(LexerError::UnterminatedQuote { column }),
                    }
                }
            }
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_char) {
                    self.bump();
                }
                Ok(self.input[start..self.pos].to_string())
            }
        }
    }

    fn column_list(&mut self) -> Result<Vec<String>, LexerError> {
        if !self.eat('(') {
            return Err(self.expected("column list"));
        }

        let mut columns = Vec::new();
        loop {
            self.skip_whitespace();
            let name = self.identifier()?.trim().to_string();
            if name.is_empty() {
                return Err(LexerError::EmptyColumn {
                    position: columns.len() + 1,
                });
            }
            columns.push(name);

            self.skip_whitespace();
            if self.eat(',') {
                continue;
            }
            if self.eat(')') {
                return Ok(columns);
            }
            return Err(self.expected("',' or ')'"));
        }
    }

    /// Scans one parenthesized value list; the opening paren is consumed.
    ///
    /// Inside a single-quoted literal a doubled quote is an escaped quote and
    /// a backslash escapes the next character. Both forms are kept verbatim.
    fn value_tuple(&mut self) -> Result<Vec<String>, LexerError> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut in_quote = false;
        let mut quote_column = 0;
        let mut depth = 0usize;

        loop {
            let Some(c) = self.bump() else {
                return Err(if in_quote {
                    LexerError::UnterminatedQuote {
                        column: quote_column,
                    }
                } else {
                    LexerError::UnbalancedParens
                });
            };

            if in_quote {
                match c {
                    '\'' if self.peek() == Some('\'') => {
                        current.push_str("''");
                        self.bump();
                    }
                    '\'' => {
                        current.push(c);
                        in_quote = false;
                    }
                    '\\' => {
                        current.push(c);
                        if let Some(escaped) = self.bump() {
                            current.push(escaped);
                        }
                    }
                    _ => current.push(c),
                }
                continue;
            }

            match c {
                '\'' => {
                    quote_column = self.column() - 1;
                    in_quote = true;
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' if depth == 0 => {
                    tokens.push(current.trim().to_string());
                    break;
                }
                ')' => {
                    depth -= 1;
                    current.push(c);
                }
                ',' if depth == 0 => {
                    tokens.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            }
        }

        if tokens.len() == 1 && tokens[0].is_empty() {
            tokens.clear();
        }
        Ok(tokens)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
impl InsertStatement {
    pub(crate) fn single(&self) -> &[String] {
        &self.tuples[0]
    }
}
