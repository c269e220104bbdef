use super::*;

fn parse(line: &str) -> InsertStatement {
    parse_insert(line).unwrap().expect("expected an INSERT statement")
}

#[test]
fn test_basic_insert() {
    let stmt = parse("INSERT INTO locataire (id, nom) VALUES (1, 'Martin');");

    assert_eq!(stmt.table, "locataire");
    assert_eq!(stmt.columns, vec!["id", "nom"]);
    assert_eq!(stmt.single(), &["1", "'Martin'"]);
}

#[test]
fn test_keywords_are_case_insensitive_and_semicolon_optional() {
    let stmt = parse("insert into Immeuble (id) values (7)");
    assert_eq!(stmt.table, "immeuble");
    assert_eq!(stmt.single(), &["7"]);
}

#[test]
fn test_quoted_identifiers_are_stripped() {
    let stmt = parse("INSERT INTO `Contrat` (`id`, \"date_debut\", 'Loyer HC') VALUES (1, '2020-01-01', 500);");

    assert_eq!(stmt.table, "contrat");
    assert_eq!(stmt.columns, vec!["id", "date_debut", "Loyer HC"]);
}

#[test]
fn test_schema_qualified_table_keeps_last_part() {
    let stmt = parse("INSERT INTO `legacy`.`log` (id) VALUES (1);");
    assert_eq!(stmt.table, "log");
}

#[test]
fn test_commas_and_parens_inside_quotes() {
    let stmt = parse("INSERT INTO t (a,b,c) VALUES ('x,y', 5, 'it''s');");
    assert_eq!(stmt.single(), &["'x,y'", "5", "'it''s'"]);

    let stmt = parse("INSERT INTO t (a,b) VALUES ('f(x), g(y)', ')');");
    assert_eq!(stmt.single(), &["'f(x), g(y)'", "')'"]);
}

#[test]
fn test_backslash_escapes_do_not_close_literal() {
    let stmt = parse(r"INSERT INTO t (a,b) VALUES ('l\'appartement, 2e', 'C:\\temp');");
    assert_eq!(stmt.single(), &[r"'l\'appartement, 2e'", r"'C:\\temp'"]);
}

#[test]
fn test_mixed_escape_conventions_in_one_line() {
    let stmt = parse(r"INSERT INTO t (a,b,c) VALUES ('it''s', 'l\'eau', 'ok');");
    assert_eq!(stmt.single(), &["'it''s'", r"'l\'eau'", "'ok'"]);
}

#[test]
fn test_empty_string_literal() {
    let stmt = parse("INSERT INTO t (a,b) VALUES ('', '''');");
    assert_eq!(stmt.single(), &["''", "''''"]);
}

#[test]
fn test_function_call_arguments_stay_in_one_token() {
    let stmt = parse("INSERT INTO t (a,b) VALUES (CONCAT('a', 'b'), 2);");
    assert_eq!(stmt.single(), &["CONCAT('a', 'b')", "2"]);
}

#[test]
fn test_extended_insert_yields_every_tuple() {
    let stmt = parse("INSERT INTO t (a,b) VALUES (1,'x'),(2,'y') , (3, NULL);");

    assert_eq!(stmt.tuples.len(), 3);
    assert_eq!(stmt.tuples[2], vec!["3", "NULL"]);
    assert!(stmt.checked_tuples().all(|t| t.is_ok()));
}

#[test]
fn test_count_mismatch_is_reported_per_tuple() {
    let stmt = parse("INSERT INTO t (a,b) VALUES (1,'x'),(2);");
    let checked: Vec<_> = stmt.checked_tuples().collect();

    assert!(checked[0].is_ok());
    assert_eq!(
        checked[1].clone().unwrap_err(),
        LexerError::ColumnCountMismatch {
            table: "t".into(),
            columns: 2,
            values: 1,
        }
    );
}

#[test]
fn test_non_insert_lines_are_skipped() {
    for line in [
        "",
        "   ",
        "-- INSERT INTO t (a) VALUES (1);",
        "CREATE TABLE `t` (",
        "/*!40101 SET NAMES utf8 */;",
        "INSERTED (1)",
        "LOCK TABLES `t` WRITE;",
    ] {
        assert_eq!(parse_insert(line).unwrap(), None, "line: {line:?}");
    }
}

#[test]
fn test_insert_ignore_is_accepted() {
    let stmt = parse("INSERT IGNORE INTO t (a) VALUES (1);");
    assert_eq!(stmt.table, "t");
}

#[test]
fn test_unterminated_quote_is_an_error() {
    let err = parse_insert("INSERT INTO t (a,b) VALUES (1, 'abc);").unwrap_err();
    assert!(matches!(err, LexerError::UnterminatedQuote { column: 32 }));
}

#[test]
fn test_missing_values_keyword() {
    let err = parse_insert("INSERT INTO t (a) SELECT 1;").unwrap_err();
    assert!(matches!(
        err,
        LexerError::Expected {
            expected: "VALUES",
            ..
        }
    ));
}

#[test]
fn test_missing_column_list() {
    let err = parse_insert("INSERT INTO t VALUES (1);").unwrap_err();
    assert!(matches!(
        err,
        LexerError::Expected {
            expected: "column list",
            ..
        }
    ));
}

#[test]
fn test_trailing_garbage() {
    let err = parse_insert("INSERT INTO t (a) VALUES (1) garbage").unwrap_err();
    assert!(matches!(err, LexerError::TrailingInput { .. }));
}

#[test]
fn test_unbalanced_value_list() {
    let err = parse_insert("INSERT INTO t (a) VALUES (1").unwrap_err();
    assert_eq!(err, LexerError::UnbalancedParens);
}

#[test]
fn test_non_ascii_identifiers() {
    let stmt = parse("INSERT INTO échéance (montant_dû) VALUES ('12,50');");
    assert_eq!(stmt.table, "échéance");
    assert_eq!(stmt.columns, vec!["montant_dû"]);
}
