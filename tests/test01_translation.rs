use sql_duet::prelude::*;
use sql_duet::translation::SplitStatement;
use sql_duet::type_tags;

#[test]
fn test01_numbered_markers_increase_left_to_right() -> Result<(), SqlDuetError> {
    let sql = "INSERT INTO customers (lastname, firstname, gender, address) VALUES (?, ?, ?, ?)";
    let rewritten = translate_placeholders(sql, "?", PlaceholderStyle::Numbered, 4)?;
    assert_eq!(
        rewritten,
        "INSERT INTO customers (lastname, firstname, gender, address) VALUES ($1, $2, $3, $4)"
    );
    Ok(())
}

#[test]
fn test01_question_marks_pass_through() -> Result<(), SqlDuetError> {
    let sql = "SELECT * FROM customers WHERE lastname = ? AND gender = ?";
    let rewritten = translate_placeholders(sql, "?", PlaceholderStyle::QuestionMark, 2)?;
    assert_eq!(rewritten, sql);
    Ok(())
}

#[test]
fn test01_every_count_mismatch_is_rejected() {
    let sql = "SELECT * FROM t WHERE a = ? AND b = ? AND c = ?";
    for params in [0_usize, 1, 2, 4, 7] {
        let err = translate_placeholders(sql, "?", PlaceholderStyle::Numbered, params).unwrap_err();
        match err {
            SqlDuetError::PlaceholderCountMismatch {
                placeholders,
                params: got,
            } => {
                assert_eq!(placeholders, 3);
                assert_eq!(got, params);
            }
            other => panic!("expected a count mismatch, got {other:?}"),
        }
    }
}

#[test]
fn test01_mismatch_message_names_both_counts() {
    let err = translate_placeholders("SELECT * FROM t WHERE id=?", "?", PlaceholderStyle::Numbered, 2)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Number of variables (2) doesn't match number of parameters in statement (1)"
    );
}

#[test]
fn test01_quoted_and_commented_tokens_are_text() -> Result<(), SqlDuetError> {
    let sql = "SELECT '?' AS q, \"odd?col\" FROM t -- is it?\nWHERE a = ? /* or ? */";
    let rewritten = translate_placeholders(sql, "?", PlaceholderStyle::Numbered, 1)?;
    assert_eq!(
        rewritten,
        "SELECT '?' AS q, \"odd?col\" FROM t -- is it?\nWHERE a = $1 /* or ? */"
    );
    Ok(())
}

#[test]
fn test01_postgres_dollar_quotes_are_text() -> Result<(), SqlDuetError> {
    let sql = "SELECT $tag$https://example.com/?1=$tag$ || ?";
    let rewritten = translate_placeholders(sql, "?", PlaceholderStyle::Numbered, 1)?;
    assert_eq!(rewritten, "SELECT $tag$https://example.com/?1=$tag$ || $1");
    Ok(())
}

#[test]
fn test01_mysql_backticks_are_text() -> Result<(), SqlDuetError> {
    let sql = "SELECT `what?` FROM t WHERE a = ?";
    let split = SplitStatement::new(sql, "?", PlaceholderStyle::QuestionMark)?;
    assert_eq!(split.placeholder_count(), 1);
    Ok(())
}

#[test]
fn test01_custom_multi_char_token() -> Result<(), SqlDuetError> {
    let sql = "UPDATE t SET a = :v WHERE id = :v";
    let rewritten = translate_placeholders(sql, ":v", PlaceholderStyle::Numbered, 2)?;
    assert_eq!(rewritten, "UPDATE t SET a = $1 WHERE id = $2");
    let rewritten = translate_placeholders(sql, ":v", PlaceholderStyle::QuestionMark, 2)?;
    assert_eq!(rewritten, "UPDATE t SET a = ? WHERE id = ?");
    Ok(())
}

#[test]
fn test01_no_placeholders_no_params() -> Result<(), SqlDuetError> {
    let rewritten = translate_placeholders("SELECT 1", "?", PlaceholderStyle::Numbered, 0)?;
    assert_eq!(rewritten, "SELECT 1");
    Ok(())
}

#[test]
fn test01_inline_renders_literals() -> Result<(), SqlDuetError> {
    let split = SplitStatement::new(
        "INSERT INTO t VALUES (?, ?, ?, ?, ?)",
        "?",
        PlaceholderStyle::Numbered,
    )?;
    let sql = split.inline(
        &[
            RowValues::Text("it's".into()),
            RowValues::Int(-3),
            RowValues::Float(2.5),
            RowValues::Bool(false),
            RowValues::Null,
        ],
        |s| format!("'{}'", s.replace('\'', "''")),
    )?;
    assert_eq!(sql, "INSERT INTO t VALUES ('it''s', -3, 2.5, 0, NULL)");
    Ok(())
}

#[test]
fn test01_type_tags_per_value() -> Result<(), SqlDuetError> {
    let tags = type_tags(&[
        RowValues::Text("Robertson".into()),
        RowValues::Int(1),
        RowValues::Float(0.5),
        RowValues::Bool(true),
        RowValues::Null,
    ])?;
    assert_eq!(tags, "sidis");
    Ok(())
}
