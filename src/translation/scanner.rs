use super::parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};

#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Lexical rules that decide where a placeholder token may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Lexer {
    /// Backslash escapes, backtick identifiers, `#` comments, flat block comments.
    Mysql,
    /// Dollar-quoted bodies, nested block comments.
    Postgres,
}

/// Split `sql` on every placeholder token found outside literals and comments.
///
/// Always returns `placeholders + 1` segments.
pub(super) fn split_on_token<'a>(sql: &'a str, token: &str, lexer: Lexer) -> Vec<&'a str> {
    let bytes = sql.as_bytes();
    let token = token.as_bytes();
    let mut segments = Vec::new();
    let mut state = State::Normal;
    let mut seg_start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => {
                if bytes[idx..].starts_with(token) {
                    segments.push(&sql[seg_start..idx]);
                    idx += token.len();
                    seg_start = idx;
                    continue;
                }
                match b {
                    b'\'' => state = State::SingleQuoted,
                    b'"' => state = State::DoubleQuoted,
                    b'`' if lexer == Lexer::Mysql => state = State::Backticked,
                    b'#' if lexer == Lexer::Mysql => state = State::LineComment,
                    _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                    _ if is_block_comment_start(bytes, idx) => {
                        state = State::BlockComment(1);
                        idx += 1;
                    }
                    b'$' if lexer == Lexer::Postgres => {
                        if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                            state = State::DollarQuoted(tag);
                            idx = advance;
                        }
                    }
                    _ => {}
                }
            }
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if matches!(state, State::SingleQuoted) {
                    b'\''
                } else {
                    b'"'
                };
                if b == b'\\' && lexer == Lexer::Mysql {
                    idx += 1; // skip escaped char
                } else if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // skip doubled quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    if bytes.get(idx + 1) == Some(&b'`') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if lexer == Lexer::Postgres && is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    segments.push(&sql[seg_start..]);
    segments
}
