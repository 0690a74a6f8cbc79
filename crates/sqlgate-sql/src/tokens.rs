//! Shared tokenization helpers.
//!
//! All sanitizer checks operate on a sqlparser token stream instead of the
//! raw text, so string literals cannot smuggle terminators or keywords past
//! the checks. The stream keeps whitespace tokens, which lets a statement
//! be re-rendered byte-for-byte (modulo a rewritten literal) after edits.

use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

/// Tokenize candidate SQL with the generic dialect.
pub fn tokenize_sql(sql: &str) -> Result<Vec<Token>, String> {
    let dialect = GenericDialect {};
    Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| e.to_string())
}

/// True for tokens that carry meaning (everything except whitespace and
/// comments, which sqlparser models as whitespace).
pub fn is_meaningful(token: &Token) -> bool {
    !matches!(token, Token::Whitespace(_))
}

/// True for plain spacing: whitespace that is not a comment.
pub fn is_plain_whitespace(token: &Token) -> bool {
    matches!(
        token,
        Token::Whitespace(Whitespace::Space)
            | Token::Whitespace(Whitespace::Newline)
            | Token::Whitespace(Whitespace::Tab)
    )
}

/// True if the stream contains a line or block comment.
pub fn has_comment(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| {
        matches!(
            t,
            Token::Whitespace(Whitespace::SingleLineComment { .. })
                | Token::Whitespace(Whitespace::MultiLineComment(_))
        )
    })
}

/// Drop trailing spacing and at most one trailing semicolon.
pub fn strip_trailing_terminator(mut tokens: Vec<Token>) -> Vec<Token> {
    while tokens.last().is_some_and(is_plain_whitespace) {
        tokens.pop();
    }
    if matches!(tokens.last(), Some(Token::SemiColon)) {
        tokens.pop();
    }
    while tokens.last().is_some_and(is_plain_whitespace) {
        tokens.pop();
    }
    tokens
}

/// Re-render a token stream as SQL text.
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.to_string()).collect()
}

/// Extract the table identifiers referenced after `FROM` and `JOIN`.
///
/// Handles qualified names (`db.sales` resolves to `sales`), aliases with
/// and without `AS`, and comma-separated FROM lists. A `(` after `FROM` is
/// a derived table; its inner `FROM` appears later in the flat stream and
/// is picked up on its own. Deduplicates case-insensitively, preserving
/// the first spelling seen.
pub fn referenced_tables(tokens: &[Token]) -> Vec<String> {
    let meaningful: Vec<&Token> = tokens.iter().filter(|t| is_meaningful(t)).collect();
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;

    while i < meaningful.len() {
        let is_source_keyword = matches!(
            meaningful[i],
            Token::Word(w) if matches!(w.keyword, Keyword::FROM | Keyword::JOIN)
        );
        if !is_source_keyword {
            i += 1;
            continue;
        }

        // Parse one or more comma-separated table references.
        let mut j = i + 1;
        loop {
            match meaningful.get(j) {
                Some(Token::Word(first)) => {
                    let mut last = first.value.clone();
                    j += 1;
                    // Qualified name: take the final segment.
                    while matches!(meaningful.get(j), Some(Token::Period)) {
                        if let Some(Token::Word(part)) = meaningful.get(j + 1) {
                            last = part.value.clone();
                            j += 2;
                        } else {
                            break;
                        }
                    }
                    if !names.iter().any(|n| n.eq_ignore_ascii_case(&last)) {
                        names.push(last);
                    }
                    // Skip an optional alias so a following comma is visible.
                    if let Some(Token::Word(w)) = meaningful.get(j) {
                        if w.keyword == Keyword::AS {
                            j += 2;
                        } else if w.keyword == Keyword::NoKeyword {
                            j += 1;
                        }
                    }
                    if matches!(meaningful.get(j), Some(Token::Comma)) {
                        j += 1;
                        continue;
                    }
                }
                _ => {}
            }
            break;
        }

        i = j.max(i + 1);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables_of(sql: &str) -> Vec<String> {
        referenced_tables(&tokenize_sql(sql).unwrap())
    }

    #[test]
    fn test_simple_from() {
        assert_eq!(tables_of("SELECT * FROM sales"), vec!["sales"]);
    }

    #[test]
    fn test_join_and_qualified_names() {
        assert_eq!(
            tables_of("SELECT * FROM shop.sales JOIN shop.inventory ON sales.id = inventory.id"),
            vec!["sales", "inventory"]
        );
    }

    #[test]
    fn test_comma_list_with_aliases() {
        assert_eq!(
            tables_of("SELECT * FROM sales s, inventory AS i WHERE s.id = i.id"),
            vec!["sales", "inventory"]
        );
    }

    #[test]
    fn test_derived_table_inner_from_is_seen() {
        assert_eq!(
            tables_of("SELECT * FROM (SELECT id FROM sales) sub"),
            vec!["sales"]
        );
    }

    #[test]
    fn test_dedup_is_case_insensitive() {
        assert_eq!(
            tables_of("SELECT * FROM sales JOIN SALES ON 1 = 1"),
            vec!["sales"]
        );
    }

    #[test]
    fn test_from_inside_string_is_ignored() {
        assert_eq!(
            tables_of("SELECT 'from ghosts' FROM sales"),
            vec!["sales"]
        );
    }

    #[test]
    fn test_strip_trailing_terminator() {
        let tokens = tokenize_sql("SELECT 1 ;  ").unwrap();
        let stripped = strip_trailing_terminator(tokens);
        assert_eq!(render(&stripped), "SELECT 1");
    }

    #[test]
    fn test_render_round_trip() {
        let sql = "SELECT name, qty FROM sales WHERE qty > 5";
        assert_eq!(render(&tokenize_sql(sql).unwrap()), sql);
    }
}
