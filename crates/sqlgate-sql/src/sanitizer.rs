//! Candidate SQL sanitization and row-cap rewriting.
//!
//! Transforms a [`CandidateQuery`] into a [`SafeQuery`] or rejects it with
//! a specific [`RejectReason`]. Checks run in a fixed fail-fast order:
//! statement count, comments, verb, deny policy, table allowlist, row cap.
//! `SafeQuery` can only be constructed here; execution layers accept no
//! other statement form.

use crate::keywords::SqlVerb;
use crate::policy::DenyPolicy;
use crate::tokens::{
    has_comment, is_meaningful, is_plain_whitespace, referenced_tables, render,
    strip_trailing_terminator, tokenize_sql,
};
use sqlgate_commons::TableName;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;
use thiserror::Error;

/// Where a candidate statement came from. Both paths get identical checks;
/// the source exists for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    /// Produced by the LLM collaborator.
    Generated,
    /// Submitted verbatim on the raw-SQL path.
    Manual,
}

/// Untrusted SQL text awaiting validation. Consumed once by the sanitizer.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub raw_text: String,
    pub source: QuerySource,
}

impl CandidateQuery {
    pub fn generated(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            source: QuerySource::Generated,
        }
    }

    pub fn manual(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            source: QuerySource::Manual,
        }
    }
}

/// A validated, bounded, read-only statement. The only form the execution
/// layer accepts. Fields are private; construction happens exclusively in
/// [`Sanitizer::sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeQuery {
    statement: String,
    target_table: TableName,
    row_limit: usize,
}

impl SafeQuery {
    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn target_table(&self) -> &TableName {
        &self.target_table
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }
}

/// Why a candidate was rejected. Reason codes are for server-side logs;
/// user-facing messages are composed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("empty SQL statement")]
    EmptyStatement,

    #[error("SQL could not be tokenized: {0}")]
    InvalidSql(String),

    #[error("multiple statements are not allowed")]
    MultiStatement,

    #[error("comment markers are not allowed")]
    CommentDetected,

    #[error("only SELECT statements are allowed, got {0}")]
    NonSelectVerb(String),

    #[error("forbidden SQL construct: {0}")]
    ForbiddenKeyword(String),

    #[error("table is not allowlisted: {0}")]
    TableNotAllowed(String),
}

/// Allowlist lookup seam. The schema cache is the production implementation
/// and the single source of truth for permitted tables.
pub trait TableResolver {
    /// Resolve a raw identifier (case-insensitive) to its canonical table
    /// name, or `None` if the table is not permitted.
    fn resolve(&self, name: &str) -> Option<TableName>;
}

/// The sanitizer/validator. Pure with respect to its inputs apart from the
/// resolver lookup.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    policy: DenyPolicy,
    max_row_limit: usize,
}

impl Sanitizer {
    pub fn new(policy: DenyPolicy, max_row_limit: usize) -> Self {
        Self {
            policy,
            max_row_limit,
        }
    }

    /// Validate a candidate and rewrite it into a [`SafeQuery`].
    ///
    /// `requested_rows` is the caller's row cap; it is clamped to
    /// `1..=max_row_limit` before being applied.
    pub fn sanitize(
        &self,
        candidate: &CandidateQuery,
        resolver: &dyn TableResolver,
        requested_rows: usize,
    ) -> Result<SafeQuery, RejectReason> {
        let raw = candidate.raw_text.trim();
        if raw.is_empty() {
            return Err(RejectReason::EmptyStatement);
        }

        let tokens = tokenize_sql(raw).map_err(RejectReason::InvalidSql)?;

        check_single_statement(&tokens)?;

        if has_comment(&tokens) {
            return Err(RejectReason::CommentDetected);
        }

        let tokens = strip_trailing_terminator(tokens);
        if !tokens.iter().any(is_meaningful) {
            return Err(RejectReason::EmptyStatement);
        }

        check_select_verb(&tokens)?;

        let body = render(&tokens);
        if let Some(pattern) = self.policy.first_match(&body) {
            return Err(RejectReason::ForbiddenKeyword(pattern.to_string()));
        }

        let referenced = referenced_tables(&tokens);
        if referenced.is_empty() {
            return Err(RejectReason::TableNotAllowed(
                "query references no table".to_string(),
            ));
        }
        let mut resolved = Vec::with_capacity(referenced.len());
        for name in &referenced {
            match resolver.resolve(name) {
                Some(table) => resolved.push(table),
                None => return Err(RejectReason::TableNotAllowed(name.clone())),
            }
        }
        let target_table = resolved.swap_remove(0);

        let cap = requested_rows.max(1).min(self.max_row_limit);
        let (statement, row_limit) = apply_row_cap(tokens, cap)?;

        Ok(SafeQuery {
            statement,
            target_table,
            row_limit,
        })
    }
}

/// Reject statement stacking: more than one semicolon, or one semicolon
/// followed by anything other than plain whitespace (comments included).
fn check_single_statement(tokens: &[Token]) -> Result<(), RejectReason> {
    let mut terminator: Option<usize> = None;
    for (i, token) in tokens.iter().enumerate() {
        if matches!(token, Token::SemiColon) {
            if terminator.is_some() {
                return Err(RejectReason::MultiStatement);
            }
            terminator = Some(i);
        }
    }
    if let Some(pos) = terminator {
        if tokens[pos + 1..].iter().any(|t| !is_plain_whitespace(t)) {
            return Err(RejectReason::MultiStatement);
        }
    }
    Ok(())
}

/// The first meaningful token must be the bare keyword SELECT.
fn check_select_verb(tokens: &[Token]) -> Result<(), RejectReason> {
    match tokens.iter().find(|t| is_meaningful(t)) {
        Some(Token::Word(word)) => {
            if word.quote_style.is_some() {
                return Err(RejectReason::NonSelectVerb(word.value.to_uppercase()));
            }
            match word.value.parse::<SqlVerb>() {
                Ok(verb) if verb.is_read_only() => Ok(()),
                Ok(verb) => Err(RejectReason::NonSelectVerb(verb.as_str().to_string())),
                Err(()) => Err(RejectReason::NonSelectVerb(word.value.to_uppercase())),
            }
        }
        Some(other) => Err(RejectReason::NonSelectVerb(other.to_string())),
        None => Err(RejectReason::EmptyStatement),
    }
}

/// Ensure the statement carries an explicit row cap no greater than `cap`.
///
/// No top-level LIMIT: append one. A LIMIT at or below the cap is left
/// untouched, which makes the rewrite idempotent. A LIMIT above the cap is
/// rewritten down. Both `LIMIT n [OFFSET m]` and `LIMIT offset, n` forms
/// are handled; anything else is rejected rather than guessed at.
fn apply_row_cap(mut tokens: Vec<Token>, cap: usize) -> Result<(String, usize), RejectReason> {
    let mut depth = 0usize;
    let mut limit_idx = None;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Word(w)
                if depth == 0 && w.keyword == Keyword::LIMIT && w.quote_style.is_none() =>
            {
                limit_idx = Some(i);
            }
            _ => {}
        }
    }

    let Some(limit_idx) = limit_idx else {
        let statement = format!("{} LIMIT {}", render(&tokens), cap);
        return Ok((statement, cap));
    };

    let after: Vec<usize> = (limit_idx + 1..tokens.len())
        .filter(|&i| is_meaningful(&tokens[i]))
        .collect();
    let first = *after
        .first()
        .ok_or_else(|| RejectReason::InvalidSql("dangling LIMIT clause".to_string()))?;
    let second = after.get(1).map(|&i| &tokens[i]);
    let third = after.get(2).copied();

    let count_idx = match (&tokens[first], second, third) {
        (Token::Number(..), Some(Token::Comma), Some(ti))
            if matches!(tokens[ti], Token::Number(..)) =>
        {
            ti
        }
        (Token::Number(..), _, _) => first,
        _ => {
            return Err(RejectReason::InvalidSql(
                "unsupported LIMIT clause".to_string(),
            ))
        }
    };

    let (value, long) = match &tokens[count_idx] {
        Token::Number(value, long) => (value.clone(), *long),
        _ => unreachable!("count_idx always points at a number token"),
    };
    let requested: usize = value
        .parse()
        .map_err(|_| RejectReason::InvalidSql("non-numeric LIMIT value".to_string()))?;

    if requested <= cap {
        Ok((render(&tokens), requested))
    } else {
        tokens[count_idx] = Token::Number(cap.to_string(), long);
        Ok((render(&tokens), cap))
    }
}
