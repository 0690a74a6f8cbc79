//! Gateway error taxonomy.
//!
//! Every failure in the core resolves to a per-request error; none is fatal
//! to the process. Internal reason codes, raw collaborator errors and SQL
//! fragments stay in server-side logs; [`GatewayError::client_message`] is
//! the only text that crosses the boundary.

use sqlgate_sql::RejectReason;
use std::time::Duration;
use thiserror::Error;

/// Terminal failure of one orchestration cycle.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A token bucket denied the request. Retryable after the hint.
    #[error("rate limited; retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The natural-language question failed the inbound guard.
    #[error("question rejected: {0}")]
    InvalidQuestion(String),

    /// The LLM collaborator failed, timed out, or produced no SQL block.
    #[error("SQL generation failed: {0}")]
    GenerationFailed(String),

    /// The sanitizer rejected the candidate. Never retried automatically.
    #[error("candidate query rejected: {0}")]
    Rejected(#[from] RejectReason),

    /// Database failure, statement timeout, or execution slot exhaustion.
    #[error("execution failed: {0}")]
    ExecutionError(String),

    /// The allowlist snapshot is empty or could not be refreshed.
    #[error("schema metadata unavailable: {0}")]
    SchemaUnavailable(String),
}

impl GatewayError {
    /// Safe, non-leaking text for the caller. The disallowed-table case is
    /// surfaced distinctly so the user can pick a valid table; every other
    /// sanitizer rejection collapses into one generic message.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::RateLimited { .. } => {
                "Rate limit exceeded. Please retry later.".to_string()
            }
            GatewayError::InvalidQuestion(_) => "Question failed validation checks.".to_string(),
            GatewayError::GenerationFailed(_) => {
                "Could not generate SQL for this question. Please rephrase and try again."
                    .to_string()
            }
            GatewayError::Rejected(RejectReason::TableNotAllowed(table)) => format!(
                "Table '{}' is not available. Use list_tables to see readable tables.",
                table
            ),
            GatewayError::Rejected(_) => {
                "Could not produce a safe query from the request.".to_string()
            }
            GatewayError::ExecutionError(_) => {
                "Query execution failed. Please retry later.".to_string()
            }
            GatewayError::SchemaUnavailable(_) => {
                "Schema information is temporarily unavailable.".to_string()
            }
        }
    }

    /// Whether resubmission can reasonably succeed without operator action.
    /// Sanitizer rejections are excluded: a rejected query is not corrected
    /// and resubmitted without a fresh draft.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::GenerationFailed(_)
                | GatewayError::ExecutionError(_)
                | GatewayError::SchemaUnavailable(_)
        )
    }

    /// Retry hint, present only for rate-limit denials.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_do_not_leak_internals() {
        let err = GatewayError::ExecutionError(
            "connection refused at 10.0.0.5:3306 (password: hunter2)".to_string(),
        );
        assert!(!err.client_message().contains("10.0.0.5"));
        assert!(!err.client_message().contains("hunter2"));

        let err = GatewayError::Rejected(RejectReason::ForbiddenKeyword("drop".to_string()));
        assert!(!err.client_message().contains("drop"));
    }

    #[test]
    fn test_table_not_allowed_is_surfaced_distinctly() {
        let err = GatewayError::Rejected(RejectReason::TableNotAllowed("users".to_string()));
        assert!(err.client_message().contains("users"));
    }

    #[test]
    fn test_retryability() {
        assert!(GatewayError::RateLimited {
            retry_after: Duration::from_secs(1)
        }
        .retryable());
        assert!(GatewayError::ExecutionError("x".to_string()).retryable());
        assert!(!GatewayError::Rejected(RejectReason::MultiStatement).retryable());
    }
}
