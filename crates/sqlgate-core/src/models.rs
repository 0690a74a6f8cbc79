//! Request, response, and result models for the gateway boundary.

use crate::schema_cache::ColumnInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlgate_commons::RequesterId;

/// Result set handed back by the database collaborator. Consumed by
/// summarization and response shaping, then discarded; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub returned_count: usize,
    pub truncated: bool,
}

/// One inbound natural-language request. Created per call, lives for one
/// orchestration cycle, never shared across requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub question: String,
    pub table_hint: Option<String>,
    /// Requested row cap; the configured default applies when absent.
    pub max_rows: Option<usize>,
    pub requester_id: RequesterId,
}

/// Raw-SQL path request. Enters the state machine at Validating.
#[derive(Debug, Clone)]
pub struct RawSqlRequest {
    pub sql: String,
    pub max_rows: Option<usize>,
    pub requester_id: RequesterId,
}

/// Success payload crossing the gateway boundary. The echoed SQL is the
/// sanitized statement, never the candidate text.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub summary: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub returned: usize,
    pub truncated: bool,
}

/// Failure payload: one safe message, no internal reason codes.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn from_error(err: &crate::error::GatewayError) -> Self {
        Self {
            error: err.client_message(),
        }
    }
}

/// Introspection: readable tables.
#[derive(Debug, Clone, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Introspection: columns of one readable table.
#[derive(Debug, Clone, Serialize)]
pub struct TableDescription {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

/// States of one orchestration cycle. Validation always precedes
/// execution; no path reorders or skips stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    RateLimited,
    Drafting,
    Validating,
    Executing,
    Summarizing,
    Completed,
    Failed,
}

impl RequestState {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Received => "received",
            RequestState::RateLimited => "rate_limited",
            RequestState::Drafting => "drafting",
            RequestState::Validating => "validating",
            RequestState::Executing => "executing",
            RequestState::Summarizing => "summarizing",
            RequestState::Completed => "completed",
            RequestState::Failed => "failed",
        }
    }

    /// Terminal states end the cycle; nothing transitions out of them.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::RateLimited | RequestState::Completed | RequestState::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn test_error_response_uses_client_message() {
        let err = GatewayError::ExecutionError("pool exhausted on shard 3".to_string());
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.error, "Query execution failed. Please retry later.");
    }

    #[test]
    fn test_terminal_states() {
        assert!(RequestState::Completed.is_terminal());
        assert!(RequestState::RateLimited.is_terminal());
        assert!(RequestState::Failed.is_terminal());
        assert!(!RequestState::Validating.is_terminal());
    }
}
