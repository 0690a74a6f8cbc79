//! Collaborator seams consumed by the gateway.
//!
//! Both collaborators are treated as untrusted input producers: LLM output
//! is exactly the candidate text fed to the sanitizer, and database results
//! are truncated and summarized before leaving the gateway. Real clients
//! (an OpenAI-compatible API, a MySQL/Postgres pool under a read-only role)
//! live in the embedding binary; tests use hand-rolled stubs.

use crate::models::QueryResult;
use crate::schema_cache::ColumnInfo;
use async_trait::async_trait;
use sqlgate_sql::SafeQuery;
use thiserror::Error;

/// Failure of an external collaborator call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("collaborator call failed: {0}")]
    Failed(String),
}

/// LLM text-generation collaborator.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Draft SQL for a question given the schema context of permitted
    /// tables. The reply is expected to wrap the statement in
    /// `<sql>...</sql>` tags; everything else is discarded.
    async fn generate_sql(
        &self,
        question: &str,
        schema_context: &str,
    ) -> Result<String, ProviderError>;

    /// Produce a short natural-language summary of a result preview.
    async fn summarize(&self, preview: &str) -> Result<String, ProviderError>;
}

/// Database collaborator, operating under a role granted read-only
/// privilege. The role is a second line of defense; the sanitizer does not
/// rely on it.
#[async_trait]
pub trait Database: Send + Sync {
    /// Names of the tables visible to the read-only role.
    async fn list_tables(&self) -> Result<Vec<String>, ProviderError>;

    /// Column metadata for one table; `ProviderError::NotFound` if absent.
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, ProviderError>;

    /// Execute a sanitized statement. `SafeQuery` is the only statement
    /// form this method accepts, by construction.
    async fn execute(&self, query: &SafeQuery) -> Result<QueryResult, ProviderError>;
}
