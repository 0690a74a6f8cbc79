//! Core of the SQLGate query safety gateway.
//!
//! Sits between "LLM-proposed SQL text" and "database execution" and
//! guarantees that nothing reaches the database unsanitized: read-only,
//! single-statement, allowlisted-table, row-capped queries under global
//! and per-resource throughput limits.
//!
//! The pieces, leaf first:
//! - [`limiter`]: token bucket rate limiter keyed per resource
//! - [`schema_cache`]: refreshable allowlist snapshot of permitted tables
//! - [`providers`]: collaborator seams for the LLM and the database
//! - [`guard`]: natural-language question validation and redaction
//! - [`orchestrator`]: the per-request state machine ([`Gateway`])
//!
//! The HTTP surface, the real LLM client, and the database driver are the
//! embedder's concern; everything here is transport-agnostic.

pub mod error;
pub mod guard;
pub mod limiter;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod schema_cache;

pub use error::GatewayError;
pub use limiter::{Acquisition, RateLimitKey, RateLimiter};
pub use models::{
    ErrorResponse, QueryResponse, QueryResult, RawSqlRequest, RequestContext, RequestState,
    TableDescription, TablesResponse,
};
pub use orchestrator::Gateway;
pub use providers::{Database, LlmClient, ProviderError};
pub use schema_cache::{AllowlistEntry, ColumnInfo, SchemaCache};
