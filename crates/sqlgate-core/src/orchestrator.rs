//! Query orchestrator: the per-request state machine.
//!
//! One [`Gateway`] instance drives every question-answer cycle:
//! rate-limit check, LLM drafting, sanitization, bounded execution,
//! summarization, error translation. The stage order is fixed: validation
//! always precedes execution, and no entry point can reorder or skip
//! stages. All shared state (limiter, schema cache, execution permits) is
//! owned here and injected at construction, not ambient.

use crate::error::GatewayError;
use crate::guard::{self, QuestionGuard};
use crate::limiter::{Acquisition, RateLimitKey, RateLimiter};
use crate::models::{
    QueryResponse, QueryResult, RawSqlRequest, RequestContext, RequestState, TableDescription,
    TablesResponse,
};
use crate::providers::{Database, LlmClient};
use crate::schema_cache::{AllowlistEntry, SchemaCache};
use log::{debug, warn};
use sqlgate_commons::config::GatewayConfig;
use sqlgate_commons::RequesterId;
use sqlgate_sql::{CandidateQuery, DenyPolicy, RejectReason, SafeQuery, Sanitizer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Columns forwarded to the drafting prompt per table.
const PROMPT_COLUMN_LIMIT: usize = 20;

/// The query safety gateway. One instance serves many concurrent requests;
/// per-request state lives on the stack of each call.
pub struct Gateway {
    config: GatewayConfig,
    limiter: RateLimiter,
    schema: SchemaCache,
    sanitizer: Sanitizer,
    guard: QuestionGuard,
    llm: Arc<dyn LlmClient>,
    db: Arc<dyn Database>,
    /// Bounded backpressure for database executions.
    db_permits: Semaphore,
}

impl Gateway {
    pub fn new(config: GatewayConfig, llm: Arc<dyn LlmClient>, db: Arc<dyn Database>) -> Self {
        let sanitizer = Sanitizer::new(
            DenyPolicy::new(&config.policy.denied_sql_patterns),
            config.limits.max_row_limit,
        );
        let guard = QuestionGuard::new(&config.policy);
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let schema = SchemaCache::new(&config.policy.table_allowlist);
        let db_permits = Semaphore::new(config.execution.max_concurrent_queries);
        Self {
            config,
            limiter,
            schema,
            sanitizer,
            guard,
            llm,
            db,
            db_permits,
        }
    }

    /// Re-read table/column metadata from the database collaborator.
    /// Call at startup and whenever the exposed schema changes.
    pub async fn refresh_schema(&self) -> Result<usize, GatewayError> {
        self.schema
            .refresh(self.db.as_ref())
            .await
            .map_err(|e| GatewayError::SchemaUnavailable(e.to_string()))
    }

    /// Answer a natural-language question with a sanitized SQL query.
    pub async fn ask(&self, request: RequestContext) -> Result<QueryResponse, GatewayError> {
        let requester = request.requester_id.clone();
        let mut state = RequestState::Received;
        let result = self.ask_inner(request, &mut state).await;
        self.finish(&requester, &mut state, &result);
        result
    }

    /// Execute caller-supplied SQL. Enters the state machine at Validating;
    /// the sanitizer and execution stages are identical to [`Gateway::ask`].
    pub async fn execute_raw(&self, request: RawSqlRequest) -> Result<QueryResponse, GatewayError> {
        let requester = request.requester_id.clone();
        let mut state = RequestState::Received;
        let result = self.execute_raw_inner(request, &mut state).await;
        self.finish(&requester, &mut state, &result);
        result
    }

    /// Names of the tables the gateway currently exposes.
    pub fn list_tables(&self) -> Result<TablesResponse, GatewayError> {
        self.acquire(RateLimitKey::Global, 1.0)?;
        Ok(TablesResponse {
            tables: self
                .schema
                .list_tables()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
        })
    }

    /// Columns of one exposed table.
    pub fn describe_table(&self, table: &str) -> Result<TableDescription, GatewayError> {
        self.acquire(RateLimitKey::Global, 1.0)?;
        let entry = self
            .schema
            .describe(table)
            .ok_or_else(|| GatewayError::Rejected(RejectReason::TableNotAllowed(table.to_string())))?;
        Ok(TableDescription {
            table: entry.table.as_str().to_string(),
            columns: entry.columns,
        })
    }

    /// Preview the first rows of an exposed table. The statement is built
    /// here but still passes through the sanitizer like any candidate.
    pub async fn preview(
        &self,
        table: &str,
        limit: usize,
        offset: usize,
    ) -> Result<QueryResponse, GatewayError> {
        self.acquire(RateLimitKey::Global, 1.0)?;
        let entry = self
            .schema
            .describe(table)
            .ok_or_else(|| GatewayError::Rejected(RejectReason::TableNotAllowed(table.to_string())))?;

        let limit = limit.clamp(1, self.config.limits.preview_row_cap);
        let sql = format!(
            "SELECT * FROM {} LIMIT {} OFFSET {}",
            entry.table, limit, offset
        );
        let safe = self
            .sanitizer
            .sanitize(&CandidateQuery::manual(sql), &self.schema, limit)?;
        let result = self.run_safe_query(&safe).await?;
        let summary = format!("Returned {} rows", result.returned_count);
        Ok(self.shape_response(&safe, result, summary))
    }

    async fn ask_inner(
        &self,
        request: RequestContext,
        state: &mut RequestState,
    ) -> Result<QueryResponse, GatewayError> {
        let question = self
            .guard
            .validate(&request.question)
            .map_err(GatewayError::InvalidQuestion)?;

        self.acquire(RateLimitKey::Global, 1.0)?;
        let max_rows = self.effective_row_cap(request.max_rows);
        self.acquire(RateLimitKey::Generate, row_cost(max_rows))?;

        self.transition(&request.requester_id, state, RequestState::Drafting);
        let context = self.schema_context(request.table_hint.as_deref())?;
        let llm_timeout = Duration::from_secs(self.config.execution.llm_timeout_seconds);
        let raw = timeout(llm_timeout, self.llm.generate_sql(&question, &context))
            .await
            .map_err(|_| GatewayError::GenerationFailed("drafting timed out".to_string()))?
            .map_err(|e| GatewayError::GenerationFailed(e.to_string()))?;
        let sql = extract_tagged_sql(&raw).ok_or_else(|| {
            GatewayError::GenerationFailed("no <sql> block in model output".to_string())
        })?;

        self.transition(&request.requester_id, state, RequestState::Validating);
        let safe = self.validate(CandidateQuery::generated(sql), max_rows)?;

        self.transition(&request.requester_id, state, RequestState::Executing);
        let result = self.run_safe_query(&safe).await?;

        self.transition(&request.requester_id, state, RequestState::Summarizing);
        let summary = self.summarize(&question, &result).await;

        Ok(self.shape_response(&safe, result, summary))
    }

    async fn execute_raw_inner(
        &self,
        request: RawSqlRequest,
        state: &mut RequestState,
    ) -> Result<QueryResponse, GatewayError> {
        self.acquire(RateLimitKey::Global, 1.0)?;
        let max_rows = self.effective_row_cap(request.max_rows);
        self.acquire(RateLimitKey::Execute, row_cost(max_rows))?;

        self.transition(&request.requester_id, state, RequestState::Validating);
        let safe = self.validate(CandidateQuery::manual(request.sql), max_rows)?;

        self.transition(&request.requester_id, state, RequestState::Executing);
        let result = self.run_safe_query(&safe).await?;

        self.transition(&request.requester_id, state, RequestState::Summarizing);
        let summary = format!("Returned {} rows", result.returned_count);

        Ok(self.shape_response(&safe, result, summary))
    }

    /// Run the sanitizer. A rejection is terminal for this cycle; the
    /// candidate is never corrected and resubmitted without a fresh draft.
    fn validate(
        &self,
        candidate: CandidateQuery,
        max_rows: usize,
    ) -> Result<SafeQuery, GatewayError> {
        self.sanitizer
            .sanitize(&candidate, &self.schema, max_rows)
            .map_err(|reason| {
                warn!(
                    "[GATEWAY] candidate rejected ({:?} source): {}",
                    candidate.source, reason
                );
                GatewayError::Rejected(reason)
            })
    }

    /// Execute a sanitized statement under the per-table bucket, a bounded
    /// execution slot, and the statement timeout.
    async fn run_safe_query(&self, safe: &SafeQuery) -> Result<QueryResult, GatewayError> {
        self.acquire(RateLimitKey::Table(safe.target_table().clone()), 1.0)?;

        let slot_timeout = Duration::from_secs(self.config.execution.pool_acquire_timeout_seconds);
        let _permit = timeout(slot_timeout, self.db_permits.acquire())
            .await
            .map_err(|_| {
                GatewayError::ExecutionError("no execution slot became available".to_string())
            })?
            .map_err(|_| GatewayError::ExecutionError("execution slots closed".to_string()))?;

        let db_timeout = Duration::from_secs(self.config.execution.db_timeout_seconds);
        timeout(db_timeout, self.db.execute(safe))
            .await
            .map_err(|_| GatewayError::ExecutionError("statement timed out".to_string()))?
            .map_err(|e| GatewayError::ExecutionError(e.to_string()))
    }

    /// Summarize a result set, degrading to a templated summary on any
    /// collaborator failure. Never a hard failure.
    async fn summarize(&self, question: &str, result: &QueryResult) -> String {
        let fallback = format!("Returned {} rows", result.returned_count);

        let sample: Vec<&Vec<serde_json::Value>> = result
            .rows
            .iter()
            .take(self.config.limits.summary_sample_rows)
            .collect();
        let sample_json = serde_json::to_string(&sample).unwrap_or_else(|_| "[]".to_string());
        let preview = format!(
            "Question: {}\nRows returned: {}\nColumns: {}\nSample rows (JSON): {}",
            question,
            result.returned_count,
            result.columns.join(", "),
            guard::redact(&sample_json)
        );

        let llm_timeout = Duration::from_secs(self.config.execution.llm_timeout_seconds);
        match timeout(llm_timeout, self.llm.summarize(&preview)).await {
            Ok(Ok(text)) => {
                let cleaned = guard::truncate_chars(
                    &guard::redact(text.trim()),
                    self.config.limits.max_summary_length,
                );
                if cleaned.is_empty() {
                    fallback
                } else {
                    cleaned
                }
            }
            Ok(Err(err)) => {
                warn!("[GATEWAY] summarization degraded: {}", err);
                fallback
            }
            Err(_) => {
                warn!("[GATEWAY] summarization degraded: timed out");
                fallback
            }
        }
    }

    /// Truncate to the response payload cap and assemble the boundary
    /// payload. The echoed SQL is the sanitized statement.
    fn shape_response(
        &self,
        safe: &SafeQuery,
        mut result: QueryResult,
        summary: String,
    ) -> QueryResponse {
        let cap = self.config.limits.response_row_cap;
        let truncated = result.truncated || result.rows.len() > cap;
        result.rows.truncate(cap);
        QueryResponse {
            sql: safe.statement().to_string(),
            summary,
            columns: result.columns,
            rows: result.rows,
            returned: result.returned_count,
            truncated,
        }
    }

    /// Build the schema context for the drafting prompt from the current
    /// snapshot, narrowed to the hinted table when the hint resolves.
    fn schema_context(&self, table_hint: Option<&str>) -> Result<String, GatewayError> {
        let entries = self.schema.entries();
        if entries.is_empty() {
            return Err(GatewayError::SchemaUnavailable(
                "no readable tables are available".to_string(),
            ));
        }

        let hinted: Option<&AllowlistEntry> =
            table_hint.and_then(|hint| entries.iter().find(|e| e.table.matches(hint)));
        let selected: Vec<&AllowlistEntry> = match hinted {
            Some(entry) => vec![entry],
            None => entries.iter().collect(),
        };

        let lines: Vec<String> = selected
            .iter()
            .map(|entry| {
                let columns: Vec<String> = entry
                    .columns
                    .iter()
                    .take(PROMPT_COLUMN_LIMIT)
                    .map(|c| format!("{} {}", c.name, c.data_type))
                    .collect();
                format!("- {}: {}", entry.table, columns.join(", "))
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// Requested row cap with the configured default filled in, clamped to
    /// the hard ceiling.
    fn effective_row_cap(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.limits.default_row_limit)
            .clamp(1, self.config.limits.max_row_limit)
    }

    fn acquire(&self, key: RateLimitKey, cost: f64) -> Result<(), GatewayError> {
        match self.limiter.acquire(&key, cost) {
            Acquisition::Allowed => Ok(()),
            Acquisition::Denied { retry_after } => {
                warn!(
                    "[GATEWAY] throttled: key={} retry_after={:?}",
                    key.class(),
                    retry_after
                );
                Err(GatewayError::RateLimited { retry_after })
            }
        }
    }

    fn transition(&self, requester: &RequesterId, state: &mut RequestState, to: RequestState) {
        debug!(
            "[GATEWAY] requester={} {} -> {}",
            requester,
            state.as_str(),
            to.as_str()
        );
        *state = to;
    }

    /// Move the cycle into its terminal state and log the server-side
    /// reason. Only the safe client message ever leaves the gateway.
    fn finish(
        &self,
        requester: &RequesterId,
        state: &mut RequestState,
        result: &Result<QueryResponse, GatewayError>,
    ) {
        match result {
            Ok(_) => self.transition(requester, state, RequestState::Completed),
            Err(GatewayError::RateLimited { .. }) => {
                self.transition(requester, state, RequestState::RateLimited)
            }
            Err(err) => {
                warn!("[GATEWAY] requester={} failed: {}", requester, err);
                self.transition(requester, state, RequestState::Failed);
            }
        }
    }
}

/// Heavier row requests cost more LLM/database budget, capped at 5 tokens.
fn row_cost(max_rows: usize) -> f64 {
    1.0 + (max_rows as f64 / 1000.0).min(4.0)
}

/// ASCII case-insensitive substring search.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Extract the statement between `<sql>` and `</sql>` tags, the contract
/// the drafting prompt imposes on the model.
fn extract_tagged_sql(raw: &str) -> Option<String> {
    let open = find_ci(raw, "<sql>", 0)?;
    let start = open + "<sql>".len();
    let close = find_ci(raw, "</sql>", start)?;
    let sql = raw[start..close].trim();
    if sql.is_empty() {
        None
    } else {
        Some(sql.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_cost_scales_and_caps() {
        assert!((row_cost(1000) - 2.0).abs() < 1e-9);
        assert!((row_cost(500) - 1.5).abs() < 1e-9);
        assert!((row_cost(100_000) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_tagged_sql() {
        assert_eq!(
            extract_tagged_sql("here you go <sql>SELECT 1</sql> thanks"),
            Some("SELECT 1".to_string())
        );
        assert_eq!(
            extract_tagged_sql("<SQL>\nSELECT * FROM sales\n</SQL>"),
            Some("SELECT * FROM sales".to_string())
        );
        assert_eq!(extract_tagged_sql("no tags here"), None);
        assert_eq!(extract_tagged_sql("<sql>   </sql>"), None);
    }
}
