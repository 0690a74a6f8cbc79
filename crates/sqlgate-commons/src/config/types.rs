use super::defaults::*;
use serde::{Deserialize, Serialize};

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub limits: LimitsSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub policy: PolicySettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
}

/// Row and payload caps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Hard ceiling on the SQL row cap; no statement leaves the gateway
    /// without `LIMIT <= max_row_limit`
    #[serde(default = "default_max_row_limit")]
    pub max_row_limit: usize,

    /// Row cap applied when the caller does not ask for one
    #[serde(default = "default_row_limit")]
    pub default_row_limit: usize,

    /// Response payload cap, distinct from the SQL row cap
    #[serde(default = "default_response_row_cap")]
    pub response_row_cap: usize,

    /// Cap for the table preview operation
    #[serde(default = "default_preview_row_cap")]
    pub preview_row_cap: usize,

    /// Number of rows forwarded to the summarizer
    #[serde(default = "default_summary_sample_rows")]
    pub summary_sample_rows: usize,

    /// Maximum length of a summary returned to the caller
    #[serde(default = "default_max_summary_length")]
    pub max_summary_length: usize,
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            max_row_limit: default_max_row_limit(),
            default_row_limit: default_row_limit(),
            response_row_cap: default_response_row_cap(),
            preview_row_cap: default_preview_row_cap(),
            summary_sample_rows: default_summary_sample_rows(),
            max_summary_length: default_max_summary_length(),
        }
    }
}

/// Token bucket capacities and refill rates per key class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Burst capacity shared by every operation (default: 60, ~60/min)
    #[serde(default = "default_global_capacity")]
    pub global_capacity: u32,
    #[serde(default = "default_global_refill")]
    pub global_refill_per_sec: f64,

    /// LLM-facing bucket (default: 10, ~10/min)
    #[serde(default = "default_generate_capacity")]
    pub generate_capacity: u32,
    #[serde(default = "default_generate_refill")]
    pub generate_refill_per_sec: f64,

    /// Database-facing bucket (default: 20, ~20/min)
    #[serde(default = "default_execute_capacity")]
    pub execute_capacity: u32,
    #[serde(default = "default_execute_refill")]
    pub execute_refill_per_sec: f64,

    /// Per-table buckets, lazily created on first touch
    #[serde(default = "default_table_capacity")]
    pub table_capacity: u32,
    #[serde(default = "default_table_refill")]
    pub table_refill_per_sec: f64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            global_capacity: default_global_capacity(),
            global_refill_per_sec: default_global_refill(),
            generate_capacity: default_generate_capacity(),
            generate_refill_per_sec: default_generate_refill(),
            execute_capacity: default_execute_capacity(),
            execute_refill_per_sec: default_execute_refill(),
            table_capacity: default_table_capacity(),
            table_refill_per_sec: default_table_refill(),
        }
    }
}

/// Security policy: deny patterns, allowlist, question bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Substrings/bare words rejected anywhere in candidate SQL.
    /// Bare words match on word boundaries; phrases match as substrings.
    #[serde(default = "default_denied_sql_patterns")]
    pub denied_sql_patterns: Vec<String>,

    /// Phrases rejected in natural-language questions (prompt-injection markers)
    #[serde(default = "default_denied_question_phrases")]
    pub denied_question_phrases: Vec<String>,

    /// Tables the gateway may expose. Empty means every table visible to
    /// the read-only role is permitted.
    #[serde(default)]
    pub table_allowlist: Vec<String>,

    #[serde(default = "default_min_question_length")]
    pub min_question_length: usize,
    #[serde(default = "default_max_question_length")]
    pub max_question_length: usize,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            denied_sql_patterns: default_denied_sql_patterns(),
            denied_question_phrases: default_denied_question_phrases(),
            table_allowlist: Vec::new(),
            min_question_length: default_min_question_length(),
            max_question_length: default_max_question_length(),
        }
    }
}

/// Timeouts and backpressure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    #[serde(default = "default_llm_timeout_seconds")]
    pub llm_timeout_seconds: u64,
    #[serde(default = "default_db_timeout_seconds")]
    pub db_timeout_seconds: u64,
    /// How long a request may wait for an execution slot before failing
    #[serde(default = "default_pool_acquire_timeout_seconds")]
    pub pool_acquire_timeout_seconds: u64,
    /// Bound on concurrent database executions
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            llm_timeout_seconds: default_llm_timeout_seconds(),
            db_timeout_seconds: default_db_timeout_seconds(),
            pool_acquire_timeout_seconds: default_pool_acquire_timeout_seconds(),
            max_concurrent_queries: default_max_concurrent_queries(),
        }
    }
}
