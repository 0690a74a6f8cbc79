//! Default values for gateway configuration.
//!
//! A 60-token global bucket refilled once per second, a stricter
//! LLM-facing bucket, and a 5000-row hard ceiling on any statement that
//! reaches the database.

pub fn default_max_row_limit() -> usize {
    5000
}

pub fn default_row_limit() -> usize {
    1000
}

pub fn default_response_row_cap() -> usize {
    500
}

pub fn default_preview_row_cap() -> usize {
    200
}

pub fn default_summary_sample_rows() -> usize {
    5
}

pub fn default_max_summary_length() -> usize {
    2000
}

pub fn default_global_capacity() -> u32 {
    60
}

pub fn default_global_refill() -> f64 {
    1.0
}

pub fn default_generate_capacity() -> u32 {
    10
}

pub fn default_generate_refill() -> f64 {
    0.16
}

pub fn default_execute_capacity() -> u32 {
    20
}

pub fn default_execute_refill() -> f64 {
    0.33
}

pub fn default_table_capacity() -> u32 {
    20
}

pub fn default_table_refill() -> f64 {
    0.33
}

/// SQL constructs rejected anywhere in a candidate statement.
///
/// Bare words are matched on word boundaries (so `created_at` does not trip
/// `create`); entries containing spaces or punctuation are matched as plain
/// substrings. `UNION` is deliberately absent from the defaults; operators
/// who want it denied add it here.
pub fn default_denied_sql_patterns() -> Vec<String> {
    [
        "drop",
        "alter",
        "truncate",
        "insert",
        "update",
        "delete",
        "replace",
        "create",
        "grant",
        "revoke",
        "load data",
        "outfile",
        "infile",
        "load_file",
        "sleep(",
        "benchmark(",
        "xp_cmdshell",
        "information_schema",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Prompt-injection markers rejected in natural-language questions.
pub fn default_denied_question_phrases() -> Vec<String> {
    [
        "ignore previous",
        "system prompt",
        "jailbreak",
        "developer mode",
        "prompt injection",
        "xp_cmdshell",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_min_question_length() -> usize {
    3
}

pub fn default_max_question_length() -> usize {
    500
}

pub fn default_llm_timeout_seconds() -> u64 {
    30
}

pub fn default_db_timeout_seconds() -> u64 {
    20
}

pub fn default_pool_acquire_timeout_seconds() -> u64 {
    5
}

pub fn default_max_concurrent_queries() -> usize {
    8
}
