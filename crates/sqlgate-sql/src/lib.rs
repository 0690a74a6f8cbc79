//! SQL sanitization for the SQLGate query safety gateway.
//!
//! This crate turns untrusted candidate SQL (LLM output or raw user text)
//! into either a [`SafeQuery`] (a single read-only SELECT, stripped of
//! comments, referencing only allowlisted tables, carrying an explicit row
//! cap) or a typed [`RejectReason`]. It performs no I/O beyond the allowlist lookup
//! injected through [`TableResolver`], so every check is testable offline.
//!
//! Tokenization uses sqlparser rather than ad-hoc string matching, so
//! semicolons and keywords inside string literals never trip the checks.

pub mod keywords;
pub mod policy;
pub mod sanitizer;
pub mod tokens;

pub use keywords::SqlVerb;
pub use policy::DenyPolicy;
pub use sanitizer::{CandidateQuery, QuerySource, RejectReason, SafeQuery, Sanitizer, TableResolver};
