//! Type-safe identifier wrappers.
//!
//! Newtypes keep table names and requester identifiers from being swapped
//! accidentally at call sites. Table names compare case-insensitively
//! because the upstream databases the gateway fronts treat them that way.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted identifier length. Anything longer is almost certainly
/// not a real table name and may be an injection payload.
const MAX_IDENTIFIER_LEN: usize = 128;

/// Error raised when a table name fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNameValidationError {
    pub name: String,
    pub reason: String,
}

impl fmt::Display for TableNameValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid table name '{}': {}", self.name, self.reason)
    }
}

impl std::error::Error for TableNameValidationError {}

/// Type-safe wrapper for table names.
///
/// The original spelling is preserved for display and SQL generation;
/// equality and hashing use the lowercase form so lookups against the
/// allowlist are case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableName(String);

impl TableName {
    fn validate(name: &str) -> Result<(), TableNameValidationError> {
        if name.is_empty() {
            return Err(TableNameValidationError {
                name: name.to_string(),
                reason: "Table name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(TableNameValidationError {
                name: name.to_string(),
                reason: format!("Table name exceeds {} characters", MAX_IDENTIFIER_LEN),
            });
        }

        if name.contains('\0') {
            return Err(TableNameValidationError {
                name: name.to_string(),
                reason: "Table name cannot contain null bytes".to_string(),
            });
        }

        if name.chars().any(char::is_whitespace) {
            return Err(TableNameValidationError {
                name: name.to_string(),
                reason: "Table name cannot contain whitespace".to_string(),
            });
        }

        Ok(())
    }

    /// Create a validated table name.
    pub fn new(name: impl Into<String>) -> Result<Self, TableNameValidationError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used for case-insensitive comparison and indexing.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// Case-insensitive comparison against a raw identifier.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for TableName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for TableName {}

impl std::hash::Hash for TableName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the party a request is executed on behalf of.
///
/// The gateway itself is single-role; the requester id exists for audit
/// logging and per-requester limiter keys, not authorization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_case_insensitive_equality() {
        let a = TableName::new("Sales").unwrap();
        let b = TableName::new("sales").unwrap();
        assert_eq!(a, b);
        assert!(a.matches("SALES"));
        assert_eq!(a.as_str(), "Sales");
    }

    #[test]
    fn test_table_name_rejects_invalid() {
        assert!(TableName::new("").is_err());
        assert!(TableName::new("bad name").is_err());
        assert!(TableName::new("bad\0name").is_err());
        assert!(TableName::new("x".repeat(200)).is_err());
    }

    #[test]
    fn test_requester_id_display() {
        let id = RequesterId::new("client-7");
        assert_eq!(id.to_string(), "client-7");
    }
}
