//! Typed SQL verb enumeration.
//!
//! Gives the sanitizer and its logs a strongly-typed view of the leading
//! statement verb instead of scattered string literals.

use std::str::FromStr;

/// Leading statement verbs the sanitizer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlVerb {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Truncate,
    Replace,
    Grant,
    Revoke,
    Show,
    Describe,
    Use,
    Explain,
    With,
}

impl SqlVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlVerb::Select => "SELECT",
            SqlVerb::Insert => "INSERT",
            SqlVerb::Update => "UPDATE",
            SqlVerb::Delete => "DELETE",
            SqlVerb::Create => "CREATE",
            SqlVerb::Drop => "DROP",
            SqlVerb::Alter => "ALTER",
            SqlVerb::Truncate => "TRUNCATE",
            SqlVerb::Replace => "REPLACE",
            SqlVerb::Grant => "GRANT",
            SqlVerb::Revoke => "REVOKE",
            SqlVerb::Show => "SHOW",
            SqlVerb::Describe => "DESCRIBE",
            SqlVerb::Use => "USE",
            SqlVerb::Explain => "EXPLAIN",
            SqlVerb::With => "WITH",
        }
    }

    /// Only plain SELECT passes the gateway; CTEs (`WITH`) are excluded
    /// because the prompt contract forbids them and the row-cap rewrite
    /// does not reason about them.
    pub fn is_read_only(self) -> bool {
        matches!(self, SqlVerb::Select)
    }
}

impl FromStr for SqlVerb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SELECT" => Ok(SqlVerb::Select),
            "INSERT" => Ok(SqlVerb::Insert),
            "UPDATE" => Ok(SqlVerb::Update),
            "DELETE" => Ok(SqlVerb::Delete),
            "CREATE" => Ok(SqlVerb::Create),
            "DROP" => Ok(SqlVerb::Drop),
            "ALTER" => Ok(SqlVerb::Alter),
            "TRUNCATE" => Ok(SqlVerb::Truncate),
            "REPLACE" => Ok(SqlVerb::Replace),
            "GRANT" => Ok(SqlVerb::Grant),
            "REVOKE" => Ok(SqlVerb::Revoke),
            "SHOW" => Ok(SqlVerb::Show),
            "DESCRIBE" | "DESC" => Ok(SqlVerb::Describe),
            "USE" => Ok(SqlVerb::Use),
            "EXPLAIN" => Ok(SqlVerb::Explain),
            "WITH" => Ok(SqlVerb::With),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_round_trip() {
        assert_eq!("select".parse::<SqlVerb>(), Ok(SqlVerb::Select));
        assert_eq!("DESC".parse::<SqlVerb>(), Ok(SqlVerb::Describe));
        assert_eq!(SqlVerb::Drop.as_str(), "DROP");
        assert!("vacuum".parse::<SqlVerb>().is_err());
    }

    #[test]
    fn test_only_select_is_read_only() {
        assert!(SqlVerb::Select.is_read_only());
        assert!(!SqlVerb::With.is_read_only());
        assert!(!SqlVerb::Show.is_read_only());
    }
}
