//! Configurable deny policy for candidate SQL.
//!
//! The forbidden construct list is configuration, not code: operators load
//! it from `policy.denied_sql_patterns`. Bare words (`drop`, `insert`)
//! match on word boundaries so column names like `created_at` pass;
//! entries with spaces or punctuation (`into outfile`, `sleep(`) match as
//! plain substrings.

use sqlgate_commons::config::PolicySettings;

/// Denied-pattern scanner applied to the full candidate text.
#[derive(Debug, Clone)]
pub struct DenyPolicy {
    /// Patterns stored lowercase; matching is case-insensitive.
    patterns: Vec<String>,
}

impl DenyPolicy {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// First configured pattern found in the text, if any.
    pub fn first_match(&self, sql: &str) -> Option<&str> {
        let lowered = sql.to_lowercase();
        self.patterns
            .iter()
            .find(|p| pattern_matches(&lowered, p))
            .map(String::as_str)
    }
}

impl Default for DenyPolicy {
    fn default() -> Self {
        Self::new(&PolicySettings::default().denied_sql_patterns)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Word-boundary match for bare-word patterns, substring match otherwise.
/// Both `text` and `pattern` must already be lowercase.
fn pattern_matches(text: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let bare_word = pattern.chars().all(is_word_char);
    if !bare_word {
        return text.contains(pattern);
    }

    let mut start = 0;
    while let Some(pos) = text[start..].find(pattern) {
        let begin = start + pos;
        let end = begin + pattern.len();
        let left_ok = begin == 0 || !text[..begin].chars().next_back().is_some_and(is_word_char);
        let right_ok = end == text.len() || !text[end..].chars().next().is_some_and(is_word_char);
        if left_ok && right_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_catches_ddl_and_dml() {
        let policy = DenyPolicy::default();
        assert_eq!(
            policy.first_match("SELECT 1; DROP TABLE sales"),
            Some("drop")
        );
        assert_eq!(
            policy.first_match("select * from t where insert_ok"),
            None,
            "insert_ok is not the word insert"
        );
        assert!(policy.first_match("SELECT * FROM sales").is_none());
    }

    #[test]
    fn test_word_boundary_does_not_match_substrings() {
        let policy = DenyPolicy::new(&["create".to_string()]);
        assert!(policy.first_match("SELECT created_at FROM sales").is_none());
        assert!(policy.first_match("CREATE TABLE x (id INT)").is_some());
    }

    #[test]
    fn test_phrase_patterns_match_as_substrings() {
        let policy = DenyPolicy::default();
        assert!(policy
            .first_match("SELECT name FROM sales INTO OUTFILE '/tmp/x'")
            .is_some());
        assert!(policy.first_match("SELECT SLEEP(10)").is_some());
        assert!(policy.first_match("SELECT BENCHMARK(100, MD5('x'))").is_some());
    }

    #[test]
    fn test_custom_policy_can_deny_union() {
        let policy = DenyPolicy::new(&["union".to_string()]);
        assert_eq!(
            policy.first_match("SELECT a FROM t UNION SELECT b FROM u"),
            Some("union")
        );
    }
}
