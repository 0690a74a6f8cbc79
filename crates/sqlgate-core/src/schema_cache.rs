//! Schema allowlist cache.
//!
//! Holds an immutable snapshot of the tables (and their columns) the
//! gateway permits queries to reference. `refresh` rebuilds the snapshot
//! wholesale from the database collaborator and swaps it atomically behind
//! an `Arc`; readers clone the `Arc` and can never observe a mix of old
//! and new fields. This cache is the single source of truth the sanitizer
//! consults; no other component decides a table is permitted.

use crate::providers::{Database, ProviderError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sqlgate_commons::TableName;
use sqlgate_sql::TableResolver;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// One column of an exposed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Immutable per-table allowlist entry. Rebuilt wholesale on refresh,
/// never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistEntry {
    pub table: TableName,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Default)]
struct SchemaSnapshot {
    /// Entries in the order the database listed them.
    tables: Vec<AllowlistEntry>,
    /// Lowercased name -> position in `tables`.
    index: HashMap<String, usize>,
}

/// Refreshable, atomically swapped view of permitted tables.
pub struct SchemaCache {
    /// Lowercased configured allowlist; empty means every table visible to
    /// the read-only role is permitted.
    allowlist: HashSet<String>,
    snapshot: RwLock<Arc<SchemaSnapshot>>,
}

impl SchemaCache {
    pub fn new(allowlist: &[String]) -> Self {
        Self {
            allowlist: allowlist.iter().map(|t| t.to_lowercase()).collect(),
            snapshot: RwLock::new(Arc::new(SchemaSnapshot::default())),
        }
    }

    fn permitted(&self, table: &str) -> bool {
        self.allowlist.is_empty() || self.allowlist.contains(&table.to_lowercase())
    }

    /// Re-read table/column metadata from the database collaborator and
    /// swap the snapshot. Readers racing this call see either the old or
    /// the new snapshot, never a partial one.
    pub async fn refresh(&self, db: &dyn Database) -> Result<usize, ProviderError> {
        let visible = db.list_tables().await?;
        let mut tables = Vec::new();
        let mut index = HashMap::new();

        for name in visible {
            if !self.permitted(&name) {
                continue;
            }
            let table = match TableName::new(name.clone()) {
                Ok(table) => table,
                Err(err) => {
                    debug!("[SCHEMA] skipping unusable table name: {}", err);
                    continue;
                }
            };
            // A table can vanish between list and describe; skip it rather
            // than failing the whole refresh.
            let columns = match db.describe_table(table.as_str()).await {
                Ok(columns) => columns,
                Err(ProviderError::NotFound(_)) => {
                    debug!("[SCHEMA] table {} vanished during refresh", table);
                    continue;
                }
                Err(err) => return Err(err),
            };
            index.insert(table.normalized(), tables.len());
            tables.push(AllowlistEntry { table, columns });
        }

        let count = tables.len();
        let next = Arc::new(SchemaSnapshot { tables, index });
        *self.snapshot.write().unwrap() = next;
        info!("[SCHEMA] snapshot refreshed: {} table(s) exposed", count);
        Ok(count)
    }

    fn current(&self) -> Arc<SchemaSnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// Names of permitted tables, in snapshot order.
    pub fn list_tables(&self) -> Vec<TableName> {
        self.current()
            .tables
            .iter()
            .map(|e| e.table.clone())
            .collect()
    }

    /// Full entry set, for prompt building.
    pub fn entries(&self) -> Vec<AllowlistEntry> {
        self.current().tables.clone()
    }

    /// Look up a table by name, case-insensitively.
    pub fn describe(&self, table: &str) -> Option<AllowlistEntry> {
        let snapshot = self.current();
        snapshot
            .index
            .get(&table.to_lowercase())
            .map(|&i| snapshot.tables[i].clone())
    }

    pub fn is_empty(&self) -> bool {
        self.current().tables.is_empty()
    }
}

impl TableResolver for SchemaCache {
    fn resolve(&self, name: &str) -> Option<TableName> {
        self.describe(name).map(|entry| entry.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryResult;
    use async_trait::async_trait;
    use sqlgate_sql::SafeQuery;
    use std::sync::Mutex;

    /// Stub database whose table set can be swapped between refreshes.
    struct StubDb {
        tables: Mutex<Vec<&'static str>>,
    }

    impl StubDb {
        fn new(tables: &[&'static str]) -> Self {
            Self {
                tables: Mutex::new(tables.to_vec()),
            }
        }

        fn set_tables(&self, tables: &[&'static str]) {
            *self.tables.lock().unwrap() = tables.to_vec();
        }
    }

    #[async_trait]
    impl Database for StubDb {
        async fn list_tables(&self) -> Result<Vec<String>, ProviderError> {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .iter()
                .map(|t| t.to_string())
                .collect())
        }

        async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, ProviderError> {
            if !self
                .tables
                .lock()
                .unwrap()
                .iter()
                .any(|t| t.eq_ignore_ascii_case(table))
            {
                return Err(ProviderError::NotFound(table.to_string()));
            }
            Ok(vec![
                ColumnInfo {
                    name: "id".to_string(),
                    data_type: "INT".to_string(),
                },
                ColumnInfo {
                    name: "name".to_string(),
                    data_type: "VARCHAR(255)".to_string(),
                },
            ])
        }

        async fn execute(&self, _query: &SafeQuery) -> Result<QueryResult, ProviderError> {
            unimplemented!("schema cache tests never execute")
        }
    }

    #[tokio::test]
    async fn test_refresh_populates_snapshot() {
        let db = StubDb::new(&["sales", "inventory"]);
        let cache = SchemaCache::new(&[]);
        assert!(cache.is_empty());

        let count = cache.refresh(&db).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(cache.list_tables().len(), 2);
        let entry = cache.describe("SALES").unwrap();
        assert_eq!(entry.table.as_str(), "sales");
        assert_eq!(entry.columns.len(), 2);
    }

    #[tokio::test]
    async fn test_configured_allowlist_filters_visible_tables() {
        let db = StubDb::new(&["sales", "secrets", "inventory"]);
        let cache = SchemaCache::new(&["Sales".to_string()]);

        cache.refresh(&db).await.unwrap();
        assert_eq!(cache.list_tables().len(), 1);
        assert!(cache.describe("sales").is_some());
        assert!(cache.describe("secrets").is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot_wholesale() {
        let db = StubDb::new(&["sales"]);
        let cache = SchemaCache::new(&[]);
        cache.refresh(&db).await.unwrap();
        assert!(cache.describe("sales").is_some());

        db.set_tables(&["inventory"]);
        cache.refresh(&db).await.unwrap();
        assert!(cache.describe("sales").is_none(), "old entries must be gone");
        assert!(cache.describe("inventory").is_some());
    }

    #[tokio::test]
    async fn test_describe_absent_table_is_none() {
        let db = StubDb::new(&["sales"]);
        let cache = SchemaCache::new(&[]);
        cache.refresh(&db).await.unwrap();
        assert!(cache.describe("users").is_none());
    }

    #[tokio::test]
    async fn test_resolver_seam_matches_describe() {
        let db = StubDb::new(&["sales"]);
        let cache = SchemaCache::new(&[]);
        cache.refresh(&db).await.unwrap();
        assert_eq!(cache.resolve("SaLeS").unwrap().as_str(), "sales");
        assert!(cache.resolve("users").is_none());
    }
}
