use anyhow::Result;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use r2d2_sqlite::rusqlite::{params, OpenFlags, OptionalExtension};

use crate::engine::local::LocalBackend;

/// SQLite-based local storage backend.
///
/// One database can hold several independent areas; rows are isolated by `scope` (usually the
/// origin of the application using the storage).
pub struct SqliteLocalBackend {
    pool: Pool<SqliteConnectionManager>,
    scope: String,
}

impl SqliteLocalBackend {
    /// Opens (or creates) the database at `path` and binds the backend to `scope`.
    pub fn new(path: &str, scope: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE |
                    OpenFlags::SQLITE_OPEN_CREATE |
                    OpenFlags::SQLITE_OPEN_URI
            )
            .with_init(|c| {
                c.busy_timeout(std::time::Duration::from_millis(500))?;
                c.execute_batch(
                    "CREATE TABLE IF NOT EXISTS local_storage (
                        scope TEXT NOT NULL,
                        key TEXT NOT NULL,
                        value TEXT NOT NULL,
                        updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
                        PRIMARY KEY(scope, key)
                    );"
                )?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(4)
            .connection_timeout(std::time::Duration::from_secs(5))
            .build(manager)?;

        Ok(Self {
            pool,
            scope: scope.to_string(),
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

impl LocalBackend for SqliteLocalBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE scope=?1 AND key=?2",
                params![self.scope, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO local_storage(scope,key,value) VALUES (?1,?2,?3)
             ON CONFLICT(scope,key) DO UPDATE
             SET value=excluded.value, updated_at=strftime('%s','now')",
            params![self.scope, key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM local_storage WHERE scope=?1 AND key=?2",
            params![self.scope, key],
        )?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM local_storage WHERE scope=?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.scope], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }

    fn usage(&self) -> Result<usize> {
        let conn = self.conn()?;
        let bytes = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM local_storage WHERE scope=?1",
            params![self.scope],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(usize::try_from(bytes).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn db_path(dir: &tempfile::TempDir) -> String {
        dir.path().join("local.db").to_string_lossy().into_owned()
    }

    #[test]
    fn backend_contract() {
        let dir = tempdir().unwrap();
        let backend = SqliteLocalBackend::new(&db_path(&dir), "https://example.com").unwrap();

        assert!(backend.get("missing").unwrap().is_none());
        backend.set("b", "2").unwrap();
        backend.set("a", "1").unwrap();
        backend.set("a", "ONE").unwrap();

        assert_eq!(backend.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(backend.get("a").unwrap().as_deref(), Some("ONE"));
        assert_eq!(backend.usage().unwrap(), 6);

        backend.remove("a").unwrap();
        assert!(backend.get("a").unwrap().is_none());
    }

    #[test]
    fn scopes_are_isolated_and_persisted() {
        let dir = tempdir().unwrap();
        let path = db_path(&dir);

        {
            let a = SqliteLocalBackend::new(&path, "https://a.test").unwrap();
            a.set("k", "v").unwrap();
        }

        let a = SqliteLocalBackend::new(&path, "https://a.test").unwrap();
        let b = SqliteLocalBackend::new(&path, "https://b.test").unwrap();
        assert_eq!(a.get("k").unwrap().as_deref(), Some("v"));
        assert!(b.get("k").unwrap().is_none());
        assert_eq!(a.scope(), "https://a.test");
    }
}
