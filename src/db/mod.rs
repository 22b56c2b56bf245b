//! Storage layer: a key-ordered bucket store on SQLite and the task
//! repository built over it.

pub mod deps;
pub mod import;
pub mod kv;
pub mod recur;
pub mod tasks;

use crate::curator::Curator;
use crate::error::{PoetError, PoetResult, ValidationError};
use crate::plugins::PluginRegistry;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Database handle wrapping a SQLite connection, scoped to one namespace.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    bucket: String,
    curator: Arc<Curator>,
    plugins: Arc<PluginRegistry>,
}

/// Bucket holding every task of a namespace.
pub fn bucket_name(namespace: &str) -> String {
    format!("/{namespace}/tasks")
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, namespace: &str) -> PoetResult<Self> {
        let conn = Connection::open(path.as_ref())?;

        // WAL: one writer, readers see a consistent snapshot
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        debug!(path = %path.as_ref().display(), namespace, "Opened task database");
        Self::init(conn, namespace)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> PoetResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::init(conn, DEFAULT_NAMESPACE)
    }

    fn init(conn: Connection, namespace: &str) -> PoetResult<Self> {
        if namespace.is_empty() {
            return Err(ValidationError::EmptyNamespace.into());
        }

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            bucket: bucket_name(namespace),
            curator: Arc::new(Curator::default()),
            plugins: Arc::new(PluginRegistry::with_builtin()),
        };

        db.run_migrations()?;
        db.with_conn(|conn| kv::ensure_bucket(conn, &db.bucket))?;

        Ok(db)
    }

    /// Replace the urgency curator.
    pub fn with_curator(mut self, curator: Curator) -> Self {
        self.curator = Arc::new(curator);
        self
    }

    /// Replace the plugin registry.
    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = Arc::new(plugins);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn curator(&self) -> &Curator {
        &self.curator
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Run database migrations.
    fn run_migrations(&self) -> PoetResult<()> {
        let mut conn = self.conn.lock().map_err(|_| PoetError::LockPoisoned)?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> PoetResult<T>
    where
        F: FnOnce(&Connection) -> PoetResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| PoetError::LockPoisoned)?;
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> PoetResult<T>
    where
        F: FnOnce(&mut Connection) -> PoetResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| PoetError::LockPoisoned)?;
        f(&mut conn)
    }

    /// Run `f` inside one transaction, committing only if it succeeds.
    pub fn with_tx<F, T>(&self, f: F) -> PoetResult<T>
    where
        F: FnOnce(&Connection) -> PoetResult<T>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }
}

/// Get the current timestamp.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_is_scoped_by_namespace() {
        assert_eq!(bucket_name("default"), "/default/tasks");
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.bucket(), "/default/tasks");
    }

    #[test]
    fn empty_namespace_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::open(dir.path().join("poet.db"), "").err().unwrap();
        assert!(matches!(
            err,
            PoetError::Validation(ValidationError::EmptyNamespace)
        ));
    }

    #[test]
    fn file_database_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poet.db");
        {
            let db = Database::open(&path, "work").unwrap();
            assert_eq!(db.bucket(), "/work/tasks");
        }
        let db = Database::open(&path, "work").unwrap();
        db.with_conn(|conn| {
            assert!(kv::bucket_exists(conn, "/work/tasks")?);
            Ok(())
        })
        .unwrap();
    }
}
