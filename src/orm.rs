//! Minimal async ORM for Cobalto (sqlite + sqlx)
//!
//! Usage:
//! let db = Db::connect("sqlite::memory:").await?;
//! orm::auto_migrate(Arc::new(db.clone())).await?;
//! db.fetch_all::<(String,)>("SELECT name FROM authors").await?
pub use futures::future::BoxFuture;
use crate::settings::Settings;
use log::{Level, info, log};
use sha2::{Digest, Sha256};
pub use sqlx::FromRow;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Executor, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const MIGRATIONS_TABLE: &str = "__cobalto_migrations";

/// An async database pool wrapper.
///
/// This is the persistence handle every record operation takes explicitly;
/// there is no process-wide session.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
    sql_log_level: Level,
}

pub struct Migration(pub MigrationFn);

impl std::ops::Deref for Migration {
    type Target = MigrationFn;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Migration function pointer for a model.
/// Each model registers a `fn(Arc<Db>) -> BoxFuture<'static, Result<(), sqlx::Error>>`.
pub type MigrationFn = fn(Arc<Db>) -> BoxFuture<'static, Result<(), sqlx::Error>>;

/// A record type backed by its own table.
///
/// `create_table_sql` is the full DDL for a fresh table; `columns` lists the
/// `(name, type)` pairs that may be added to an existing table by `migrate`.
#[async_trait::async_trait]
pub trait Model: Send + Sync {
    fn table_name() -> &'static str;
    fn create_table_sql() -> String;
    fn columns() -> Vec<(String, String)>;

    async fn migrate(db: Arc<Db>) -> Result<(), sqlx::Error> {
        let table_name = Self::table_name();
        let create_sql = Self::create_table_sql();
        let schema_hash = hash(&create_sql);

        ensure_migrations_table(&db).await?;

        let recorded: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT hash FROM {} WHERE table_name = ?",
            MIGRATIONS_TABLE
        ))
        .bind(table_name)
        .fetch_optional(&db.pool)
        .await?;

        let Some((recorded_hash,)) = recorded else {
            db.execute(&create_sql).await?;
            sqlx::query(&format!(
                "INSERT INTO {} (table_name, schema_sql, hash) VALUES (?, ?, ?)",
                MIGRATIONS_TABLE
            ))
            .bind(table_name)
            .bind(&create_sql)
            .bind(&schema_hash)
            .execute(&db.pool)
            .await?;
            info!(
                "Migrated `{}` (table created, initial schema applied).",
                table_name
            );
            return Ok(());
        };

        if recorded_hash == schema_hash {
            info!("No schema changes detected for `{}`.", table_name);
            return Ok(());
        }

        let pragma_sql = format!("PRAGMA table_info({})", table_name);
        let existing: Vec<String> = sqlx::query(&pragma_sql)
            .fetch_all(&db.pool)
            .await?
            .into_iter()
            .map(|row: sqlx::sqlite::SqliteRow| row.get::<String, _>("name"))
            .collect();

        let mut added = Vec::new();
        for (name, sqltype) in Self::columns() {
            if !existing.contains(&name) {
                db.execute(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {};",
                    table_name, name, sqltype
                ))
                .await?;
                added.push((name, sqltype));
            }
        }

        if added.is_empty() {
            info!(
                "Schema of `{}` changed but no columns were missing.",
                table_name
            );
        } else {
            info!(
                "Schema changes detected for `{}`, the following columns were added:",
                table_name
            );
            for (name, sqltype) in &added {
                info!("  - {} {}", name, sqltype);
            }
        }

        sqlx::query(&format!(
            "UPDATE {} SET schema_sql = ?, hash = ?, applied_at = CURRENT_TIMESTAMP \
             WHERE table_name = ?",
            MIGRATIONS_TABLE
        ))
        .bind(&create_sql)
        .bind(&schema_hash)
        .bind(table_name)
        .execute(&db.pool)
        .await?;
        Ok(())
    }
}

async fn ensure_migrations_table(db: &Db) -> Result<(), sqlx::Error> {
    db.execute(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name TEXT UNIQUE NOT NULL,
            schema_sql TEXT NOT NULL,
            hash TEXT NOT NULL,
            applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        MIGRATIONS_TABLE
    ))
    .await
}

// Helper function to hash a SQL string
fn hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when `err` is the storage engine rejecting a UNIQUE constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

impl Db {
    /// Connect (or create) a SQLite database at the given URI
    pub async fn connect(uri: &str) -> Result<Self, sqlx::Error> {
        Self::connect_with(uri, 5, false).await
    }

    /// Connect using the database section of `settings`.
    ///
    /// With `settings.debug` on, every statement is logged at `info` instead
    /// of `debug`.
    pub async fn from_settings(settings: &Settings) -> Result<Self, sqlx::Error> {
        Self::connect_with(
            &settings.database.url,
            settings.database.max_connections,
            settings.debug,
        )
        .await
    }

    async fn connect_with(
        uri: &str,
        max_connections: u32,
        debug: bool,
    ) -> Result<Self, sqlx::Error> {
        info!("Connecting to SQLite database at URI: {}", uri);
        let sql_log_level = if debug { Level::Info } else { Level::Debug };
        let options = SqliteConnectOptions::from_str(uri)?
            .create_if_missing(true)
            .foreign_keys(true)
            .log_statements(sql_log_level.to_level_filter());

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        // An in-memory database is dropped with its last connection, so the
        // pool must never reap down to zero.
        if uri.contains(":memory:") {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        info!("Connected to SQLite database: {}", uri);
        Ok(Db {
            pool,
            sql_log_level,
        })
    }

    /// Level SQL statements are logged at.
    pub fn sql_log_level(&self) -> Level {
        self.sql_log_level
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Execute an arbitrary SQL statement, e.g. DDL, INSERT, UPDATE.
    pub async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        log!(self.sql_log_level, "Executing SQL: {}", sql);
        let result = self.pool.execute(sql).await;
        match &result {
            Ok(_) => log!(self.sql_log_level, "SQL executed successfully"),
            Err(e) => log::error!("SQL execution failed: {}", e),
        }
        result.map(|_| ())
    }

    /// Fetch all rows and map to a type implementing `FromRow`.
    pub async fn fetch_all<T: for<'r> FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin>(
        &self,
        sql: &str,
    ) -> Result<Vec<T>, sqlx::Error> {
        log!(self.sql_log_level, "Fetching rows with SQL: {}", sql);
        let result = sqlx::query_as(sql).fetch_all(&self.pool).await;
        match &result {
            Ok(rows) => log!(self.sql_log_level, "Fetched {} rows successfully", rows.len()),
            Err(e) => log::error!("Row fetch failed: {}", e),
        }
        result
    }
}

/// Migrate all registered models using the inventory pattern.
pub async fn auto_migrate(db: Arc<Db>) -> Result<(), sqlx::Error> {
    info!("Starting auto migration of all registered models...");
    let mut total = 0;
    for m in inventory::iter::<Migration> {
        total += 1;
        if let Err(e) = m(db.clone()).await {
            log::error!("Auto-migration failed for a model: {}", e);
            return Err(e);
        }
    }
    info!("Auto migration completed for {} models.", total);
    Ok(())
}
