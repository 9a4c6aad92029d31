//! Durable article storage.
//!
//! The store is the system of record for harvested articles and the
//! authority for deduplication: `url` is the primary key, so uniqueness
//! holds even when two runs race past the find-then-insert check. The
//! connection string comes from the environment and a failure to connect
//! is startup-fatal; everything after startup degrades per record instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::str::FromStr;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::ArticleRecord;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        url TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        source TEXT NOT NULL,
        content TEXT NOT NULL,
        scraped_at TEXT NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0
    )
    "#,
    // add future migrations here
];

/// Narrow store contract used by the persistence gateway.
///
/// Only two operations are needed: look a record up by its URL, and insert
/// a new one. Implementations must be shareable across tasks.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch the stored record with this URL, if any.
    async fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>>;

    /// Insert a new record.
    ///
    /// Inserting a URL that already exists is an error; the primary key
    /// constraint is the final word on uniqueness.
    async fn insert(&self, record: &ArticleRecord) -> Result<()>;
}

/// SQLite-backed [`ArticleStore`].
///
/// Timestamps are stored as RFC 3339 text so the table stays readable with
/// plain `sqlite3` tooling.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database named by `url` and run migrations.
    ///
    /// # Arguments
    ///
    /// * `url` - A SQLite connection string such as `sqlite:articles.db`
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is malformed, the
    /// database cannot be opened, or a migration fails. Callers treat all
    /// of these as fatal.
    #[instrument(level = "info", skip_all)]
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        for migration in MIGRATIONS {
            sqlx::query(migration).execute(&pool).await?;
        }

        info!("Connected to article store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        let row = sqlx::query(
            r#"
            SELECT title, url, source, content, scraped_at, processed
            FROM articles
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let scraped_raw: String = row.try_get("scraped_at")?;
        let scraped_at = DateTime::parse_from_rfc3339(&scraped_raw)
            .map_err(|e| Error::Timestamp {
                value: scraped_raw.clone(),
                message: e.to_string(),
            })?
            .with_timezone(&Utc);

        Ok(Some(ArticleRecord {
            title: row.try_get("title")?,
            url: row.try_get("url")?,
            source: row.try_get("source")?,
            content: row.try_get("content")?,
            scraped_at,
            processed: row.try_get("processed")?,
        }))
    }

    async fn insert(&self, record: &ArticleRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO articles (url, title, source, content, scraped_at, processed)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.url)
        .bind(&record.title)
        .bind(&record.source)
        .bind(&record.content)
        .bind(record.scraped_at.to_rfc3339())
        .bind(record.processed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record(url: &str) -> ArticleRecord {
        ArticleRecord::new("Markets rally", url, "Example Wire", "Body text")
    }

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let dir = tempdir().unwrap();
        let db = format!("sqlite:{}", dir.path().join("test.db").display());
        let store = SqliteStore::connect(&db).await.unwrap();

        let record = sample_record("https://example.com/a");
        store.insert(&record).await.unwrap();

        let found = store.find_by_url("https://example.com/a").await.unwrap();
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn test_find_absent_url_returns_none() {
        let dir = tempdir().unwrap();
        let db = format!("sqlite:{}", dir.path().join("test.db").display());
        let store = SqliteStore::connect(&db).await.unwrap();

        let found = store.find_by_url("https://example.com/missing").await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected_by_primary_key() {
        let dir = tempdir().unwrap();
        let db = format!("sqlite:{}", dir.path().join("test.db").display());
        let store = SqliteStore::connect(&db).await.unwrap();

        store.insert(&sample_record("https://example.com/a")).await.unwrap();
        let err = store.insert(&sample_record("https://example.com/a")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        assert!(SqliteStore::connect("postgres://nope").await.is_err());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempdir().unwrap();
        let db = format!("sqlite:{}", dir.path().join("test.db").display());

        let store = SqliteStore::connect(&db).await.unwrap();
        store.insert(&sample_record("https://example.com/a")).await.unwrap();
        drop(store);

        // Reconnecting must not clobber existing rows
        let store = SqliteStore::connect(&db).await.unwrap();
        let found = store.find_by_url("https://example.com/a").await.unwrap();
        assert!(found.is_some());
    }
}
