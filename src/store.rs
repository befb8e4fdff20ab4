//! SQLite record of vacancies already applied to.
//!
//! The `UNIQUE` constraint on `vacancy_id` is the at-most-once guarantee;
//! callers pre-check with [`ApplicationStore::is_applied`] to avoid the
//! network call, but a duplicate insert is still rejected here.

use std::fmt;
use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vacancy {0} already has an application on record")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Status stored alongside each application. Only successful submissions
/// are ever recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Applied,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `applications` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub id: i64,
    pub vacancy_id: String,
    pub company_id: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct ApplicationStore {
    pool: SqlitePool,
}

impl ApplicationStore {
    /// Open or create the database file and make sure the table exists.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                vacancy_id TEXT UNIQUE,
                company_id TEXT,
                status     TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    pub async fn is_applied(&self, vacancy_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM applications WHERE vacancy_id = ?")
            .bind(vacancy_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Inserts a new row; a second insert for the same vacancy fails with
    /// [`StoreError::Duplicate`].
    pub async fn record_application(
        &self,
        vacancy_id: &str,
        company_id: &str,
        status: ApplicationStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO applications (vacancy_id, company_id, status) VALUES (?, ?, ?)",
        )
        .bind(vacancy_id)
        .bind(company_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(vacancy_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM applications")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    /// Most recent applications first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ApplicationRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, vacancy_id, company_id, status FROM applications ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ApplicationRecord, StoreError> {
                Ok(ApplicationRecord {
                    id: row.try_get("id")?,
                    vacancy_id: row.try_get::<Option<String>, _>("vacancy_id")?.unwrap_or_default(),
                    company_id: row.try_get::<Option<String>, _>("company_id")?.unwrap_or_default(),
                    status: row.try_get::<Option<String>, _>("status")?.unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_vacancy_is_not_applied() {
        let store = ApplicationStore::in_memory().await.unwrap();
        assert!(!store.is_applied("100").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recorded_vacancy_is_applied() {
        let store = ApplicationStore::in_memory().await.unwrap();
        store
            .record_application("100", "", ApplicationStatus::Applied)
            .await
            .unwrap();

        assert!(store.is_applied("100").await.unwrap());
        assert!(!store.is_applied("101").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = ApplicationStore::in_memory().await.unwrap();
        store
            .record_application("100", "", ApplicationStatus::Applied)
            .await
            .unwrap();

        let err = store
            .record_application("100", "employer-9", ApplicationStatus::Applied)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref id) if id == "100"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recent_lists_newest_first() {
        let store = ApplicationStore::in_memory().await.unwrap();
        for id in ["1", "2", "3"] {
            store
                .record_application(id, "", ApplicationStatus::Applied)
                .await
                .unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|r| r.vacancy_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
        assert_eq!(recent[0].status, "applied");
        assert_eq!(recent[0].company_id, "");
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        let store = ApplicationStore::open(&path).await.unwrap();
        store
            .record_application("555", "", ApplicationStatus::Applied)
            .await
            .unwrap();
        drop(store);

        let reopened = ApplicationStore::open(&path).await.unwrap();
        assert!(reopened.is_applied("555").await.unwrap());
    }
}
