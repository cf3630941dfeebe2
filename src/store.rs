use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::error::Result;
use crate::types::FeedbackRecord;

/// Where classified feedback is recorded.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn save(&self, record: &FeedbackRecord) -> Result<()>;

    /// Most recent records first.
    async fn recent(&self, limit: u32) -> Result<Vec<FeedbackRecord>>;
}

/// Used when no database is configured.
#[derive(Debug, Default)]
pub struct NullStore;

#[async_trait]
impl FeedbackStore for NullStore {
    async fn save(&self, _record: &FeedbackRecord) -> Result<()> {
        Ok(())
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<FeedbackRecord>> {
        Ok(Vec::new())
    }
}

pub struct SqliteFeedbackStore {
    pool: SqlitePool,
}

impl SqliteFeedbackStore {
    #[tracing::instrument]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // A single connection keeps `sqlite::memory:` databases shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS feedback_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_text TEXT NOT NULL,
                sentiment TEXT NOT NULL,
                response_text TEXT NOT NULL,
                empathy_score REAL NOT NULL,
                sarcasm INTEGER NOT NULL,
                emotion TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        tracing::info!("Feedback store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl FeedbackStore for SqliteFeedbackStore {
    async fn save(&self, record: &FeedbackRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO feedback_responses
                (customer_text, sentiment, response_text, empathy_score, sarcasm, emotion, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.customer_text)
        .bind(&record.sentiment)
        .bind(&record.response_text)
        .bind(record.empathy_score)
        .bind(record.sarcasm)
        .bind(&record.emotion)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            "SELECT customer_text, sentiment, response_text, empathy_score, sarcasm, emotion, created_at
             FROM feedback_responses
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<FeedbackRecord> {
                Ok(FeedbackRecord {
                    customer_text: row.try_get("customer_text")?,
                    sentiment: row.try_get("sentiment")?,
                    response_text: row.try_get("response_text")?,
                    empathy_score: row.try_get("empathy_score")?,
                    sarcasm: row.try_get("sarcasm")?,
                    emotion: row.try_get("emotion")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
