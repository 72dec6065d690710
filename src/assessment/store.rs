//! Quiz response store with per-module counts.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::assessment::catalog::{self, MODULES};
use crate::assessment::summary::{AssessmentSummary, DashboardSummary, QuizResponse};
use crate::common::config::StorageConfig;
use crate::common::errors::{StoreError, StoreResult};
use crate::common::ids::UserId;

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Assessment store trait.
pub trait AssessmentStore: Send + Sync {
    /// Record one answer, replacing any earlier answer to the same question.
    ///
    /// # Errors
    /// Returns an error if the module or question is unknown, or storage fails.
    fn record_response(&self, response: QuizResponse) -> StoreFuture<'_, StoreResult<()>>;

    /// Response counts for every catalog module, in catalog order.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn response_counts(&self, user_id: UserId)
    -> StoreFuture<'_, StoreResult<Vec<AssessmentSummary>>>;

    /// Completion rollup for a user.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn dashboard(&self, user_id: UserId) -> StoreFuture<'_, StoreResult<DashboardSummary>> {
        Box::pin(async move {
            let counts = self.response_counts(user_id).await?;
            Ok(DashboardSummary::from_counts(&counts))
        })
    }
}

/// `SQLite` implementation of the assessment store.
pub struct SqliteAssessmentStore {
    conn: Connection,
    table: String,
}

impl SqliteAssessmentStore {
    /// Open the store at the configured path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn new(config: &StorageConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::init(conn, config.responses_table.clone()).await
    }

    /// Open a private in-memory store.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub async fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn, StorageConfig::default().responses_table).await
    }

    async fn init(conn: Connection, table: String) -> StoreResult<Self> {
        let table_name = table.clone();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    module_id TEXT NOT NULL,
                    question_id INTEGER NOT NULL,
                    answer TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    UNIQUE (user_id, module_id, question_id)
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_user
                    ON {table_name} (user_id, module_id);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl AssessmentStore for SqliteAssessmentStore {
    fn record_response(&self, response: QuizResponse) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let module = catalog::find_module(&response.module_id)
                .ok_or_else(|| StoreError::UnknownModule(response.module_id.clone()))?;
            if !module.contains_question(response.question_id) {
                return Err(StoreError::UnknownQuestion {
                    module_id: response.module_id,
                    question_id: response.question_id,
                });
            }

            let table = self.table.clone();
            let user_id = response.user_id.to_string();
            let module_id = module.id;
            let question_id = i64::from(response.question_id);
            let answer = serde_json::to_string(&response.answer)?;
            let now = Utc::now().timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table}
                             (user_id, module_id, question_id, answer, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                             ON CONFLICT (user_id, module_id, question_id)
                             DO UPDATE SET answer = excluded.answer, updated_at = excluded.updated_at"
                        ),
                        rusqlite::params![user_id, module_id, question_id, answer, now],
                    )?;
                    Ok(())
                })
                .await?;

            debug!(
                user_id = %response.user_id,
                module_id,
                question_id,
                "Recorded quiz response"
            );
            Ok(())
        })
    }

    fn response_counts(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, StoreResult<Vec<AssessmentSummary>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let user = user_id.to_string();
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT module_id, COUNT(*) FROM {table}
                         WHERE user_id = ?1
                         GROUP BY module_id"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![user], |row| {
                            let module_id: String = row.get(0)?;
                            let count: i64 = row.get(1)?;
                            Ok((module_id, count))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            let mut counts = HashMap::with_capacity(rows.len());
            for (module_id, count) in rows {
                let count = u32::try_from(count).map_err(|_| {
                    StoreError::InvalidRecord(format!("invalid count for {module_id}"))
                })?;
                counts.insert(module_id, count);
            }

            Ok(MODULES
                .iter()
                .map(|module| {
                    AssessmentSummary::for_module(
                        module,
                        counts.get(module.id).copied().unwrap_or(0),
                    )
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(user: &str, module_id: &str, question_id: u32) -> QuizResponse {
        QuizResponse {
            user_id: UserId::parse(user).unwrap(),
            module_id: module_id.to_string(),
            question_id,
            answer: json!("yes"),
        }
    }

    fn count_for(summaries: &[AssessmentSummary], module_id: &str) -> u32 {
        summaries
            .iter()
            .find(|summary| summary.module_id == module_id)
            .map_or(0, |summary| summary.response_count)
    }

    #[tokio::test]
    async fn test_counts_cover_every_module() {
        let store = SqliteAssessmentStore::in_memory().await.unwrap();
        let counts = store
            .response_counts(UserId::parse("nobody").unwrap())
            .await
            .unwrap();

        assert_eq!(counts.len(), MODULES.len());
        let ids: Vec<&str> = counts.iter().map(|s| s.module_id.as_str()).collect();
        let expected: Vec<&str> = MODULES.iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);
        assert!(counts.iter().all(|s| s.response_count == 0));
    }

    #[tokio::test]
    async fn test_record_and_count() {
        let store = SqliteAssessmentStore::in_memory().await.unwrap();
        store.record_response(response("u1", "individual", 1)).await.unwrap();
        store.record_response(response("u1", "individual", 2)).await.unwrap();
        store.record_response(response("u1", "monogamy", 90)).await.unwrap();
        store.record_response(response("u2", "individual", 1)).await.unwrap();

        let counts = store
            .response_counts(UserId::parse("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(count_for(&counts, "individual"), 2);
        assert_eq!(count_for(&counts, "monogamy"), 1);
        assert_eq!(count_for(&counts, "preferences"), 0);
    }

    #[tokio::test]
    async fn test_reanswer_replaces() {
        let store = SqliteAssessmentStore::in_memory().await.unwrap();
        store.record_response(response("u1", "preferences", 4)).await.unwrap();
        let mut again = response("u1", "preferences", 4);
        again.answer = json!({"choice": "no"});
        store.record_response(again).await.unwrap();

        let counts = store
            .response_counts(UserId::parse("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(count_for(&counts, "preferences"), 1);
    }

    #[tokio::test]
    async fn test_rejects_unknown_module_and_question() {
        let store = SqliteAssessmentStore::in_memory().await.unwrap();

        let err = store
            .record_response(response("u1", "astrology", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownModule(ref id) if id == "astrology"));
        assert!(err.is_client_error());

        let err = store
            .record_response(response("u1", "individual", 4))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnknownQuestion { question_id: 4, .. }
        ));
    }

    #[tokio::test]
    async fn test_dashboard_rollup() {
        let store = SqliteAssessmentStore::in_memory().await.unwrap();
        for question_id in 1..=3 {
            store
                .record_response(response("u1", "individual", question_id))
                .await
                .unwrap();
        }
        store.record_response(response("u1", "deep_dive", 76)).await.unwrap();

        let dashboard = store.dashboard(UserId::parse("u1").unwrap()).await.unwrap();
        assert_eq!(dashboard.total_responses, 4);
        assert_eq!(dashboard.total_questions, 90);
        assert_eq!(dashboard.completion_percentage, 4);

        let individual = &dashboard.module_progress[0];
        assert_eq!(individual.module_id, "individual");
        assert_eq!(individual.completed, 3);
        assert_eq!(individual.percentage, 100);

        let deep_dive = dashboard
            .module_progress
            .iter()
            .find(|m| m.module_id == "deep_dive")
            .unwrap();
        assert_eq!(deep_dive.completed, 1);
        assert_eq!(deep_dive.percentage, 10);
    }
}
