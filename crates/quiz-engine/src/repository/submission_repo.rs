//! 答题流水仓储
//!
//! 流水存为独立的只追加表，`seq` 为插入序号，用于同一时间戳的先后判定

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::SubmissionRepositoryTrait;
use crate::error::Result;
use crate::models::{NewSubmission, SubmissionHistoryEntry};

pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 单条语句完成存在性检查和写入，题集已删除时不会留下孤立流水
    pub async fn append(
        &self,
        shuffled_quiz_set_id: &str,
        entry: &NewSubmission,
    ) -> Result<Option<i64>> {
        let seq = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO shuffled_quiz_set_submissions
                (shuffled_quiz_set_id, question_id, correct, accepted, submitted_at)
            SELECT $1, $2, $3, $4, $5
            WHERE EXISTS (
                SELECT 1 FROM shuffled_quiz_sets WHERE id = $1 AND deleted_at IS NULL
            )
            RETURNING seq
            "#,
        )
        .bind(shuffled_quiz_set_id)
        .bind(&entry.question_id)
        .bind(entry.correct)
        .bind(entry.accepted)
        .bind(entry.submitted_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(seq)
    }

    pub async fn list_entries(
        &self,
        shuffled_quiz_set_id: &str,
    ) -> Result<Vec<SubmissionHistoryEntry>> {
        let entries = sqlx::query_as::<_, SubmissionHistoryEntry>(
            r#"
            SELECT seq, shuffled_quiz_set_id, question_id, correct, accepted, submitted_at
            FROM shuffled_quiz_set_submissions
            WHERE shuffled_quiz_set_id = $1
            ORDER BY seq
            "#,
        )
        .bind(shuffled_quiz_set_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[async_trait]
impl SubmissionRepositoryTrait for SubmissionRepository {
    async fn append(
        &self,
        shuffled_quiz_set_id: &str,
        entry: &NewSubmission,
    ) -> Result<Option<i64>> {
        self.append(shuffled_quiz_set_id, entry).await
    }

    async fn list_entries(
        &self,
        shuffled_quiz_set_id: &str,
    ) -> Result<Vec<SubmissionHistoryEntry>> {
        self.list_entries(shuffled_quiz_set_id).await
    }
}
