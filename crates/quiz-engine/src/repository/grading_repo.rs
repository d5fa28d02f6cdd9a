//! 评分记录仓储
//!
//! 三张评分表合并为统一的 [`GradingRecord`] 形状

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::GradingRepositoryTrait;
use crate::error::Result;
use crate::models::{ExamSubmissionStatus, GradingRecord};

pub struct GradingRepository {
    pool: PgPool,
}

impl GradingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_grading_records(
        &self,
        shuffled_quiz_set_ids: &[String],
    ) -> Result<Vec<GradingRecord>> {
        let records = sqlx::query_as::<_, GradingRecord>(
            r#"
            SELECT shuffled_quiz_set_id, 'EXAM'::VARCHAR AS kind, graded_point,
                   status AS exam_status, TRUE AS is_submitted
            FROM exam_lo_submissions
            WHERE shuffled_quiz_set_id = ANY($1) AND deleted_at IS NULL
            UNION ALL
            SELECT shuffled_quiz_set_id, 'FLASHCARD'::VARCHAR, NULL::INT, NULL::VARCHAR, is_submitted
            FROM flash_card_submissions
            WHERE shuffled_quiz_set_id = ANY($1) AND deleted_at IS NULL
            UNION ALL
            SELECT shuffled_quiz_set_id, 'LEARNING_OBJECTIVE'::VARCHAR, NULL::INT, NULL::VARCHAR, is_submitted
            FROM lo_submissions
            WHERE shuffled_quiz_set_id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(shuffled_quiz_set_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 写入考试批改结果（每次作答一条）
    pub async fn upsert_exam_grading(
        &self,
        shuffled_quiz_set_id: &str,
        status: ExamSubmissionStatus,
        graded_point: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exam_lo_submissions (shuffled_quiz_set_id, status, graded_point)
            VALUES ($1, $2, $3)
            ON CONFLICT (shuffled_quiz_set_id)
            DO UPDATE SET status = EXCLUDED.status, graded_point = EXCLUDED.graded_point,
                          updated_at = NOW()
            "#,
        )
        .bind(shuffled_quiz_set_id)
        .bind(status)
        .bind(graded_point)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl GradingRepositoryTrait for GradingRepository {
    async fn list_grading_records(
        &self,
        shuffled_quiz_set_ids: &[String],
    ) -> Result<Vec<GradingRecord>> {
        self.list_grading_records(shuffled_quiz_set_ids).await
    }
}
