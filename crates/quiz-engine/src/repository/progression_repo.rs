//! 作答进度仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ProgressionRepositoryTrait;
use crate::error::Result;
use crate::models::{ProgressionKey, QuizProgression};

const PROGRESSION_COLUMNS: &str = r#"
    student_id, study_plan_id, learning_material_id, shuffled_quiz_set_id, last_index,
    window_from, window_to, window_question_ids, created_at, updated_at
"#;

pub struct ProgressionRepository {
    pool: PgPool,
}

impl ProgressionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 (student, study_plan, learning_material) 整体替换
    pub async fn upsert_progression(&self, progression: &QuizProgression) -> Result<QuizProgression> {
        let saved = sqlx::query_as::<_, QuizProgression>(&format!(
            r#"
            INSERT INTO quiz_progressions (
                student_id, study_plan_id, learning_material_id, shuffled_quiz_set_id, last_index,
                window_from, window_to, window_question_ids, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (student_id, study_plan_id, learning_material_id)
            DO UPDATE SET
                shuffled_quiz_set_id = EXCLUDED.shuffled_quiz_set_id,
                last_index = EXCLUDED.last_index,
                window_from = EXCLUDED.window_from,
                window_to = EXCLUDED.window_to,
                window_question_ids = EXCLUDED.window_question_ids,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            PROGRESSION_COLUMNS
        ))
        .bind(&progression.student_id)
        .bind(&progression.study_plan_id)
        .bind(&progression.learning_material_id)
        .bind(&progression.shuffled_quiz_set_id)
        .bind(progression.last_index)
        .bind(progression.window_from)
        .bind(progression.window_to)
        .bind(&progression.window_question_ids)
        .bind(progression.created_at)
        .bind(progression.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    pub async fn get_progression(&self, key: &ProgressionKey) -> Result<Option<QuizProgression>> {
        let progression = sqlx::query_as::<_, QuizProgression>(&format!(
            r#"
            SELECT {}
            FROM quiz_progressions
            WHERE student_id = $1 AND study_plan_id = $2 AND learning_material_id = $3
            "#,
            PROGRESSION_COLUMNS
        ))
        .bind(&key.student_id)
        .bind(&key.study_plan_id)
        .bind(&key.learning_material_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progression)
    }
}

#[async_trait]
impl ProgressionRepositoryTrait for ProgressionRepository {
    async fn upsert_progression(&self, progression: &QuizProgression) -> Result<QuizProgression> {
        self.upsert_progression(progression).await
    }

    async fn get_progression(&self, key: &ProgressionKey) -> Result<Option<QuizProgression>> {
        self.get_progression(key).await
    }
}
