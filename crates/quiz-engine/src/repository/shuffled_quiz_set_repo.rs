//! 乱序题集仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ShuffledQuizSetRepositoryTrait;
use crate::error::Result;
use crate::models::ShuffledQuizSet;

const SHUFFLED_COLUMNS: &str = r#"
    id, original_quiz_set_id, original_shuffled_quiz_set_id, student_id, study_plan_id,
    learning_material_id, study_plan_item_id, session_id, question_ids, random_seed,
    total_correctness, created_at, updated_at, deleted_at
"#;

/// 乱序题集仓储
pub struct ShuffledQuizSetRepository {
    pool: PgPool,
}

impl ShuffledQuizSetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_shuffled_set(&self, set: &ShuffledQuizSet) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shuffled_quiz_sets (
                id, original_quiz_set_id, original_shuffled_quiz_set_id, student_id, study_plan_id,
                learning_material_id, study_plan_item_id, session_id, question_ids, random_seed,
                total_correctness, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&set.id)
        .bind(&set.original_quiz_set_id)
        .bind(&set.original_shuffled_quiz_set_id)
        .bind(&set.student_id)
        .bind(&set.study_plan_id)
        .bind(&set.learning_material_id)
        .bind(&set.study_plan_item_id)
        .bind(&set.session_id)
        .bind(&set.question_ids)
        .bind(&set.random_seed)
        .bind(set.total_correctness)
        .bind(set.created_at)
        .bind(set.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_shuffled_set(&self, id: &str) -> Result<Option<ShuffledQuizSet>> {
        let set = sqlx::query_as::<_, ShuffledQuizSet>(&format!(
            "SELECT {} FROM shuffled_quiz_sets WHERE id = $1 AND deleted_at IS NULL",
            SHUFFLED_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(set)
    }

    pub async fn get_by_session(&self, session_id: &str) -> Result<Option<ShuffledQuizSet>> {
        let set = sqlx::query_as::<_, ShuffledQuizSet>(&format!(
            r#"
            SELECT {}
            FROM shuffled_quiz_sets
            WHERE session_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SHUFFLED_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(set)
    }

    /// PostgreSQL 数组下标从 1 开始且闭区间，`[from + 1 : to]` 即 `[from, to)`，越界部分自动截断
    pub async fn get_window(&self, id: &str, from: i32, to: i32) -> Result<Option<Vec<String>>> {
        let window = sqlx::query_scalar::<_, Vec<String>>(
            r#"
            SELECT COALESCE(question_ids[$2 + 1 : $3], ARRAY[]::TEXT[])
            FROM shuffled_quiz_sets
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(window)
    }

    pub async fn list_by_study_plan_item(
        &self,
        study_plan_item_id: &str,
    ) -> Result<Vec<ShuffledQuizSet>> {
        let sets = sqlx::query_as::<_, ShuffledQuizSet>(&format!(
            r#"
            SELECT {}
            FROM shuffled_quiz_sets
            WHERE study_plan_item_id = $1 AND deleted_at IS NULL
            ORDER BY created_at
            "#,
            SHUFFLED_COLUMNS
        ))
        .bind(study_plan_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sets)
    }

    pub async fn update_total_correctness(&self, id: &str, total_correctness: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE shuffled_quiz_sets
            SET total_correctness = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(total_correctness)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ShuffledQuizSetRepositoryTrait for ShuffledQuizSetRepository {
    async fn create_shuffled_set(&self, set: &ShuffledQuizSet) -> Result<()> {
        self.create_shuffled_set(set).await
    }

    async fn get_shuffled_set(&self, id: &str) -> Result<Option<ShuffledQuizSet>> {
        self.get_shuffled_set(id).await
    }

    async fn get_by_session(&self, session_id: &str) -> Result<Option<ShuffledQuizSet>> {
        self.get_by_session(session_id).await
    }

    async fn get_window(&self, id: &str, from: i32, to: i32) -> Result<Option<Vec<String>>> {
        self.get_window(id, from, to).await
    }

    async fn list_by_study_plan_item(
        &self,
        study_plan_item_id: &str,
    ) -> Result<Vec<ShuffledQuizSet>> {
        self.list_by_study_plan_item(study_plan_item_id).await
    }

    async fn update_total_correctness(&self, id: &str, total_correctness: i32) -> Result<bool> {
        self.update_total_correctness(id, total_correctness).await
    }
}
