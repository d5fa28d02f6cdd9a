//! 原始题集仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::QuizSetRepositoryTrait;
use crate::error::Result;
use crate::models::QuizSet;

const QUIZ_SET_COLUMNS: &str =
    "id, learning_material_id, question_ids, created_at, updated_at, deleted_at";

/// 原始题集仓储
pub struct QuizSetRepository {
    pool: PgPool,
}

impl QuizSetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_quiz_set(&self, id: &str) -> Result<Option<QuizSet>> {
        let quiz_set = sqlx::query_as::<_, QuizSet>(&format!(
            "SELECT {} FROM quiz_sets WHERE id = $1",
            QUIZ_SET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz_set)
    }

    pub async fn get_live_by_learning_material(
        &self,
        learning_material_id: &str,
    ) -> Result<Option<QuizSet>> {
        let quiz_set = sqlx::query_as::<_, QuizSet>(&format!(
            r#"
            SELECT {}
            FROM quiz_sets
            WHERE learning_material_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            QUIZ_SET_COLUMNS
        ))
        .bind(learning_material_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz_set)
    }

    /// 在同一事务中软删除旧版本并插入新版本
    pub async fn replace_quiz_set(&self, quiz_set: &QuizSet) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE quiz_sets
            SET deleted_at = $2, updated_at = $2
            WHERE learning_material_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(&quiz_set.learning_material_id)
        .bind(quiz_set.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO quiz_sets (id, learning_material_id, question_ids, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&quiz_set.id)
        .bind(&quiz_set.learning_material_id)
        .bind(&quiz_set.question_ids)
        .bind(quiz_set.created_at)
        .bind(quiz_set.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl QuizSetRepositoryTrait for QuizSetRepository {
    async fn get_quiz_set(&self, id: &str) -> Result<Option<QuizSet>> {
        self.get_quiz_set(id).await
    }

    async fn get_live_by_learning_material(
        &self,
        learning_material_id: &str,
    ) -> Result<Option<QuizSet>> {
        self.get_live_by_learning_material(learning_material_id)
            .await
    }

    async fn replace_quiz_set(&self, quiz_set: &QuizSet) -> Result<()> {
        self.replace_quiz_set(quiz_set).await
    }
}
