//! 题库分值仓储

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::QuestionCatalogTrait;
use crate::error::Result;

pub struct QuestionCatalogRepository {
    pool: PgPool,
}

impl QuestionCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn point_values(&self, question_ids: &[String]) -> Result<HashMap<String, i32>> {
        let rows = sqlx::query_as::<_, (String, i32)>(
            r#"
            SELECT question_id, point
            FROM quiz_questions
            WHERE question_id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// 写入或更新题目分值
    pub async fn upsert_point(&self, question_id: &str, point: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_questions (question_id, point)
            VALUES ($1, $2)
            ON CONFLICT (question_id)
            DO UPDATE SET point = EXCLUDED.point, deleted_at = NULL, updated_at = NOW()
            "#,
        )
        .bind(question_id)
        .bind(point)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl QuestionCatalogTrait for QuestionCatalogRepository {
    async fn point_values(&self, question_ids: &[String]) -> Result<HashMap<String, i32>> {
        self.point_values(question_ids).await
    }
}
