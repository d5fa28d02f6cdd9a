//! 原始题集模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 原始题集
///
/// 学习材料下有序且去重的题目 ID 列表。重新创建时旧题集被软删除，
/// 被乱序题集引用后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizSet {
    pub id: String,
    pub learning_material_id: String,
    pub question_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl QuizSet {
    pub fn new(id: String, learning_material_id: String, question_ids: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            learning_material_id,
            question_ids,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn len(&self) -> usize {
        self.question_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.question_ids.is_empty()
    }
}
