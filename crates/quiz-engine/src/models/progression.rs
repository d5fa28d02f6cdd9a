//! 作答进度模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 进度记录的唯一键：(学生, 学习计划, 学习材料)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionKey {
    pub student_id: String,
    pub study_plan_id: String,
    pub learning_material_id: String,
}

impl ProgressionKey {
    pub fn new(
        student_id: impl Into<String>,
        study_plan_id: impl Into<String>,
        learning_material_id: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            study_plan_id: study_plan_id.into(),
            learning_material_id: learning_material_id.into(),
        }
    }
}

/// 作答进度
///
/// 每个键只有一条有效记录，每次更新整体替换，不保留历史
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizProgression {
    pub student_id: String,
    pub study_plan_id: String,
    pub learning_material_id: String,
    pub shuffled_quiz_set_id: String,
    pub last_index: i32,
    /// 题目窗口 `[window_from, window_to)`，不存窗口时均为空
    pub window_from: Option<i32>,
    pub window_to: Option<i32>,
    pub window_question_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizProgression {
    pub fn key(&self) -> ProgressionKey {
        ProgressionKey::new(
            self.student_id.clone(),
            self.study_plan_id.clone(),
            self.learning_material_id.clone(),
        )
    }
}
