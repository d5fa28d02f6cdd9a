//! 仓储 Trait 定义
//!
//! 服务层依赖这些接口而非具体实现，便于 mock 测试和内存实现

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    GradingRecord, NewSubmission, ProgressionKey, QuizProgression, QuizSet, ShuffledQuizSet,
    SubmissionHistoryEntry,
};

/// 原始题集仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizSetRepositoryTrait: Send + Sync {
    /// 按 ID 获取，包含已软删除的版本（仍被旧作答引用）
    async fn get_quiz_set(&self, id: &str) -> Result<Option<QuizSet>>;
    async fn get_live_by_learning_material(&self, learning_material_id: &str)
    -> Result<Option<QuizSet>>;
    /// 软删除学习材料当前的题集并写入新版本
    async fn replace_quiz_set(&self, quiz_set: &QuizSet) -> Result<()>;
}

/// 题库分值接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionCatalogTrait: Send + Sync {
    /// 返回存在于题库中的题目分值，缺失的题目不出现在结果中
    async fn point_values(&self, question_ids: &[String]) -> Result<HashMap<String, i32>>;
}

/// 乱序题集仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShuffledQuizSetRepositoryTrait: Send + Sync {
    async fn create_shuffled_set(&self, set: &ShuffledQuizSet) -> Result<()>;
    async fn get_shuffled_set(&self, id: &str) -> Result<Option<ShuffledQuizSet>>;
    async fn get_by_session(&self, session_id: &str) -> Result<Option<ShuffledQuizSet>>;
    /// 乱序顺序的 `[from, to)` 片段，调用方保证 0 <= from
    async fn get_window(&self, id: &str, from: i32, to: i32) -> Result<Option<Vec<String>>>;
    async fn list_by_study_plan_item(&self, study_plan_item_id: &str)
    -> Result<Vec<ShuffledQuizSet>>;
    /// 返回是否命中一条有效记录
    async fn update_total_correctness(&self, id: &str, total_correctness: i32) -> Result<bool>;
}

/// 答题流水仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionRepositoryTrait: Send + Sync {
    /// 追加一条流水，返回插入序号；题集不存在或已删除时返回 None 且不写入
    async fn append(&self, shuffled_quiz_set_id: &str, entry: &NewSubmission)
    -> Result<Option<i64>>;
    /// 按插入顺序返回全部流水
    async fn list_entries(&self, shuffled_quiz_set_id: &str) -> Result<Vec<SubmissionHistoryEntry>>;
}

/// 评分记录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GradingRepositoryTrait: Send + Sync {
    async fn list_grading_records(&self, shuffled_quiz_set_ids: &[String])
    -> Result<Vec<GradingRecord>>;
}

/// 作答进度仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressionRepositoryTrait: Send + Sync {
    async fn upsert_progression(&self, progression: &QuizProgression) -> Result<QuizProgression>;
    async fn get_progression(&self, key: &ProgressionKey) -> Result<Option<QuizProgression>>;
}
