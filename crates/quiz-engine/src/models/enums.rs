//! 测验引擎枚举类型定义
//!
//! 所有持久化枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 提交类型
///
/// 三类学习材料共用乱序题集和答题流水，但评分记录分表存放
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionKind {
    /// 考试型
    Exam,
    /// 闪卡型
    Flashcard,
    /// 学习目标型
    LearningObjective,
}

/// 考试提交的批改状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamSubmissionStatus {
    #[default]
    NotMarked,
    InProgress,
    Marked,
    /// 已发回学生，只有此状态的批改分数才计入成绩
    Returned,
}

/// 单次作答的状态
///
/// 只会向前推进：Created -> InProgress -> Completed -> Graded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    /// 已创建，尚无答题记录
    Created,
    /// 至少有一条答题记录，但未答完
    InProgress,
    /// 每道题都至少有一条答题记录
    Completed,
    /// 已关联评分记录
    Graded,
}

/// 得分来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreSource {
    /// 教师批改分数
    Graded,
    /// 由答题流水推导
    Ledger,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graded => "graded",
            Self::Ledger => "ledger",
        }
    }
}
