//! 评分记录模型
//!
//! 三类提交（考试、闪卡、学习目标）的评分记录分表存放，查询时统一为同一形状

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::enums::{ExamSubmissionStatus, SubmissionKind};

/// 统一后的评分记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GradingRecord {
    pub shuffled_quiz_set_id: String,
    pub kind: SubmissionKind,
    /// 教师批改得分，仅考试型有
    pub graded_point: Option<i32>,
    /// 批改状态，仅考试型有
    pub exam_status: Option<ExamSubmissionStatus>,
    /// 闪卡和学习目标型的提交标记，考试型恒为 true
    pub is_submitted: bool,
}

impl GradingRecord {
    pub fn exam(
        shuffled_quiz_set_id: impl Into<String>,
        status: ExamSubmissionStatus,
        graded_point: Option<i32>,
    ) -> Self {
        Self {
            shuffled_quiz_set_id: shuffled_quiz_set_id.into(),
            kind: SubmissionKind::Exam,
            graded_point,
            exam_status: Some(status),
            is_submitted: true,
        }
    }

    pub fn flashcard(shuffled_quiz_set_id: impl Into<String>, is_submitted: bool) -> Self {
        Self {
            shuffled_quiz_set_id: shuffled_quiz_set_id.into(),
            kind: SubmissionKind::Flashcard,
            graded_point: None,
            exam_status: None,
            is_submitted,
        }
    }

    pub fn learning_objective(shuffled_quiz_set_id: impl Into<String>, is_submitted: bool) -> Self {
        Self {
            shuffled_quiz_set_id: shuffled_quiz_set_id.into(),
            kind: SubmissionKind::LearningObjective,
            graded_point: None,
            exam_status: None,
            is_submitted,
        }
    }

    /// 已发回学生的考试批改分数
    pub fn returned_point(&self) -> Option<i32> {
        match (self.kind, self.exam_status) {
            (SubmissionKind::Exam, Some(ExamSubmissionStatus::Returned)) => self.graded_point,
            _ => None,
        }
    }

    /// 未提交的闪卡或学习目标记录会使该次作答不计入最高分
    pub fn excludes_attempt(&self) -> bool {
        matches!(
            self.kind,
            SubmissionKind::Flashcard | SubmissionKind::LearningObjective
        ) && !self.is_submitted
    }
}
