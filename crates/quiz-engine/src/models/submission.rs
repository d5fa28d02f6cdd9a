//! 答题流水模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 答题流水条目
///
/// 只追加、不修改。同一题目可以有多条记录，时间戳最新的一条生效，
/// 时间戳相同时 seq 较大者生效。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionHistoryEntry {
    /// 插入序号
    pub seq: i64,
    pub shuffled_quiz_set_id: String,
    pub question_id: String,
    pub correct: bool,
    /// 教师认可（可覆盖判题结果）
    pub accepted: bool,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionHistoryEntry {
    /// 排序键：先比较时间戳，再比较插入序号
    pub fn recency_key(&self) -> (DateTime<Utc>, i64) {
        (self.submitted_at, self.seq)
    }
}

/// 待追加的答题记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub question_id: String,
    pub correct: bool,
    pub accepted: bool,
    pub submitted_at: DateTime<Utc>,
}

impl NewSubmission {
    pub fn new(question_id: impl Into<String>, correct: bool, accepted: bool) -> Self {
        Self {
            question_id: question_id.into(),
            correct,
            accepted,
            submitted_at: Utc::now(),
        }
    }

    pub fn at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = submitted_at;
        self
    }
}
