//! 乱序题集模型

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{EngineError, Result};

/// 随机种子
///
/// 以十进制文本持久化，相同种子和相同原始顺序总能还原出相同排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RandomSeed(pub i64);

impl RandomSeed {
    /// 生成新的随机种子
    pub fn generate() -> Self {
        Self(rand::random::<i64>())
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RandomSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RandomSeed {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl From<i64> for RandomSeed {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// 乱序题集（单次作答）
///
/// 学生专属的原始题集排列。创建后题目顺序和种子都不再改变，
/// 只有答题流水追加和正确数重算会更新它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShuffledQuizSet {
    pub id: String,
    pub original_quiz_set_id: String,
    /// 重做时指向上一次作答
    pub original_shuffled_quiz_set_id: Option<String>,
    pub student_id: String,
    pub study_plan_id: String,
    pub learning_material_id: String,
    pub study_plan_item_id: Option<String>,
    pub session_id: Option<String>,
    pub question_ids: Vec<String>,
    pub random_seed: String,
    pub total_correctness: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShuffledQuizSet {
    /// 解析持久化的种子
    pub fn seed(&self) -> Result<RandomSeed> {
        self.random_seed.parse().map_err(|_| {
            EngineError::DataIntegrity(format!(
                "shuffled quiz set {} has malformed seed {:?}",
                self.id, self.random_seed
            ))
        })
    }

    /// 题目在乱序顺序中的位置（从 0 开始）
    pub fn position_of(&self, question_id: &str) -> Option<usize> {
        self.question_ids.iter().position(|id| id == question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.position_of(question_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.question_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.question_ids.is_empty()
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}
