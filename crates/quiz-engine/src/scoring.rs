//! 评分计算
//!
//! 得分 = 分子 / 原始题集总分 * 100。分子优先取已发回的教师批改分，否则取流水中
//! 最新记录被认可的题目分值之和。

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::ledger::LatestEntries;
use crate::models::{GradingRecord, ScoreResult};

/// 单次作答的评分依据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptGrading {
    /// 使用教师批改分
    Graded(i32),
    /// 回退到流水推导
    Ledger,
    /// 不参与最高分
    Excluded,
}

/// 从该次作答的评分记录中确定评分依据
pub fn resolve_grading(records: &[GradingRecord]) -> AttemptGrading {
    if records.iter().any(GradingRecord::excludes_attempt) {
        return AttemptGrading::Excluded;
    }

    records
        .iter()
        .filter_map(GradingRecord::returned_point)
        .max()
        .map_or(AttemptGrading::Ledger, AttemptGrading::Graded)
}

/// 百分比，分母为 0 时为 0，结果截断到 [0, 100]
pub fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64 * 100.0).clamp(0.0, 100.0)
}

/// 题目分值之和，题库中缺少任何一题都是数据一致性错误
pub fn sum_points<'a, I>(question_ids: I, points: &HashMap<String, i32>) -> Result<i64>
where
    I: IntoIterator<Item = &'a String>,
{
    question_ids.into_iter().try_fold(0_i64, |acc, id| {
        points
            .get(id)
            .map(|p| acc + i64::from(*p))
            .ok_or_else(|| EngineError::DataIntegrity(format!("question {} has no catalog entry", id)))
    })
}

/// 流水推导的分子：顺序中最新记录被认可的题目分值之和
pub fn ledger_points(
    ordering: &[String],
    latest: &LatestEntries,
    points: &HashMap<String, i32>,
) -> Result<i64> {
    let accepted = ordering
        .iter()
        .filter(|id| latest.get(*id).is_some_and(|entry| entry.accepted));
    sum_points(accepted, points)
}

/// 多次作答取最高分（不是平均或最近一次），不参与比较的作答被忽略
pub fn highest(scores: &[ScoreResult]) -> Option<&ScoreResult> {
    scores
        .iter()
        .filter(|s| s.eligible)
        .max_by(|a, b| a.percentage.total_cmp(&b.percentage))
}
