//! 得分结果模型（按需计算，不落库）

use serde::{Deserialize, Serialize};

use super::enums::ScoreSource;

/// 单次作答得分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub shuffled_quiz_set_id: String,
    /// 百分比，范围 [0, 100]
    pub percentage: f64,
    pub numerator: i64,
    /// 原始题集的总分，与本次作答无关
    pub denominator: i64,
    pub source: ScoreSource,
    /// 未提交的闪卡或学习目标作答不参与最高分
    pub eligible: bool,
}

/// 学习计划项的最高分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighestScore {
    pub study_plan_item_id: String,
    pub percentage: f64,
    /// 取得最高分的那次作答
    pub shuffled_quiz_set_id: String,
    /// 参与比较的作答次数
    pub attempts: usize,
}
