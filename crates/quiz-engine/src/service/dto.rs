//! 服务层数据传输对象

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{ProgressionKey, SubmissionHistoryEntry};

// ==================== 乱序题集 ====================

/// 创建乱序题集请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShuffledSetRequest {
    pub student_id: String,
    pub study_plan_id: String,
    pub learning_material_id: String,
    /// 为空时按学习材料查找当前有效题集
    pub original_quiz_set_id: Option<String>,
    pub study_plan_item_id: Option<String>,
    /// 同一会话重复进入时返回已有题集
    pub session_id: Option<String>,
    /// 为空时由引擎生成
    pub seed: Option<i64>,
    /// 保持原始顺序（仍然生成并保存种子）
    #[serde(default)]
    pub keep_order: bool,
}

impl CreateShuffledSetRequest {
    pub fn new(
        student_id: impl Into<String>,
        study_plan_id: impl Into<String>,
        learning_material_id: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            study_plan_id: study_plan_id.into(),
            learning_material_id: learning_material_id.into(),
            original_quiz_set_id: None,
            study_plan_item_id: None,
            session_id: None,
            seed: None,
            keep_order: false,
        }
    }

    pub fn with_original(mut self, quiz_set_id: impl Into<String>) -> Self {
        self.original_quiz_set_id = Some(quiz_set_id.into());
        self
    }

    pub fn with_study_plan_item(mut self, study_plan_item_id: impl Into<String>) -> Self {
        self.study_plan_item_id = Some(study_plan_item_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn keep_order(mut self) -> Self {
        self.keep_order = true;
        self
    }
}

// ==================== 答题流水 ====================

/// 答题历史中的一个位置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionHistoryItem {
    /// 在乱序顺序中的位置（从 0 开始）
    pub position: usize,
    pub question_id: String,
    /// 该题最新一条流水，未作答时为空
    pub latest: Option<SubmissionHistoryEntry>,
}

/// 分页的答题历史
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionHistoryPage {
    pub shuffled_quiz_set_id: String,
    pub total_questions: usize,
    pub items: Vec<SubmissionHistoryItem>,
}

/// 正确数重算结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectnessSummary {
    pub shuffled_quiz_set_id: String,
    pub total_correctness: i32,
    pub answered: usize,
    pub total_questions: usize,
    pub is_complete: bool,
}

// ==================== 作答进度 ====================

/// 进度窗口请求，`to` 为空时取默认窗口大小
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRequest {
    pub from: i64,
    pub to: Option<i64>,
}

/// 写入进度请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProgressionRequest {
    #[serde(flatten)]
    pub key: ProgressionKey,
    pub shuffled_quiz_set_id: String,
    pub last_index: i32,
    pub window: Option<WindowRequest>,
}

// ==================== 批量操作 ====================

/// 批量操作中单项的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult<T> {
    /// 输入项的标识（如乱序题集 ID）
    pub key: String,
    pub success: bool,
    pub data: Option<T>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl<T> ItemResult<T> {
    pub fn success(key: String, data: T) -> Self {
        Self {
            key,
            success: true,
            data: Some(data),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(key: String, error: &EngineError) -> Self {
        Self {
            key,
            success: false,
            data: None,
            error_code: Some(error.error_code().to_string()),
            error_message: Some(error.to_string()),
        }
    }
}

/// 批量操作结果，`results` 与输入顺序一致
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T> {
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub results: Vec<ItemResult<T>>,
}

impl<T> BatchResult<T> {
    pub fn from_results(results: Vec<ItemResult<T>>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            success_count,
            failed_count: results.len() - success_count,
            results,
        }
    }
}
