//! 测验引擎错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

/// 测验引擎错误类型
#[derive(Debug, Error)]
pub enum EngineError {
    // === 资源不存在 ===
    #[error("题集不存在: {0}")]
    QuizSetNotFound(String),

    #[error("乱序题集不存在: {0}")]
    ShuffledQuizSetNotFound(String),

    #[error("学习材料没有可用题集: {0}")]
    LearningMaterialHasNoQuizSet(String),

    #[error("进度记录不存在: student_id={student_id}, learning_material_id={learning_material_id}")]
    ProgressionNotFound {
        student_id: String,
        learning_material_id: String,
    },

    // === 数据一致性 ===
    #[error("数据一致性错误: {0}")]
    DataIntegrity(String),

    // === 请求错误 ===
    #[error("索引越界: index={index}, 有效范围 [0, {len})")]
    InvalidRange { index: i64, len: usize },

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("所有题目均已通过，无需重做: {0}")]
    AllQuestionsAccepted(String),

    // === 系统错误 ===
    /// 连接、超时、序列化冲突等可重放的存储故障
    #[error("存储暂时不可用: {0}")]
    TransientStorage(#[source] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("缓存错误: {0}")]
    Cache(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 测验引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// 是否可由调用方重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStorage(_) | Self::Cache(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QuizSetNotFound(_)
                | Self::ShuffledQuizSetNotFound(_)
                | Self::LearningMaterialHasNoQuizSet(_)
                | Self::ProgressionNotFound { .. }
        )
    }

    /// 获取错误码（用于批量结果和 CLI 输出）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QuizSetNotFound(_) => "QUIZ_SET_NOT_FOUND",
            Self::ShuffledQuizSetNotFound(_) => "SHUFFLED_QUIZ_SET_NOT_FOUND",
            Self::LearningMaterialHasNoQuizSet(_) => "LEARNING_MATERIAL_HAS_NO_QUIZ_SET",
            Self::ProgressionNotFound { .. } => "PROGRESSION_NOT_FOUND",
            Self::DataIntegrity(_) => "DATA_INTEGRITY",
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AllQuestionsAccepted(_) => "ALL_QUESTIONS_ACCEPTED",
            Self::TransientStorage(_) => "TRANSIENT_STORAGE",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// 可重放的 SQLSTATE：连接类 08、序列化失败、死锁、服务端关闭或过载
fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08")
        || matches!(
            code,
            "40001" | "40P01" | "53300" | "57P01" | "57P02" | "57P03"
        )
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;

        match err {
            E::Io(_)
            | E::Tls(_)
            | E::Protocol(_)
            | E::PoolTimedOut
            | E::PoolClosed
            | E::WorkerCrashed
            | E::BeginFailed => Self::TransientStorage(err),
            E::Database(ref db) if db.code().is_some_and(|c| is_transient_sqlstate(&c)) => {
                Self::TransientStorage(err)
            }
            E::RowNotFound
            | E::TypeNotFound { .. }
            | E::ColumnNotFound(_)
            | E::ColumnIndexOutOfBounds { .. }
            | E::ColumnDecode { .. }
            | E::Decode(_) => Self::DataIntegrity(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<quiz_shared::SharedError> for EngineError {
    fn from(err: quiz_shared::SharedError) -> Self {
        match err {
            quiz_shared::SharedError::Database(e) => e.into(),
            quiz_shared::SharedError::Redis(e) => Self::Cache(e.to_string()),
            quiz_shared::SharedError::CacheSerialization(e) => Self::Cache(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
