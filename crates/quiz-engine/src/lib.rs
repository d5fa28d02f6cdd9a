//! 测验引擎
//!
//! 为学生生成乱序题集，记录答题流水，并据此计算正确数、得分和最高分。
//!
//! ## 核心功能
//!
//! - **乱序题集**：按种子确定性打乱原始题集，支持重做未通过的题目
//! - **答题流水**：只追加的答题记录，同一题目以最新一条为准
//! - **正确数重算**：由流水推导并写回 `total_correctness`
//! - **成绩聚合**：批改分数优先，否则由流水推导；最高分取最大值
//! - **作答进度**：断点续答的位置和题目窗口
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `shuffle`: 乱序算法
//! - `ledger`: 流水归并规则
//! - `scoring`: 评分规则
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层

pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod scoring;
pub mod service;
pub mod shuffle;

pub use error::{EngineError, Result};
pub use models::*;
pub use repository::{
    GradingRepository, ProgressionRepository, QuestionCatalogRepository, QuizSetRepository,
    ShuffledQuizSetRepository, SubmissionRepository,
};
pub use service::{
    CorrectnessRecalculator, ProgressionService, QuizSetStore, ScoreAggregator, ShuffleEngine,
    SubmissionLedger, dto,
};
