//! 服务层
//!
//! 实现测验业务逻辑，协调仓储层和缓存层。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `batch`: 批量执行（逐项结果，保持输入顺序）
//! - `quiz_set_store`: 原始题集管理
//! - `shuffle_engine`: 乱序题集生成与窗口读取
//! - `submission_ledger`: 答题流水
//! - `correctness`: 正确数重算
//! - `score_aggregator`: 单次得分与最高分
//! - `progression_service`: 作答进度

pub mod batch;
pub mod correctness;
pub mod dto;
pub mod progression_service;
pub mod quiz_set_store;
pub mod score_aggregator;
pub mod shuffle_engine;
pub mod submission_ledger;

pub use correctness::CorrectnessRecalculator;
pub use dto::*;
pub use progression_service::ProgressionService;
pub use quiz_set_store::QuizSetStore;
pub use score_aggregator::ScoreAggregator;
pub use shuffle_engine::ShuffleEngine;
pub use submission_ledger::SubmissionLedger;
