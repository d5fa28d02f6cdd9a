//! 数据库仓储层
//!
//! 显式的结构体与行映射（`sqlx::FromRow`），SQL 直接写在仓储方法里。
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 事务控制仅用于单个聚合内部（题集换版）
//! - 定义 trait 接口以支持 mock 测试

mod grading_repo;
mod progression_repo;
mod question_catalog_repo;
mod quiz_set_repo;
mod shuffled_quiz_set_repo;
mod submission_repo;
mod traits;

pub use grading_repo::GradingRepository;
pub use progression_repo::ProgressionRepository;
pub use question_catalog_repo::QuestionCatalogRepository;
pub use quiz_set_repo::QuizSetRepository;
pub use shuffled_quiz_set_repo::ShuffledQuizSetRepository;
pub use submission_repo::SubmissionRepository;
pub use traits::*;
