//! 共享库
//!
//! 包含测验服务共用的配置、错误处理、数据库连接、缓存、重试与可观测性等基础设施代码。

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;
pub mod test_utils;

pub use error::{Result, SharedError};
