//! 数据库连接管理模块
//!
//! PostgreSQL 连接池、编译期嵌入的迁移脚本和 schema 版本查询。

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::Result;

/// 工作区根目录 migrations/ 下的迁移脚本
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// 按配置构建连接池参数
fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

impl Database {
    /// 创建数据库连接池并确认可用
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = pool_options(config).connect(&config.url).await?;
        let db = Self { pool };
        db.health_check().await?;

        info!("Database connection pool created");
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// 应用尚未执行的迁移，返回当前 schema 版本
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<Option<i64>> {
        MIGRATOR.run(&self.pool).await?;
        let version = self.schema_version().await?;
        info!(?version, "Database migrations applied");
        Ok(version)
    }

    /// 已成功执行的最新迁移版本，未迁移时为 `None`
    pub async fn schema_version(&self) -> Result<Option<i64>> {
        let exists: bool = sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let version = sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_clamp_min_connections() {
        let config = DatabaseConfig {
            max_connections: 2,
            min_connections: 5,
            ..DatabaseConfig::default()
        };
        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 2);
        assert_eq!(options.get_min_connections(), 2);
    }

    #[test]
    fn test_migrator_embeds_schema() {
        assert!(MIGRATOR.iter().count() >= 1);
    }

    #[tokio::test]
    #[ignore] // 需要数据库连接
    async fn test_connect_and_migrate() {
        let db = Database::connect(&crate::test_utils::test_database_config())
            .await
            .unwrap();
        let version = db.run_migrations().await.unwrap();
        assert!(version.is_some());
        assert_eq!(db.schema_version().await.unwrap(), version);
        db.close().await;
    }
}
