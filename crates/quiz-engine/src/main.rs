//! 测验引擎命令行入口
//!
//! 提供数据库迁移、正确数批量重算和成绩查询等运维命令。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quiz_shared::{
    SharedError,
    cache::Cache,
    config::AppConfig,
    database::Database,
    observability,
    retry::{RetryPolicy, retry_with_policy},
};
use serde::Serialize;
use tracing::{info, warn};

use quiz_engine::{
    CorrectnessRecalculator, QuizSetStore, ScoreAggregator,
    repository::{
        GradingRepository, QuestionCatalogRepository, QuizSetRepository,
        ShuffledQuizSetRepository, SubmissionRepository,
    },
};

/// 测验引擎运维工具
#[derive(Parser, Debug)]
#[command(name = "quiz-engine")]
#[command(version, about = "乱序测验引擎运维工具")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 执行数据库迁移
    Migrate,

    /// 按答题流水重算乱序题集的正确数
    Recompute {
        /// 乱序题集 ID
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// 查询单次作答得分
    AttemptScore {
        /// 乱序题集 ID
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// 查询学习计划项的最高分
    HighestScore {
        /// 学习计划项 ID
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load("quiz-engine").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;
    info!(environment = %config.environment, "Configuration loaded");

    let db = retry_with_policy(
        &RetryPolicy::for_database(&config.database),
        "database_connect",
        SharedError::is_retryable,
        || Database::connect(&config.database),
    )
    .await?;
    info!("Database connection established");

    match cli.command {
        Commands::Migrate => {
            let version = db.run_migrations().await?;
            print_json(&serde_json::json!({ "schemaVersion": version }))?;
        }
        Commands::Recompute { ids } => {
            let pool = db.pool().clone();
            let recalculator = CorrectnessRecalculator::new(
                Arc::new(ShuffledQuizSetRepository::new(pool.clone())),
                Arc::new(SubmissionRepository::new(pool)),
            )
            .with_batch_concurrency(config.engine.batch_concurrency);

            print_json(&recalculator.batch_recompute(ids).await)?;
        }
        Commands::AttemptScore { ids } => {
            let aggregator = build_aggregator(&config, &db).await;
            for id in ids {
                match aggregator.attempt_score(&id).await {
                    Ok(score) => print_json(&score)?,
                    Err(e) => warn!(shuffled_quiz_set_id = %id, code = e.error_code(), error = %e, "Score calculation failed"),
                }
            }
        }
        Commands::HighestScore { ids } => {
            let aggregator = build_aggregator(&config, &db).await;
            print_json(&aggregator.highest_scores(ids).await)?;
        }
    }

    db.close().await;
    Ok(())
}

type PgScoreAggregator = ScoreAggregator<
    QuizSetRepository,
    QuestionCatalogRepository,
    ShuffledQuizSetRepository,
    SubmissionRepository,
    GradingRepository,
>;

async fn build_aggregator(config: &AppConfig, db: &Database) -> PgScoreAggregator {
    let pool = db.pool().clone();
    let quiz_sets = Arc::new(QuizSetStore::new(
        Arc::new(QuizSetRepository::new(pool.clone())),
        Arc::new(QuestionCatalogRepository::new(pool.clone())),
    ));
    let aggregator = ScoreAggregator::new(
        quiz_sets,
        Arc::new(ShuffledQuizSetRepository::new(pool.clone())),
        Arc::new(SubmissionRepository::new(pool.clone())),
        Arc::new(GradingRepository::new(pool)),
    )
    .with_batch_concurrency(config.engine.batch_concurrency);

    match connect_cache(config).await {
        Some(cache) => aggregator.with_cache(
            cache,
            Duration::from_secs(config.engine.score_cache_ttl_seconds),
        ),
        None => aggregator,
    }
}

/// Redis 不可用时不启用缓存，直接计算
async fn connect_cache(config: &AppConfig) -> Option<Arc<Cache>> {
    if !config.redis.is_enabled() || !config.engine.score_cache_enabled {
        return None;
    }

    match Cache::connect(&config.redis).await {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, score cache disabled");
            None
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_recompute() {
        let cli = Cli::try_parse_from(["quiz-engine", "recompute", "sqs-1", "sqs-2"]).unwrap();
        match cli.command {
            Commands::Recompute { ids } => assert_eq!(ids, vec!["sqs-1", "sqs-2"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_ids() {
        assert!(Cli::try_parse_from(["quiz-engine", "highest-score"]).is_err());
        assert!(Cli::try_parse_from(["quiz-engine", "migrate"]).is_ok());
    }
}
