//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出，在 metrics_port 上暴露 `/metrics`
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_quiz_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn register_quiz_metrics(service_name: &str) {
    metrics::describe_counter!(
        "quiz_shuffled_sets_created_total",
        "Total number of shuffled quiz sets created"
    );
    metrics::describe_counter!(
        "quiz_ledger_appends_total",
        "Total number of answers appended to the submission ledger"
    );
    metrics::describe_counter!(
        "quiz_correctness_recomputes_total",
        "Total number of correctness recomputations"
    );
    metrics::describe_histogram!(
        "quiz_correctness_recompute_duration_seconds",
        "Correctness recomputation duration in seconds"
    );
    metrics::describe_counter!(
        "quiz_score_calculations_total",
        "Total number of attempt score calculations"
    );
    metrics::describe_histogram!(
        "quiz_score_calculation_duration_seconds",
        "Highest score calculation duration in seconds"
    );
    metrics::describe_counter!(
        "quiz_batch_items_total",
        "Total number of items processed by batch operations"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录乱序题集创建
#[inline]
pub fn record_shuffled_set_created(retry: bool) {
    metrics::counter!(
        "quiz_shuffled_sets_created_total",
        "retry" => retry.to_string()
    )
    .increment(1);
}

/// 记录答题追加
#[inline]
pub fn record_ledger_append(correct: bool, accepted: bool) {
    metrics::counter!(
        "quiz_ledger_appends_total",
        "correct" => correct.to_string(),
        "accepted" => accepted.to_string()
    )
    .increment(1);
}

/// 记录正确数重算
#[inline]
pub fn record_correctness_recompute(status: &str, duration_secs: f64) {
    metrics::counter!(
        "quiz_correctness_recomputes_total",
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("quiz_correctness_recompute_duration_seconds").record(duration_secs);
}

/// 记录单次作答得分计算，source 为 graded 或 ledger
#[inline]
pub fn record_score_calculation(source: &str) {
    metrics::counter!(
        "quiz_score_calculations_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// 记录最高分查询耗时
#[inline]
pub fn record_highest_score_duration(cache_hit: bool, duration_secs: f64) {
    metrics::histogram!(
        "quiz_score_calculation_duration_seconds",
        "cache_hit" => cache_hit.to_string()
    )
    .record(duration_secs);
}

/// 记录批量操作中的单项结果
#[inline]
pub fn record_batch_item(operation: &str, success: bool) {
    metrics::counter!(
        "quiz_batch_items_total",
        "operation" => operation.to_string(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 未安装 recorder 时也不应 panic
        record_shuffled_set_created(false);
        record_ledger_append(true, false);
        record_correctness_recompute("success", 0.01);
        record_score_calculation("graded");
        record_highest_score_duration(true, 0.002);
        record_batch_item("recompute", false);
    }
}
