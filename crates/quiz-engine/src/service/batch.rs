//! 批量执行
//!
//! 批量操作是一组相互独立的幂等操作：并发执行（上限可配），单项失败只记入该项结果，
//! 不影响其他项，结果顺序与输入一致。

use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use quiz_shared::observability::metrics;

use crate::error::Result;
use crate::service::dto::{BatchResult, ItemResult};

/// 并发执行一批操作并收集逐项结果
pub async fn run_batch<I, T, K, F, Fut>(
    operation: &'static str,
    items: Vec<I>,
    concurrency: usize,
    key_of: K,
    op: F,
) -> BatchResult<T>
where
    K: Fn(&I) -> String,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let tasks = items.into_iter().map(|item| {
        let key = key_of(&item);
        let fut = op(item);
        async move {
            match fut.await {
                Ok(data) => {
                    metrics::record_batch_item(operation, true);
                    ItemResult::success(key, data)
                }
                Err(e) => {
                    metrics::record_batch_item(operation, false);
                    warn!(operation, key = %key, error = %e, "批量操作单项失败");
                    ItemResult::failure(key, &e)
                }
            }
        }
    });

    let results: Vec<ItemResult<T>> = stream::iter(tasks)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let batch = BatchResult::from_results(results);
    info!(
        operation,
        total = batch.total,
        success = batch.success_count,
        failed = batch.failed_count,
        "批量操作完成"
    );
    batch
}
