//! 退避重试
//!
//! 只用于基础设施层的瞬时故障（建连、连接池耗尽）。引擎的业务操作不做内部重试，
//! 存储错误原样上抛，由调用方决定是否重放。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 指数退避策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 首次执行之外的最多重试次数
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 启动建连用的策略，重试次数取自配置
    pub fn for_database(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.connect_retries,
            ..Self::default()
        }
    }

    /// 依次产出每次重试前的等待时间，长度等于 `max_retries`
    pub fn backoff(&self) -> impl Iterator<Item = Duration> + '_ {
        let cap = self.max_delay.as_secs_f64();
        (0..self.max_retries).map(move |n| {
            let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(n as i32);
            Duration::from_secs_f64(secs.min(cap))
        })
    }
}

/// 执行 `operation`，遇到 `is_retryable` 认可的错误时按策略退避后重试
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut delays = policy.backoff();
    let mut retries = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!(operation = operation_name, retries, "Recovered after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }
        let Some(delay) = delays.next() else {
            warn!(operation = operation_name, retries, error = %err, "Retries exhausted");
            return Err(err);
        };

        retries += 1;
        warn!(
            operation = operation_name,
            retry = retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient failure, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
