//! Redis 缓存模块
//!
//! JSON 值缓存，所有键自动加上 `quiz:` 命名空间。连接在创建时建立并复用
//! （多路复用连接，克隆开销很小）。

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument};

use crate::config::RedisConfig;
use crate::error::Result;

const KEY_NAMESPACE: &str = "quiz";

/// 带命名空间的缓存键
pub fn namespaced_key(key: &str) -> String {
    format!("{}:{}", KEY_NAMESPACE, key)
}

/// Redis 缓存客户端
#[derive(Clone)]
pub struct Cache {
    conn: MultiplexedConnection,
}

impl Cache {
    /// 建立连接并 PING 确认可用
    #[instrument(skip(config))]
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;

        info!("Redis connection established");
        Ok(Self { conn })
    }

    /// 读取并反序列化，键不存在时为 `None`
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(namespaced_key(key)).await?;
        raw.map(|v| serde_json::from_str(&v))
            .transpose()
            .map_err(Into::into)
    }

    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.conn.clone();
        // TTL 至少 1 秒，SETEX 不接受 0
        let _: () = conn
            .set_ex(namespaced_key(key), payload, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    /// 使缓存失效，键不存在也视为成功
    #[instrument(skip(self))]
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(namespaced_key(key)).await?;
        debug!(removed, "Cache entry invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced_key("highest_score:spi-1"), "quiz:highest_score:spi-1");
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let config = RedisConfig {
            url: "not-a-redis-url".to_string(),
        };
        assert!(Cache::connect(&config).await.is_err());
    }

    #[tokio::test]
    #[ignore] // 需要 Redis 连接
    async fn test_set_get_invalidate() {
        let cache = Cache::connect(&crate::test_utils::test_redis_config())
            .await
            .unwrap();
        let key = crate::test_utils::test_id("test:cache");

        cache
            .set(&key, &Some(42.5_f64), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(cache.get::<Option<f64>>(&key).await.unwrap(), Some(Some(42.5)));

        cache.invalidate(&key).await.unwrap();
        cache.invalidate(&key).await.unwrap();
        assert_eq!(cache.get::<Option<f64>>(&key).await.unwrap(), None);
    }
}
