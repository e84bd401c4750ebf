use crate::error::{LimitsError, LimitsResult};
use crate::store::ClassStore;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Redis-backed class store.
pub struct RedisClient {
    client: Client,
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
}

impl RedisClient {
    pub fn new(redis_url: &str) -> LimitsResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| LimitsError::Redis(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a client and establish its connection.
    pub async fn connect_to(redis_url: &str) -> LimitsResult<Self> {
        let client = Self::new(redis_url)?;
        client.connect().await?;
        Ok(client)
    }

    pub async fn connect(&self) -> LimitsResult<()> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| LimitsError::Redis(format!("Failed to connect to Redis: {}", e)))?;

        *self.connection.write().await = Some(conn);
        debug!("Connected to Redis");

        Ok(())
    }

    async fn conn(&self) -> LimitsResult<MultiplexedConnection> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| LimitsError::Redis("No Redis connection available".into()))
    }

    pub async fn ping(&self) -> LimitsResult<String> {
        let mut conn = self.conn().await?;
        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        result.map_err(|e| LimitsError::Redis(format!("Ping failed: {}", e)))
    }
}

#[async_trait]
impl ClassStore for RedisClient {
    async fn get(&self, key: &str) -> LimitsResult<Option<String>> {
        let mut conn = self.conn().await?;
        let result: RedisResult<Option<String>> =
            redis::cmd("GET").arg(key).query_async(&mut conn).await;
        result.map_err(|e| LimitsError::Redis(format!("GET failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str) -> LimitsResult<()> {
        let mut conn = self.conn().await?;
        let result: RedisResult<()> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await;
        result.map_err(|e| LimitsError::Redis(format!("SET failed: {}", e)))
    }

    async fn delete(&self, key: &str) -> LimitsResult<bool> {
        let mut conn = self.conn().await?;
        let result: RedisResult<i32> = redis::cmd("DEL").arg(key).query_async(&mut conn).await;
        result
            .map(|deleted_count| deleted_count > 0)
            .map_err(|e| LimitsError::Redis(format!("DEL failed: {}", e)))
    }
}
