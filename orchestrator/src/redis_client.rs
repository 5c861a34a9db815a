use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AgentError;

#[derive(Clone)]
pub struct RedisClient {
    connection: ConnectionManager,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> Result<Self, AgentError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_tokio_connection_manager().await?;
        Ok(Self { connection })
    }

    /// Stores `value` as JSON under `field` of hash `key`.
    pub async fn hset_json<T: Serialize>(
        &self,
        key: &str,
        field: &str,
        value: &T,
    ) -> Result<(), AgentError> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection.clone();
        conn.hset::<_, _, _, ()>(key, field, json).await?;
        Ok(())
    }

    pub async fn hvals_json<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<Vec<T>, AgentError> {
        let mut conn = self.connection.clone();
        let raw: HashMap<String, String> = conn.hgetall(key).await?;
        raw.values()
            .map(|json| serde_json::from_str(json).map_err(AgentError::from))
            .collect()
    }
}
