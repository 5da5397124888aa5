use std::env;

use redis::{AsyncCommands, Client};

use crate::blob::{BlobError, BlobStore};

pub fn get_redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string())
}

/// Blob store backed by plain Redis string values.
pub struct RedisBlobs {
    client: Client,
}

impl RedisBlobs {
    pub fn open(url: &str) -> Result<Self, BlobError> {
        Ok(Self {
            client: Client::open(url)?,
        })
    }

    pub fn from_env() -> Result<Self, BlobError> {
        Self::open(&get_redis_url())
    }
}

impl BlobStore for RedisBlobs {
    fn location(&self) -> String {
        format!("redis://{}", self.client.get_connection_info().addr)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let mut con = self.client.get_async_connection().await?;
        let data: Option<Vec<u8>> = con.get(key).await?;
        Ok(data)
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), BlobError> {
        let mut con = self.client.get_async_connection().await?;
        con.set::<_, _, ()>(key, body).await?;
        Ok(())
    }
}
