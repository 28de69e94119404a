use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::Store;

#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { connection })
    }
}

impl Store for RedisStore {
    async fn get(&mut self, key: &str) -> crate::ApiResult<Option<String>> {
        let value: Option<String> = self.connection.get(key).await?;
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: String) -> crate::ApiResult<()> {
        self.connection.set::<_, _, ()>(key, value).await?;
        Ok(())
    }
}
