use tracing::{info, warn};

use crate::config::{self, StorageKind};

pub mod file;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod sql;

pub use self::file::FileStore;
pub use self::memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use self::sql::SqlStore;

/// A key-value store holding serialized records.
pub trait Store {
    /// Get a value by key, `None` if the key is absent.
    async fn get(&mut self, key: &str) -> crate::ApiResult<Option<String>>;

    /// Store a value by key, replacing any previous value.
    async fn set(&mut self, key: &str, value: String) -> crate::ApiResult<()>;
}

#[derive(Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    File(FileStore),
    Sql(SqlStore),
    #[cfg(feature = "redis")]
    Redis(RedisStore),
}

impl AnyStore {
    /// Open the backend selected by the storage configuration.
    pub async fn open(config: &config::Storage) -> anyhow::Result<Self> {
        let store = match config.kind {
            StorageKind::Memory => {
                warn!("using in-memory storage, pastes will not survive a restart");
                MemoryStore::default().into()
            }
            StorageKind::File => {
                info!("using file storage in {}", config.file.dir.display());
                FileStore::new(&config.file.dir).await?.into()
            }
            StorageKind::Sql => {
                info!("using sql storage");
                SqlStore::connect(&config.sql.url).await?.into()
            }
            #[cfg(feature = "redis")]
            StorageKind::Redis => {
                info!("using redis storage");
                RedisStore::connect(&config.redis.url).await?.into()
            }
        };
        Ok(store)
    }
}

impl Store for AnyStore {
    async fn get(&mut self, key: &str) -> crate::ApiResult<Option<String>> {
        match self {
            AnyStore::Memory(memory) => memory.get(key).await,
            AnyStore::File(file) => file.get(key).await,
            AnyStore::Sql(sql) => sql.get(key).await,
            #[cfg(feature = "redis")]
            AnyStore::Redis(redis) => redis.get(key).await,
        }
    }

    async fn set(&mut self, key: &str, value: String) -> crate::ApiResult<()> {
        match self {
            AnyStore::Memory(memory) => memory.set(key, value).await,
            AnyStore::File(file) => file.set(key, value).await,
            AnyStore::Sql(sql) => sql.set(key, value).await,
            #[cfg(feature = "redis")]
            AnyStore::Redis(redis) => redis.set(key, value).await,
        }
    }
}

impl From<MemoryStore> for AnyStore {
    fn from(value: MemoryStore) -> Self {
        AnyStore::Memory(value)
    }
}

impl From<FileStore> for AnyStore {
    fn from(value: FileStore) -> Self {
        AnyStore::File(value)
    }
}

impl From<SqlStore> for AnyStore {
    fn from(value: SqlStore) -> Self {
        AnyStore::Sql(value)
    }
}

#[cfg(feature = "redis")]
impl From<RedisStore> for AnyStore {
    fn from(value: RedisStore) -> Self {
        AnyStore::Redis(value)
    }
}
