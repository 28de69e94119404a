use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::Store;

/// Process-local store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl Store for MemoryStore {
    async fn get(&mut self, key: &str) -> crate::ApiResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: String) -> crate::ApiResult<()> {
        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }
}
