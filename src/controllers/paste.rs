//! Paste creation and conditional retrieval.
//!
//! Retrieval is a plain read followed by a write-back with no locking, so two
//! concurrent reads of a paste with one view left can both succeed.

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Paste;
use crate::storage::Store;

/// Store a new paste and return its id.
///
/// `ttl_seconds` and `max_views` of zero are treated as absent. `content` is
/// stored as given; callers reject empty content before getting here.
pub async fn create<S: Store>(
    store: &mut S,
    content: String,
    ttl_seconds: Option<u64>,
    max_views: Option<u64>,
    now: i64,
) -> crate::ApiResult<String> {
    let id = Uuid::new_v4().to_string();
    let paste = Paste::new(id.clone(), content, now, ttl_seconds, max_views);

    info!(
        "new paste: id='{id}', size={size}, ttl={ttl_seconds:?}, max_views={max_views:?}",
        size = paste.content.len(),
    );

    store
        .set(&Paste::storage_key(&id), serde_json::to_string(&paste)?)
        .await?;

    Ok(id)
}

/// Fetch a paste and count one view.
///
/// Returns `None` when the paste never existed, has expired, or has used up
/// its views. Only a successful retrieval writes to the store, and the
/// returned record already includes the new view.
pub async fn retrieve<S: Store>(
    store: &mut S,
    id: &str,
    now: i64,
) -> crate::ApiResult<Option<Paste>> {
    let Some(mut paste) = peek(store, id).await? else {
        return Ok(None);
    };

    if paste.is_expired(now) || paste.is_exhausted() {
        debug!("paste '{id}' is {}", paste.state(now));
        return Ok(None);
    }

    paste.views_used = paste.views_used.saturating_add(1);
    store
        .set(&Paste::storage_key(id), serde_json::to_string(&paste)?)
        .await?;

    Ok(Some(paste))
}

/// Read the stored record as-is, without expiry or view checks.
pub async fn peek<S: Store>(store: &mut S, id: &str) -> crate::ApiResult<Option<Paste>> {
    match store.get(&Paste::storage_key(id)).await? {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}
