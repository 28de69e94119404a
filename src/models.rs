use std::fmt;

use serde::{Deserialize, Serialize};

/// A stored paste, serialized as JSON under [`Paste::storage_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    pub id: String,
    pub content: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub max_views: Option<u64>,
    pub views_used: u64,
    /// Epoch milliseconds. Retrieval fails once `now` is strictly past it.
    pub expires_at_ms: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PasteState {
    Active,
    Expired,
    Exhausted,
}

impl fmt::Display for PasteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PasteState::Active => "active",
            PasteState::Expired => "expired",
            PasteState::Exhausted => "exhausted",
        })
    }
}

impl Paste {
    /// Build a fresh record. A zero ttl or view limit means "none".
    pub fn new(
        id: String,
        content: String,
        now: i64,
        ttl_seconds: Option<u64>,
        max_views: Option<u64>,
    ) -> Self {
        let expires_at_ms = ttl_seconds.filter(|&ttl| ttl > 0).map(|ttl| {
            let ttl_ms = i64::try_from(ttl).unwrap_or(i64::MAX).saturating_mul(1000);
            now.saturating_add(ttl_ms)
        });

        Self {
            id,
            content,
            created_at: now,
            max_views: max_views.filter(|&max| max > 0),
            views_used: 0,
            expires_at_ms,
        }
    }

    pub fn storage_key(id: &str) -> String {
        format!("paste:{id}")
    }

    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at_ms, Some(expires_at) if now > expires_at)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_views, Some(max_views) if self.views_used >= max_views)
    }

    /// Expiry takes precedence over exhaustion.
    pub fn state(&self, now: i64) -> PasteState {
        if self.is_expired(now) {
            PasteState::Expired
        } else if self.is_exhausted() {
            PasteState::Exhausted
        } else {
            PasteState::Active
        }
    }
}
