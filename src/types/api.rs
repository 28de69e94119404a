use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreatePaste {
    pub content: Option<String>,
    pub ttl_seconds: Option<u64>,
    pub max_views: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub ok: bool,
}
