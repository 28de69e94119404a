use askama::Template;
use chrono::{TimeZone, Utc};

use crate::models::Paste;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage;

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage;

#[derive(Template)]
#[template(path = "paste.html")]
pub struct PastePage<'a> {
    pub content: &'a str,
    pub views: String,
    pub expires_at: Option<String>,
}

impl<'a> From<&'a Paste> for PastePage<'a> {
    fn from(paste: &'a Paste) -> Self {
        let views = match paste.max_views {
            Some(max_views) => format!("{} / {max_views}", paste.views_used),
            None => paste.views_used.to_string(),
        };

        let expires_at = paste
            .expires_at_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string());

        Self {
            content: &paste.content,
            views,
            expires_at,
        }
    }
}
