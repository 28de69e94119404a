use std::net::SocketAddr;

use askama::Template;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, ServiceExt};
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::clock::RequestTime;
use crate::config::Config;
use crate::controllers::paste;
use crate::error::ApiError;
use crate::pages::{IndexPage, NotFoundPage, PastePage};
use crate::storage::AnyStore;
use crate::types::api::{CreatePaste, CreatedPaste, Health};
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::new(app.config.host, app.config.port);
    if app.config.test_mode {
        info!("test mode on, honoring the {} header", crate::clock::TEST_NOW_HEADER);
    }

    let service = router(app);

    info!("listening on http://{addr}");
    axum::Server::bind(&addr)
        .serve(ServiceExt::<Request<Body>>::into_make_service(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Routes with trailing slashes trimmed before matching.
pub fn router(app: App) -> NormalizePath<Router> {
    let router = Router::new()
        .route("/", get(index))
        .route("/api/healthz", get(healthz))
        .route("/api/pastes", post(create_paste))
        .route("/api/pastes/:id", get(get_paste_json))
        .route("/p/:id", get(view_paste))
        .layer(TraceLayer::new_for_http())
        .with_state(app);

    NormalizePath::trim_trailing_slash(router)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

async fn index() -> crate::ApiResult<Html<String>> {
    Ok(Html(IndexPage.render()?))
}

async fn healthz() -> Json<Health> {
    Json(Health { ok: true })
}

async fn create_paste(
    State(config): State<Config>,
    State(mut store): State<AnyStore>,
    RequestTime(now): RequestTime,
    headers: HeaderMap,
    payload: Result<Json<CreatePaste>, JsonRejection>,
) -> crate::ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let content = payload
        .content
        .filter(|content| !content.is_empty())
        .ok_or(ApiError::MissingContent)?;

    let id = paste::create(
        &mut store,
        content,
        payload.ttl_seconds,
        payload.max_views,
        now,
    )
    .await?;

    let path = format!("/p/{id}");
    let url = format!("{base_url}{path}", base_url = base_url(&config, &headers));

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, path)],
        Json(CreatedPaste { id, url }),
    ))
}

async fn view_paste(
    State(mut store): State<AnyStore>,
    RequestTime(now): RequestTime,
    Path(id): Path<String>,
) -> crate::ApiResult<Response> {
    match paste::retrieve(&mut store, &id, now).await? {
        Some(paste) => Ok(Html(PastePage::from(&paste).render()?).into_response()),
        None => Ok((StatusCode::NOT_FOUND, Html(NotFoundPage.render()?)).into_response()),
    }
}

async fn get_paste_json(
    State(mut store): State<AnyStore>,
    RequestTime(now): RequestTime,
    Path(id): Path<String>,
) -> crate::ApiResult<impl IntoResponse> {
    let paste = paste::retrieve(&mut store, &id, now)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(paste))
}

/// The configured base url, or one rebuilt from the request's proxy and host
/// headers.
fn base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base_url) = &config.base_url {
        return base_url.trim_end_matches('/').to_owned();
    }

    let proto = header_str(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost");
    format!("{proto}://{host}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    use super::*;
    use crate::clock::{FixedClock, TimeSource, TEST_NOW_HEADER};
    use crate::storage::{FileStore, MemoryStore};

    fn test_app(test_mode: bool) -> App {
        let config = Config {
            test_mode,
            ..Config::default()
        };
        App {
            config,
            store: MemoryStore::default().into(),
            time: TimeSource::new(FixedClock(1_000), test_mode),
        }
    }

    async fn send(app: &App, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = router(app.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/pastes")
            .header(header::HOST, "paste.test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_at(uri: &str, now: Option<i64>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(now) = now {
            builder = builder.header(TEST_NOW_HEADER, now.to_string());
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn create(app: &App, body: Value) -> String {
        let (status, _, body) = send(app, post_json(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_str(&body).unwrap();
        created["id"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let app = test_app(false);
        let (status, _, body) = send(&app, get_at("/api/healthz", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "ok": true }));
    }

    #[tokio::test]
    async fn create_returns_link_built_from_host() {
        let app = test_app(false);
        let (status, headers, body) = send(&app, post_json(json!({ "content": "hi" }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let created: Value = serde_json::from_str(&body).unwrap();
        let id = created["id"].as_str().unwrap();
        assert_eq!(created["url"], format!("http://paste.test/p/{id}"));
        assert_eq!(headers[header::LOCATION], format!("/p/{id}"));
    }

    #[tokio::test]
    async fn create_prefers_configured_base_url() {
        let mut app = test_app(false);
        app.config.base_url = Some("https://paste.example/".into());

        let (_, _, body) = send(&app, post_json(json!({ "content": "hi" }))).await;
        let created: Value = serde_json::from_str(&body).unwrap();
        let id = created["id"].as_str().unwrap();
        assert_eq!(created["url"], format!("https://paste.example/p/{id}"));
    }

    #[tokio::test]
    async fn create_honors_forwarded_proto() {
        let app = test_app(false);
        let mut request = post_json(json!({ "content": "hi" }));
        request
            .headers_mut()
            .insert("x-forwarded-proto", "https".parse().unwrap());

        let (_, _, body) = send(&app, request).await;
        let created: Value = serde_json::from_str(&body).unwrap();
        assert!(created["url"].as_str().unwrap().starts_with("https://paste.test/p/"));
    }

    #[tokio::test]
    async fn create_requires_content() {
        let app = test_app(false);
        for body in [json!({}), json!({ "content": "" }), json!({ "content": null })] {
            let (status, _, body) = send(&app, post_json(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                serde_json::from_str::<Value>(&body).unwrap(),
                json!({ "error": "content required" })
            );
        }
    }

    #[tokio::test]
    async fn create_rejects_malformed_bodies() {
        let app = test_app(false);
        let negative_ttl = post_json(json!({ "content": "x", "ttl_seconds": -5 }));
        let (status, _, _) = send(&app, negative_ttl).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/pastes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(serde_json::from_str::<Value>(&body).unwrap()["error"].is_string());
    }

    #[tokio::test]
    async fn view_page_escapes_and_counts_views() {
        let app = test_app(false);
        let id = create(&app, json!({ "content": "<b>bold</b>", "max_views": 3 })).await;

        let (status, _, body) = send(&app, get_at(&format!("/p/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("<b>bold"));
        assert!(body.contains("&lt;b&gt;bold"));
        assert!(body.contains("1 / 3"));

        let (_, _, body) = send(&app, get_at(&format!("/p/{id}/"), None)).await;
        assert!(body.contains("2 / 3"));
    }

    #[tokio::test]
    async fn view_limit_exhausts_to_not_found_page() {
        let app = test_app(false);
        let id = create(&app, json!({ "content": "twice", "max_views": 2 })).await;
        let uri = format!("/p/{id}");

        assert_eq!(send(&app, get_at(&uri, None)).await.0, StatusCode::OK);
        assert_eq!(send(&app, get_at(&uri, None)).await.0, StatusCode::OK);

        let (status, headers, body) = send(&app, get_at(&uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
        assert!(body.contains("Paste Not Found"));
    }

    #[tokio::test]
    async fn test_header_drives_expiry_in_test_mode() {
        let app = test_app(true);
        let mut request = post_json(json!({ "content": "hello", "ttl_seconds": 60 }));
        request
            .headers_mut()
            .insert(TEST_NOW_HEADER, "1000".parse().unwrap());
        let (_, _, body) = send(&app, request).await;
        let id = serde_json::from_str::<Value>(&body).unwrap()["id"]
            .as_str()
            .unwrap()
            .to_owned();
        let uri = format!("/api/pastes/{id}");

        let (status, _, body) = send(&app, get_at(&uri, Some(60_999))).await;
        assert_eq!(status, StatusCode::OK);
        let paste: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(paste["views_used"], 1);
        assert_eq!(paste["expires_at_ms"], 61_000);

        let (status, _, body) = send(&app, get_at(&uri, Some(61_001))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({ "error": "not found" })
        );
    }

    #[tokio::test]
    async fn test_header_is_ignored_outside_test_mode() {
        let app = test_app(false);
        // created at the fixed clock's 1000ms, expiring at 2000ms
        let id = create(&app, json!({ "content": "hello", "ttl_seconds": 1 })).await;

        let uri = format!("/p/{id}");
        let (status, _, _) = send(&app, get_at(&uri, Some(999_999_999))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_paste_is_not_found() {
        let app = test_app(false);
        let (status, _, body) = send(&app, get_at("/p/does-not-exist", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Paste Not Found"));

        let (status, _, _) = send(&app, get_at("/api/pastes/does-not-exist", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_failures_are_opaque_server_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("pastes");
        std::fs::create_dir(&dir).unwrap();
        let store = FileStore::new(&dir).await.unwrap();
        // every path under the store now fails with ENOTDIR
        std::fs::remove_dir(&dir).unwrap();
        std::fs::write(&dir, "").unwrap();

        let app = App {
            store: store.into(),
            ..test_app(false)
        };
        let error = json!({ "error": "IO error" });

        let (status, _, body) = send(&app, post_json(json!({ "content": "hi" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), error);

        let (status, headers, body) = send(&app, get_at("/p/some-id", None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(!body.contains("Paste Not Found"));
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), error);
    }

    #[tokio::test]
    async fn index_serves_form() {
        let app = test_app(false);
        let (status, _, body) = send(&app, get_at("/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Create Paste"));
    }
}
