//! HTTP server: static assets plus the content resolver

pub mod resolve;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{FromRequest, Multipart, State},
    http::{header, Method, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::CONFIG_POLL_INTERVAL;
use crate::content;
use crate::error::WikiError;
use crate::Wiki;
use resolve::{Intent, Resolution};

/// Body returned by a successful save
const SAVED: &str = "1";

/// Form posted by the editor
#[derive(Debug, Deserialize)]
struct SaveForm {
    #[serde(default)]
    content: String,
}

/// Build the application router
pub fn router(wiki: Arc<Wiki>) -> Router {
    let assets = ServeDir::new(&wiki.static_dir);

    Router::new()
        .nest_service("/_static", assets)
        .fallback(content_handler)
        .with_state(wiki)
        .layer(TraceLayer::new_for_http())
}

/// Start the server and the config poller; returns after Ctrl+C
pub async fn start(wiki: Arc<Wiki>, ip: &str, port: u16) -> Result<()> {
    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let poller = wiki.config().spawn_poller(CONFIG_POLL_INTERVAL);

    println!("Serving {} at http://{}:{}", wiki.doc_dir.display(), ip, port);
    println!("Press Ctrl+C to stop.");

    let app = router(Arc::clone(&wiki));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    poller.stop().await;
    served?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Every path outside `/_static`
async fn content_handler(State(wiki): State<Arc<Wiki>>, request: Request<Body>) -> Response {
    let url_path = resolve::clean_path(request.uri().path());
    let intent = Intent::from_uri(request.uri());

    match resolve::classify(&wiki.doc_dir, &url_path, &intent, request.method()).await {
        Resolution::Edit => {
            tracing::info!("Serve editor for {}", url_path);
            serve_file(&wiki.editor_path(), request).await
        }
        Resolution::Save { md_path } => save_handler(md_path, request).await,
        Resolution::Directory { path } => {
            // Listing is not implemented
            tracing::info!("Serve dir {:?}", path);
            StatusCode::OK.into_response()
        }
        Resolution::Raw { path } => {
            tracing::info!("Serve file {:?}", path);
            serve_file(&path, request).await
        }
        Resolution::Markdown { path, mtime } => markdown_handler(wiki, url_path, path, mtime).await,
        Resolution::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Serve a single file for any method. HEAD stays HEAD, everything else is
/// answered as a GET.
async fn serve_file(path: &Path, mut request: Request<Body>) -> Response {
    if request.method() != Method::HEAD {
        *request.method_mut() = Method::GET;
    }

    match ServeFile::new(path).try_call(request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!("Failed to serve {:?}: {}", path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

async fn save_handler(md_path: PathBuf, request: Request<Body>) -> Response {
    let content = match read_content(request).await {
        Ok(content) => content,
        Err(rejection) => return rejection,
    };

    tracing::info!("Save file in {:?}", md_path);
    match save_document(&md_path, &content).await {
        Ok(()) => SAVED.into_response(),
        Err(e) => {
            tracing::error!("{}", e);
            (e.status(), "Internal error").into_response()
        }
    }
}

fn is_multipart(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// The `content` field of a urlencoded or multipart form; absent means empty
async fn read_content(request: Request<Body>) -> Result<String, Response> {
    if !is_multipart(&request) {
        let Form(form) = Form::<SaveForm>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        return Ok(form.content);
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(IntoResponse::into_response)?;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some("content") {
            return field.text().await.map_err(bad_multipart);
        }
    }
    Ok(String::new())
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> Response {
    tracing::warn!("Malformed multipart body: {}", e);
    (StatusCode::BAD_REQUEST, e.body_text()).into_response()
}

/// Write `content` verbatim to `md_path`, creating parent directories.
/// Last writer wins.
pub async fn save_document(md_path: &Path, content: &str) -> Result<(), WikiError> {
    if let Some(parent) = md_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| WikiError::Persistence {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(md_path, content)
        .await
        .map_err(|source| WikiError::Persistence {
            path: md_path.to_path_buf(),
            source,
        })
}

async fn markdown_handler(
    wiki: Arc<Wiki>,
    url_path: String,
    path: PathBuf,
    mtime: SystemTime,
) -> Response {
    let modified: chrono::DateTime<chrono::Local> = mtime.into();
    tracing::info!(
        "Serve md {:?} {}",
        path,
        modified.format("%Y-%m-%d %H:%M:%S")
    );

    let rendered =
        tokio::task::spawn_blocking(move || content::render_page(&wiki, &url_path, &path)).await;

    match rendered {
        Ok(Ok(html)) => Html(html).into_response(),
        Ok(Err(e)) => {
            tracing::error!("Failed to render page: {}", e);
            let status = e.status();
            let message = if status == StatusCode::NOT_FOUND {
                "Not found"
            } else {
                "Internal error"
            };
            (status, message).into_response()
        }
        Err(e) => {
            tracing::error!("Render task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
