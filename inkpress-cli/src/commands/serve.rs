//! Development server: serve the output directory and rebuild on changes.

use super::build::{build_with_config, BuildOverrides};
use super::load_config;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use inkpress_core::Config;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::mpsc;

#[derive(Clone)]
struct AppState {
    output_dir: Arc<PathBuf>,
}

/// `inkpress serve`
pub async fn serve_site(
    config_path: &Path,
    overrides: BuildOverrides,
    port: Option<u16>,
    watch: bool,
) -> Result<()> {
    let config = load_with_overrides(config_path, &overrides)?;
    build_with_config(&config, false).context("Failed to build site")?;

    let output_dir = config.output_dir();
    let port = port.unwrap_or(config.server.port);

    tracing::info!("Starting dev server on http://localhost:{}", port);
    println!("\nServing at http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    // Kept alive for the lifetime of the server
    let _watcher = if watch {
        Some(spawn_rebuilder(config_path.to_path_buf(), overrides, &config)?)
    } else {
        None
    };

    let state = AppState {
        output_dir: Arc::new(output_dir),
    };
    let app = Router::new()
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_path))
        .fallback(serve_404)
        .with_state(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn load_with_overrides(config_path: &Path, overrides: &BuildOverrides) -> Result<Config> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config)?;
    Ok(config)
}

/// Watch the content roots and the config file. Every burst of events
/// triggers one full rebuild on the blocking pool.
fn spawn_rebuilder(
    config_path: PathBuf,
    overrides: BuildOverrides,
    config: &Config,
) -> Result<RecommendedWatcher> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .context("Failed to initialize file watcher")?;

    let mut watched: Vec<PathBuf> = vec![config.content_dir()];
    watched.extend(config.pages_dir());
    watched.extend(config.static_dir());
    for dir in &watched {
        if dir.exists() {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {:?}", dir))?;
        }
    }
    if config_path.exists() {
        watcher
            .watch(&config_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", config_path))?;
    }

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                Ok(_ev) => {
                    // Debounce a bit by draining pending events
                    while rx.try_recv().is_ok() {}
                    tracing::info!("Change detected, rebuilding site...");
                    let res = tokio::task::spawn_blocking({
                        let config_path = config_path.clone();
                        let overrides = overrides.clone();
                        move || {
                            let config = load_with_overrides(&config_path, &overrides)?;
                            build_with_config(&config, false)
                        }
                    })
                    .await;

                    match res {
                        Ok(Ok(report)) => tracing::info!(
                            "Rebuild complete: {} files, {} skipped",
                            report.files_written,
                            report.output.failures.len()
                        ),
                        Ok(Err(e)) => tracing::error!("Rebuild failed: {:?}", e),
                        Err(e) => tracing::error!("Rebuild task panicked: {}", e),
                    }
                }
                Err(err) => tracing::warn!("Watcher error: {}", err),
            }
        }
    });

    Ok(watcher)
}

async fn serve_index(State(state): State<AppState>) -> Response {
    serve_file(&state, "index.html").await
}

async fn serve_path(State(state): State<AppState>, uri: Uri) -> Response {
    serve_file(&state, uri.path()).await
}

async fn serve_404(State(state): State<AppState>) -> Response {
    not_found(&state).await
}

async fn serve_file(state: &AppState, request_path: &str) -> Response {
    let Some(rel) = sanitize_path(request_path) else {
        return not_found(state).await;
    };
    let mut file_path = state.output_dir.join(&rel);
    if file_path.is_dir() {
        file_path.push("index.html");
    }

    match fs::read(&file_path).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type_for_path(&file_path))],
            content,
        )
            .into_response(),
        Err(_) => not_found(state).await,
    }
}

async fn not_found(state: &AppState) -> Response {
    match fs::read(state.output_dir.join("404.html")).await {
        Ok(content) => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Request path to a path under the output dir; `None` for anything that
/// would escape it.
fn sanitize_path(request_path: &str) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for component in Path::new(request_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(rel)
}

fn content_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
        .as_str()
    {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "xml" => "application/xml; charset=utf-8",
        "rss" => "application/rss+xml; charset=utf-8",
        "atom" => "application/atom+xml; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tempfile::tempdir;

    fn state(dir: &Path) -> AppState {
        std::fs::create_dir_all(dir.join("2024")).unwrap();
        std::fs::write(dir.join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.join("2024/index.html"), "<h1>2024</h1>").unwrap();
        std::fs::write(dir.join("404.html"), "<h1>missing</h1>").unwrap();
        std::fs::write(dir.join("feed.rss"), "<rss/>").unwrap();
        AppState {
            output_dir: Arc::new(dir.to_path_buf()),
        }
    }

    async fn body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn serves_files_and_directory_indexes() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());

        let response = serve_index(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "<h1>home</h1>");

        let response = serve_file(&state, "/2024/").await;
        assert_eq!(body(response).await, "<h1>2024</h1>");

        let response = serve_file(&state, "/feed.rss").await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/rss+xml; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn missing_and_escaping_paths_get_the_404_page() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());

        let response = serve_file(&state, "/nope.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await, "<h1>missing</h1>");

        let response = serve_file(&state, "/../secret").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/2024/03/a.html"),
            Some(PathBuf::from("2024/03/a.html"))
        );
        assert_eq!(sanitize_path("/"), Some(PathBuf::new()));
        assert_eq!(sanitize_path("/a/../../etc"), None);
    }
}
