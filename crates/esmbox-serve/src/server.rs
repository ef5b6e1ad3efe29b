use crate::index::{list_packages, render_index};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use esmbox_core::{EsmError, EsmResult};
use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Everything a `serve` invocation needs
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served as static files
    pub root: PathBuf,
    /// File served at `/` instead of the generated index
    pub custom_entry: Option<PathBuf>,
    /// Give up after this many bind attempts (unbounded when `None`)
    pub max_port_attempts: Option<u32>,
}

impl ServerConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            root,
            custom_entry: None,
            max_port_attempts: None,
        }
    }
}

struct ServeState {
    root: PathBuf,
    custom_entry: Option<PathBuf>,
}

/// A listener that won the bind loop, ready to serve
pub struct BoundServer {
    listener: TcpListener,
    addr: SocketAddr,
    state: Arc<ServeState>,
}

/// Bind `host:port`, moving to the next port while the address is in use
pub async fn bind(config: ServerConfig) -> EsmResult<BoundServer> {
    let mut port = config.port;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let display_addr = format!("{}:{}", config.host, port);

        match TcpListener::bind((config.host.as_str(), port)).await {
            Ok(listener) => {
                let addr = listener.local_addr().map_err(|e| EsmError::ServerBindFailed {
                    addr: display_addr.clone(),
                    source: e,
                })?;
                tracing::debug!(%addr, attempts, "listener bound");

                return Ok(BoundServer {
                    listener,
                    addr,
                    state: Arc::new(ServeState {
                        root: config.root,
                        custom_entry: config.custom_entry,
                    }),
                });
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                if config.max_port_attempts.is_some_and(|max| attempts >= max) {
                    return Err(EsmError::ServerBindFailed {
                        addr: display_addr,
                        source: e,
                    });
                }
                let Some(next) = port.checked_add(1) else {
                    return Err(EsmError::ServerBindFailed {
                        addr: display_addr,
                        source: e,
                    });
                };
                println!("⚠️  Port {} is in use, trying {}", port, next);
                port = next;
            }
            Err(e) => {
                return Err(EsmError::ServerBindFailed {
                    addr: display_addr,
                    source: e,
                })
            }
        }
    }
}

impl BoundServer {
    /// The address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Announced URL, built from the bound address
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve until Ctrl-C
    pub async fn serve(self) -> EsmResult<()> {
        self.serve_with_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            println!("\n👋 Shutting down...");
        })
        .await
    }

    pub async fn serve_with_shutdown<F>(self, signal: F) -> EsmResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}

fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .fallback(serve_static)
        .with_state(state)
}

async fn serve_root(State(state): State<Arc<ServeState>>) -> Response {
    if let Some(entry) = state.custom_entry.as_ref().filter(|p| p.is_file()) {
        return file_response(entry).await;
    }

    let root = state.root.clone();
    let listing = tokio::task::spawn_blocking(move || list_packages(&root)).await;
    match listing {
        Ok(Ok(packages)) => Html(render_index(&packages)).into_response(),
        Ok(Err(e)) => {
            tracing::warn!("failed to list {}: {}", state.root.display(), e);
            Html(render_index(&[])).into_response()
        }
        Err(e) => {
            tracing::error!("index task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn serve_static(State(state): State<Arc<ServeState>>, uri: Uri) -> Response {
    match request_path(&state.root, uri.path()) {
        Some(path) if path.is_file() => file_response(&path).await,
        _ => not_found(),
    }
}

async fn file_response(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(path))], bytes).into_response(),
        Err(e) => {
            tracing::warn!("failed to read {}: {}", path.display(), e);
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Map a request path onto the served root
///
/// Returns `None` for anything that would escape the root.
pub fn request_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(uri_path).ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));

    let mut path = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    // Symlinks pointing outside the root count as traversal too
    if let (Ok(real), Ok(real_root)) = (path.canonicalize(), root.canonicalize()) {
        if !real.starts_with(real_root) {
            return None;
        }
    }

    Some(path)
}

/// Content type from the file extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" | "cjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
