//! Visualization server.
//!
//! Serves the output directory as static files so the embedded viewer can
//! fetch `chat_data.json`. The root path redirects to the viewer document.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Redirect to the graph-viewer document |
//! | `GET`  | `/relationship_graph.html` | The viewer |
//! | `GET`  | `/chat_data.json` | The graph artifact |
//!
//! # Port conflicts
//!
//! When the requested port is already bound the server retries on the next
//! port, once per conflict, logging the fallback; after
//! [`MAX_BIND_ATTEMPTS`] consecutive conflicts it gives up with
//! [`AnalysisError::PortInUse`].
//!
//! Serving blocks until Ctrl+C, which is a normal shutdown.

use axum::{response::Redirect, routing::get, Router};
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::warn;

use crate::assets;
use crate::error::{AnalysisError, Result};
use crate::export::ARTIFACT_FILE;

/// Consecutive bind conflicts tolerated before giving up.
pub const MAX_BIND_ATTEMPTS: u16 = 16;

/// Serve `data_dir` on the first free port at or above `port`.
///
/// Verifies the artifact exists and (re)installs the viewer document first,
/// so a directory produced by an earlier data-only run serves correctly.
pub async fn serve(data_dir: &Path, host: &str, port: u16, open_browser: bool) -> Result<()> {
    let artifact = data_dir.join(ARTIFACT_FILE);
    if !artifact.is_file() {
        return Err(AnalysisError::DataUnavailable(format!(
            "no {} in {} (run `chatgraph analyze` first)",
            ARTIFACT_FILE,
            data_dir.display()
        )));
    }

    assets::install_viewer(data_dir)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route(
            "/",
            get(|| async { Redirect::temporary("/relationship_graph.html") }),
        )
        .fallback_service(ServeDir::new(data_dir))
        .layer(cors);

    let (listener, bound_port) = bind_with_fallback(host, port).await?;

    let url = format!("http://{}:{}/", host, bound_port);
    println!("Serving relationship graph at {}", url);
    println!("Press Ctrl+C to stop");

    if open_browser {
        if let Err(e) = webbrowser::open(&url) {
            warn!("could not open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("Server stopped.");
    Ok(())
}

/// Bind `host:port`, incrementing the port once per `AddrInUse` conflict.
async fn bind_with_fallback(host: &str, port: u16) -> Result<(TcpListener, u16)> {
    let mut candidate = port;
    for _ in 0..MAX_BIND_ATTEMPTS {
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => return Ok((listener, candidate)),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                let next = candidate
                    .checked_add(1)
                    .ok_or(AnalysisError::PortInUse(candidate))?;
                warn!("port {} is already in use, retrying on {}", candidate, next);
                candidate = next;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AnalysisError::PortInUse(candidate))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_next_port_on_conflict() {
        // Grab an ephemeral port, keep it occupied, then ask for it.
        let occupied = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let taken = occupied.local_addr().unwrap().port();

        let (listener, port) = bind_with_fallback("127.0.0.1", taken).await.unwrap();
        // One increment per conflict; usually exactly taken+1, but a
        // neighboring port may itself be busy on a shared test host.
        assert!(port > taken);
        drop(listener);
    }

    #[tokio::test]
    async fn binds_requested_port_when_free() {
        let probe = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let free = probe.local_addr().unwrap().port();
        drop(probe);

        let (_listener, port) = bind_with_fallback("127.0.0.1", free).await.unwrap();
        assert_eq!(port, free);
    }

    #[tokio::test]
    async fn serve_refuses_directory_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = serve(dir.path(), "127.0.0.1", 0, false).await.unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable(_)));
    }
}
