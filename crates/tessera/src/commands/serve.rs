//! Preview server command.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::ConfigFile;

/// Serve a built tree without watching or rebuilding.
pub async fn run(config_path: &Path, port: Option<u16>, dir: Option<PathBuf>, open: bool) -> Result<()> {
    let file_config = ConfigFile::load(config_path)?;
    let dir = dir.unwrap_or_else(|| file_config.site.output.clone());
    let port = port.unwrap_or(file_config.server.port);

    if !dir.is_dir() {
        anyhow::bail!(
            "Directory not found: {}. Run 'tessera build' first.",
            dir.display()
        );
    }

    let addr: SocketAddr = format!("{}:{}", file_config.server.host, port)
        .parse()
        .context("Invalid address")?;

    tracing::info!("Serving {} at http://{}", dir.display(), addr);

    let app = Router::new().fallback_service(ServeDir::new(&dir));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    if open {
        let _ = open::that(format!("http://{}", addr));
    }

    axum::serve(listener, app).await?;

    Ok(())
}
