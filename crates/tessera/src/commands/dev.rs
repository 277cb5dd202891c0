//! Development server command.

use std::path::Path;

use anyhow::Result;
use tessera_server::{DevServer, DevServerConfig};

use crate::config::ConfigFile;

/// Run the dev server.
pub async fn run(config_path: &Path, locale: Option<String>, port: Option<u16>, open: bool) -> Result<()> {
    let file_config = ConfigFile::load(config_path)?;

    // The session locale is fixed here for every later rebuild.
    let locale = super::resolve_locales(&file_config, locale, false)?.remove(0);

    let config = DevServerConfig {
        build: file_config.build_config(None, Some(false))?,
        locale,
        port: port.unwrap_or(file_config.server.port),
        host: file_config.server.host.clone(),
        open,
    };

    tracing::info!(
        "Starting development server on port {} for locale {}",
        config.port,
        config.locale
    );

    DevServer::new(config).start().await?;

    Ok(())
}
