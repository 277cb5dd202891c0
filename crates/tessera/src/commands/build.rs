//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tessera_static::SiteBuilder;

use crate::config::ConfigFile;

/// Run the build command.
pub async fn run(
    config_path: &Path,
    locale: Option<String>,
    all: bool,
    output: Option<PathBuf>,
    minify: Option<bool>,
) -> Result<()> {
    tracing::info!("Building static site...");

    let file_config = ConfigFile::load(config_path)?;
    let locales = super::resolve_locales(&file_config, locale, all)?;
    let config = file_config.build_config(output, minify)?;

    let builder = SiteBuilder::new(config);
    let result = tokio::task::spawn_blocking(move || builder.build(&locales))
        .await
        .context("Build task panicked")??;

    tracing::info!(
        "Built {} pages in {}ms",
        result.pages.len(),
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    if !result.is_success() {
        let failed: Vec<_> = result.failures.iter().map(|(l, _)| l.as_str()).collect();
        bail!("Build failed for locales: {}", failed.join(", "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::site_with_broken_locale;

    #[tokio::test]
    async fn fails_naming_the_broken_locale() {
        let (temp, config) = site_with_broken_locale();

        let err = run(&config, None, true, None, None).await.unwrap_err();

        assert!(err.to_string().contains("fr"));
        assert!(temp.path().join("dist/index.html").is_file());
    }
}
