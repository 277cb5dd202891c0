//! JSON aggregation command.

use std::path::Path;

use anyhow::{bail, Result};
use tessera_data::{Aggregator, DataLayout};

use crate::config::ConfigFile;

/// Run the data command: aggregate items and project documents only.
pub async fn run(config_path: &Path, locale: Option<String>, all: bool) -> Result<()> {
    let file_config = ConfigFile::load(config_path)?;
    let locales = super::resolve_locales(&file_config, locale, all)?;

    let aggregator = Aggregator::new(DataLayout::new(&file_config.site.data_dir));
    let report = tokio::task::spawn_blocking(move || aggregator.aggregate_all(&locales)).await?;

    for (locale, aggregation) in &report.succeeded {
        tracing::info!("[{}] Wrote {}", locale, aggregation.output.display());
    }

    if !report.is_success() {
        for (locale, err) in &report.failed {
            tracing::error!("[{}] {}", locale, err);
        }
        bail!(
            "Aggregation failed for {} of {} locales",
            report.failed.len(),
            report.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::site_with_broken_locale;

    #[tokio::test]
    async fn fails_when_any_locale_fails() {
        let (temp, config) = site_with_broken_locale();

        let err = run(&config, None, true).await.unwrap_err();

        assert!(err.to_string().contains("1 of 2 locales"));
        assert!(temp.path().join("data/en/_project.json").is_file());
        assert!(!temp.path().join("data/fr/_project.json").exists());
    }

    #[tokio::test]
    async fn succeeds_for_a_valid_locale() {
        let (temp, config) = site_with_broken_locale();

        run(&config, Some("en".to_string()), false).await.unwrap();

        assert!(temp.path().join("data/en/_items.json").is_file());
    }
}
