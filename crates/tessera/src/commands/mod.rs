pub mod build;
pub mod data;
pub mod dev;
pub mod init;
pub mod serve;

use anyhow::{bail, Result};
use tessera_data::{discover_locales, resolve_locale, Locale};

use crate::config::ConfigFile;

/// Resolve the locales a command runs for.
///
/// `--all` selects every discovered locale. Otherwise `--locale` wins over
/// the configured default.
pub fn resolve_locales(config: &ConfigFile, locale: Option<String>, all: bool) -> Result<Vec<Locale>> {
    let data_dir = &config.site.data_dir;

    if all {
        let locales = discover_locales(data_dir)?;
        if locales.is_empty() {
            bail!("No locale directories found in {}", data_dir.display());
        }
        return Ok(locales);
    }

    let tag = locale.unwrap_or_else(|| config.site.default_locale.clone());
    Ok(vec![resolve_locale(data_dir, &tag)?])
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// A site where `en` is valid and `fr` has a malformed item.
    /// Returns the directory and the path of its `tessera.toml`.
    pub fn site_with_broken_locale() -> (TempDir, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();

        write(root, "data/en/items/hero.json", r#"{"title":"Hi"}"#);
        write(root, "data/en/project/meta.json", r#"{"name":"Site"}"#);
        write(root, "data/fr/items/hero.json", "{broken");
        write(root, "data/fr/project/meta.json", r#"{"name":"Site FR"}"#);
        write(root, "src/views/index.html", "<body>{{ name }}</body>");

        let config = root.join("tessera.toml");
        write(
            root,
            "tessera.toml",
            &format!(
                "[site]\ndata_dir = {:?}\nsrc_dir = {:?}\noutput = {:?}\n",
                root.join("data"),
                root.join("src"),
                root.join("dist"),
            ),
        );

        (temp, config)
    }
}
