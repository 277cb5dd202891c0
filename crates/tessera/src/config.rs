//! Configuration file structure (tessera.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tessera_data::{Locale, FALLBACK_LOCALE};
use tessera_static::{BuildConfig, CdnConfig};

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub cdn: Option<CdnSettings>,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_minify")]
    pub minify: bool,
}

#[derive(Debug, Deserialize)]
pub struct CdnSettings {
    pub base: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            src_dir: default_src_dir(),
            output: default_output(),
            default_locale: default_locale(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: default_minify(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}
fn default_output() -> PathBuf {
    PathBuf::from("dist")
}
fn default_locale() -> String {
    FALLBACK_LOCALE.to_string()
}
fn default_minify() -> bool {
    true
}
fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Build settings with CLI overrides applied.
    pub fn build_config(&self, output: Option<PathBuf>, minify: Option<bool>) -> Result<BuildConfig> {
        let default_locale = Locale::new(self.site.default_locale.as_str())
            .context("Invalid site.default_locale")?;

        Ok(BuildConfig {
            data_dir: self.site.data_dir.clone(),
            src_dir: self.site.src_dir.clone(),
            output_dir: output.unwrap_or_else(|| self.site.output.clone()),
            default_locale,
            minify: minify.unwrap_or(self.build.minify),
            cdn: self.cdn.as_ref().map(|c| CdnConfig {
                base: c.base.clone(),
                files: c.files.clone(),
            }),
            clean: true,
        })
    }
}
