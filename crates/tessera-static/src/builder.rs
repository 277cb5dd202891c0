//! Static site builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tessera_data::{
    discover_locales, for_each_locale, load_document, Aggregation, Aggregator, DataError,
    DataLayout, Locale,
};

use crate::assets::{AssetError, AssetPipeline, CopyMode, IMAGE_EXTENSIONS, SCRIPT_EXTENSIONS};
use crate::cdn::CdnRewriter;
use crate::stage::Stage;
use crate::templates::{TemplateEngine, TemplateError};

/// Stylesheet written under `<output>/styles/`.
pub const STYLES_OUTPUT: &str = "main.min.css";

/// CDN rewriting settings.
#[derive(Debug, Clone, Default)]
pub struct CdnConfig {
    /// URL prefix, e.g. `//cdn.example.com`
    pub base: String,

    /// Root-relative asset paths to serve from the CDN
    pub files: Vec<String>,
}

/// Configuration for building a site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the per-locale data tree
    pub data_dir: PathBuf,

    /// Source directory (views, styles, scripts, img, static files)
    pub src_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Locale rendered at the output root
    pub default_locale: Locale,

    /// Minify HTML/CSS output
    pub minify: bool,

    /// Rewrite asset URLs to a CDN
    pub cdn: Option<CdnConfig>,

    /// Remove the output directory before a full build
    pub clean: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            src_dir: PathBuf::from("src"),
            output_dir: PathBuf::from("dist"),
            default_locale: Locale::default(),
            minify: true,
            cdn: None,
            clean: true,
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Pages written, one per successful locale
    pub pages: Vec<PathBuf>,

    /// Locales that failed, with the cause
    pub failures: Vec<(Locale, BuildError)>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Failed to render template: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Failed to write output {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

impl BuildError {
    fn write(path: &Path, err: impl ToString) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    aggregator: Aggregator,
    templates: TemplateEngine,
    cdn: Option<CdnRewriter>,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        let aggregator = Aggregator::new(DataLayout::new(&config.data_dir));
        let templates = TemplateEngine::new(config.src_dir.join("views"));
        let cdn = config
            .cdn
            .as_ref()
            .filter(|c| !c.base.is_empty())
            .map(|c| CdnRewriter::new(c.base.clone(), c.files.iter().cloned()));

        Self {
            config,
            aggregator,
            templates,
            cdn,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site for `locales`.
    ///
    /// Asset stage failures abort the build. Locale failures are collected
    /// in the result while the remaining locales complete.
    pub fn build(&self, locales: &[Locale]) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        if self.config.clean {
            self.clean()?;
        }
        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::write(&self.config.output_dir, e))?;

        for stage in Stage::ASSETS {
            self.run_stage(stage, &self.config.default_locale)?;
        }

        let report = for_each_locale(locales, |locale| {
            self.aggregate(locale)?;
            self.render_page(locale)
        });

        for (locale, err) in &report.failed {
            tracing::error!("[{}] {}", locale, err);
        }

        Ok(BuildResult {
            pages: report.succeeded.into_iter().map(|(_, page)| page).collect(),
            failures: report.failed,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Run a single stage. `locale` is ignored by asset stages.
    pub fn run_stage(&self, stage: Stage, locale: &Locale) -> Result<(), BuildError> {
        match stage {
            Stage::Data => {
                self.aggregate(locale)?;
                self.render_page(locale)?;
            }
            Stage::Pages => {
                self.render_page(locale)?;
            }
            Stage::Styles => {
                self.compile_styles()?;
            }
            Stage::Scripts => {
                self.copy_scripts()?;
            }
            Stage::Images => {
                self.copy_images()?;
            }
            Stage::Static => {
                self.copy_static()?;
            }
        }

        Ok(())
    }

    /// Remove the output directory.
    pub fn clean(&self) -> Result<(), BuildError> {
        let out = &self.config.output_dir;
        if out.exists() {
            fs::remove_dir_all(out).map_err(|e| BuildError::write(out, e))?;
            tracing::debug!("Removed {}", out.display());
        }
        Ok(())
    }

    /// Aggregate items, then project, for one locale.
    pub fn aggregate(&self, locale: &Locale) -> Result<Aggregation, BuildError> {
        Ok(self.aggregator.aggregate(locale)?)
    }

    /// Output path of a locale's page.
    pub fn page_path(&self, locale: &Locale) -> PathBuf {
        if *locale == self.config.default_locale {
            self.config.output_dir.join("index.html")
        } else {
            self.config
                .output_dir
                .join(locale.as_str())
                .join("index.html")
        }
    }

    /// Render a locale's page from its persisted `_project.json`.
    pub fn render_page(&self, locale: &Locale) -> Result<PathBuf, BuildError> {
        let project_path = self.aggregator.layout().project_output(locale);
        if !project_path.is_file() {
            return Err(DataError::Filesystem {
                path: project_path,
                message: "aggregated project not found; the data stage has not run".to_string(),
            }
            .into());
        }
        let project = load_document(&project_path)?;
        let locales = discover_locales(&self.config.data_dir)?;

        let mut html = self.templates.render_locale(locale, &locales, &project)?;

        // Rewrite first: minified attributes may lose their quotes.
        if let Some(cdn) = &self.cdn {
            html = cdn.rewrite(&html);
        }
        if self.config.minify {
            html = AssetPipeline::minify_html(&html);
        }

        let output = self.page_path(locale);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::write(parent, e))?;
        }
        fs::write(&output, html).map_err(|e| BuildError::write(&output, e))?;

        tracing::info!("[{}] Rendered {}", locale, output.display());

        Ok(output)
    }

    /// Compile `styles/main.css` into `styles/main.min.css`.
    ///
    /// Unminified builds also write `main.min.css.map` next to it.
    pub fn compile_styles(&self) -> Result<Option<PathBuf>, BuildError> {
        let entry = self.config.src_dir.join("styles").join("main.css");
        if !entry.is_file() {
            tracing::warn!("Stylesheet not found: {}", entry.display());
            return Ok(None);
        }

        let minify = self.config.minify;
        let compiled = AssetPipeline::compile_styles(&entry, minify, !minify)?;

        let dest_dir = self.config.output_dir.join("styles");
        fs::create_dir_all(&dest_dir).map_err(|e| BuildError::write(&dest_dir, e))?;
        let output = dest_dir.join(STYLES_OUTPUT);

        let mut css = compiled.code;
        if let Some(map) = compiled.map {
            let map_path = dest_dir.join(format!("{}.map", STYLES_OUTPUT));
            fs::write(&map_path, map).map_err(|e| BuildError::write(&map_path, e))?;
            css.push_str(&format!("\n/*# sourceMappingURL={}.map */\n", STYLES_OUTPUT));
        }
        fs::write(&output, css).map_err(|e| BuildError::write(&output, e))?;

        tracing::info!("Compiled {}", output.display());

        Ok(Some(output))
    }

    /// Copy `scripts/**` into the output.
    pub fn copy_scripts(&self) -> Result<usize, BuildError> {
        self.copy_dir("scripts", SCRIPT_EXTENSIONS, CopyMode::Always)
    }

    /// Copy changed images from `img/**` into the output.
    pub fn copy_images(&self) -> Result<usize, BuildError> {
        self.copy_dir("img", IMAGE_EXTENSIONS, CopyMode::Changed)
    }

    /// Copy top-level source files (`_headers`, `robots.txt`, ...).
    pub fn copy_static(&self) -> Result<usize, BuildError> {
        if !self.config.src_dir.is_dir() {
            tracing::warn!("Source directory not found: {}", self.config.src_dir.display());
            return Ok(0);
        }

        let copied = AssetPipeline::copy_top_level(&self.config.src_dir, &self.config.output_dir)?;
        tracing::info!("Copied {} static files", copied);
        Ok(copied)
    }

    fn copy_dir(&self, name: &str, extensions: &[&str], mode: CopyMode) -> Result<usize, BuildError> {
        let src = self.config.src_dir.join(name);
        if !src.is_dir() {
            tracing::debug!("No {} directory at {}", name, src.display());
            return Ok(0);
        }

        let copied =
            AssetPipeline::copy_tree(&src, &self.config.output_dir.join(name), extensions, mode)?;
        tracing::info!("Copied {} {} files", copied, name);
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    fn locale(tag: &str) -> Locale {
        Locale::new(tag).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// A two-locale site with one item and one project fragment each.
    fn fixture() -> (TempDir, BuildConfig) {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "data/en/items/hero.json", r#"{"title":"Hi"}"#);
        write(root, "data/en/project/meta.json", r#"{"name":"Site"}"#);
        write(root, "data/fr/items/hero.json", r#"{"title":"Salut"}"#);
        write(root, "data/fr/project/meta.json", r#"{"name":"Site FR"}"#);

        write(
            root,
            "src/views/index.html",
            "<html lang=\"{{ locale }}\">\n  <h1>{{ name }}</h1>\n  <p>{{ _items.hero.title }}</p>\n  <link href=\"/styles/main.min.css\">\n</html>\n",
        );
        write(root, "src/styles/main.css", ".hero { color: red }");
        write(root, "src/scripts/main.js", "console.log('hi');");
        write(root, "src/img/logo.svg", "<svg/>");
        write(root, "src/_headers", "/*\n  X-Frame-Options: DENY");

        let config = BuildConfig {
            data_dir: root.join("data"),
            src_dir: root.join("src"),
            output_dir: root.join("dist"),
            ..Default::default()
        };

        (temp, config)
    }

    #[test]
    fn builds_every_locale_and_asset() {
        let (temp, config) = fixture();
        let out = temp.path().join("dist");

        let result = SiteBuilder::new(config)
            .build(&[locale("en"), locale("fr")])
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.pages, vec![out.join("index.html"), out.join("fr/index.html")]);

        let en = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(en.contains("<h1>Site</h1>"));
        assert!(en.contains("<p>Hi</p>"));
        assert!(!en.contains('\n'));

        let fr = fs::read_to_string(out.join("fr/index.html")).unwrap();
        assert!(fr.contains("lang=fr") || fr.contains("lang=\"fr\""));
        assert!(fr.contains("<p>Salut</p>"));

        assert!(out.join("styles/main.min.css").is_file());
        assert!(out.join("scripts/main.js").is_file());
        assert!(out.join("img/logo.svg").is_file());
        assert!(out.join("_headers").is_file());
    }

    #[test]
    fn one_failing_locale_does_not_stop_the_others() {
        let (temp, config) = fixture();
        write(temp.path(), "data/fr/items/broken.json", "{nope");

        let result = SiteBuilder::new(config)
            .build(&[locale("en"), locale("fr")])
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].0, locale("fr"));
        assert!(result.failures[0].1.to_string().contains("broken.json"));
        assert!(temp.path().join("dist/index.html").is_file());
        assert!(!temp.path().join("dist/fr/index.html").exists());
    }

    #[test]
    fn rewrites_cdn_urls_when_configured() {
        let (temp, mut config) = fixture();
        config.cdn = Some(CdnConfig {
            base: "//cdn.example.com".to_string(),
            files: vec!["/styles/main.min.css".to_string()],
        });

        SiteBuilder::new(config).build(&[locale("en")]).unwrap();

        let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert!(html.contains("href=//cdn.example.com/styles/main.min.css")
            || html.contains(r#"href="//cdn.example.com/styles/main.min.css""#));
    }

    #[test]
    fn unminified_builds_write_a_css_source_map() {
        let (temp, mut config) = fixture();
        config.minify = false;

        SiteBuilder::new(config).build(&[locale("en")]).unwrap();

        let styles = temp.path().join("dist/styles");
        let css = fs::read_to_string(styles.join("main.min.css")).unwrap();
        assert!(css.ends_with("/*# sourceMappingURL=main.min.css.map */\n"));

        let map: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(styles.join("main.min.css.map")).unwrap())
                .unwrap();
        assert_eq!(map["version"], 3);
    }

    #[test]
    fn minified_builds_skip_the_source_map() {
        let (temp, config) = fixture();

        SiteBuilder::new(config).build(&[locale("en")]).unwrap();

        let styles = temp.path().join("dist/styles");
        assert!(!fs::read_to_string(styles.join("main.min.css"))
            .unwrap()
            .contains("sourceMappingURL"));
        assert!(!styles.join("main.min.css.map").exists());
    }

    #[test]
    fn keeps_formatting_without_minify() {
        let (temp, mut config) = fixture();
        config.minify = false;

        SiteBuilder::new(config).build(&[locale("en")]).unwrap();

        let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert!(html.contains("\n  <h1>Site</h1>"));
    }

    #[test]
    fn pages_stage_requires_aggregated_data() {
        let (_temp, config) = fixture();
        let builder = SiteBuilder::new(config);

        let err = builder.run_stage(Stage::Pages, &locale("en")).unwrap_err();
        assert!(matches!(err, BuildError::Data(DataError::Filesystem { .. })));

        builder.run_stage(Stage::Data, &locale("en")).unwrap();
        builder.run_stage(Stage::Pages, &locale("en")).unwrap();
    }

    #[test]
    fn stages_are_rerunnable() {
        let (temp, config) = fixture();
        let builder = SiteBuilder::new(config);
        builder.build(&[locale("en")]).unwrap();
        let first = fs::read(temp.path().join("dist/index.html")).unwrap();

        builder.run_stage(Stage::Data, &locale("en")).unwrap();
        builder.run_stage(Stage::Pages, &locale("en")).unwrap();
        for stage in Stage::ASSETS {
            builder.run_stage(stage, &locale("en")).unwrap();
        }

        let second = fs::read(temp.path().join("dist/index.html")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn clean_build_removes_stale_output() {
        let (temp, config) = fixture();
        write(temp.path(), "dist/stale.html", "old");

        SiteBuilder::new(config).build(&[locale("en")]).unwrap();

        assert!(!temp.path().join("dist/stale.html").exists());
    }

    #[test]
    fn css_errors_abort_the_build() {
        let (temp, config) = fixture();
        write(temp.path(), "src/styles/main.css", "@import \"gone.css\";");

        let err = SiteBuilder::new(config).build(&[locale("en")]).unwrap_err();

        assert!(matches!(err, BuildError::Asset(AssetError::Css { .. })));
    }
}
