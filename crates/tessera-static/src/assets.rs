//! Asset pipelines: styles, scripts, images, static files and HTML.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use tessera_data::freshness::is_output_fresh;

/// Errors that can occur while processing assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("CSS error in {}: {message}", path.display())]
    Css { path: PathBuf, message: String },

    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl AssetError {
    fn io(path: &Path, err: impl ToString) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn css(path: &Path, err: impl ToString) -> Self {
        Self::Css {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Extensions handled by the image stage.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "svg", "webp", "gif"];

/// Extensions handled by the script stage.
pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs"];

/// How to treat destination files that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Always overwrite
    Always,
    /// Skip files whose destination is at least as new as the source
    Changed,
}

/// Asset pipeline utilities.
pub struct AssetPipeline;

/// A compiled stylesheet and, when requested, its source map JSON.
#[derive(Debug, Clone)]
pub struct CompiledStyles {
    pub code: String,
    pub map: Option<String>,
}

impl AssetPipeline {
    /// Bundle a stylesheet and its `@import`s with lightningcss.
    ///
    /// Vendor prefixes are added for [`default_browsers`]. With `source_map`
    /// set, a v3 source map is produced with sources relative to the entry's
    /// directory.
    pub fn compile_styles(
        entry: &Path,
        minify: bool,
        source_map: bool,
    ) -> Result<CompiledStyles, AssetError> {
        use lightningcss::bundler::{Bundler, FileProvider};
        use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions};
        use lightningcss::targets::Targets;
        use parcel_sourcemap::SourceMap;

        let provider = FileProvider::new();
        let mut bundler = Bundler::new(&provider, None, ParserOptions::default());
        let mut stylesheet = bundler
            .bundle(entry)
            .map_err(|e| AssetError::css(entry, e))?;

        let targets = Targets::from(default_browsers());

        stylesheet
            .minify(MinifyOptions {
                targets,
                ..Default::default()
            })
            .map_err(|e| AssetError::css(entry, e))?;

        let mut map = if source_map {
            let root = entry.parent().unwrap_or(Path::new("."));
            let mut map = SourceMap::new(&root.to_string_lossy());
            for source in &stylesheet.sources {
                map.add_source(source);
            }
            Some(map)
        } else {
            None
        };

        let output = stylesheet
            .to_css(PrinterOptions {
                minify,
                targets,
                source_map: map.as_mut(),
                ..Default::default()
            })
            .map_err(|e| AssetError::css(entry, e))?;

        let map = match map {
            Some(mut map) => Some(map.to_json(None).map_err(|e| AssetError::css(entry, e))?),
            None => None,
        };

        Ok(CompiledStyles {
            code: output.code,
            map,
        })
    }

    /// Minify a rendered page with minify-html.
    ///
    /// Whitespace between inline elements collapses to a single space rather
    /// than disappearing. Comments are removed.
    pub fn minify_html(html: &str) -> String {
        let mut cfg = minify_html::Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        cfg.keep_comments = false;
        cfg.minify_css = true;
        cfg.minify_js = true;
        cfg.remove_bangs = true;
        cfg.remove_processing_instructions = true;

        let minified = minify_html::minify(html.as_bytes(), &cfg);
        String::from_utf8_lossy(&minified).into_owned()
    }

    /// Copy every file under `src` whose extension is in `extensions` into
    /// `dest`, keeping relative paths. Returns the number of files written.
    pub fn copy_tree(
        src: &Path,
        dest: &Path,
        extensions: &[&str],
        mode: CopyMode,
    ) -> Result<usize, AssetError> {
        let mut copied = 0;

        for entry in WalkDir::new(src).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| AssetError::io(src, e))?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            if !extensions.contains(&ext.as_str()) {
                continue;
            }

            let relative = path.strip_prefix(src).unwrap_or(path);
            let target = dest.join(relative);

            if mode == CopyMode::Changed && is_output_fresh(&target, path) {
                continue;
            }

            copy_file(path, &target)?;
            copied += 1;
        }

        Ok(copied)
    }

    /// Copy the files directly inside `src` (dotfiles included) to `dest`.
    pub fn copy_top_level(src: &Path, dest: &Path) -> Result<usize, AssetError> {
        let mut copied = 0;

        for entry in WalkDir::new(src)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| AssetError::io(src, e))?;
            if !entry.path().is_file() {
                continue;
            }

            copy_file(entry.path(), &dest.join(entry.file_name()))?;
            copied += 1;
        }

        Ok(copied)
    }
}

/// Browser versions vendor prefixes are generated for.
pub fn default_browsers() -> lightningcss::targets::Browsers {
    // Versions are encoded as major << 16 | minor << 8 | patch.
    lightningcss::targets::Browsers {
        chrome: Some(87 << 16),
        edge: Some(88 << 16),
        firefox: Some(78 << 16),
        safari: Some(12 << 16),
        ios_saf: Some(12 << 16),
        samsung: Some(14 << 16),
        ..Default::default()
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), AssetError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| AssetError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| AssetError::io(to, e))?;
    Ok(())
}
