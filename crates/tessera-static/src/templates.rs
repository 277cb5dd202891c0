//! Template engine for rendering locale pages.

use std::path::PathBuf;

use minijinja::{path_loader, Environment};
use serde_json::Value;

use tessera_data::{Document, Locale};

/// Errors that can occur when rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("No template for locale {locale} in {} (expected index-{locale}.html or index.html)", dir.display())]
    NotFound { locale: Locale, dir: PathBuf },

    #[error(transparent)]
    Render(#[from] minijinja::Error),
}

/// Template engine using minijinja, loading views from disk.
pub struct TemplateEngine {
    views_dir: PathBuf,
}

impl TemplateEngine {
    /// Create an engine reading templates from `views_dir`.
    pub fn new(views_dir: impl Into<PathBuf>) -> Self {
        Self {
            views_dir: views_dir.into(),
        }
    }

    /// Name of the template used for `locale`.
    ///
    /// Prefers `index-<locale>.html` and falls back to `index.html`.
    pub fn template_for(&self, locale: &Locale) -> Option<String> {
        [format!("index-{}.html", locale), "index.html".to_string()]
            .into_iter()
            .find(|name| self.views_dir.join(name).is_file())
    }

    /// Render the page for `locale` from its aggregated project document.
    ///
    /// Top-level keys of `project` become template variables, alongside
    /// `locale` and `locales` unless the project defines them itself.
    pub fn render_locale(
        &self,
        locale: &Locale,
        locales: &[Locale],
        project: &Document,
    ) -> Result<String, TemplateError> {
        let name = self
            .template_for(locale)
            .ok_or_else(|| TemplateError::NotFound {
                locale: locale.clone(),
                dir: self.views_dir.clone(),
            })?;

        let mut context = project.clone();
        context
            .entry("locale")
            .or_insert_with(|| Value::from(locale.as_str()));
        context.entry("locales").or_insert_with(|| {
            Value::Array(locales.iter().map(|l| Value::from(l.as_str())).collect())
        });

        // A fresh environment per render picks up edited templates in dev mode.
        let mut env = Environment::new();
        env.set_loader(path_loader(&self.views_dir));

        let tmpl = env.get_template(&name)?;
        Ok(tmpl.render(&context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn locale(tag: &str) -> Locale {
        Locale::new(tag).unwrap()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn renders_project_variables() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("index.html"),
            "<title>{{ name }}</title>{% for key, item in _items|items %}<li>{{ key }}={{ item.title }}</li>{% endfor %}",
        )
        .unwrap();

        let engine = TemplateEngine::new(temp.path());
        let project = doc(json!({
            "name": "Site",
            "_items": {"hero": {"title": "Hi"}},
        }));

        let html = engine
            .render_locale(&locale("en"), &[locale("en")], &project)
            .unwrap();

        assert!(html.contains("<title>Site</title>"));
        assert!(html.contains("<li>hero=Hi</li>"));
    }

    #[test]
    fn prefers_locale_specific_template() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("index.html"), "generic").unwrap();
        fs::write(temp.path().join("index-fr.html"), "bonjour {{ locale }}").unwrap();

        let engine = TemplateEngine::new(temp.path());
        let locales = [locale("en"), locale("fr")];

        let fr = engine
            .render_locale(&locale("fr"), &locales, &Document::new())
            .unwrap();
        let en = engine
            .render_locale(&locale("en"), &locales, &Document::new())
            .unwrap();

        assert_eq!(fr, "bonjour fr");
        assert_eq!(en, "generic");
    }

    #[test]
    fn supports_template_inheritance() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("layout.html"),
            "<body>{% block main %}{% endblock %}</body>",
        )
        .unwrap();
        fs::write(
            temp.path().join("index.html"),
            r#"{% extends "layout.html" %}{% block main %}{{ locales|join(",") }}{% endblock %}"#,
        )
        .unwrap();

        let engine = TemplateEngine::new(temp.path());
        let html = engine
            .render_locale(&locale("en"), &[locale("en"), locale("fr")], &Document::new())
            .unwrap();

        assert_eq!(html, "<body>en,fr</body>");
    }

    #[test]
    fn escapes_content_in_html_templates() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("index.html"), "{{ body }}").unwrap();

        let engine = TemplateEngine::new(temp.path());
        let html = engine
            .render_locale(&locale("en"), &[], &doc(json!({"body": "<b>x</b>"})))
            .unwrap();

        assert!(html.starts_with("&lt;b&gt;x"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn missing_template_is_not_found() {
        let temp = tempdir().unwrap();
        let engine = TemplateEngine::new(temp.path());

        let err = engine
            .render_locale(&locale("de"), &[], &Document::new())
            .unwrap_err();

        assert!(matches!(err, TemplateError::NotFound { .. }));
        assert!(err.to_string().contains("index-de.html"));
    }
}
