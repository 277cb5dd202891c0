//! Scaffold a new site in the current directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Starter files, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    ("data/en/items/semantic-html.json", DEFAULT_ITEM),
    ("data/en/project/meta.json", DEFAULT_META),
    ("src/views/index.html", DEFAULT_VIEW),
    ("src/styles/main.css", DEFAULT_CSS),
    ("src/scripts/main.js", DEFAULT_JS),
    ("src/robots.txt", DEFAULT_ROBOTS),
];

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing tessera...");

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());

    for (rel, content) in SCAFFOLD {
        let path = Path::new(rel);
        if path.exists() && !yes {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", rel))?;
        tracing::info!("Created {}", rel);
    }

    fs::create_dir_all("src/img").context("Failed to create src/img")?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'tessera dev' to start the development server.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Tessera Configuration

[site]
# Per-locale JSON content: data/<locale>/{items,project}/*.json
data_dir = "data"

# Views, styles, scripts, images and top-level static files
src_dir = "src"

# Output directory for the built site
output = "dist"

# Locale rendered at the site root; others go to /<locale>/
default_locale = "en"

[build]
# Minify HTML and CSS
minify = true

# Serve selected assets from a CDN in production builds
# [cdn]
# base = "//cdn.example.com"
# files = ["/styles/main.min.css", "/scripts/main.js"]

[server]
port = 3000
host = "127.0.0.1"
"#;

const DEFAULT_ITEM: &str = r#"{
  "title": "Use semantic HTML",
  "priority": "high",
  "description": "Prefer elements that describe their content over generic containers."
}
"#;

const DEFAULT_META: &str = r#"{
  "name": "My Checklist",
  "description": "A multi-language checklist built with tessera."
}
"#;

const DEFAULT_VIEW: &str = r#"<!DOCTYPE html>
<html lang="{{ locale }}">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ name }}</title>
  <link rel="stylesheet" href="/styles/main.min.css">
</head>
<body>
  <h1>{{ name }}</h1>
  <p>{{ description }}</p>
  <ul class="items">
  {% for id, item in _items|items %}
    <li id="{{ id }}" class="priority-{{ item.priority }}">
      <strong>{{ item.title }}</strong>
      <p>{{ item.description }}</p>
    </li>
  {% endfor %}
  </ul>
  <script src="/scripts/main.js"></script>
</body>
</html>
"#;

const DEFAULT_CSS: &str = r#":root {
  --accent: #0b7285;
}

body {
  font-family: system-ui, sans-serif;
  max-width: 48rem;
  margin: 2rem auto;
  padding: 0 1rem;
}

.items {
  display: grid;
  gap: 1rem;
  list-style: none;
  padding: 0;
}

.priority-high strong {
  color: var(--accent);
}

.items li {
  user-select: none;
}
"#;

const DEFAULT_JS: &str = r#"document.querySelectorAll('.items li').forEach(function (item) {
  item.addEventListener('click', function () {
    item.classList.toggle('done');
  });
});
"#;

const DEFAULT_ROBOTS: &str = "User-agent: *\nAllow: /\n";
