//! Development server implementation.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path as UrlPath, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use tessera_data::Locale;
use tessera_static::{BuildConfig, BuildError, SiteBuilder, Stage};

use crate::watcher::{FileWatcher, WatchEvent, WatchRules};
use crate::websocket::{reload_client_script, ReloadHub, ReloadMessage};

const RELOAD_SOCKET: &str = "/__reload";
const RELOAD_SCRIPT: &str = "/__reload.js";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Build settings used for every stage re-run
    pub build: BuildConfig,

    /// Locale rebuilt on data changes for the whole session
    pub locale: Locale,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig {
                minify: false,
                ..Default::default()
            },
            locale: Locale::default(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

impl DevServerConfig {
    /// Build settings for the session.
    ///
    /// The session locale renders to the output root so `/` shows it, and
    /// CDN rewriting is off.
    pub fn session_build(&self) -> BuildConfig {
        BuildConfig {
            default_locale: self.locale.clone(),
            cdn: None,
            ..self.build.clone()
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}: {1}")]
    Address(String, String),

    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, String),

    #[error("File watch error: {0}")]
    Watch(String),
}

/// Shared server state.
struct ServerState {
    output_dir: PathBuf,
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Build once, then serve, watch and live-reload until interrupted.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::Address(addr_str.clone(), e.to_string()))?;

        let locale = self.config.locale.clone();
        let builder = Arc::new(SiteBuilder::new(self.config.session_build()));

        initial_build(&builder, &locale).await;

        let hub = ReloadHub::new();
        let source_root = canonical(&self.config.build.src_dir);
        let data_root = canonical(&self.config.build.data_dir);

        let rules = WatchRules::defaults(&source_root, &data_root, &locale)
            .map_err(|e| ServerError::Watch(e.to_string()))?;

        let (watcher, mut rx) = FileWatcher::new(&[source_root, data_root])
            .map_err(|e| ServerError::Watch(e.to_string()))?;

        // Spawn file watch handler
        let watch_hub = hub.clone();
        let watch_builder = Arc::clone(&builder);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&watch_builder, &rules, &watch_hub, &locale, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let output_dir = builder.config().output_dir.clone();
        let state = Arc::new(ServerState {
            output_dir: output_dir.clone(),
            hub,
        });

        let app = Router::new()
            .route("/", get(root_page_handler))
            .route("/{locale}/", get(locale_page_handler))
            .route(RELOAD_SOCKET, get(ws_handler))
            .route(RELOAD_SCRIPT, get(reload_script_handler))
            .fallback_service(ServeDir::new(&output_dir))
            .with_state(state);

        tracing::info!("Starting dev server at http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        // Open browser if configured
        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        Ok(())
    }
}

async fn initial_build(builder: &Arc<SiteBuilder>, locale: &Locale) {
    let builder = Arc::clone(builder);
    let locales = vec![locale.clone()];

    match tokio::task::spawn_blocking(move || builder.build(&locales)).await {
        Ok(Ok(result)) => {
            for (locale, err) in &result.failures {
                tracing::error!("[{}] Initial build failed: {}", locale, err);
            }
            tracing::info!("Initial build finished in {}ms", result.duration_ms);
        }
        Ok(Err(e)) => tracing::error!("Initial build failed: {}", e),
        Err(e) => tracing::error!("Initial build task panicked: {}", e),
    }
}

/// Handle a debounced batch of file changes.
async fn handle_watch_event(
    builder: &Arc<SiteBuilder>,
    rules: &WatchRules,
    hub: &ReloadHub,
    locale: &Locale,
    event: WatchEvent,
) {
    let stages = plan_stages(rules.stages_for_all(&event.paths));
    if stages.is_empty() {
        return;
    }

    tracing::info!(
        "Changed: {} -> re-running {}",
        event
            .paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        stages.iter().map(Stage::name).collect::<Vec<_>>().join(", ")
    );

    let task_builder = Arc::clone(builder);
    let task_locale = locale.clone();
    let task_stages = stages.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        run_stages(&task_builder, &task_stages, &task_locale)
    })
    .await;

    match outcome {
        Ok(Ok(())) => hub.send(reload_message(&stages)),
        Ok(Err(e)) => {
            tracing::warn!("Rebuild failed: {}", e);
            hub.send(ReloadMessage::Error {
                message: e.to_string(),
            });
        }
        Err(e) => tracing::error!("Rebuild task panicked: {}", e),
    }
}

/// Drop stages already covered by another stage in the batch.
pub fn plan_stages(mut stages: BTreeSet<Stage>) -> BTreeSet<Stage> {
    // Data re-renders the page itself.
    if stages.contains(&Stage::Data) {
        stages.remove(&Stage::Pages);
    }
    stages
}

/// Run stages in order, stopping at the first failure.
pub fn run_stages(
    builder: &SiteBuilder,
    stages: &BTreeSet<Stage>,
    locale: &Locale,
) -> Result<(), BuildError> {
    for stage in stages {
        builder.run_stage(*stage, locale)?;
    }
    Ok(())
}

/// Message to broadcast once `stages` completed.
pub fn reload_message(stages: &BTreeSet<Stage>) -> ReloadMessage {
    if !stages.is_empty() && stages.iter().all(|s| *s == Stage::Styles) {
        ReloadMessage::Css
    } else {
        ReloadMessage::Reload
    }
}

/// Insert the reload client before `</body>`, or append it.
pub fn inject_reload_script(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT);

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}{}", html, tag),
    }
}

/// Handler for the default locale page.
async fn root_page_handler(State(state): State<Arc<ServerState>>) -> Response {
    serve_page(&state.output_dir.join("index.html"))
}

/// Handler for `/<locale>/` pages.
async fn locale_page_handler(
    State(state): State<Arc<ServerState>>,
    UrlPath(tag): UrlPath<String>,
) -> Response {
    match Locale::new(tag) {
        Ok(locale) => serve_page(&state.output_dir.join(locale.as_str()).join("index.html")),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn serve_page(path: &Path) -> Response {
    match std::fs::read_to_string(path) {
        Ok(html) => Html(inject_reload_script(&html)).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Html(inject_reload_script(&format!(
                "<!DOCTYPE html><html><body><p>{} has not been built yet.</p></body></html>",
                path.display()
            ))),
        )
            .into_response(),
    }
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one client.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Handler for the live reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        reload_client_script(RELOAD_SOCKET),
    )
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tessera_static::CdnConfig;

    fn set(stages: &[Stage]) -> BTreeSet<Stage> {
        stages.iter().copied().collect()
    }

    #[test]
    fn creates_server_with_default_config() {
        let server = DevServer::new(DevServerConfig::default());
        assert_eq!(server.config.port, 3000);
        assert_eq!(server.config.locale.as_str(), "en");
        assert!(!server.config.build.minify);
    }

    #[test]
    fn session_locale_renders_to_the_output_root() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for (rel, content) in [
            ("data/en/items/a.json", r#"{"t":"A"}"#),
            ("data/en/project/meta.json", r#"{"name":"Site"}"#),
            ("data/fr/items/a.json", r#"{"t":"B"}"#),
            ("data/fr/project/meta.json", r#"{"name":"Site FR"}"#),
            ("src/views/index.html", "<body>{{ name }}</body>"),
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let config = DevServerConfig {
            build: BuildConfig {
                data_dir: root.join("data"),
                src_dir: root.join("src"),
                output_dir: root.join("dist"),
                minify: false,
                cdn: Some(CdnConfig {
                    base: "//cdn.example.com".to_string(),
                    files: vec![],
                }),
                ..Default::default()
            },
            locale: Locale::new("fr").unwrap(),
            ..Default::default()
        };

        let build = config.session_build();
        assert_eq!(build.default_locale.as_str(), "fr");
        assert!(build.cdn.is_none());

        SiteBuilder::new(build)
            .build(&[config.locale.clone()])
            .unwrap();

        let page = fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert_eq!(page, "<body>Site FR</body>");
        assert!(!root.join("dist/fr/index.html").exists());
    }

    #[test]
    fn data_stage_subsumes_pages() {
        let planned = plan_stages(set(&[Stage::Pages, Stage::Data, Stage::Styles]));
        assert_eq!(planned, set(&[Stage::Data, Stage::Styles]));

        let planned = plan_stages(set(&[Stage::Pages]));
        assert_eq!(planned, set(&[Stage::Pages]));
    }

    #[test]
    fn style_only_batches_hot_swap_css() {
        assert_eq!(reload_message(&set(&[Stage::Styles])), ReloadMessage::Css);
        assert_eq!(
            reload_message(&set(&[Stage::Styles, Stage::Pages])),
            ReloadMessage::Reload
        );
        assert_eq!(reload_message(&set(&[Stage::Images])), ReloadMessage::Reload);
    }

    #[test]
    fn injects_before_closing_body() {
        let html = inject_reload_script("<html><BODY><p>x</p></BODY></html>");
        assert_eq!(
            html,
            r#"<html><BODY><p>x</p><script src="/__reload.js"></script></BODY></html>"#
        );

        let fragment = inject_reload_script("<p>x</p>");
        assert!(fragment.ends_with(r#"<script src="/__reload.js"></script>"#));
    }

    #[test]
    fn runs_stages_for_the_session_locale() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for (rel, content) in [
            ("data/en/items/a.json", r#"{"t":"A"}"#),
            ("data/en/project/meta.json", r#"{"name":"Dev"}"#),
            ("src/views/index.html", "<body>{{ name }} {{ _items.a.t }}</body>"),
            ("src/styles/main.css", "a { color: red }"),
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let builder = SiteBuilder::new(BuildConfig {
            data_dir: root.join("data"),
            src_dir: root.join("src"),
            output_dir: root.join("dist"),
            minify: false,
            ..Default::default()
        });

        run_stages(
            &builder,
            &set(&[Stage::Data, Stage::Styles]),
            &Locale::new("en").unwrap(),
        )
        .unwrap();

        let page = fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert_eq!(page, "<body>Dev A</body>");
        assert!(root.join("dist/styles/main.min.css").is_file());
    }
}
