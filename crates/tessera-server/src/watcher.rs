//! File watching and glob-to-stage rules.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use globset::{GlobBuilder, GlobMatcher};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use tessera_data::Locale;
use tessera_static::Stage;

/// Quiet period that closes a batch of file events.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// A debounced batch of changed paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Changed paths, deduplicated and sorted
    pub paths: Vec<PathBuf>,
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Returns the watcher and a channel of debounced batches. Events stop
    /// when the watcher is dropped.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel::<notify::Event>();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::warn!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            while let Ok(first) = sync_rx.recv() {
                let mut batch = BTreeSet::new();
                collect(&mut batch, first);

                let disconnected = loop {
                    match sync_rx.recv_timeout(DEBOUNCE) {
                        Ok(event) => collect(&mut batch, event),
                        Err(RecvTimeoutError::Timeout) => break false,
                        Err(RecvTimeoutError::Disconnected) => break true,
                    }
                };

                if !batch.is_empty() {
                    let event = WatchEvent {
                        paths: batch.into_iter().collect(),
                    };
                    if async_tx.blocking_send(event).is_err() {
                        return;
                    }
                }

                if disconnected {
                    return;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn collect(batch: &mut BTreeSet<PathBuf>, event: notify::Event) {
    if matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        batch.extend(event.paths);
    }
}

/// Directory a watch pattern is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchRoot {
    Source,
    Data,
}

#[derive(Debug, Clone)]
struct Rule {
    root: WatchRoot,
    matcher: GlobMatcher,
    stage: Option<Stage>,
}

/// Maps changed paths to the stages that must re-run.
///
/// Patterns are matched against paths relative to their root; `*` does not
/// cross directory separators. An ignore pattern wins over every rule.
#[derive(Debug, Clone)]
pub struct WatchRules {
    source_root: PathBuf,
    data_root: PathBuf,
    rules: Vec<Rule>,
}

impl WatchRules {
    /// Create an empty rule set.
    pub fn new(source_root: impl Into<PathBuf>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            data_root: data_root.into(),
            rules: Vec::new(),
        }
    }

    /// Default rules for a dev session pinned to `locale`.
    pub fn defaults(
        source_root: impl Into<PathBuf>,
        data_root: impl Into<PathBuf>,
        locale: &Locale,
    ) -> Result<Self, globset::Error> {
        Self::new(source_root, data_root)
            .ignore(WatchRoot::Data, "**/_*.json")?
            .ignore(WatchRoot::Data, "**/*.tmp")?
            .rule(WatchRoot::Data, &format!("{}/**/*.json", locale), Stage::Data)?
            .rule(WatchRoot::Source, "styles/**/*.css", Stage::Styles)?
            .rule(WatchRoot::Source, "views/**/*.html", Stage::Pages)?
            .rule(WatchRoot::Source, "scripts/**/*.{js,mjs}", Stage::Scripts)?
            .rule(WatchRoot::Source, "img/**/*", Stage::Images)?
            .rule(WatchRoot::Source, "*", Stage::Static)
    }

    /// Re-run `stage` when a path under `root` matches `pattern`.
    pub fn rule(mut self, root: WatchRoot, pattern: &str, stage: Stage) -> Result<Self, globset::Error> {
        self.rules.push(Rule {
            root,
            matcher: compile(pattern)?,
            stage: Some(stage),
        });
        Ok(self)
    }

    /// Never react to paths under `root` matching `pattern`.
    pub fn ignore(mut self, root: WatchRoot, pattern: &str) -> Result<Self, globset::Error> {
        self.rules.push(Rule {
            root,
            matcher: compile(pattern)?,
            stage: None,
        });
        Ok(self)
    }

    /// Stages triggered by a single path.
    pub fn stages_for(&self, path: &Path) -> BTreeSet<Stage> {
        let mut stages = BTreeSet::new();

        for (root, base) in [
            (WatchRoot::Source, &self.source_root),
            (WatchRoot::Data, &self.data_root),
        ] {
            let Ok(relative) = path.strip_prefix(base) else {
                continue;
            };

            let matching = self
                .rules
                .iter()
                .filter(|r| r.root == root && r.matcher.is_match(relative));

            let mut found = BTreeSet::new();
            for rule in matching {
                match rule.stage {
                    Some(stage) => {
                        found.insert(stage);
                    }
                    None => {
                        found.clear();
                        break;
                    }
                }
            }
            stages.extend(found);
        }

        stages
    }

    /// Union of the stages triggered by every path in a batch.
    pub fn stages_for_all(&self, paths: &[PathBuf]) -> BTreeSet<Stage> {
        paths.iter().flat_map(|p| self.stages_for(p)).collect()
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn rules() -> WatchRules {
        WatchRules::defaults("/site/src", "/site/data", &Locale::new("en").unwrap()).unwrap()
    }

    fn stages(path: &str) -> Vec<Stage> {
        rules().stages_for(Path::new(path)).into_iter().collect()
    }

    #[test]
    fn maps_sources_to_stages() {
        assert_eq!(stages("/site/src/styles/base/_grid.css"), vec![Stage::Styles]);
        assert_eq!(stages("/site/src/views/index-en.html"), vec![Stage::Pages]);
        assert_eq!(stages("/site/src/scripts/lib/menu.js"), vec![Stage::Scripts]);
        assert_eq!(stages("/site/src/img/logos/mark.svg"), vec![Stage::Images]);
        assert_eq!(stages("/site/src/_headers"), vec![Stage::Static]);
    }

    #[test]
    fn data_changes_are_scoped_to_the_session_locale() {
        assert_eq!(stages("/site/data/en/items/html.json"), vec![Stage::Data]);
        assert_eq!(stages("/site/data/en/project/meta.json"), vec![Stage::Data]);
        assert!(stages("/site/data/fr/items/html.json").is_empty());
    }

    #[test]
    fn ignores_aggregated_outputs() {
        assert!(stages("/site/data/en/_items.json").is_empty());
        assert!(stages("/site/data/en/_project.json").is_empty());
        assert!(stages("/site/data/en/_items.json.tmp").is_empty());
    }

    #[test]
    fn unrelated_paths_trigger_nothing() {
        assert!(stages("/elsewhere/styles/main.css").is_empty());
        assert!(stages("/site/src/views/notes.txt").is_empty());
    }

    #[test]
    fn batches_union_stages() {
        let paths = vec![
            PathBuf::from("/site/src/styles/main.css"),
            PathBuf::from("/site/src/styles/print.css"),
            PathBuf::from("/site/data/en/items/a.json"),
        ];

        let all: Vec<_> = rules().stages_for_all(&paths).into_iter().collect();

        assert_eq!(all, vec![Stage::Data, Stage::Styles]);
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("meta.json");

        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()]).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&test_file, "{}").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        let event = event
            .expect("timeout waiting for file watch event")
            .expect("channel should not be closed");
        assert!(event.paths.iter().any(|p| p.ends_with("meta.json")));
    }
}
