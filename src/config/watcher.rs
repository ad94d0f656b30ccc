//! Hot reload of the route table.
//!
//! # Data Flow
//! ```text
//! notify event (modify/create)
//!     → Reloader::reload: load + validate, diff against last accepted
//!     → unchanged? dropped (editors touch files without changing them)
//!     → ConfigUpdate over mpsc → Shell::apply_routes
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::AppConfig;

/// A validated configuration that differs from the last one accepted.
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub config: AppConfig,
    pub routes_changed: bool,
    /// `[document]` changed; only takes effect after a restart.
    pub document_changed: bool,
}

/// Loads the file and reports what changed since the last accepted config.
#[derive(Debug)]
pub struct Reloader {
    path: PathBuf,
    last: AppConfig,
}

impl Reloader {
    pub fn new(path: &Path, current: AppConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            last: current,
        }
    }

    /// Reload the file. `Ok(None)` when neither routes nor document changed.
    /// A failed load leaves the last accepted config in place.
    pub fn reload(&mut self) -> Result<Option<ConfigUpdate>, ConfigError> {
        let config = load_config(&self.path)?;
        let routes_changed = config.routes != self.last.routes;
        let document_changed = config.document != self.last.document;
        if !routes_changed && !document_changed {
            return Ok(None);
        }

        tracing::debug!(routes_changed, document_changed, routes = config.routes.len(), "Config changed");
        self.last = config.clone();
        Ok(Some(ConfigUpdate {
            config,
            routes_changed,
            document_changed,
        }))
    }
}

/// Watches the configuration file and sends updates to the running shell.
pub struct ConfigWatcher {
    reloader: Reloader,
    update_tx: mpsc::UnboundedSender<ConfigUpdate>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, diffing against `current`.
    pub fn new(path: &Path, current: AppConfig) -> (Self, mpsc::UnboundedReceiver<ConfigUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                reloader: Reloader::new(path, current),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle stops the watch when dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.reloader.path.clone();
        let mut reloader = self.reloader;
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => match reloader.reload() {
                    Ok(Some(update)) => {
                        if tx.send(update).is_err() {
                            tracing::warn!("Config update dropped: shell no longer listening");
                        }
                    }
                    Ok(None) => tracing::trace!("Config file touched without changes"),
                    Err(e) => tracing::error!(error = %e, "Failed to reload config, keeping current routes"),
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::config::loader::parse_config;

    const ROUTES: &str = r#"
        [[routes]]
        name = "home"
        path = "/"
        exact = true
    "#;

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("view-router-{}-{}.toml", name, std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reload_reports_only_changes() {
        let path = temp_config("reload", ROUTES);
        let mut reloader = Reloader::new(&path, parse_config(ROUTES).unwrap());

        assert!(reloader.reload().unwrap().is_none());

        fs::write(&path, format!("{ROUTES}\n[[routes]]\nname = \"video\"\npath = \"/video\"\n")).unwrap();
        let update = reloader.reload().unwrap().unwrap();
        assert!(update.routes_changed);
        assert!(!update.document_changed);
        assert_eq!(update.config.routes.len(), 2);
        assert!(reloader.reload().unwrap().is_none());

        fs::write(&path, "[[routes]]\nname = \"broken\"\npath = \"/(\"\n").unwrap();
        assert!(matches!(reloader.reload(), Err(ConfigError::Validation(_))));

        fs::write(&path, format!("[document]\nbase_url = \"https://example.com/app/\"\n{ROUTES}")).unwrap();
        let update = reloader.reload().unwrap().unwrap();
        assert!(update.document_changed);
        assert!(update.routes_changed);

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_watcher_sends_rewritten_routes() {
        let path = temp_config("watch", ROUTES);
        let (watcher, mut updates) = ConfigWatcher::new(&path, parse_config(ROUTES).unwrap());
        let _handle = watcher.run().unwrap();

        fs::write(&path, format!("{ROUTES}\n[[routes]]\nname = \"about\"\npath = \"/about\"\n")).unwrap();

        // A write can surface as several events (truncate, then data)
        let received = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(update) = updates.recv().await {
                if update.config.routes.len() == 2 {
                    return Some(update);
                }
            }
            None
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(received.config.routes[1].name, "about");
        fs::remove_file(&path).unwrap();
    }
}
