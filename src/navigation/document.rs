//! The hosting document: base URL, location, and session history.
//!
//! # Responsibilities
//! - Derive the base path (document path up to its last `/`)
//! - Own the session history and the navigation bus
//! - `push_state`, `back`, `forward`: update history, then announce
//!   `history-changed` on the bus
//! - Resolve link destinations to document paths
//! - Install the default `navigate` handler (push the resolved path)

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::navigation::bus::{EventName, NavigationBus, NavigationEvent, SubscribeOptions, SubscriptionId};
use crate::navigation::history::History;
use crate::observability::metrics;

/// Errors raised by document navigation.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("invalid base URL `{url}`: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot resolve `{href}` against the document URL: {source}")]
    InvalidHref {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

struct DocumentInner {
    base_url: Url,
    base_path: String,
    history: Mutex<History>,
    bus: NavigationBus,
    default_navigation: Mutex<Option<SubscriptionId>>,
}

/// Shared handle to the hosting document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("base_url", &self.inner.base_url.as_str())
            .field("base_path", &self.inner.base_path)
            .finish()
    }
}

impl Document {
    /// Create a document loaded from `base_url`.
    pub fn new(base_url: &str) -> Result<Self, NavigationError> {
        let url = Url::parse(base_url).map_err(|source| NavigationError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        let base_path = base_path_of(&url);
        let initial = document_path(&url);

        tracing::debug!(base_url = %url, base_path = %base_path, "Document created");

        Ok(Self {
            inner: Arc::new(DocumentInner {
                base_url: url,
                base_path,
                history: Mutex::new(History::new(initial)),
                bus: NavigationBus::new(),
                default_navigation: Mutex::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Path prefix shared by the document, without a trailing `/`.
    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    pub fn bus(&self) -> &NavigationBus {
        &self.inner.bus
    }

    /// Current location as an absolute URL.
    pub fn location(&self) -> Url {
        let current = self.history().current().url.clone();
        // History only ever holds paths produced by `document_path` or
        // accepted by `push_state`, both of which join cleanly.
        self.inner
            .base_url
            .join(&current)
            .unwrap_or_else(|_| self.inner.base_url.clone())
    }

    /// Path component of the current location (what routes match against).
    pub fn location_path(&self) -> String {
        self.location().path().to_string()
    }

    /// State object of the current history entry.
    pub fn state(&self) -> Value {
        self.history().current().state.clone()
    }

    pub fn history_len(&self) -> usize {
        self.history().len()
    }

    /// Push a new history entry and announce it.
    pub fn push_state(&self, state: Value, path: &str) -> Result<(), NavigationError> {
        let url = self.inner.base_url.join(path).map_err(|source| NavigationError::InvalidHref {
            href: path.to_string(),
            source,
        })?;
        let entry = document_path(&url);
        self.history().push(state.clone(), entry.clone());

        tracing::info!(path = %entry, "History entry pushed");
        metrics::record_history_change("push");

        self.inner.bus.publish(NavigationEvent::HistoryChanged { state });
        Ok(())
    }

    /// Step back one entry. Returns false if there is nothing to go back to.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Step forward one entry. Returns false at the newest entry.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Move through history by `delta` and announce the entry's state.
    pub fn go(&self, delta: isize) -> bool {
        let moved = {
            let mut history = self.history();
            history.go(delta).map(|entry| (entry.url.clone(), entry.state.clone()))
        };
        let Some((url, state)) = moved else {
            tracing::debug!(delta, "History traversal out of range");
            return false;
        };

        tracing::info!(path = %url, delta, "History traversed");
        metrics::record_history_change("traverse");

        self.inner.bus.publish(NavigationEvent::HistoryChanged { state });
        true
    }

    /// Resolve a link destination to the path published with `navigate`:
    /// base path + destination path + query + fragment.
    pub fn resolve_href(&self, href: &str) -> Result<String, NavigationError> {
        let url = self.inner.base_url.join(href).map_err(|source| NavigationError::InvalidHref {
            href: href.to_string(),
            source,
        })?;
        Ok(format!("{}{}", self.inner.base_path, document_path(&url)))
    }

    /// Register the default `navigate` handler, which pushes the resolved
    /// path. Capture subscribers that stop propagation pre-empt it.
    /// Calling this again is a no-op.
    pub fn install_default_navigation(&self) -> SubscriptionId {
        let mut installed = self
            .inner
            .default_navigation
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(id) = *installed {
            return id;
        }

        let weak = Arc::downgrade(&self.inner);
        let id = self.inner.bus.subscribe(EventName::Navigate, SubscribeOptions::default(), move |dispatch| {
            let Some(inner) = weak.upgrade() else { return };
            if let NavigationEvent::Navigate { resolved_path, .. } = dispatch.event() {
                let document = Document { inner };
                if let Err(e) = document.push_state(Value::Null, resolved_path) {
                    tracing::warn!(error = %e, "Default navigation failed");
                }
            }
        });
        *installed = Some(id);
        id
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.inner.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Path of `url` up to (not including) its last `/`.
pub fn base_path_of(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(i) => path[..i].to_string(),
        None => String::new(),
    }
}

fn document_path(url: &Url) -> String {
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        path.push('#');
        path.push_str(fragment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path() {
        let doc = Document::new("https://example.com/app/index.html").unwrap();
        assert_eq!(doc.base_path(), "/app");
        assert_eq!(doc.location_path(), "/app/index.html");

        let root = Document::new("https://example.com/").unwrap();
        assert_eq!(root.base_path(), "");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            Document::new("not a url"),
            Err(NavigationError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_href() {
        let doc = Document::new("https://example.com/app/index.html").unwrap();
        assert_eq!(doc.resolve_href("/video/1?t=3#top").unwrap(), "/app/video/1?t=3#top");
    }

    #[test]
    fn test_push_and_traverse_publish() {
        let doc = Document::new("https://example.com/").unwrap();
        let states = Arc::new(Mutex::new(Vec::new()));
        let s = states.clone();
        doc.bus().subscribe(EventName::HistoryChanged, SubscribeOptions::default(), move |d| {
            if let NavigationEvent::HistoryChanged { state } = d.event() {
                s.lock().unwrap().push(state.clone());
            }
        });

        doc.push_state(Value::from(1), "/a?q=1").unwrap();
        assert_eq!(doc.location_path(), "/a");
        assert_eq!(doc.location().query(), Some("q=1"));

        assert!(doc.back());
        assert_eq!(doc.location_path(), "/");
        assert!(!doc.back());
        assert!(doc.forward());
        assert_eq!(doc.state(), Value::from(1));

        assert_eq!(
            *states.lock().unwrap(),
            vec![Value::from(1), Value::Null, Value::from(1)]
        );
    }

    #[test]
    fn test_default_navigation_pushes() {
        let doc = Document::new("https://example.com/").unwrap();
        let id = doc.install_default_navigation();
        assert_eq!(doc.install_default_navigation(), id);

        doc.bus().publish(NavigationEvent::Navigate {
            resolved_path: "/video/7".into(),
            anchor: None,
        });
        assert_eq!(doc.location_path(), "/video/7");
        assert_eq!(doc.history_len(), 2);
    }
}
