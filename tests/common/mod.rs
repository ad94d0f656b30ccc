//! Shared fixtures for integration tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use view_router::config::{AppConfig, RouteConfig};
use view_router::transition::CallbackResult;

/// Route table of a small video site served from `/app/`.
#[allow(dead_code)]
pub fn video_site() -> AppConfig {
    let mut config = AppConfig::default();
    config.document.base_url = "https://example.com/app/index.html".into();
    config.transitions.animations_enabled = false;
    config.routes = vec![
        route("home", "/(?:index.html)?", true, None),
        route("video", "/video", false, None),
        route("detail", "/video/(?<id>\\w+)", false, Some("video")),
        route("about", "/about", true, None),
        route("missing", "*", false, None),
    ];
    config
}

#[allow(dead_code)]
pub fn route(name: &str, path: &str, exact: bool, parent: Option<&str>) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        path: path.into(),
        exact,
        outlet: "main".into(),
        parent: parent.map(str::to_string),
    }
}

/// Shared log of callback labels, in completion order.
#[allow(dead_code)]
pub type Log = Arc<Mutex<Vec<&'static str>>>;

#[allow(dead_code)]
pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Boxed update future returned by [`step`].
#[allow(dead_code)]
pub type StepFuture = Pin<Box<dyn Future<Output = CallbackResult> + Send>>;

/// An update that sleeps for `ms` and then records `label`.
#[allow(dead_code)]
pub fn step(log: &Log, label: &'static str, ms: u64) -> impl FnOnce() -> StepFuture + Send + 'static {
    let log = log.clone();
    move || -> StepFuture {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            log.lock().unwrap().push(label);
            Ok(())
        })
    }
}

#[allow(dead_code)]
pub fn entries(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}
