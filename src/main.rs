//! view-router
//!
//! Replays navigation steps against a configured route table and prints the
//! routes active after each step's transition finishes.
//!
//! # Architecture Overview
//!
//! ```text
//!   step ──▶ Shell::replay ──▶ RouteHost::click ──▶ NavigationBus `navigate`
//!                                                       │ (capture)
//!                                                       ▼
//!                              TransitionScheduler::start_transition
//!                                                       │
//!                                                       ▼
//!                         callback: Document::push_state ──▶ `history-changed`
//!                                                       │
//!                                                       ▼
//!                              RouteHost::refresh ──▶ route listeners
//!
//!   --watch: ConfigWatcher ──mpsc──▶ Shell::apply_routes   (until Ctrl-C)
//! ```

use std::path::PathBuf;

use clap::Parser;

use view_router::config::loader::load_config;
use view_router::config::watcher::ConfigWatcher;
use view_router::lifecycle::signals::shutdown_on_ctrl_c;
use view_router::observability::{logging, metrics};
use view_router::routing::RouteMatch;
use view_router::shell::ActiveRoute;
use view_router::transition::TransitionNotice;
use view_router::{AppConfig, Shell, Shutdown, Step};

#[derive(Parser)]
#[command(name = "view-router")]
#[command(about = "Replay navigations against a client-side route table", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep running and re-apply routes when the config file changes
    #[arg(short, long, requires = "config")]
    watch: bool,

    /// Navigation steps: a path, `back`, or `forward`
    steps: Vec<Step>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("view-router v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shell = Shell::from_config(&config)?;
    tracing::info!(
        base_url = %config.document.base_url,
        routes = config.routes.len(),
        animations = config.transitions.animations_enabled,
        "Configuration loaded"
    );

    let mut notices = shell.scheduler().subscribe();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice {
                TransitionNotice::Started { transition, transition_type } => {
                    tracing::debug!(transition, transition_type = ?transition_type, "Transition started");
                }
                TransitionNotice::Ended { transition, transition_type, outcome } => {
                    tracing::debug!(transition, transition_type = ?transition_type, ok = outcome.is_ok(), "Transition ended");
                }
            }
        }
    });

    print_active(&shell, "initial");
    for step in &cli.steps {
        if let Some(transition) = shell.replay(step)? {
            if let Err(e) = transition.finished().wait().await {
                tracing::warn!(step = %step, error = %e, "Transition failed");
            }
        }
        print_active(&shell, &step.to_string());
    }

    if let (true, Some(path)) = (cli.watch, &cli.config) {
        let shutdown = Shutdown::new();
        let (watcher, mut updates) = ConfigWatcher::new(path, config.clone());
        let _watcher = watcher.run()?;
        tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

        let mut stop = shutdown.subscribe();
        loop {
            tokio::select! {
                Some(update) = updates.recv() => {
                    if update.document_changed {
                        tracing::warn!("Document settings changed; restart to apply them");
                    }
                    if update.routes_changed {
                        match shell.apply_routes(&update.config.routes) {
                            Ok(()) => tracing::info!(routes = update.config.routes.len(), "Routes reloaded"),
                            Err(e) => tracing::error!(error = %e, "Routes partially reloaded"),
                        }
                        print_active(&shell, "reload");
                    }
                }
                _ = stop.recv() => break,
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_active(shell: &Shell, label: &str) {
    let active: Vec<String> = shell.active_routes().iter().map(describe).collect();
    println!(
        "{:<12} {} -> [{}]",
        label,
        shell.document().location_path(),
        active.join(", ")
    );
}

fn describe(route: &ActiveRoute) -> String {
    match &route.matched {
        RouteMatch::Pattern(captures) if !captures.named.is_empty() => {
            let params: Vec<String> = captures.named.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{}({})", route.name, params.join(", "))
        }
        _ => route.name.clone(),
    }
}
