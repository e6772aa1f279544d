// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use multiaddonmanager::api::{ApiHandlers, HttpServer, serve_request};
use multiaddonmanager::config::Config;
use multiaddonmanager::downloader::{
    DownloadCoordinator, HttpClient, SteamConnection, WorkshopContentService, completion_channel,
};
use multiaddonmanager::host::{ConsoleCommand, ConsoleEngine, LocalSearchPath};
use multiaddonmanager::logging::setup_logging;
use multiaddonmanager::manager::{AddonLifecycleManager, ManagerSettings};
use multiaddonmanager::mount::MountSet;

fn run_console_line(manager: &mut AddonLifecycleManager, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match line.parse::<ConsoleCommand>() {
        Ok(command) => {
            let output = command.execute(manager);
            info!(target: "console", "{output}");
        }
        Err(e) => warn!(target: "console", command = %line, "{e}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level, config.log_json)?;

    info!("Starting MultiAddonManager v{}", env!("CARGO_PKG_VERSION"));

    let resolver = config.resolver();
    tokio::fs::create_dir_all(resolver.content_dir()).await?;
    info!(path = %resolver.content_dir().display(), "Workshop content directory ready");

    let (completion_tx, completion_rx) = completion_channel();
    let steam = SteamConnection::new(config.app_id).await?;
    let content = WorkshopContentService::new(
        resolver.clone(),
        Arc::new(steam),
        HttpClient::new()?,
        completion_tx,
    );

    let mut manager = AddonLifecycleManager::new(
        ManagerSettings::from(&config),
        DownloadCoordinator::new(Box::new(content), completion_rx),
        MountSet::new(resolver, Box::new(LocalSearchPath::new())),
        Box::new(ConsoleEngine::stdout()),
    );

    // Persisted extra addons are mounted by the activation refresh
    for &id in &config.extra_addons {
        manager.add_addon(id, false);
    }
    manager.on_server_startup(config.startup_map_target());

    // Start HTTP server
    let (admin_tx, mut admin_rx) = mpsc::channel(64);
    let http_server = HttpServer::new(ApiHandlers::new(admin_tx), config.local_api_bind);
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.serve().await {
            error!(error = %e, "HTTP server error");
        }
    });

    manager.on_server_activated();

    info!("All services started. Waiting for shutdown signal...");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut frames = tokio::time::interval(Duration::from_millis(config.tick_interval_ms.max(1)));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                match result {
                    Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
                    Err(err) => error!(error = %err, "Unable to listen for shutdown signal"),
                }
                break;
            }
            _ = frames.tick() => manager.on_game_frame(),
            Some(request) = admin_rx.recv() => serve_request(&mut manager, request),
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => run_console_line(&mut manager, &line),
                Ok(None) => {
                    info!("Console input closed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read console input");
                    stdin_open = false;
                }
            },
        }
    }

    // Graceful shutdown
    info!("Initiating graceful shutdown...");

    manager.clear_addons();
    http_task.abort();

    info!("Shutdown complete");
    Ok(())
}
