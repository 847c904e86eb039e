use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use favsync_api::config::AppConfig;
use favsync_api::logging;
use favsync_api::router::build_app_router;
use favsync_api::state::AppState;
use favsync_catalog::{
    CommandDownloader, DownloadHistory, DownloaderAccount, HistoryDownloader, QobuzApi,
};
use favsync_core::{JobLock, StatusStore};
use favsync_worker::{JobController, Scheduler};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // The subscriber needs the config, so this goes to stderr.
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // --- Tracing ---
    if let Err(e) = logging::init_tracing(&config) {
        eprintln!("Failed to open log file in {}: {e}", config.config_directory.display());
        std::process::exit(1);
    }

    tracing::info!(
        music_directory = %config.music_directory.display(),
        config_directory = %config.config_directory.display(),
        quality = config.quality,
        interval_mins = config.check_interval_minutes,
        workers_tracks = config.max_workers_tracks,
        workers_albums = config.max_workers_albums,
        workers_artists = config.max_workers_artists,
        batch_size = config.batch_size,
        "Loaded configuration",
    );

    // --- Catalog client ---
    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };
    let catalog = QobuzApi::with_client(http, config.api_url.clone(), config.app_id.clone());

    // --- Downloader ---
    let history = match DownloadHistory::load_from_dir(&config.config_directory).await {
        Ok(history) => Arc::new(history),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load download history");
            std::process::exit(1);
        }
    };
    tracing::info!(entries = history.len().await, "Download history loaded");

    let command = CommandDownloader::new(config.music_directory.clone(), config.quality)
        .with_program(config.downloader_command.clone())
        .with_folder_format(config.folder_format.clone())
        .with_account(
            config.downloader_home(),
            DownloaderAccount {
                credentials: config.credentials.clone(),
                app_id: config.app_id.clone(),
                secrets: config.app_secrets.clone(),
            },
        );
    if let Err(e) = command.prepare().await {
        tracing::error!(error = %e, "Failed to write downloader config");
        std::process::exit(1);
    }
    let downloader = HistoryDownloader::new(command, history);

    // --- Job controller + scheduler ---
    let status = StatusStore::new();
    let controller = Arc::new(JobController::new(
        Arc::new(catalog),
        Arc::new(downloader),
        config.credentials.clone(),
        config.job_settings(),
        JobLock::new(),
        status,
    ));
    let scheduler = Scheduler::new(controller, config.check_interval());

    let cancel = CancellationToken::new();
    let scheduler_handle = tokio::spawn(scheduler.clone().run(cancel.clone()));

    // --- Dashboard ---
    if config.enable_web_ui {
        let addr = match config.host.parse() {
            Ok(ip) => SocketAddr::new(ip, config.port),
            Err(e) => {
                tracing::error!(host = %config.host, error = %e, "Invalid WEB_UI_HOST address");
                std::process::exit(1);
            }
        };

        let app = build_app_router(
            AppState::new(scheduler),
            Duration::from_secs(config.request_timeout_secs),
        );

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(%addr, error = %e, "Failed to bind dashboard address");
                std::process::exit(1);
            }
        };
        tracing::info!(%addr, "Starting dashboard server");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!(error = %e, "Server error");
        }
        tracing::info!("Server stopped accepting connections");
    } else {
        tracing::info!("Dashboard disabled");
        shutdown_signal().await;
    }

    // --- Post-shutdown cleanup ---
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), scheduler_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the service
/// shuts down cleanly whether stopped interactively or by a container
/// runtime.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
