//! ADM backend - session management API.
//!
//! This binary parses the configuration, assembles the router and serves it.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adm_backend::{
    config::{Cli, Command, ServeConfig},
    directory::HttpUserDirectory,
    router::join_path,
    server::{build_routes, create_app, default_cors_config, AppState, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Routes(config) => run_routes(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let state = match build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize user directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let origins = config.resolved_cors_origins();
    info!("Configuration:");
    info!("  CORS origins: {}", origins.join(", "));
    if let Some(ref base_path) = config.base_path {
        info!("  Base path: {}", base_path);
    }
    match config.directory_url() {
        Some(url) => info!("  User directory: {}", url),
        None => warn!("  User directory: not configured, session creation will fail"),
    }

    let app = match create_app(state, build_router_config(&config)) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to build router: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Server listening on: http://{}", addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => return serve_exit_code(result),
        _ = shutdown_signal() => {}
    }

    info!("Shutdown signal received, draining in-flight requests");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(result) => serve_exit_code(result),
        Err(_) => {
            warn!(
                "Shutdown timed out after {}s, exiting",
                config.shutdown_timeout
            );
            ExitCode::SUCCESS
        }
    }
}

fn serve_exit_code(result: Result<std::io::Result<()>, tokio::task::JoinError>) -> ExitCode {
    match result {
        Ok(Ok(())) => {
            info!("HTTP server stopped");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Server task failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "adm_backend=debug,tower_http=debug"
    } else {
        "adm_backend=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wire the collaborators described by `config`.
fn build_state(config: &ServeConfig) -> Result<AppState, adm_backend::DirectoryError> {
    let mut state = AppState::in_memory();

    if let Some(url) = config.directory_url() {
        state = state.with_directory(Arc::new(HttpUserDirectory::new(url)?));
    }
    if let Some(ref token) = config.service_token {
        state = state.with_service_token(token.clone());
    }

    Ok(state)
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let origins = config.resolved_cors_origins();
    let cors = default_cors_config(origins.as_slice()).with_max_age(config.cors_max_age);

    let mut router_config = RouterConfig::new()
        .with_cors(cors)
        .with_request_timeout(config.request_timeout())
        .with_tracing(!config.no_tracing);

    if let Some(ref base_path) = config.base_path {
        router_config = router_config.with_base_path(base_path.clone());
    }

    router_config
}

// =============================================================================
// Routes Command
// =============================================================================

fn run_routes(config: ServeConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let router = match build_routes(AppState::in_memory()) {
        Ok(router) => router,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let base = config.base_path.as_deref().unwrap_or("/");
    for (method, path) in router.routes() {
        println!("{:<7} {}", method.as_str(), join_path(base, &path));
    }

    ExitCode::SUCCESS
}
