use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use command_registry::{
    AppState, AuthManager, CommandStore, Config, KvEngine, Role, RouteTable, build_router, sync,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::parse();

    let engine = match &config.data_dir {
        Some(dir) => KvEngine::open(dir, config.engine_options())
            .with_context(|| format!("failed to open data directory {}", dir.display()))?,
        None => {
            warn!("no data directory configured, commands are kept in memory only");
            KvEngine::with_options(config.engine_options())
        }
    };
    let engine = Arc::new(engine);

    let store = Arc::new(
        CommandStore::new(Arc::clone(&engine))
            .await
            .context("failed to initialize command store")?,
    );

    if let Some(path) = &config.external_commands {
        sync::synchronize_from_file(&store, path)
            .await
            .with_context(|| format!("failed to apply command definitions from {}", path.display()))?;
    }

    let auth = AuthManager::with_admin(&config.admin_username, &config.admin_password, config.bcrypt_cost)
        .context("failed to create administrator account")?;
    for account in &config.users {
        let id = auth
            .create_user(&account.username, &account.password, Role::Standard)
            .await
            .with_context(|| format!("failed to create account '{}'", account.username))?;
        info!(user = %account.username, id = id.0, "account created");
    }

    let state = AppState::new(
        store,
        Arc::new(RouteTable::new()),
        Arc::new(auth),
        config.command_management(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind))?;

    info!(
        address = %config.bind,
        command_management = config.command_management(),
        "command registry started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    engine.close().await.context("failed to checkpoint on shutdown")?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("command_registry=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
