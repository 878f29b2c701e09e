// ============================
// crates/backend-bin/src/main.rs
// ============================
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use warden_backend_lib::{
    auth::token_generator::generate_secure_token, config::Settings, router, telemetry, AppState,
};

/// How often expired login lockouts are swept
const LOCKOUT_SWEEP: Duration = Duration::from_secs(5 * 60);

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Credential hashing, session tokens and route gating")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Configuration file; defaults to ./warden.toml when present
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print a fresh random signing key
    Keygen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve { config: None }) {
        Command::Keygen => {
            println!("{}", generate_secure_token());
            Ok(())
        },
        Command::Serve { config } => serve(config).await,
    }
}

async fn serve(config: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = Settings::load(config.as_deref()).context("loading configuration")?;
    telemetry::init(&settings.logging);

    // Refuses to start without a usable signing key
    let state = Arc::new(AppState::new(settings).context("initializing authentication")?);
    state.rate_limiter.spawn_cleanup(LOCKOUT_SWEEP);

    let addr = state.settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    // peer addresses key the login lockout
    let app = router::create_router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
