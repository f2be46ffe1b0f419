//! Portal API server binary.
//!
//! `serve` (the default) runs the HTTP API; `issue-token` mints a token pair
//! with the configured secret for local development.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use portal_api::AppState;
use portal_api::config::ApiConfig;
use portal_core::models::Role;
use tracing::{debug, info};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "portal_api_server", about = "Portal API server", version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve(ServeArgs),
    /// Print a freshly issued token pair as JSON.
    IssueToken(IssueTokenArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Seconds between sweeps of expired revocations and idle rate-limit entries.
    #[arg(long, default_value_t = 60)]
    sweep_interval_secs: u64,
}

#[derive(Args, Debug)]
struct IssueTokenArgs {
    /// Subject (user ID).
    #[arg(long)]
    subject: String,

    /// Role: user, berater or admin.
    #[arg(long, default_value = "user")]
    role: Role,

    /// User email.
    #[arg(long)]
    email: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so `issue-token` output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,portal_api=debug,portal_core=debug")
                }),
        )
        .init();

    let cli = Cli::parse();
    let config = ApiConfig::from_env()?;

    match cli.command {
        Some(Command::IssueToken(args)) => issue_token(config, args),
        Some(Command::Serve(args)) => serve(config, args).await,
        None => serve(config, cli.serve).await,
    }
}

fn issue_token(config: ApiConfig, args: IssueTokenArgs) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(config);
    let resp =
        portal_api::services::auth::issue(&state.tokens, &args.subject, args.role, &args.email)?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}

async fn serve(mut config: ApiConfig, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "127.0.0.1".into());
        config.bind_addr = format!("{host}:{port}");
    }

    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        cors_origins = ?config.cors.allowed_origins,
        api_key_callers = config.api_keys.registry.len(),
        "starting portal_api_server"
    );

    let state = AppState::new(config);
    spawn_sweeper(state.clone(), Duration::from_secs(args.sweep_interval_secs.max(1)));

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    let app = portal_api::router(state);

    info!(addr = %local_addr, "REST API listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically drop expired revocations and idle rate-limit windows.
fn spawn_sweeper(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let revocations = state.tokens.purge_expired();
            let clients = state.limiter.sweep();
            if revocations > 0 || clients > 0 {
                debug!(revocations, clients, "swept expired auth state");
            }
        }
    });
}
