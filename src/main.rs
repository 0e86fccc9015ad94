use anyhow::{Context, Result};
use clap::Parser;
use interview_runner::{
    create_router, AppState, Config, DisabledDetector, HttpSessionGateway, InterviewRunner,
    ReplayCaptureBackend,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One-take video interview session runner
#[derive(Debug, Parser)]
#[command(name = "interview-runner", version)]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/interview-runner")]
    config: String,

    /// Access token from the invitation link
    #[arg(long)]
    token: String,

    /// Media file replayed as the camera+microphone capture
    #[arg(long)]
    media: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    info!("Interview runner v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Session gateway: {}", cfg.gateway.base_url);

    let gateway = Arc::new(HttpSessionGateway::new(&cfg.gateway)?);
    let backend = Arc::new(ReplayCaptureBackend::new(&args.media));
    let detector = Arc::new(DisabledDetector);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let (handle, runner) = InterviewRunner::spawn(args.token, cfg, gateway, backend, detector);

    let app = create_router(AppState::new(handle));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Control API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    // Dropping the router dropped the last handle, which leaves the flow
    runner.await.context("Interview runner panicked")?;

    Ok(())
}
