use anyhow::{Context, Result};
use clap::Parser;
use medinterp::{create_router, AppState, Config};
use tracing::info;

#[derive(Parser)]
#[command(name = "medinterp", about = "Real-time medical interpreting session service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/medinterp")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);
    info!(
        "HTTP server will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::from_config(cfg);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
