use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use levelmon_audio::MonitorSetThread;
use levelmon_foundation::Config;

mod routes;

#[derive(Parser, Debug)]
#[command(name = "levelmon")]
#[command(about = "Audio input level monitor with an HTTP query surface")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "./config.json", env = "LEVELMON_CONFIG")]
    config: PathBuf,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "levelmon.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().map_err(|e| anyhow::anyhow!("logging init failed: {}", e))?;
    let args = Args::parse();

    let cfg = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    tracing::info!(
        "starting levelmon: backend {}, {} configured device(s), {}s window",
        cfg.backend,
        cfg.devices.len(),
        cfg.buffer_length
    );

    let (capture, registry) =
        MonitorSetThread::spawn(&cfg.backend, &cfg.devices, cfg.buffer_length)?;
    if registry.is_empty() {
        tracing::warn!("no configured devices were found; /levels will be empty");
    }

    let app = routes::router(Arc::new(registry));
    let addr = format!("{}:{}", cfg.bind, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("serving HTTP on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    capture.stop();
    tracing::info!("levelmon stopped");
    Ok(())
}
