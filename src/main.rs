use std::sync::Arc;

use datagen::{
    config::AppConfig,
    pipeline::{engine::Engine, sinks::LogSink},
    sources::SequenceSource,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let log_level = if config.debug { "debug" } else { "info" };
    let use_ansi = atty::is(atty::Stream::Stdout);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("datagen={}", log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(use_ansi), // Disable ANSI colors in non-terminal environments
        )
        .init();

    let handle = Engine::new(Arc::new(SequenceSource::new()), Arc::new(LogSink::new()))
        .with_generators(config.generators)
        .with_publishers(config.publishers)
        .run();

    tokio::signal::ctrl_c().await?;
    info!("shutting down generation");
    handle.shutdown().await;

    Ok(())
}
