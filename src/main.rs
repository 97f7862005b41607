use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use routegen::config::Config;
use routegen::engine::Engine;
use routegen::error::Error;
use routegen::external::{FileSink, RouteServiceClient};

#[derive(Debug, Parser)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, env = "ROUTEGEN_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load(&args.config).await?;

    let rg = &config.route_generator;
    tracing::info!(
        "starting route generator with configuration: {}",
        args.config.display()
    );
    tracing::info!(
        "method: {}, route count: {}",
        rg.method.name(),
        rg.route_count
    );

    let sink = FileSink::create(&rg.output.directory).await?;
    tracing::info!("output directory: {}", sink.directory().display());

    let finder = RouteServiceClient::new(&rg.route_service.base_url, config.attempt_timeout())?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received shutdown signal, stopping dispatch");
            shutdown.cancel();
        }
    });

    let engine = Engine::new(config, Arc::new(finder), Arc::new(sink));
    let report = engine.run(&cancel).await?;

    if report.cancelled {
        tracing::warn!("route generation stopped early; completed results were saved");
    } else {
        tracing::info!("route generation completed successfully");
    }

    Ok(())
}
